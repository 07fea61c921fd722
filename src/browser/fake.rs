//! Scripted in-memory page used by detector, orchestrator and scheduler tests.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::browser::{BrowserLauncher, PageSession, Probe};
use crate::error::{AppError, Result};

/// Shared record of everything the code under test asked the page to do.
#[derive(Debug, Default, Clone)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| c.as_str() == call).count()
    }
}

/// Probe answers keyed by probe name. A queue with more than one entry is
/// consumed front to back; the last entry repeats forever.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    answers: Arc<Mutex<HashMap<&'static str, VecDeque<Value>>>>,
    pub goto_error: Option<String>,
    pub missing_selectors: bool,
    pub close_error: bool,
    pub clear_warnings: Vec<String>,
    pub log: CallLog,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, probe: &'static str, value: Value) -> Self {
        self.answers(probe, vec![value])
    }

    pub fn answers(self, probe: &'static str, values: Vec<Value>) -> Self {
        self.answers.lock().unwrap().insert(probe, values.into());
        self
    }
}

#[async_trait]
impl PageSession for FakePage {
    async fn clear_state(&self) -> Vec<String> {
        self.log.push("clear_state");
        self.clear_warnings.clone()
    }

    async fn goto(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.log.push(format!("goto {url}"));
        match &self.goto_error {
            Some(msg) => Err(AppError::Navigation(msg.clone())),
            None => Ok(()),
        }
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<()> {
        self.log.push("wait_for_selector");
        if self.missing_selectors {
            Err(AppError::Timeout(format!("selector '{selector}' not found")))
        } else {
            Ok(())
        }
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> Result<()> {
        self.log.push("network_idle");
        Ok(())
    }

    async fn evaluate(&self, probe: &Probe) -> Result<Value> {
        self.log.push(probe.name);
        let mut answers = self.answers.lock().unwrap();
        let queue = answers
            .get_mut(probe.name)
            .ok_or_else(|| AppError::Browser(format!("no scripted answer for probe {}", probe.name)))?;
        let value = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        value.ok_or_else(|| AppError::Browser(format!("empty answer queue for {}", probe.name)))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.log.push(format!("screenshot {}", path.display()));
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.push("close");
        if self.close_error {
            Err(AppError::Browser("Target closed".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Hands out clones of one scripted page; optionally fails to launch.
pub struct FakeLauncher {
    pub page: FakePage,
    pub launch_error: Option<String>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self { page, launch_error: None }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            page: FakePage::new(),
            launch_error: Some(msg.to_string()),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        self.page.log.push("launch");
        match &self.launch_error {
            Some(msg) => Err(AppError::Launch(msg.clone())),
            None => Ok(Box::new(self.page.clone())),
        }
    }
}
