//! Rendering-engine boundary. Detection and orchestration only talk to these
//! traits; `chromium` is the production implementation.

pub mod chromium;
#[cfg(test)]
pub mod fake;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use chromium::ChromiumLauncher;

/// A DOM-inspection script. `name` identifies it in logs; only `source` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub name: &'static str,
    pub source: String,
}

impl Probe {
    pub fn new(name: &'static str, source: impl Into<String>) -> Self {
        Self { name, source: source.into() }
    }
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Start a fresh browser with one configured page. Never shared across attempts.
    async fn launch(&self) -> Result<Box<dyn PageSession>>;
}

#[async_trait]
pub trait PageSession: Send + Sync {
    /// Clear cookies and web storage. Returns one warning per store that could not be cleared.
    async fn clear_state(&self) -> Vec<String>;

    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Resolves once any element matches `selector`; `Err(Timeout)` otherwise.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    async fn evaluate(&self, probe: &Probe) -> Result<serde_json::Value>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}
