use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{SetDownloadBehaviorBehavior, SetDownloadBehaviorParams};
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::cdp::browser_protocol::security::SetIgnoreCertificateErrorsParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use futures_util::StreamExt;
use tracing::{debug, info, warn};

use crate::browser::{BrowserLauncher, PageSession, Probe};
use crate::config::{BROWSER_ARGS, USER_AGENT, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
use crate::error::{AppError, Result};

/// Each store is cleared on its own so one security restriction does not
/// block the others. Resolves to the names of stores that refused.
const CLEAR_STORAGE_JS: &str = r#"(async () => {
    const refused = [];
    try { localStorage.clear(); } catch (_) { refused.push('localStorage'); }
    try { sessionStorage.clear(); } catch (_) { refused.push('sessionStorage'); }
    try {
        if (window.indexedDB && typeof indexedDB.databases === 'function') {
            const dbs = await indexedDB.databases();
            for (const db of dbs) {
                if (db.name) indexedDB.deleteDatabase(db.name);
            }
        }
    } catch (_) { refused.push('indexedDB'); }
    return refused;
})()"#;

pub struct ChromiumLauncher {
    headless: bool,
}

impl ChromiumLauncher {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .viewport(Viewport {
                width: VIEWPORT_WIDTH,
                height: VIEWPORT_HEIGHT,
                ..Viewport::default()
            })
            .args(BROWSER_ARGS.iter().copied());
        if !self.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(AppError::Launch)
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn PageSession>> {
        info!(headless = self.headless, "Launching browser...");
        let (mut browser, handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| AppError::Launch(e.to_string()))?;
        let handler_task = spawn_handler_task(handler);

        match prepare_page(&browser).await {
            Ok(page) => Ok(Box::new(ChromiumSession {
                browser,
                page,
                handler_task,
            })),
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!("Failed to close half-initialised browser: {close_err}");
                }
                handler_task.abort();
                Err(e)
            }
        }
    }
}

/// New tab with the fixed user agent, downloads denied and TLS errors tolerated.
async fn prepare_page(browser: &Browser) -> Result<Page> {
    let page = browser.new_page("about:blank").await?;
    page.set_user_agent(USER_AGENT).await?;
    page.execute(SetIgnoreCertificateErrorsParams::new(true)).await?;
    browser
        .execute(SetDownloadBehaviorParams::new(SetDownloadBehaviorBehavior::Deny))
        .await?;
    Ok(page)
}

fn spawn_handler_task(mut handler: Handler) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("browser handler event error: {e}");
            }
        }
    })
}

pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn clear_state(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = self.page.execute(ClearBrowserCookiesParams::default()).await {
            warnings.push(format!("cookie clearing failed: {e}"));
        }

        match self.page.evaluate(CLEAR_STORAGE_JS).await {
            Ok(val) => {
                let refused: Vec<String> = val.into_value().unwrap_or_default();
                for store in refused {
                    warnings.push(format!("{store} clearing was restricted by browser security policy"));
                }
            }
            Err(e) => warnings.push(format!("storage clearing was restricted: {e}")),
        }

        warnings
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::Navigation(format!("{url}: {e}"))),
            Err(_) => Err(AppError::Timeout(format!(
                "navigation to {url} exceeded {}ms",
                timeout.as_millis()
            ))),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let mut poll_interval = Duration::from_millis(100);
        let max_interval = Duration::from_secs(1);

        loop {
            if self.page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(AppError::Timeout(format!(
                    "selector '{selector}' not found after {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(poll_interval).await;
            poll_interval = (poll_interval * 2).min(max_interval);
        }
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        let val = self.page.evaluate(network_idle_script(timeout)).await?;
        let info: serde_json::Value = val.into_value()?;
        let ok = info.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
        let waited = info.get("waitedMs").and_then(|v| v.as_u64()).unwrap_or(0);
        if ok {
            debug!(waited_ms = waited, "network idle reached");
            Ok(())
        } else {
            Err(AppError::Timeout(format!("network did not go idle within {waited}ms")))
        }
    }

    async fn evaluate(&self, probe: &Probe) -> Result<serde_json::Value> {
        debug!(probe = probe.name, "evaluating DOM probe");
        let val = self.page.evaluate(probe.source.as_str()).await?;
        Ok(val.into_value()?)
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let closed = self.browser.close().await;
        if closed.is_ok() {
            if let Err(e) = self.browser.wait().await {
                warn!("browser process did not exit cleanly: {e}");
            }
        }
        self.handler_task.abort();
        closed?;
        Ok(())
    }
}

/// Ready-state plus resource-count stability, polled inside the page.
fn network_idle_script(timeout: Duration) -> String {
    let timeout_ms = timeout.as_millis().min(u128::from(u64::MAX)) as u64;
    format!(
        r#"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = 500;
            const interval = 250;
            const start = Date.now();
            let lastCount = 0;
            let stableMs = 0;
            try {{ lastCount = performance.getEntriesByType('resource').length; }} catch (_) {{ lastCount = 0; }}
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                let curCount = lastCount;
                try {{ curCount = performance.getEntriesByType('resource').length; }} catch (_) {{ curCount = lastCount; }}
                if (document.readyState === 'complete' && curCount === lastCount) {{
                    stableMs += interval;
                    if (stableMs >= idleMs) {{
                        return {{ ok: true, waitedMs: Date.now() - start }};
                    }}
                }} else {{
                    stableMs = 0;
                }}
                lastCount = curCount;
            }}
            return {{ ok: false, waitedMs: Date.now() - start }};
        }})()"#
    )
}
