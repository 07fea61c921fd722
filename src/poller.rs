use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::browser::{BrowserLauncher, PageSession};
use crate::config::{
    Config, CLOSE_GRACE, CONTENT_SELECTOR_TIMEOUT, NAVIGATION_TIMEOUT, NETWORK_IDLE_TIMEOUT, POST_LOAD_SETTLE,
    TICKET_CONTENT_SETTLE, TICKET_ELEMENT_TIMEOUT,
};
use crate::detector::PageStateDetector;
use crate::error::Result;
use crate::notifier::Notifier;
use crate::types::{CycleReport, PollResult};

/// Page shell; any match means the event page rendered.
pub const CONTENT_SELECTORS: &str = "main, #content, .event-detail, .event-header, .tm-header";

/// Ticket widgets; only waited on for the log line.
pub const TICKET_ELEMENT_SELECTORS: &str =
    r#"[data-testid="quickpicksList"], .ticket-list, [data-tid="ticket-tile"], .event-tickets, .ticket-card"#;

/// One attempt at checking the event page. Implemented by the orchestrator
/// and by scripted checkers in scheduler tests.
#[async_trait]
pub trait TicketCheck: Send + Sync {
    /// `Err` only when no browser could be started; everything after that is
    /// reported inside the `CycleReport`.
    async fn check(&self) -> Result<CycleReport>;
}

pub struct PollOrchestrator<L, N> {
    cfg: Config,
    launcher: L,
    notifier: N,
    detector: PageStateDetector,
}

impl<L: BrowserLauncher, N: Notifier> PollOrchestrator<L, N> {
    pub fn new(cfg: Config, launcher: L, notifier: N) -> Self {
        let detector = PageStateDetector::new(cfg.headless);
        Self { cfg, launcher, notifier, detector }
    }

    /// `captcha_seen` is set as soon as the CAPTCHA stage reports, so a later
    /// failure still carries it.
    async fn inspect(
        &self,
        page: &dyn PageSession,
        warnings: &mut Vec<String>,
        captcha_seen: &mut bool,
    ) -> Result<PollResult> {
        self.navigate(page, warnings).await?;
        *captcha_seen = self.detector.check_captcha(page).await?;
        self.detector.assess(page, *captcha_seen).await
    }

    async fn navigate(&self, page: &dyn PageSession, warnings: &mut Vec<String>) -> Result<()> {
        info!("Navigating to {}", self.cfg.event_url);
        page.goto(&self.cfg.event_url, NAVIGATION_TIMEOUT).await?;

        info!("Waiting for page content to load...");
        match page.wait_for_selector(CONTENT_SELECTORS, CONTENT_SELECTOR_TIMEOUT).await {
            Ok(()) => info!("Main content loaded"),
            Err(e) => {
                warn!("Timeout waiting for main content, continuing anyway: {e}");
                warnings.push(format!("page content not found: {e}"));
            }
        }

        sleep(POST_LOAD_SETTLE).await;

        if let Err(e) = page.wait_for_network_idle(NETWORK_IDLE_TIMEOUT).await {
            warn!("Network did not go idle, continuing anyway: {e}");
            warnings.push(format!("network idle wait failed: {e}"));
        }

        sleep(TICKET_CONTENT_SETTLE).await;

        match page.wait_for_selector(TICKET_ELEMENT_SELECTORS, TICKET_ELEMENT_TIMEOUT).await {
            Ok(()) => info!("Ticket elements found on page"),
            Err(_) => info!("No ticket elements found within timeout, page may not have tickets"),
        }
        Ok(())
    }
}

#[async_trait]
impl<L: BrowserLauncher, N: Notifier> TicketCheck for PollOrchestrator<L, N> {
    async fn check(&self) -> Result<CycleReport> {
        info!("Starting resale ticket check");
        let mut page = self.launcher.launch().await?;

        let mut warnings = page.clear_state().await;
        for w in &warnings {
            info!("{w}");
        }

        let mut captcha_seen = false;
        let outcome = self.inspect(page.as_ref(), &mut warnings, &mut captcha_seen).await;

        if !self.cfg.headless {
            info!("Closing browser in {} seconds...", CLOSE_GRACE.as_secs());
            sleep(CLOSE_GRACE).await;
        }
        if let Err(e) = page.close().await {
            warn!("Error closing browser: {e}");
            warnings.push(format!("browser close failed: {e}"));
        }

        let (result, error) = match outcome {
            Ok(result) => (result, None),
            Err(e) => {
                error!("Error during ticket check: {e}");
                (PollResult::none(captcha_seen), Some(e.to_string()))
            }
        };

        if result.found && result.count > 0 {
            self.notifier.notify(result.count, &result.tickets).await;
        } else if error.is_none() {
            info!("No resale tickets found");
        }

        Ok(CycleReport { result, error, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::Instant;

    use crate::browser::fake::{FakeLauncher, FakePage};
    use crate::config::test_config;
    use crate::detector::{availability, captcha, extract};
    use crate::types::TicketInfo;

    /// Records (count, tickets) for every alert.
    #[derive(Clone, Default)]
    struct RecordingNotifier(Arc<Mutex<Vec<(usize, Vec<TicketInfo>)>>>);

    impl RecordingNotifier {
        fn sent(&self) -> Vec<(usize, Vec<TicketInfo>)> {
            self.0.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, count: usize, tickets: &[TicketInfo]) {
            self.0.lock().unwrap().push((count, tickets.to_vec()));
        }
    }

    fn listed_page() -> FakePage {
        FakePage::new()
            .answer(captcha::PROBE_NAME, json!([]))
            .answer(availability::PROBE_NAME, json!({"containerCount": 1, "noResultsText": false}))
            .answer(
                extract::PROBE_NAME,
                json!([[{"section": ["Block 7"], "row": [null, "F"], "price": ["£95.00"]}]]),
            )
    }

    fn empty_page() -> FakePage {
        FakePage::new()
            .answer(captcha::PROBE_NAME, json!([]))
            .answer(availability::PROBE_NAME, json!({"containerCount": 0, "noResultsText": true}))
            .answer(extract::PROBE_NAME, json!([[]]))
    }

    fn orchestrator(
        launcher: FakeLauncher,
        headless: bool,
    ) -> (PollOrchestrator<FakeLauncher, RecordingNotifier>, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        let cfg = Config { headless, ..test_config() };
        (PollOrchestrator::new(cfg, launcher, notifier.clone()), notifier)
    }

    #[tokio::test]
    async fn launch_failure_propagates() {
        let (orch, notifier) = orchestrator(FakeLauncher::failing("Failed to launch the browser process"), true);

        let err = orch.check().await.unwrap_err();

        assert!(err.to_string().contains("Failed to launch"));
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn found_tickets_are_notified_once() {
        let page = listed_page();
        let (orch, notifier) = orchestrator(FakeLauncher::new(page.clone()), true);

        let report = orch.check().await.unwrap();

        assert!(report.error.is_none());
        assert_eq!(report.result.count, 1);
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 1);
        assert_eq!(sent[0].1[0].section.as_deref(), Some("Block 7"));
        assert_eq!(sent[0].1[0].row.as_deref(), Some("F"));
        assert_eq!(page.log.count("close"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn steps_run_in_order() {
        let page = listed_page();
        let (orch, _) = orchestrator(FakeLauncher::new(page.clone()), true);

        orch.check().await.unwrap();

        assert_eq!(
            page.log.calls(),
            vec![
                "launch",
                "clear_state",
                "goto https://tickets.example.test/event/42",
                "wait_for_selector",
                "network_idle",
                "wait_for_selector",
                "captcha",
                "availability",
                "extract",
                "close",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_found_sends_nothing() {
        let (orch, notifier) = orchestrator(FakeLauncher::new(empty_page()), true);

        let report = orch.check().await.unwrap();

        assert_eq!(report.result, PollResult::none(false));
        assert!(report.error.is_none());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_failure_is_reported_not_raised() {
        let mut page = listed_page();
        page.goto_error = Some("net::ERR_NAME_NOT_RESOLVED".to_string());
        let (orch, notifier) = orchestrator(FakeLauncher::new(page.clone()), true);

        let report = orch.check().await.unwrap();

        assert_eq!(report.result, PollResult::none(false));
        assert!(report.error.as_deref().unwrap().contains("net::ERR_NAME_NOT_RESOLVED"));
        assert_eq!(page.log.count("close"), 1);
        assert_eq!(page.log.count(captcha::PROBE_NAME), 0);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn solved_captcha_survives_a_later_probe_failure() {
        // Challenge shows, clears on the first re-check, then availability has no answer.
        let page = FakePage::new().answers(
            captcha::PROBE_NAME,
            vec![json!([{"tag":"IFRAME","offsetWidth":304,"offsetHeight":78,"hasOffsetParent":true}]), json!([])],
        );
        let (orch, notifier) = orchestrator(FakeLauncher::new(page.clone()), false);

        let report = orch.check().await.unwrap();

        assert!(report.error.as_deref().unwrap().contains(availability::PROBE_NAME));
        assert_eq!(report.result, PollResult::none(true));
        assert_eq!(page.log.count("screenshot captcha-detected.png"), 1);
        assert_eq!(page.log.count("close"), 1);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_before_captcha_stage_reports_no_captcha() {
        let mut page = listed_page();
        page.goto_error = Some("net::ERR_CONNECTION_RESET".to_string());
        let (orch, _) = orchestrator(FakeLauncher::new(page), false);

        let report = orch.check().await.unwrap();

        assert!(!report.result.captcha_detected);
        assert!(report.error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_page_shell_is_only_a_warning() {
        let mut page = listed_page();
        page.missing_selectors = true;
        let (orch, notifier) = orchestrator(FakeLauncher::new(page), true);

        let report = orch.check().await.unwrap();

        assert!(report.error.is_none());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("page content not found"));
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_problems_become_warnings() {
        let mut page = empty_page();
        page.close_error = true;
        page.clear_warnings = vec!["Could not clear localStorage".to_string()];
        let (orch, _) = orchestrator(FakeLauncher::new(page), true);

        let report = orch.check().await.unwrap();

        assert!(report.error.is_none());
        assert_eq!(report.warnings[0], "Could not clear localStorage");
        assert!(report.warnings[1].contains("Target closed"));
    }

    #[tokio::test(start_paused = true)]
    async fn visible_browser_lingers_before_close() {
        let (headless, _) = orchestrator(FakeLauncher::new(empty_page()), true);
        let started = Instant::now();
        headless.check().await.unwrap();
        let headless_elapsed = started.elapsed();

        let (visible, _) = orchestrator(FakeLauncher::new(empty_page()), false);
        let started = Instant::now();
        visible.check().await.unwrap();

        assert_eq!(started.elapsed() - headless_elapsed, CLOSE_GRACE);
        assert!(headless_elapsed >= Duration::from_secs(7));
    }
}
