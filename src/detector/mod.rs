//! Page-state detection: CAPTCHA check → availability check → extraction.
//!
//! In-page scripts only report raw DOM facts; every decision (visibility,
//! availability priority, selector cascades, fallback record) is made here.

pub mod availability;
pub mod captcha;
pub mod extract;
pub mod visibility;

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::browser::PageSession;
use crate::config::{CAPTCHA_POLL_INTERVAL, CAPTCHA_SOLVE_TIMEOUT, SCREENSHOT_PATH};
use crate::error::Result;
use crate::types::{PollResult, TicketInfo};

/// JSON literal for splicing Rust-side tables into probe scripts.
pub(crate) fn js_literal(value: impl Into<serde_json::Value>) -> String {
    value.into().to_string()
}

pub struct PageStateDetector {
    headless: bool,
    screenshot_path: PathBuf,
    solve_timeout: Duration,
    poll_interval: Duration,
}

impl PageStateDetector {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            screenshot_path: PathBuf::from(SCREENSHOT_PATH),
            solve_timeout: CAPTCHA_SOLVE_TIMEOUT,
            poll_interval: CAPTCHA_POLL_INTERVAL,
        }
    }

    /// Availability and extraction stages for a page whose CAPTCHA stage
    /// already ran. Always yields one result; only evaluation failures
    /// surface as errors.
    pub async fn assess(&self, page: &dyn PageSession, captcha_detected: bool) -> Result<PollResult> {
        if captcha_detected && self.headless {
            warn!("Running in headless mode, cannot solve CAPTCHA. Consider setting HEADLESS=false");
            return Ok(PollResult::none(true));
        }

        if !self.tickets_available(page).await? {
            info!("No tickets are available at the moment: \"no results\" message found");
            return Ok(PollResult::none(captcha_detected));
        }

        let tickets = self.extract_tickets(page).await?;
        Ok(PollResult::from_tickets(tickets, captcha_detected))
    }

    /// True if a challenge was showing when the page was first inspected. In a
    /// visible browser this also waits (bounded) for an operator to solve it.
    pub async fn check_captcha(&self, page: &dyn PageSession) -> Result<bool> {
        if !self.captcha_visible(page).await? {
            return Ok(false);
        }
        warn!("reCAPTCHA detected!");

        if !self.headless {
            match page.screenshot(&self.screenshot_path).await {
                Ok(()) => info!(
                    path = %self.screenshot_path.display(),
                    "Screenshot saved as {} for verification",
                    self.screenshot_path.display()
                ),
                Err(e) => warn!("Failed to save CAPTCHA screenshot: {e}"),
            }
            info!("Please solve the CAPTCHA in the browser window, then wait for the script to continue...");
            if self.wait_for_captcha_cleared(page).await {
                info!("CAPTCHA appears to be solved, continuing...");
            } else {
                warn!("Timed out waiting for CAPTCHA resolution, will try to proceed anyway...");
            }
        }

        Ok(true)
    }

    async fn captcha_visible(&self, page: &dyn PageSession) -> Result<bool> {
        let candidates = captcha::parse(page.evaluate(&captcha::probe()).await?)?;
        Ok(captcha::any_visible(&candidates))
    }

    /// Polls until no challenge marker is visible. Returns false on timeout.
    async fn wait_for_captcha_cleared(&self, page: &dyn PageSession) -> bool {
        let deadline = Instant::now() + self.solve_timeout;
        loop {
            tokio::time::sleep(self.poll_interval).await;
            match self.captcha_visible(page).await {
                Ok(false) => return true,
                Ok(true) => {}
                Err(e) => warn!("CAPTCHA re-check failed: {e}"),
            }
            if Instant::now() >= deadline {
                return false;
            }
        }
    }

    pub async fn tickets_available(&self, page: &dyn PageSession) -> Result<bool> {
        let snapshot = availability::parse(page.evaluate(&availability::probe()).await?)?;
        info!(
            containers = snapshot.container_count,
            no_results_text = snapshot.no_results_text,
            "availability probe"
        );
        Ok(snapshot.is_available())
    }

    /// Only called once availability is confirmed, hence the synthetic fallback.
    pub async fn extract_tickets(&self, page: &dyn PageSession) -> Result<Vec<TicketInfo>> {
        info!("Extracting ticket information...");
        let per_strategy = extract::parse(page.evaluate(&extract::probe()).await?)?;

        match extract::winning_strategy(&per_strategy) {
            Some(idx) => info!(
                strategy = extract::CONTAINER_STRATEGIES[idx],
                elements = per_strategy[idx].len(),
                "Found {} potential ticket elements",
                per_strategy[idx].len()
            ),
            None => info!("No ticket elements matched any listing strategy"),
        }

        let parsed = extract::listings_from(per_strategy);
        if parsed.is_empty() {
            // Could equally be a selector regression; the placeholder keeps the alert firing.
            warn!("Tickets detected but no listing details could be parsed, reporting one placeholder ticket");
        }
        let tickets = extract::with_fallback(parsed);
        info!("Successfully extracted {} tickets", tickets.len());
        Ok(tickets)
    }
}
