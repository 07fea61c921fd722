use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::RETRY_BACKOFF_STEP;
use crate::poller::TicketCheck;
use crate::runlog::RunLog;
use crate::types::RunSummary;

/// Fires one retry-wrapped check immediately and then at a fixed rate.
/// Runs never overlap: a tick that falls inside a running check is skipped.
pub struct Scheduler<C> {
    checker: C,
    run_log: RunLog,
    interval: Duration,
    max_retries: u32,
    shutdown: CancellationToken,
}

impl<C: TicketCheck> Scheduler<C> {
    pub fn new(checker: C, run_log: RunLog, interval: Duration, max_retries: u32) -> Self {
        Self {
            checker,
            run_log,
            interval,
            max_retries: max_retries.max(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel this to stop after the current run; pending backoff sleeps end early.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_retries = self.max_retries,
            "Ticket checker started, checking every {} minutes",
            self.interval.as_secs() / 60
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let summary = self.run_with_retry().await;
            self.run_log.record(&summary);
        }
    }

    /// Up to `max_retries` attempts with linear backoff between them. Only a
    /// failed browser launch is retried; a completed attempt ends the run.
    pub async fn run_with_retry(&self) -> RunSummary {
        let started = Instant::now();
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            info!("Attempt {attempt} of {}", self.max_retries);
            match self.checker.check().await {
                Ok(report) => {
                    for w in &report.warnings {
                        warn!(attempt, "{w}");
                    }
                    return RunSummary {
                        attempts: attempt,
                        success: report.error.is_none(),
                        tickets_found: report.result.count,
                        captcha_detected: report.result.captcha_detected,
                        error: report.error,
                        duration: started.elapsed(),
                    };
                }
                Err(e) => {
                    error!(attempt, "Attempt {attempt} failed: {e}");
                    last_error = Some(e.to_string());
                }
            }

            if attempt < self.max_retries {
                let delay = backoff_delay(attempt);
                info!("Retrying in {} seconds...", delay.as_secs());
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("Shutdown requested, abandoning retries");
                        return self.exhausted(attempt, last_error, started);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        error!("All {} attempts failed", self.max_retries);
        self.exhausted(self.max_retries, last_error, started)
    }

    fn exhausted(&self, attempts: u32, error: Option<String>, started: Instant) -> RunSummary {
        RunSummary {
            attempts,
            success: false,
            tickets_found: 0,
            captcha_detected: false,
            error,
            duration: started.elapsed(),
        }
    }
}

/// Wait after failed attempt `attempt` (1-based).
pub fn backoff_delay(attempt: u32) -> Duration {
    RETRY_BACKOFF_STEP * attempt
}
