use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const EVENT_URL: &str =
    "https://www.ticketmaster.co.uk/back-to-the-beginning-birmingham-05-07-2025/event/360062289EF011A5";
pub const NOTIFY_URL: &str = "https://ntfy.sh/ticket-alert";
pub const LOG_FILE_NAME: &str = "ticketmaster_scraping_log.csv";

/// Upper bound on the initial page load.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// How long to wait for the page shell before continuing without it.
pub const CONTENT_SELECTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Settle delay right after the base DOM is ready.
pub const POST_LOAD_SETTLE: Duration = Duration::from_secs(2);

/// Best-effort bound on the network-quiescence heuristic.
pub const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Ticket widgets render asynchronously after the network goes quiet.
pub const TICKET_CONTENT_SETTLE: Duration = Duration::from_secs(5);

/// Informational wait for ticket elements; a miss is not an error.
pub const TICKET_ELEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long an operator gets to solve a challenge in a visible browser.
pub const CAPTCHA_SOLVE_TIMEOUT: Duration = Duration::from_secs(120);

/// Poll interval while waiting for a challenge to disappear.
pub const CAPTCHA_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Visible-mode delay before closing so the operator can see the final page.
pub const CLOSE_GRACE: Duration = Duration::from_secs(3);

/// Linear backoff step: attempt N waits N × this.
pub const RETRY_BACKOFF_STEP: Duration = Duration::from_secs(5);

pub const SCREENSHOT_PATH: &str = "captcha-detected.png";

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 720;

/// Fixed browser argument set: sandboxing off, a few GPU/security features off.
pub const BROWSER_ARGS: &[&str] = &[
    "--disable-features=site-per-process",
    "--disable-web-security",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--no-first-run",
    "--no-zygote",
    "--disable-gpu",
];

#[derive(Debug, Clone)]
pub struct Config {
    /// Monitored event page (EVENT_URL)
    pub event_url: String,
    /// Push endpoint that receives the alert (NOTIFY_URL)
    pub notify_url: String,
    /// Minutes between scheduled runs (INTERVAL_MINUTES)
    pub interval_minutes: u64,
    /// Attempts per scheduled run (MAX_RETRIES)
    pub max_retries: u32,
    /// Run Chromium without a window (HEADLESS)
    pub headless: bool,
    /// CSV run log destination (LOG_FILE_PATH)
    pub log_file_path: PathBuf,
    /// Open the event page locally when tickets show up (OPEN_BROWSER)
    pub open_browser: bool,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let interval_minutes = std::env::var("INTERVAL_MINUTES")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Config("INTERVAL_MINUTES must be a whole number".to_string()))?;
        if interval_minutes == 0 {
            return Err(AppError::Config("INTERVAL_MINUTES must be at least 1".to_string()));
        }

        let max_retries = std::env::var("MAX_RETRIES")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()
            .map_err(|_| AppError::Config("MAX_RETRIES must be a whole number".to_string()))?;
        if max_retries == 0 {
            return Err(AppError::Config("MAX_RETRIES must be at least 1".to_string()));
        }

        let log_file_path = match std::env::var("LOG_FILE_PATH") {
            Ok(p) => PathBuf::from(p),
            Err(_) => std::env::current_dir()?.join(LOG_FILE_NAME),
        };

        Ok(Self {
            event_url: std::env::var("EVENT_URL").unwrap_or_else(|_| EVENT_URL.to_string()),
            notify_url: std::env::var("NOTIFY_URL").unwrap_or_else(|_| NOTIFY_URL.to_string()),
            interval_minutes,
            max_retries,
            headless: parse_flag("HEADLESS", std::env::var("HEADLESS").ok(), true)?,
            log_file_path,
            open_browser: parse_flag("OPEN_BROWSER", std::env::var("OPEN_BROWSER").ok(), true)?,
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

fn parse_flag(name: &str, raw: Option<String>, default: bool) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{name} must be true or false, got {raw:?}"))),
    }
}

/// Defaults-only config with a throwaway log path.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        event_url: "https://tickets.example.test/event/42".to_string(),
        notify_url: "https://ntfy.example.test/alerts".to_string(),
        interval_minutes: 10,
        max_retries: 3,
        headless: true,
        log_file_path: PathBuf::from(LOG_FILE_NAME),
        open_browser: false,
        log_level: "info".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_defaults_when_unset() {
        assert!(parse_flag("HEADLESS", None, true).unwrap());
        assert!(!parse_flag("HEADLESS", None, false).unwrap());
    }

    #[test]
    fn flag_accepts_common_spellings() {
        assert!(parse_flag("HEADLESS", Some("TRUE".into()), false).unwrap());
        assert!(parse_flag("HEADLESS", Some(" yes ".into()), false).unwrap());
        assert!(!parse_flag("HEADLESS", Some("0".into()), true).unwrap());
        assert!(!parse_flag("HEADLESS", Some("off".into()), true).unwrap());
    }

    #[test]
    fn flag_rejects_garbage() {
        let err = parse_flag("HEADLESS", Some("maybe".into()), true).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn interval_is_minutes() {
        let mut cfg = test_config();
        assert_eq!(cfg.interval(), Duration::from_secs(600));
        cfg.interval_minutes = 1;
        assert_eq!(cfg.interval(), Duration::from_secs(60));
    }
}
