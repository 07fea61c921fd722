use thiserror::Error;

// Display strings double as classifier input (see runlog::classifier), so the
// timeout and navigation variants keep the marker text in front.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Browser protocol Error: {0}")]
    Browser(String),

    #[error("Browser launch Error: {0}")]
    Launch(String),

    #[error("TimeoutError: {0}")]
    Timeout(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        match err {
            chromiumoxide::error::CdpError::Timeout => {
                AppError::Timeout("browser did not answer in time".to_string())
            }
            other => AppError::Browser(other.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout("operation exceeded its deadline".to_string())
    }
}
