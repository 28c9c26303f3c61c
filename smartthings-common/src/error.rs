use thiserror::Error;

/// Common error type for SmartThings components.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("OAuth token error: {0}")]
    Token(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("No SmartApp endpoint is installed for this token")]
    NoEndpoint,

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the SmartThings Error.
pub type Result<T> = std::result::Result<T, Error>;
