use thiserror::Error;

/// Everything that can go wrong while reading credentials, talking to the
/// usage API or turning a snapshot into a view.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("{what} limit is zero")]
    ZeroLimit { what: &'static str },

    #[error("{0}")]
    InvalidLimit(String),

    #[error("No Cursor token found. Please log in first.")]
    NotLoggedIn,

    #[error("request failed: {0}")]
    Transport(#[from] ureq::Error),

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("credential error: {0}")]
    Credential(String),
}

pub type UsageResult<T> = Result<T, UsageError>;
