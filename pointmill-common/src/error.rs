// ================================================================
// File: pointmill-common/src/error.rs
// ================================================================

use thiserror::Error;

use crate::models::quota::ActivityKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found error: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Uuid error: {0}")]
    Uuid(#[from] uuid::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No points backend configured: {0}")]
    NotConfigured(String),

    #[error("Insufficient points: balance {balance}, required {required}")]
    InsufficientPoints { balance: i64, required: i64 },

    #[error("Daily quota exhausted for {activity}")]
    QuotaExhausted { activity: ActivityKind },

    #[error("Unknown reward: {0}")]
    UnknownReward(String),

    #[error("Ledger amounts must be positive, got {0}")]
    InvalidAmount(i64),
}

impl Error {
    /// True for connection-class failures where retrying the same call can
    /// succeed. Validation and balance errors are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}
