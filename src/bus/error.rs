use thiserror::Error;

/// Failure to establish the broker connection at initialization.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid broker url: {0}")]
    InvalidUrl(String),

    #[error("unsupported broker scheme: {0}")]
    UnsupportedScheme(String),

    #[error("failed to connect to {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("failed to start transport runtime: {0}")]
    Runtime(String),
}

/// Failure of a single publish call.
#[derive(Debug, Error)]
pub enum PublishError {
    /// No broker connection was established (publishing disabled or closed).
    #[error("not connected to a broker")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("message rejected: {0}")]
    Rejected(String),

    #[error("publish timed out")]
    Timeout,

    #[error("transport lock poisoned")]
    LockPoisoned,
}
