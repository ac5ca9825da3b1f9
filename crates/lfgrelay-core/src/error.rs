//! Error type shared by every LfgRelay crate.

use crate::types::MessageId;

/// All errors surfaced by LfgRelay.
#[derive(Debug, thiserror::Error)]
pub enum LfgError {
    /// A single platform call failed (permissions, unknown message, bad request).
    #[error("Platform error: {0}")]
    Platform(String),

    /// Transport-level failure or a 5xx from the platform.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// A request with this primary message id is already tracked.
    #[error("Duplicate request id: {0}")]
    DuplicateId(MessageId),

    /// Creation reached zero channels, so there is nothing to track.
    #[error("Broadcast reached no channels")]
    EmptyBroadcast,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LfgError {
    /// Whether a retry of the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LfgError::Http(_) | LfgError::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, LfgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(LfgError::Http("timeout".into()).is_retryable());
        assert!(LfgError::RateLimited { retry_after_ms: 250 }.is_retryable());
        assert!(!LfgError::Platform("Missing Access".into()).is_retryable());
        assert!(!LfgError::EmptyBroadcast.is_retryable());
        assert!(!LfgError::DuplicateId(MessageId(7)).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = LfgError::DuplicateId(MessageId(42));
        assert_eq!(err.to_string(), "Duplicate request id: 42");
    }
}
