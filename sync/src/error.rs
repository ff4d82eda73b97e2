//! Failures reported by repository clients and the browser boundary.

use thiserror::Error;

/// Type alias for results of repository calls.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("API error: {status}{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status { status: u16, message: Option<String> },
    /// The response body did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
    /// The request body could not be built.
    #[error("encode error: {0}")]
    Encode(String),
    /// A host capability (window, storage) is missing.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    pub fn status(status: u16) -> Self {
        Self::Status {
            status,
            message: None,
        }
    }

    /// Whether retrying the same logical operation can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Status { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(Error::Transport("reset".into()).is_retryable());
        assert!(Error::status(503).is_retryable());
        assert!(Error::status(429).is_retryable());
        assert!(!Error::status(404).is_retryable());
        assert!(!Error::Decode("eof".into()).is_retryable());
        assert!(Error::status(404).is_not_found());
        assert!(!Error::Transport("reset".into()).is_not_found());
    }

    #[test]
    fn status_display() {
        assert_eq!(Error::status(500).to_string(), "API error: 500");
        let err = Error::Status {
            status: 400,
            message: Some("empty body".into()),
        };
        assert_eq!(err.to_string(), "API error: 400: empty body");
    }
}
