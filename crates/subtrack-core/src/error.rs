use std::time::Duration;
use thiserror::Error;

/// All the ways things can go wrong while tracking subscriptions
///
/// thiserror does the Display/Error plumbing so we don't have to.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Subscription not found: {0}")]
    NotFound(i64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("File operation timed out after {0:?}")]
    TimeoutError(Duration),
}

impl Error {
    /// True for anything that came out of the filesystem, deadline included
    pub fn is_io(&self) -> bool {
        matches!(self, Error::IoError(_) | Error::TimeoutError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_counts_as_io() {
        assert!(Error::TimeoutError(Duration::from_secs(1)).is_io());
        assert!(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full"
        )).is_io());
        assert!(!Error::NotFound(7).is_io());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::NotFound(42).to_string(),
            "Subscription not found: 42"
        );
        assert!(Error::ValidationError("bad date".into())
            .to_string()
            .contains("bad date"));
    }
}
