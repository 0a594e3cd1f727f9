//! Error types for the cloud volume manager
//!
//! Provides structured error types for resolution, provider operations,
//! and the remote format driver.

use thiserror::Error;

/// Unified error type for the manager
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Resolution Errors
    // =========================================================================
    #[error("Resource not found: {kind}/{reference}")]
    NotFound { kind: String, reference: String },

    // =========================================================================
    // Provider Errors
    // =========================================================================
    #[error("Operation rejected by provider: {operation} - {reason}")]
    OperationRejected { operation: String, reason: String },

    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {reason}")]
    Auth { reason: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    // =========================================================================
    // Remote Format Errors
    // =========================================================================
    #[error("Remote format failed: {reason}")]
    Format { reason: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Parse/IO Errors
    // =========================================================================
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Translate a provider bad-request response into a rejection of the
    /// named state-changing operation. Every other error passes through
    /// unmodified; only delete/detach call this.
    pub fn reject_bad_request(self, operation: &str) -> Error {
        match self {
            Error::Api { status: 400, message } => Error::OperationRejected {
                operation: operation.to_string(),
                reason: message,
            },
            other => other,
        }
    }

    /// Check if this error means the referenced resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result type alias for the manager
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_bad_request_translation() {
        let err = Error::Api {
            status: 400,
            message: "volume is attached".into(),
        };
        assert_matches!(
            err.reject_bad_request("volume delete"),
            Error::OperationRejected { operation, reason }
                if operation == "volume delete" && reason == "volume is attached"
        );
    }

    #[test]
    fn test_non_bad_request_passes_through() {
        let err = Error::Api {
            status: 503,
            message: "service unavailable".into(),
        };
        assert_matches!(
            err.reject_bad_request("volume detach"),
            Error::Api { status: 503, .. }
        );

        let err = Error::NotFound {
            kind: "volume".into(),
            reference: "d1".into(),
        };
        assert_matches!(
            err.reject_bad_request("volume delete"),
            Error::NotFound { .. }
        );
    }

    #[test]
    fn test_is_not_found() {
        let err = Error::NotFound {
            kind: "instance".into(),
            reference: "server1".into(),
        };
        assert!(err.is_not_found());

        let err = Error::Format {
            reason: "connection refused".into(),
        };
        assert!(!err.is_not_found());
    }
}
