//! Konya Water error types
//!
//! Errors stay inside the crate: the gateway collapses every one of them
//! into a fallback value before anything reaches a caller. The HTTP layer
//! only produces errors for requests it rejects at the boundary.

use thiserror::Error;

/// Konya Water error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store initialization failed
    #[error("Initialization error: {0}")]
    Init(String),

    /// Gave up waiting for another caller's initialization
    #[error("Initialization still in progress after {0:?}")]
    InitTimeout(std::time::Duration),

    /// Remote document store call failed
    #[error("Store error: {0}")]
    Store(String),

    /// Text-generation call failed
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Payload could not be decoded into the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Expected absence (unknown document id, empty collection)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before reaching the gateway
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Konya Water operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("analysis/abc".to_string());
        assert_eq!(err.to_string(), "Not found: analysis/abc");

        let err = Error::InitTimeout(std::time::Duration::from_secs(2));
        assert!(err.to_string().contains("2s"));
    }

    #[test]
    fn test_from_serde_error() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
