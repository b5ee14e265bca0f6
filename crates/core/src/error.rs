//! Unified error types for offcache.
//!
//! Every variant's display text starts with a stable uppercase code so hosts
//! can match on failures without parsing free-form messages.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache manager.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty resource identifier).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The resource manifest is empty, unreadable, or holds bad identifiers.
    #[error("INVALID_MANIFEST: {0}")]
    InvalidManifest(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A manifest resource could not be fetched or stored during activation.
    #[error("MANIFEST_FETCH_FAILED: {resource}: {reason}")]
    ManifestFetchFailure { resource: String, reason: String },

    /// A cache miss could not be answered by the network.
    #[error("NETWORK_FALLBACK_FAILED: {resource}: {reason}")]
    NetworkFallbackFailure { resource: String, reason: String },

    /// Invalid URL or resource identifier.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// A populate task panicked or was cancelled.
    #[error("TASK_FAILED: {0}")]
    TaskFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(format!("json: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let message = err.to_string();
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidManifest(_) => -32000,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::ManifestFetchFailure { .. } => -32003,
            Error::NetworkFallbackFailure { .. } => -32004,
            Error::InvalidUrl(_) => -32005,
            Error::FetchTooLarge(_) => -32006,
            Error::HttpError(_) => -32007,
            Error::TaskFailed(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ManifestFetchFailure { resource: "main.js".to_string(), reason: "status 404".to_string() };
        assert!(err.to_string().starts_with("MANIFEST_FETCH_FAILED"));
        assert!(err.to_string().contains("main.js"));
        assert!(err.to_string().contains("status 404"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::NetworkFallbackFailure { resource: "other.png".to_string(), reason: "offline".to_string() };
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32004);
        assert!(mcp_err.message.contains("other.png"));
    }

    #[test]
    fn test_invalid_input_maps_to_invalid_params() {
        let mcp_err: McpError = Error::InvalidInput("empty".into()).into();
        assert_eq!(mcp_err.code.0, -32602);
    }
}
