//! Error types for collector API calls.

use thiserror::Error;

/// A specialised Result type for collector API calls.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by [`MoesifApi`](crate::MoesifApi) implementations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Collector returned a non-success status.
    #[error("collector returned {status}: {body}")]
    Status {
        /// HTTP status code returned by the collector.
        status: u16,
        /// Response body returned by the collector.
        body: String,
    },

    /// The payload could not be encoded or the response decoded.
    #[error("failed to encode or decode payload")]
    Json(#[from] serde_json::Error),

    /// The client was built without an application id.
    #[error("no application id configured")]
    MissingApplicationId,
}

impl ApiError {
    pub(crate) fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_status_display() {
        let err = ApiError::status(401, "Unauthorized");
        assert_eq!(err.to_string(), "collector returned 401: Unauthorized");
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
    }

    #[test]
    fn test_json_error_chain() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ApiError::from(json_err);
        assert!(err.source().is_some());
    }
}
