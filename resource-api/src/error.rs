//! Error types and HTTP response conversion
//!
//! [`Error`] is the crate-level error. Controller stages return it to
//! forward a failure they do not answer themselves, and its
//! [`IntoResponse`] implementation is the single place where forwarded
//! failures are logged and turned into a response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::handlers::error::{ErrorBody, ErrorEnvelope};
use crate::repository::StoreError;

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Failure reported by the document store
    #[error("{0}")]
    Store(StoreError),

    /// No acting user is attached to a write request
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err)
    }
}

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, id, message) = match self {
            Error::Store(e) => {
                tracing::error!(
                    operation = %e.operation,
                    kind = %e.kind,
                    "Store error: {}", e.message
                );
                (StatusCode::INTERNAL_SERVER_ERROR, "serverError", e.message)
            }
            Error::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "serverError", e.to_string())
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "serverError", msg)
            }
            Error::Unauthorized(msg) => {
                tracing::warn!("Unauthorized: {}", msg);
                (StatusCode::UNAUTHORIZED, "unauthorized", msg)
            }
            Error::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "badRequest", msg)
            }
        };

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                id,
                message,
                fields: None,
            },
        };

        (status, Json(envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::StoreOperation;
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_from_store_error() {
        let err: Error = StoreError::other(StoreOperation::Find, "cursor lost").into();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(err.to_string(), "Store other error during find: cursor lost");
    }

    #[tokio::test]
    async fn test_store_error_response() {
        let err = Error::from(StoreError::other(StoreOperation::Count, "timeout"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": { "id": "serverError", "message": "timeout" } })
        );
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = Error::Unauthorized("no actor".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["id"], "unauthorized");
        assert_eq!(body["error"]["message"], "no actor");
    }

    #[tokio::test]
    async fn test_bad_request_response() {
        let response = Error::BadRequest("expected an object".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["id"], "badRequest");
    }

    #[tokio::test]
    async fn test_internal_response() {
        let response = Error::Internal("no response".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["message"], "no response");
    }
}
