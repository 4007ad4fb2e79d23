//! API error types for controller operations
//!
//! Failures the controller answers itself. Each [`ApiErrorKind`] has a fixed
//! wire id and HTTP status, and every error is rendered as the envelope
//! `{"error": {"id", "message", "fields"?}}`.
//!
//! # Example
//!
//! ```rust
//! use resource_api::handlers::{ApiError, ApiErrorKind};
//!
//! let error = ApiError::not_found("User", "5b0f8f1c9d3e2a1f4c8b4567");
//! assert_eq!(error.kind, ApiErrorKind::NotFound);
//! assert_eq!(error.message, "User 5b0f8f1c9d3e2a1f4c8b4567 does not exist");
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::repository::StoreError;

/// Operation being performed when the API error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing documents
    List,
    /// Reading a resolved document
    Read,
    /// Creating a document
    Create,
    /// Updating a resolved document
    Update,
    /// Flagging a resolved document as deleted
    SoftDelete,
    /// Removing a resolved document
    Delete,
    /// Loading the document addressed by the path
    ResolveById,
    /// Counting documents
    Stats,
    /// Computing model statistics
    Statistics,
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Read => write!(f, "read"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::SoftDelete => write!(f, "soft_delete"),
            Self::Delete => write!(f, "delete"),
            Self::ResolveById => write!(f, "resolve_by_id"),
            Self::Stats => write!(f, "stats"),
            Self::Statistics => write!(f, "statistics"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The store failed while loading data
    ServerError,
    /// No document has the requested identifier
    NotFound,
    /// The identifier is not in the store's format
    InvalidId,
    /// The operation needs a resolved document and none is attached
    ModelMissing,
    /// The store rejected the document's shape
    ValidationError,
    /// A uniqueness constraint was violated
    Duplicate,
    /// Deleting the document failed
    DeleteError,
}

impl ApiErrorKind {
    /// Identifier written to the `error.id` member
    #[must_use]
    pub const fn id(&self) -> &'static str {
        match self {
            Self::ServerError => "serverError",
            Self::NotFound => "notFound",
            Self::InvalidId => "invalidId",
            Self::ModelMissing => "modelMissing",
            Self::ValidationError => "validationError",
            Self::Duplicate => "duplicate",
            Self::DeleteError => "delete",
        }
    }

    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidId
            | Self::ModelMissing
            | Self::ValidationError
            | Self::Duplicate
            | Self::DeleteError => StatusCode::BAD_REQUEST,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Structured API error with operation context
///
/// Constructed at the point of failure and consumed once to produce the
/// HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Field-level validation detail
    pub fields: Option<Map<String, Value>>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            fields: None,
        }
    }

    /// The store failed while loading `model_name` data
    pub fn server_error(operation: ApiOperation, model_name: &str) -> Self {
        Self::new(
            operation,
            ApiErrorKind::ServerError,
            format!("failed to get {model_name}"),
        )
    }

    /// No `model_name` document has identifier `id`
    pub fn not_found(model_name: &str, id: &str) -> Self {
        Self::new(
            ApiOperation::ResolveById,
            ApiErrorKind::NotFound,
            format!("{model_name} {id} does not exist"),
        )
    }

    /// The identifier is malformed
    pub fn invalid_id() -> Self {
        Self::new(ApiOperation::ResolveById, ApiErrorKind::InvalidId, "Invalid id")
    }

    /// No document was resolved for `operation`
    pub fn model_missing(operation: ApiOperation) -> Self {
        Self::new(
            operation,
            ApiErrorKind::ModelMissing,
            "the model is missing in the request",
        )
    }

    /// The store rejected the document
    ///
    /// # Example
    ///
    /// ```rust
    /// use resource_api::handlers::{ApiError, ApiOperation};
    /// use serde_json::json;
    ///
    /// let fields = json!({ "name": { "kind": "required" } }).as_object().cloned();
    /// let error = ApiError::validation(ApiOperation::Create, "User validation failed", fields);
    /// assert!(error.fields.is_some());
    /// ```
    pub fn validation(
        operation: ApiOperation,
        message: impl Into<String>,
        fields: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            fields,
            ..Self::new(operation, ApiErrorKind::ValidationError, message)
        }
    }

    /// A `model_name` document with the same unique key exists
    pub fn duplicate(operation: ApiOperation, model_name: &str) -> Self {
        Self::new(
            operation,
            ApiErrorKind::Duplicate,
            format!("{model_name} already exists"),
        )
    }

    /// Deleting failed with the store's `message`
    pub fn delete_error(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::DeleteError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API {} error during {}: {}",
            self.kind, self.operation, self.message
        )
    }
}

impl std::error::Error for ApiError {}

/// Classify a failed save
///
/// Validation and duplicate-key failures are answered locally. Any other
/// failure is handed back so the caller can forward it.
///
/// # Example
///
/// ```rust
/// use resource_api::handlers::{classify_write_error, ApiErrorKind, ApiOperation};
/// use resource_api::repository::{StoreError, StoreOperation};
///
/// let answered = classify_write_error(StoreError::duplicate_key("E11000"), ApiOperation::Create, "User");
/// assert_eq!(answered.unwrap().kind, ApiErrorKind::Duplicate);
///
/// let forwarded = classify_write_error(
///     StoreError::other(StoreOperation::Save, "socket closed"),
///     ApiOperation::Create,
///     "User",
/// );
/// assert!(forwarded.is_err());
/// ```
pub fn classify_write_error(
    err: StoreError,
    operation: ApiOperation,
    model_name: &str,
) -> Result<ApiError, StoreError> {
    if err.is_validation() {
        Ok(ApiError::validation(operation, err.message, err.fields))
    } else if err.is_duplicate() {
        Ok(ApiError::duplicate(operation, model_name))
    } else {
        Err(err)
    }
}

/// Inner member of the error envelope
#[derive(Debug, Serialize)]
pub(crate) struct ErrorBody {
    pub(crate) id: &'static str,
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) fields: Option<Map<String, Value>>,
}

/// The error envelope, `{"error": {...}}`
#[derive(Debug, Serialize)]
pub(crate) struct ErrorEnvelope {
    pub(crate) error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if status.is_server_error() {
            tracing::error!(
                operation = %self.operation,
                kind = %self.kind,
                "API error: {}", self.message
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                kind = %self.kind,
                "API error: {}", self.message
            );
        }

        let envelope = ErrorEnvelope {
            error: ErrorBody {
                id: self.kind.id(),
                message: self.message,
                fields: self.fields,
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
    use serde_json::json;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_api_operation_display() {
        assert_eq!(format!("{}", ApiOperation::List), "list");
        assert_eq!(format!("{}", ApiOperation::SoftDelete), "soft_delete");
        assert_eq!(format!("{}", ApiOperation::ResolveById), "resolve_by_id");
    }

    #[test]
    fn test_api_error_kind_ids() {
        assert_eq!(ApiErrorKind::ServerError.id(), "serverError");
        assert_eq!(ApiErrorKind::NotFound.id(), "notFound");
        assert_eq!(ApiErrorKind::InvalidId.id(), "invalidId");
        assert_eq!(ApiErrorKind::ModelMissing.id(), "modelMissing");
        assert_eq!(ApiErrorKind::ValidationError.id(), "validationError");
        assert_eq!(ApiErrorKind::Duplicate.id(), "duplicate");
        assert_eq!(ApiErrorKind::DeleteError.id(), "delete");
    }

    #[test]
    fn test_api_error_kind_status_codes() {
        assert_eq!(
            ApiErrorKind::ServerError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        for kind in [
            ApiErrorKind::InvalidId,
            ApiErrorKind::ModelMissing,
            ApiErrorKind::ValidationError,
            ApiErrorKind::Duplicate,
            ApiErrorKind::DeleteError,
        ] {
            assert_eq!(kind.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_constructor_messages() {
        assert_eq!(
            ApiError::server_error(ApiOperation::Stats, "User").message,
            "failed to get User"
        );
        assert_eq!(ApiError::invalid_id().message, "Invalid id");
        assert_eq!(
            ApiError::model_missing(ApiOperation::Update).message,
            "the model is missing in the request"
        );
        assert_eq!(
            ApiError::duplicate(ApiOperation::Create, "User").message,
            "User already exists"
        );
    }

    #[test]
    fn test_display() {
        let error = ApiError::invalid_id();
        assert_eq!(
            format!("{}", error),
            "API invalidId error during resolve_by_id: Invalid id"
        );
    }

    #[test]
    fn test_classify_validation() {
        let fields = json!({ "name": "required" }).as_object().cloned();
        let err = StoreError::validation("User validation failed", fields.clone());
        let api = classify_write_error(err, ApiOperation::Update, "User").unwrap();
        assert_eq!(api.kind, ApiErrorKind::ValidationError);
        assert_eq!(api.message, "User validation failed");
        assert_eq!(api.fields, fields);
        assert_eq!(api.operation, ApiOperation::Update);
    }

    #[test]
    fn test_classify_forwards_other_errors() {
        let err = StoreError::other(StoreOperation::Save, "socket closed");
        let forwarded = classify_write_error(err.clone(), ApiOperation::Create, "User");
        assert_eq!(forwarded, Err(err));
    }

    #[tokio::test]
    async fn test_into_response_envelope() {
        let response = ApiError::duplicate(ApiOperation::Create, "User").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "error": { "id": "duplicate", "message": "User already exists" } })
        );
    }

    #[tokio::test]
    async fn test_into_response_includes_fields() {
        let fields = json!({ "email": { "message": "invalid" } }).as_object().cloned();
        let response =
            ApiError::validation(ApiOperation::Create, "bad", fields).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"]["id"], "validationError");
        assert_eq!(body["error"]["fields"]["email"]["message"], "invalid");
    }

    #[tokio::test]
    async fn test_not_found_status() {
        let response = ApiError::not_found("User", "abc").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "User abc does not exist");
    }
}
