//! Response types for controller operations
//!
//! - [`ApiResponse`]: the list envelope `{meta, data}`
//! - [`DocumentResponse`]: a single plain document, 200 or 201
//! - [`StatsResponse`]: the accumulated statistics map
//!
//! # Example
//!
//! ```rust
//! use resource_api::handlers::{ApiMeta, ApiResponse};
//! use serde_json::json;
//!
//! let response = ApiResponse::new()
//!     .with_meta(ApiMeta::new(111, 2, 0, 100))
//!     .with_data(vec![json!({ "name": "a" }), json!({ "name": "b" })]);
//!
//! assert_eq!(response.status().as_u16(), 200);
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::repository::Document;

/// Metadata of a list response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMeta {
    /// Number of documents matching the base filter, ignoring pagination
    pub total: u64,
    /// Number of documents in this page
    pub count: u64,
    /// Offset of the executed query
    pub offset: u64,
    /// Limit of the executed query
    pub limit: u64,
    /// Set when building the page partially failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiMeta {
    /// Create list metadata
    #[must_use]
    pub fn new(total: u64, count: u64, offset: u64, limit: u64) -> Self {
        Self {
            total,
            count,
            offset,
            limit,
            error: None,
        }
    }

    /// Flag the response as failed
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Whether an error was recorded
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// The list envelope, `{meta, data}`
///
/// Absent members are omitted from the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiResponse {
    /// Page metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ApiMeta>,
    /// Page documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
}

impl ApiResponse {
    /// Create an empty envelope
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach page metadata
    #[must_use]
    pub fn with_meta(mut self, meta: ApiMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Attach page documents
    #[must_use]
    pub fn with_data(mut self, data: Vec<Value>) -> Self {
        self.data = Some(data);
        self
    }

    /// 500 when the metadata records an error, 200 otherwise
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if self.meta.as_ref().is_some_and(ApiMeta::has_error) {
            StatusCode::INTERNAL_SERVER_ERROR
        } else {
            StatusCode::OK
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// A single document in its plain representation
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResponse {
    status: StatusCode,
    document: Value,
}

impl DocumentResponse {
    /// 200 OK with the document
    pub fn ok(document: &Document) -> Self {
        Self {
            status: StatusCode::OK,
            document: document.to_plain(),
        }
    }

    /// 201 Created with the persisted document
    pub fn created(document: &Document) -> Self {
        Self {
            status: StatusCode::CREATED,
            document: document.to_plain(),
        }
    }
}

impl IntoResponse for DocumentResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.document)).into_response()
    }
}

/// The accumulated statistics map, always 200
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsResponse(pub Map<String, Value>);

impl IntoResponse for StatsResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(Value::Object(self.0))).into_response()
    }
}
