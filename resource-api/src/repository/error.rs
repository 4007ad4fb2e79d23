//! Store error types
//!
//! Failures reported by a [`Model`](super::Model) implementation. The
//! controller only inspects the error's [`StoreErrorKind`] to decide whether
//! a write failure is answered locally (validation, duplicate key) or
//! forwarded to the centralized error handler.
//!
//! # Example
//!
//! ```rust
//! use resource_api::repository::{StoreError, StoreErrorKind, StoreOperation};
//!
//! let error = StoreError::duplicate_key("E11000 duplicate key error");
//! assert_eq!(error.kind, StoreErrorKind::Duplicate);
//! assert_eq!(error.operation, StoreOperation::Save);
//! ```

use std::fmt;

use serde_json::{Map, Value};

/// Store operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Finding documents matching a criteria
    Find,
    /// Finding a single document by identifier
    FindById,
    /// Counting documents matching a criteria
    Count,
    /// Inserting or updating a document
    Save,
    /// Removing a document
    Remove,
    /// Computing model-specific aggregate statistics
    Statistics,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find => write!(f, "find"),
            Self::FindById => write!(f, "find_by_id"),
            Self::Count => write!(f, "count"),
            Self::Save => write!(f, "save"),
            Self::Remove => write!(f, "remove"),
            Self::Statistics => write!(f, "statistics"),
        }
    }
}

/// Category of store error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Schema validation rejected the document
    Validation,
    /// A uniqueness constraint was violated (duplicate key)
    Duplicate,
    /// Any other failure
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured store error with operation context
#[derive(Debug, Clone, PartialEq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Message reported by the store
    pub message: String,
    /// Field-level validation detail, keyed by field name
    pub fields: Option<Map<String, Value>>,
}

impl StoreError {
    /// Create a new store error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            fields: None,
        }
    }

    /// Create a schema validation error for a save
    ///
    /// # Example
    ///
    /// ```rust
    /// use resource_api::repository::StoreError;
    /// use serde_json::json;
    ///
    /// let fields = json!({ "name": { "message": "Path `name` is required." } });
    /// let error = StoreError::validation("User validation failed", fields.as_object().cloned());
    /// assert!(error.fields.is_some());
    /// ```
    pub fn validation(message: impl Into<String>, fields: Option<Map<String, Value>>) -> Self {
        Self {
            operation: StoreOperation::Save,
            kind: StoreErrorKind::Validation,
            message: message.into(),
            fields,
        }
    }

    /// Create a duplicate key error for a save
    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(StoreOperation::Save, StoreErrorKind::Duplicate, message)
    }

    /// Create an unclassified error
    pub fn other(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Other, message)
    }

    /// Whether the store rejected the document's shape
    pub fn is_validation(&self) -> bool {
        self.kind == StoreErrorKind::Validation
    }

    /// Whether the store reported a uniqueness violation
    pub fn is_duplicate(&self) -> bool {
        self.kind == StoreErrorKind::Duplicate
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )
    }
}

impl std::error::Error for StoreError {}
