//! Model capability trait
//!
//! [`Model`] is the only way the controller reaches the document store. It
//! uses RPITIT (Return Position Impl Trait In Traits) for async methods, so
//! implementations can be written with plain `async fn`.
//!
//! # Example
//!
//! ```rust,ignore
//! use resource_api::repository::{Document, FindQuery, Model, Populate, StoreResult};
//!
//! struct Articles {
//!     collection: mongodb::Collection<Document>,
//! }
//!
//! impl Model for Articles {
//!     fn model_name(&self) -> &str { "Article" }
//!     fn collection_name(&self) -> &str { "articles" }
//!
//!     async fn find(&self, query: FindQuery) -> StoreResult<Vec<Document>> {
//!         // Translate the query into a driver cursor
//!         todo!()
//!     }
//!
//!     // ... other required methods
//! }
//! ```

use std::future::Future;

use once_cell::sync::Lazy;
use regex::Regex;

use super::document::Document;
use super::error::StoreError;
use super::query::{Criteria, FindQuery, Populate};

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

static OBJECT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{24}$").unwrap_or_else(|e| panic!("invalid ObjectId pattern: {e}"))
});

/// Check whether `value` is a 24 character hexadecimal ObjectId
///
/// # Example
///
/// ```rust
/// use resource_api::repository::is_object_id;
///
/// assert!(is_object_id("5b0f8f1c9d3e2a1f4c8b4567"));
/// assert!(!is_object_id("not-an-id"));
/// ```
pub fn is_object_id(value: &str) -> bool {
    OBJECT_ID.is_match(value)
}

/// Document-store model capability
///
/// One implementation per resource collection. Every store call is
/// awaited exactly once by the controller and never retried.
pub trait Model: Send + Sync + 'static {
    /// Human readable model name used in messages (e.g. `"User"`)
    fn model_name(&self) -> &str;

    /// Collection name used as the key of statistics results
    fn collection_name(&self) -> &str;

    /// Check the identifier format before any lookup
    ///
    /// Defaults to the ObjectId format.
    fn is_valid_id(&self, id: &str) -> bool {
        is_object_id(id)
    }

    /// Find documents matching the query
    fn find(&self, query: FindQuery) -> impl Future<Output = StoreResult<Vec<Document>>> + Send;

    /// Find a single document by identifier, expanding `populate` relations
    ///
    /// Returns `Ok(None)` when no document has the identifier.
    fn find_by_id(
        &self,
        id: &str,
        populate: &[Populate],
    ) -> impl Future<Output = StoreResult<Option<Document>>> + Send;

    /// Count documents matching `criteria`
    fn count_documents(
        &self,
        criteria: &Criteria,
    ) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Insert or update a document, returning the persisted version
    fn save(&self, document: Document) -> impl Future<Output = StoreResult<Document>> + Send;

    /// Permanently remove a document
    fn remove(&self, document: &Document) -> impl Future<Output = StoreResult<()>> + Send;
}
