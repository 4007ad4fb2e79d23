//! Document-store model capability
//!
//! This module defines everything the controller needs from the persistence
//! layer, and nothing more:
//!
//! - **Model**: [`Model`] trait for find, find-by-id, count, save and remove
//! - **Documents**: [`Document`], a JSON object with audit-stamp helpers
//! - **Queries**: [`FindQuery`], [`SortSpec`] and [`Populate`]
//! - **Errors**: [`StoreError`], classified by [`StoreErrorKind`]
//!
//! The store's own query engine, indexing and schema validation stay on the
//! other side of the [`Model`] trait.

mod document;
mod error;
mod query;
mod traits;

pub use document::{Document, ID_FIELD, TIMESTAMPS_FIELD};
pub use error::{StoreError, StoreErrorKind, StoreOperation};
pub use query::{match_all, Criteria, FindQuery, Populate, SortDirection, SortSpec};
pub use traits::{is_object_id, Model, StoreResult};
