//! Optional controller capabilities
//!
//! A resource can customize its list query and provide its own aggregate
//! statistics. Both are injected into the
//! [`ResourceController`](super::ResourceController) at construction as
//! trait objects and are never detected at call time.
//!
//! # Example
//!
//! ```rust
//! use resource_api::handlers::{ApiQuery, QueryBuilder};
//! use serde_json::json;
//!
//! /// Lists only published articles, whatever the filter says
//! struct PublishedOnly;
//!
//! impl QueryBuilder for PublishedOnly {
//!     fn parse_query(&self, query: ApiQuery) -> ApiQuery {
//!         query.with_criteria(json!({ "published": true }))
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;

use super::query::ApiQuery;
use crate::repository::{Criteria, StoreResult};

/// Resource-specific list query construction
///
/// Receives the default normalized query, including the raw query-string
/// map, and returns the query that is executed. The result replaces the
/// default entirely.
pub trait QueryBuilder: Send + Sync {
    /// Rewrite the default list query
    fn parse_query(&self, query: ApiQuery) -> ApiQuery;
}

/// Resource-specific aggregate statistics
///
/// `criteria` is the date-range predicate of the request, or the
/// match-all predicate when no range was given.
#[async_trait]
pub trait StatisticsProvider: Send + Sync {
    /// Compute statistics for documents matching `criteria`
    async fn statistics(&self, criteria: Criteria) -> StoreResult<Value>;
}
