//! Ordered controller stages
//!
//! An endpoint is a list of [`Stage`]s run in order by
//! [`ResourceController::run`](super::ResourceController::run). Each stage
//! receives the [`RequestContext`] by value and either passes it on,
//! answers the request, or forwards an error to the centralized handler.
//!
//! # Example
//!
//! ```rust
//! use resource_api::handlers::pipeline::{self, Stage};
//!
//! assert_eq!(pipeline::LIST, &[Stage::List, Stage::PopulateMeta, Stage::ApiResponse]);
//! assert!(Stage::ApiResponse.is_terminal());
//! ```

use std::fmt;

use axum::response::Response;

use super::context::RequestContext;
use crate::error::Error;

/// A single controller operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Fetch a page of documents
    List,
    /// Count the total and build list metadata
    PopulateMeta,
    /// Answer the list envelope
    ApiResponse,
    /// Load the document addressed by the `id` path parameter
    ResolveById,
    /// Answer the resolved document
    Read,
    /// Insert a document from the body
    Create,
    /// Merge the body onto the resolved document
    Update,
    /// Flag the resolved document as deleted
    SoftDelete,
    /// Remove the resolved document
    Delete,
    /// Derive a date range from the `year` and `month` path parameters
    ParseDateRange,
    /// Count every document
    Stats,
    /// Compute model statistics, falling back to [`Stage::Stats`]
    Statistics,
    /// Answer the statistics map
    StatsResponse,
}

impl Stage {
    /// Whether the stage always answers the request
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ApiResponse
                | Self::Read
                | Self::Create
                | Self::Update
                | Self::SoftDelete
                | Self::Delete
                | Self::StatsResponse
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::PopulateMeta => write!(f, "populate_meta"),
            Self::ApiResponse => write!(f, "api_response"),
            Self::ResolveById => write!(f, "resolve_by_id"),
            Self::Read => write!(f, "read"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::SoftDelete => write!(f, "soft_delete"),
            Self::Delete => write!(f, "delete"),
            Self::ParseDateRange => write!(f, "parse_date_range"),
            Self::Stats => write!(f, "stats"),
            Self::Statistics => write!(f, "statistics"),
            Self::StatsResponse => write!(f, "stats_response"),
        }
    }
}

/// Outcome of a stage that did not fail
#[derive(Debug)]
pub enum Flow {
    /// Run the next stage with the updated context
    Continue(RequestContext),
    /// Answer the request and stop
    Respond(Response),
}

/// Result of running one stage
pub type StageResult = Result<Flow, Error>;

/// `GET /`
pub const LIST: &[Stage] = &[Stage::List, Stage::PopulateMeta, Stage::ApiResponse];

/// `GET /{id}`
pub const READ: &[Stage] = &[Stage::ResolveById, Stage::Read];

/// `POST /`
pub const CREATE: &[Stage] = &[Stage::Create];

/// `PUT /{id}`
pub const UPDATE: &[Stage] = &[Stage::ResolveById, Stage::Update];

/// `DELETE /{id}` on soft-deletable resources
pub const SOFT_DELETE: &[Stage] = &[Stage::ResolveById, Stage::SoftDelete];

/// `DELETE /{id}`
pub const DELETE: &[Stage] = &[Stage::ResolveById, Stage::Delete];

/// `GET /stats`
pub const STATS: &[Stage] = &[Stage::Statistics, Stage::StatsResponse];

/// `GET /stats/{year}` and `GET /stats/{year}/{month}`
pub const STATS_FOR_RANGE: &[Stage] = &[
    Stage::ParseDateRange,
    Stage::Statistics,
    Stage::StatsResponse,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predefined_lists_end_with_terminal_stage() {
        for stages in [LIST, READ, CREATE, UPDATE, SOFT_DELETE, DELETE, STATS, STATS_FOR_RANGE] {
            let last = stages.last().unwrap();
            assert!(last.is_terminal(), "{last} should answer the request");
            assert!(
                stages[..stages.len() - 1].iter().all(|s| !s.is_terminal()),
                "only the last stage of {stages:?} may answer"
            );
        }
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::PopulateMeta.to_string(), "populate_meta");
        assert_eq!(Stage::ParseDateRange.to_string(), "parse_date_range");
        assert_eq!(Stage::StatsResponse.to_string(), "stats_response");
    }

    #[test]
    fn test_resolving_lists_start_with_resolve() {
        for stages in [READ, UPDATE, SOFT_DELETE, DELETE] {
            assert_eq!(stages[0], Stage::ResolveById);
        }
    }
}
