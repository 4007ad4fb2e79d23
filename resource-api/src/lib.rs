//! # resource-api
//!
//! Generic REST resource controllers for document-store backed collections.
//!
//! Given a [`Model`](repository::Model) implementation, a
//! [`ResourceController`](handlers::ResourceController) provides the
//! standard collection endpoints with a uniform JSON envelope:
//!
//! - **CRUD**: list, read, create, update, soft delete and hard delete
//! - **Query parsing**: bounded pagination, sort parsing, allow-listed filters
//! - **Statistics**: document counts and model-specific aggregates, per year or month
//! - **Errors**: one `{"error": {"id", "message"}}` envelope for every failure
//!
//! ## Example
//!
//! ```rust,ignore
//! use resource_api::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let users = ResourceController::new(UserModel::connect().await?, config.controller.clone());
//!     let app = axum::Router::new().nest("/users", resource_router(users));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod repository;
pub mod router;

#[cfg(test)]
mod test_support;

/// Commonly used types
pub mod prelude {
    pub use crate::config::{Config, ControllerConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{
        pipeline, Actor, ApiError, ApiErrorKind, ApiMeta, ApiQuery, QueryBuilder, RequestContext,
        ResourceController, Stage, StatisticsProvider,
    };
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        Criteria, Document, FindQuery, Model, Populate, SortDirection, SortSpec, StoreError,
        StoreErrorKind, StoreOperation, StoreResult,
    };
    pub use crate::router::resource_router;
}
