//! Resource controller for REST collection endpoints
//!
//! This module implements the standard REST collection pattern (list, read,
//! create, update, soft delete, delete, statistics) for any
//! [`Model`](crate::repository::Model).
//!
//! # Features
//!
//! - **Controller**: [`ResourceController`] with one method per stage
//! - **Pipelines**: [`pipeline::Stage`] lists run by [`ResourceController::run`]
//! - **Query parsing**: [`QueryParser`] for pagination, sort, filters and date ranges
//! - **Error handling**: [`ApiError`] with fixed wire ids and status codes
//! - **Capabilities**: optional [`QueryBuilder`] and [`StatisticsProvider`]
//!
//! # Example
//!
//! ```rust,ignore
//! use resource_api::config::ControllerConfig;
//! use resource_api::handlers::{pipeline, RequestContext, ResourceController};
//!
//! let controller = ResourceController::new(users, ControllerConfig::default());
//!
//! async fn list_users(ctx: RequestContext) -> axum::response::Response {
//!     controller.run(pipeline::LIST, ctx).await
//! }
//! ```

mod context;
mod controller;
pub(crate) mod error;
pub mod pipeline;
mod query;
mod response;
mod traits;

pub use context::{Actor, RequestContext};
pub use controller::{ResourceController, ID_PARAM, MONTH_PARAM, RANGE_STAT, YEAR_PARAM};
pub use error::{classify_write_error, ApiError, ApiErrorKind, ApiOperation};
pub use pipeline::{Flow, Stage, StageResult};
pub use query::{
    js_to_string, parse_date_range, parse_filter, parse_int, parse_pagination, parse_sort,
    ApiQuery, DateRange, QueryParser, FILTER_PARAM, LIMIT_PARAM, OFFSET_PARAM, SORT_PARAM,
    TOTAL_PARAM,
};
pub use response::{ApiMeta, ApiResponse, DocumentResponse, StatsResponse};
pub use traits::{QueryBuilder, StatisticsProvider};
