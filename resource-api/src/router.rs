//! HTTP routes for a resource
//!
//! [`resource_router`] mounts the standard endpoints of one
//! [`ResourceController`] on an axum [`Router`]. Nest it under the
//! resource's path in the host service:
//!
//! ```rust,ignore
//! use resource_api::{config::ControllerConfig, handlers::ResourceController, router::resource_router};
//!
//! let users = ResourceController::new(UserModel::new(db), ControllerConfig::default());
//! let app = axum::Router::new().nest("/users", resource_router(users));
//! ```
//!
//! | method & path              | stages                                      |
//! |----------------------------|---------------------------------------------|
//! | `GET /`                    | list, populate meta, api response           |
//! | `POST /`                   | create                                      |
//! | `GET /stats`               | statistics, stats response                  |
//! | `GET /stats/{year}`        | date range, statistics, stats response      |
//! | `GET /stats/{year}/{month}`| date range, statistics, stats response      |
//! | `GET /{id}`                | resolve, read                               |
//! | `PUT /{id}`                | resolve, update                             |
//! | `DELETE /{id}`             | resolve, soft delete or delete              |

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use tower_http::trace::TraceLayer;

use crate::error::Error;
use crate::handlers::{pipeline, RequestContext, ResourceController};
use crate::repository::Model;

type Controller<M> = State<Arc<ResourceController<M>>>;

/// Build the routes for `controller`
pub fn resource_router<M: Model>(controller: ResourceController<M>) -> Router {
    tracing::debug!(
        model = controller.model().model_name(),
        soft_delete = controller.is_soft_delete(),
        "mounting resource routes"
    );

    Router::new()
        .route("/", get(list::<M>).post(create::<M>))
        .route("/stats", get(stats::<M>))
        .route("/stats/{year}", get(stats_for_range::<M>))
        .route("/stats/{year}/{month}", get(stats_for_range::<M>))
        .route(
            "/{id}",
            get(read::<M>).put(update::<M>).delete(remove::<M>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(controller))
}

async fn list<M: Model>(State(controller): Controller<M>, ctx: RequestContext) -> Response {
    controller.run(pipeline::LIST, ctx).await
}

async fn create<M: Model>(
    State(controller): Controller<M>,
    ctx: RequestContext,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(body)) => controller.run(pipeline::CREATE, ctx.with_body(body)).await,
        Err(rejection) => Error::BadRequest(rejection.body_text()).into_response(),
    }
}

async fn read<M: Model>(State(controller): Controller<M>, ctx: RequestContext) -> Response {
    controller.run(pipeline::READ, ctx).await
}

async fn update<M: Model>(
    State(controller): Controller<M>,
    ctx: RequestContext,
    body: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(body)) => controller.run(pipeline::UPDATE, ctx.with_body(body)).await,
        Err(rejection) => Error::BadRequest(rejection.body_text()).into_response(),
    }
}

async fn remove<M: Model>(State(controller): Controller<M>, ctx: RequestContext) -> Response {
    let stages = if controller.is_soft_delete() {
        pipeline::SOFT_DELETE
    } else {
        pipeline::DELETE
    };
    controller.run(stages, ctx).await
}

async fn stats<M: Model>(State(controller): Controller<M>, ctx: RequestContext) -> Response {
    controller.run(pipeline::STATS, ctx).await
}

async fn stats_for_range<M: Model>(
    State(controller): Controller<M>,
    ctx: RequestContext,
) -> Response {
    controller.run(pipeline::STATS_FOR_RANGE, ctx).await
}
