//! Per-request controller state
//!
//! A [`RequestContext`] is created by the HTTP adapter, moved through every
//! stage of a pipeline, and dropped when the response is written. Stages
//! read their inputs from it and record what they produce on it.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::PathRejection, FromRequestParts, Path, Query},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::query::{ApiQuery, DateRange};
use super::response::ApiMeta;
use crate::error::Error;
use crate::repository::Document;

/// The authenticated user acting on a request
///
/// Inserted into the request extensions by the host's authentication
/// layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Name recorded in audit stamps
    pub username: String,
}

impl Actor {
    /// Create an actor
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

/// State threaded through the stages of one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Query-string values
    pub query: BTreeMap<String, String>,
    /// Path parameters
    pub params: BTreeMap<String, String>,
    /// JSON body of a write request
    pub body: Option<Map<String, Value>>,
    /// Acting user
    pub actor: Option<Actor>,
    /// The query executed by the list stage
    pub api_query: Option<ApiQuery>,
    /// Documents fetched by the list stage
    pub data: Option<Vec<Document>>,
    /// List metadata
    pub meta: Option<ApiMeta>,
    /// Accumulated statistics
    pub stats: Option<Map<String, Value>>,
    /// Date range from the path
    pub date_range: Option<DateRange>,
    /// The document addressed by the path
    pub model: Option<Document>,
}

impl RequestContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query-string values
    #[must_use]
    pub fn with_query(mut self, query: BTreeMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Set a single path parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set the request body
    #[must_use]
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the acting user
    #[must_use]
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Attach a resolved document
    #[must_use]
    pub fn with_model(mut self, model: Document) -> Self {
        self.model = Some(model);
        self
    }

    /// A path parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// A query-string value
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Name of the acting user
    pub fn username(&self) -> Option<&str> {
        self.actor.as_ref().map(|actor| actor.username.as_str())
    }

    /// The statistics map, created on first use
    pub fn stats_mut(&mut self) -> &mut Map<String, Value> {
        self.stats.get_or_insert_with(Map::new)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<BTreeMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::BadRequest(e.body_text()))?;

        let params = match Path::<BTreeMap<String, String>>::from_request_parts(parts, state).await
        {
            Ok(Path(params)) => params,
            Err(PathRejection::MissingPathParams(_)) => BTreeMap::new(),
            Err(e) => return Err(Error::BadRequest(e.body_text())),
        };

        let actor = parts.extensions.get::<Actor>().cloned();

        Ok(Self {
            query,
            params,
            actor,
            ..Self::default()
        })
    }
}
