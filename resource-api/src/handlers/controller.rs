//! Generic resource controller
//!
//! [`ResourceController`] implements every stage of the standard resource
//! endpoints against a [`Model`]. Stages are combined into endpoints with
//! [`ResourceController::run`], which executes a [`Stage`] list and turns
//! its outcome into exactly one response.
//!
//! # Example
//!
//! ```rust,ignore
//! use resource_api::config::ControllerConfig;
//! use resource_api::handlers::{pipeline, RequestContext, ResourceController};
//!
//! let controller = ResourceController::new(Articles::connect().await?, ControllerConfig::default())
//!     .with_query_builder(PublishedOnly)
//!     .with_statistics(ArticleTotals);
//!
//! let response = controller.run(pipeline::LIST, RequestContext::new()).await;
//! ```

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

use super::context::RequestContext;
use super::error::{classify_write_error, ApiError, ApiOperation};
use super::pipeline::{Flow, Stage, StageResult};
use super::query::{parse_date_range, QueryParser, LIMIT_PARAM, OFFSET_PARAM, TOTAL_PARAM};
use super::response::{ApiMeta, ApiResponse, DocumentResponse, StatsResponse};
use super::traits::{QueryBuilder, StatisticsProvider};
use crate::config::ControllerConfig;
use crate::error::Error;
use crate::repository::{match_all, Document, Model, Populate, StoreError, ID_FIELD, TIMESTAMPS_FIELD};

/// Path parameter holding the document identifier
pub const ID_PARAM: &str = "id";

/// Path parameter holding the statistics year
pub const YEAR_PARAM: &str = "year";

/// Path parameter holding the statistics month
pub const MONTH_PARAM: &str = "month";

/// Key of the date range recorded in the statistics map
pub const RANGE_STAT: &str = "range";

/// Standard REST controller for one model
pub struct ResourceController<M: Model> {
    model: Arc<M>,
    config: ControllerConfig,
    parser: QueryParser,
    populate: Vec<Populate>,
    query_builder: Option<Arc<dyn QueryBuilder>>,
    statistics: Option<Arc<dyn StatisticsProvider>>,
}

impl<M: Model> Clone for ResourceController<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            config: self.config.clone(),
            parser: self.parser.clone(),
            populate: self.populate.clone(),
            query_builder: self.query_builder.clone(),
            statistics: self.statistics.clone(),
        }
    }
}

impl<M: Model> ResourceController<M> {
    /// Create a controller for `model`
    pub fn new(model: M, config: ControllerConfig) -> Self {
        Self {
            model: Arc::new(model),
            parser: QueryParser::from_config(&config),
            config,
            populate: Vec::new(),
            query_builder: None,
            statistics: None,
        }
    }

    /// Rewrite list queries with a resource-specific builder
    #[must_use]
    pub fn with_query_builder(mut self, builder: impl QueryBuilder + 'static) -> Self {
        self.query_builder = Some(Arc::new(builder));
        self
    }

    /// Compute statistics with a resource-specific provider
    #[must_use]
    pub fn with_statistics(mut self, provider: impl StatisticsProvider + 'static) -> Self {
        self.statistics = Some(Arc::new(provider));
        self
    }

    /// Relations expanded when resolving a document by id
    #[must_use]
    pub fn with_populate(mut self, populate: Vec<Populate>) -> Self {
        self.populate = populate;
        self
    }

    /// The underlying model
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Controller settings
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Whether `DELETE /{id}` soft-deletes
    pub fn is_soft_delete(&self) -> bool {
        self.config.soft_delete
    }

    /// Run `stages` in order and produce the request's response
    ///
    /// A forwarded error is answered by the crate error's response
    /// conversion. A list that ends without answering is answered with 500.
    pub async fn run(&self, stages: &[Stage], mut ctx: RequestContext) -> Response {
        let model = self.model.model_name();

        for stage in stages {
            tracing::debug!(model, stage = %stage, "running stage");

            match self.run_stage(*stage, ctx).await {
                Ok(Flow::Continue(next)) => ctx = next,
                Ok(Flow::Respond(response)) => return response,
                Err(err) => {
                    tracing::error!(model, stage = %stage, error = %err, "stage failed");
                    return err.into_response();
                }
            }
        }

        let stage_names: Vec<String> = stages.iter().map(ToString::to_string).collect();
        Error::Internal(format!(
            "stages [{}] finished without a response",
            stage_names.join(", ")
        ))
        .into_response()
    }

    /// Run a single stage
    pub async fn run_stage(&self, stage: Stage, ctx: RequestContext) -> StageResult {
        match stage {
            Stage::List => self.list(ctx).await,
            Stage::PopulateMeta => self.populate_meta(ctx).await,
            Stage::ApiResponse => self.api_response(ctx),
            Stage::ResolveById => self.resolve_by_id(ctx).await,
            Stage::Read => self.read(ctx),
            Stage::Create => self.create(ctx).await,
            Stage::Update => self.update(ctx).await,
            Stage::SoftDelete => self.soft_delete(ctx).await,
            Stage::Delete => self.delete(ctx).await,
            Stage::ParseDateRange => self.parse_date_range(ctx),
            Stage::Stats => self.stats(ctx).await,
            Stage::Statistics => self.statistics(ctx).await,
            Stage::StatsResponse => self.stats_response(ctx),
        }
    }

    /// Fetch the requested page into `ctx.data`
    pub async fn list(&self, mut ctx: RequestContext) -> StageResult {
        let mut query = self.parser.parse(ctx.query.clone());
        if let Some(builder) = &self.query_builder {
            query = builder.parse_query(query);
        }

        tracing::debug!(
            operation = %ApiOperation::List,
            model = self.model.model_name(),
            offset = query.offset,
            limit = query.limit,
            "listing documents"
        );

        let data = self.model.find(query.to_find_query()).await?;

        ctx.data = Some(data);
        ctx.api_query = Some(query);
        Ok(Flow::Continue(ctx))
    }

    /// Count the total for the list metadata
    ///
    /// The `total` query parameter, a JSON object, is the counted criteria.
    pub async fn populate_meta(&self, mut ctx: RequestContext) -> StageResult {
        let total_criteria = ctx
            .query_value(TOTAL_PARAM)
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .filter(Value::is_object)
            .unwrap_or_else(match_all);

        let total = self.model.count_documents(&total_criteria).await?;
        let count = ctx.data.as_ref().map_or(0, |data| data.len() as u64);
        let (offset, limit) = match &ctx.api_query {
            Some(query) => (query.offset, query.limit),
            None => (
                self.parser.offset(ctx.query_value(OFFSET_PARAM)),
                self.parser.limit(ctx.query_value(LIMIT_PARAM)),
            ),
        };

        ctx.meta = Some(ApiMeta::new(total, count, offset, limit));
        Ok(Flow::Continue(ctx))
    }

    /// Answer `{meta, data}`
    pub fn api_response(&self, ctx: RequestContext) -> StageResult {
        let response = ApiResponse {
            meta: ctx.meta,
            data: ctx
                .data
                .map(|data| data.iter().map(Document::to_plain).collect()),
        };
        respond(response)
    }

    /// Load the document named by the `id` path parameter into `ctx.model`
    ///
    /// Malformed identifiers are rejected before the store is queried.
    pub async fn resolve_by_id(&self, mut ctx: RequestContext) -> StageResult {
        let model = self.model.model_name();
        let id = match ctx.param(ID_PARAM) {
            Some(id) if self.model.is_valid_id(id) => id.to_string(),
            _ => return respond(ApiError::invalid_id()),
        };

        match self.model.find_by_id(&id, &self.populate).await {
            Ok(Some(document)) => {
                ctx.model = Some(document);
                Ok(Flow::Continue(ctx))
            }
            Ok(None) => respond(ApiError::not_found(model, &id)),
            Err(err) => {
                tracing::error!(model, id = %id, error = %err, "failed to resolve document");
                respond(ApiError::server_error(ApiOperation::ResolveById, model))
            }
        }
    }

    /// Answer the resolved document
    pub fn read(&self, ctx: RequestContext) -> StageResult {
        match &ctx.model {
            Some(document) => respond(DocumentResponse::ok(document)),
            None => respond(ApiError::model_missing(ApiOperation::Read)),
        }
    }

    /// Insert a document built from the body
    ///
    /// Caller-supplied `_id` and `timestamps` are discarded and the creator
    /// is stamped from the acting user.
    pub async fn create(&self, mut ctx: RequestContext) -> StageResult {
        let actor = require_actor(&ctx, ApiOperation::Create)?;

        let mut body = ctx.body.take().unwrap_or_default();
        body.remove(ID_FIELD);
        body.remove(TIMESTAMPS_FIELD);

        let mut document = Document::from(body);
        document.stamp_created_by(&actor);

        match self.model.save(document).await {
            Ok(saved) => {
                tracing::info!(model = self.model.model_name(), id = ?saved.id(), "document created");
                respond(DocumentResponse::created(&saved))
            }
            Err(err) => self.write_failure(err, ApiOperation::Create),
        }
    }

    /// Merge the body onto the resolved document and save it
    pub async fn update(&self, mut ctx: RequestContext) -> StageResult {
        let mut body = ctx.body.take().unwrap_or_default();
        if body.get(ID_FIELD).is_some_and(Value::is_null) {
            body.remove(ID_FIELD);
        }
        body.remove(TIMESTAMPS_FIELD);

        let Some(mut document) = ctx.model.take() else {
            return respond(ApiError::model_missing(ApiOperation::Update));
        };
        let actor = require_actor(&ctx, ApiOperation::Update)?;

        document.merge(body);
        document.stamp_updated_by(&actor);

        match self.model.save(document).await {
            Ok(saved) => {
                tracing::info!(model = self.model.model_name(), id = ?saved.id(), "document updated");
                respond(DocumentResponse::ok(&saved))
            }
            Err(err) => self.write_failure(err, ApiOperation::Update),
        }
    }

    /// Flag the resolved document as deleted and save it
    pub async fn soft_delete(&self, mut ctx: RequestContext) -> StageResult {
        let Some(mut document) = ctx.model.take() else {
            return respond(ApiError::model_missing(ApiOperation::SoftDelete));
        };
        let actor = require_actor(&ctx, ApiOperation::SoftDelete)?;

        document.mark_deleted();
        document.stamp_updated_by(&actor);

        match self.model.save(document).await {
            Ok(saved) => {
                tracing::info!(model = self.model.model_name(), id = ?saved.id(), "document soft deleted");
                respond(DocumentResponse::ok(&saved))
            }
            Err(err) => respond(ApiError::delete_error(ApiOperation::SoftDelete, err.message)),
        }
    }

    /// Permanently remove the resolved document
    ///
    /// Answers the document as it was before removal.
    pub async fn delete(&self, mut ctx: RequestContext) -> StageResult {
        let Some(document) = ctx.model.take() else {
            return respond(ApiError::model_missing(ApiOperation::Delete));
        };

        match self.model.remove(&document).await {
            Ok(()) => {
                tracing::info!(model = self.model.model_name(), id = ?document.id(), "document removed");
                respond(DocumentResponse::ok(&document))
            }
            Err(err) => respond(ApiError::delete_error(ApiOperation::Delete, err.message)),
        }
    }

    /// Derive the date range from the `year` and `month` path parameters
    ///
    /// An unusable year leaves the context untouched.
    pub fn parse_date_range(&self, mut ctx: RequestContext) -> StageResult {
        if let Some(range) = parse_date_range(ctx.param(YEAR_PARAM), ctx.param(MONTH_PARAM)) {
            ctx.stats_mut().insert(
                RANGE_STAT.to_string(),
                json!({ "from": range.from, "to": range.to }),
            );
            ctx.date_range = Some(range);
        }
        Ok(Flow::Continue(ctx))
    }

    /// Record the number of documents under the collection name
    pub async fn stats(&self, mut ctx: RequestContext) -> StageResult {
        match self.model.count_documents(&match_all()).await {
            Ok(count) => {
                ctx.stats_mut()
                    .insert(self.model.collection_name().to_string(), json!(count));
                Ok(Flow::Continue(ctx))
            }
            Err(err) => self.stats_failure(err, ApiOperation::Stats),
        }
    }

    /// Record model statistics under the collection name
    ///
    /// Without a statistics provider this is [`stats`](Self::stats).
    pub async fn statistics(&self, mut ctx: RequestContext) -> StageResult {
        let Some(provider) = &self.statistics else {
            return self.stats(ctx).await;
        };

        let criteria = ctx
            .date_range
            .map(|range| range.to_criteria(&self.config.date_field))
            .unwrap_or_else(match_all);

        match provider.statistics(criteria).await {
            Ok(result) => {
                ctx.stats_mut()
                    .insert(self.model.collection_name().to_string(), result);
                Ok(Flow::Continue(ctx))
            }
            Err(err) => self.stats_failure(err, ApiOperation::Statistics),
        }
    }

    /// Answer the statistics map
    pub fn stats_response(&self, ctx: RequestContext) -> StageResult {
        respond(StatsResponse(ctx.stats.unwrap_or_default()))
    }

    fn write_failure(&self, err: StoreError, operation: ApiOperation) -> StageResult {
        match classify_write_error(err, operation, self.model.model_name()) {
            Ok(answer) => respond(answer),
            Err(forwarded) => Err(forwarded.into()),
        }
    }

    fn stats_failure(&self, err: StoreError, operation: ApiOperation) -> StageResult {
        let model = self.model.model_name();
        tracing::error!(model, operation = %operation, error = %err, "failed to compute statistics");
        respond(ApiError::server_error(operation, model))
    }
}

fn respond(response: impl IntoResponse) -> StageResult {
    Ok(Flow::Respond(response.into_response()))
}

fn require_actor(ctx: &RequestContext, operation: ApiOperation) -> Result<String, Error> {
    ctx.username()
        .map(str::to_owned)
        .ok_or_else(|| Error::Unauthorized(format!("{operation} requires an authenticated user")))
}
