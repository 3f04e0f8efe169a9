use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use mp_core::widget::{widget_feed, WidgetOptions, WidgetPayload, DEFAULT_WIDGET_LIMIT};
use mp_core::{
    Article, ArticleId, ArticleRepository, Difficulty, Feedback, Pagination, QuerySpec, Rating, SearchMode,
    SortOrder, Statistics, TopicTable, Vocabulary,
};
use mp_storage::{FeedbackStatistics, RefreshOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ArticlesParams {
    pub topic: Option<String>,
    pub audience: Option<String>,
    pub difficulty: Option<String>,
    pub source: Option<String>,
    pub q: Option<String>,
    pub tag: Option<String>,
    pub mode: Option<String>,
    pub sort: Option<String>,
    pub min_score: Option<f64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ArticlesParams {
    fn to_spec(&self) -> Result<QuerySpec, ApiError> {
        Ok(QuerySpec {
            topic: self.topic.clone(),
            audience: self.audience.clone(),
            difficulty: self.difficulty.as_deref().map(str::parse::<Difficulty>).transpose()?,
            source: self.source.clone(),
            search_text: self.q.clone(),
            search_mode: self
                .mode
                .as_deref()
                .map(str::parse::<SearchMode>)
                .transpose()?
                .unwrap_or_default(),
            tag: self.tag.clone(),
            min_relevance: self.min_score,
            sort: self.sort.as_deref().map(str::parse::<SortOrder>).transpose()?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ArticlesResponse {
    pub articles: Vec<Article>,
    pub pagination: Pagination,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "MinePenge API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ArticlesParams>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let spec = params.to_spec()?;
    let page_size = params
        .page_size
        .unwrap_or(i64::try_from(state.default_page_size).unwrap_or(i64::MAX));
    let result = state
        .store
        .query(&state.topics, &spec, params.page.unwrap_or(1), page_size);

    Ok(Json(ArticlesResponse {
        articles: result.items,
        pagination: result.pagination,
    }))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    state
        .store
        .get(&ArticleId::new(id.clone()))
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("article '{}' not found", id)))
}

pub async fn get_filters(State(state): State<Arc<AppState>>) -> Json<Vocabulary> {
    Json(state.store.vocabulary())
}

pub async fn get_topics(State(state): State<Arc<AppState>>) -> Json<TopicTable> {
    Json(state.topics.as_ref().clone())
}

pub async fn get_statistics(State(state): State<Arc<AppState>>) -> Json<Statistics> {
    Json(state.store.statistics(state.default_page_size))
}

#[derive(Debug, Default, Deserialize)]
pub struct WidgetParams {
    pub theme: Option<String>,
    pub limit: Option<usize>,
    pub show_source: Option<bool>,
    pub min_score: Option<f64>,
}

pub async fn get_widget(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WidgetParams>,
) -> Json<WidgetPayload> {
    let options = WidgetOptions {
        theme: params.theme.unwrap_or_else(|| WidgetOptions::default().theme),
        limit: params.limit.unwrap_or(DEFAULT_WIDGET_LIMIT),
        show_source: params.show_source.unwrap_or(true),
        min_relevance: params.min_score,
    };
    let snapshot = state.store.get_all();
    Json(widget_feed(snapshot.articles(), &state.topics, &options))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub article_id: ArticleId,
    pub rating: Rating,
    #[serde(default)]
    pub comment: String,
    pub timestamp: Option<DateTime<Utc>>,
}

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get(&request.article_id).is_none() {
        return Err(ApiError::NotFound(format!(
            "article '{}' not found",
            request.article_id
        )));
    }

    let mut feedback = Feedback::new(request.article_id, request.rating, request.comment);
    if let Some(timestamp) = request.timestamp {
        feedback.timestamp = timestamp;
    }
    state.feedback.record(feedback);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Feedback submitted successfully" })),
    ))
}

pub async fn get_feedback_statistics(State(state): State<Arc<AppState>>) -> Json<FeedbackStatistics> {
    Json(state.feedback.statistics(Utc::now()))
}

pub async fn refresh_articles(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let refresher = state
        .refresher
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("no remote article API configured".to_string()))?;

    let body = match refresher.refresh().await? {
        RefreshOutcome::Applied { articles } => json!({ "status": "applied", "articles": articles }),
        RefreshOutcome::Cached { articles } => json!({ "status": "cached", "articles": articles }),
        RefreshOutcome::Superseded => json!({ "status": "superseded" }),
    };
    Ok(Json(body))
}
