use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/:id", get(handlers::get_article))
        .route("/api/filters", get(handlers::get_filters))
        .route("/api/topics", get(handlers::get_topics))
        .route("/api/statistics", get(handlers::get_statistics))
        .route("/api/widget", get(handlers::get_widget))
        .route("/api/feedback", post(handlers::submit_feedback))
        .route("/api/feedback/statistics", get(handlers::get_feedback_statistics))
        .route("/api/refresh", post(handlers::refresh_articles))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("🌐 Serving MinePenge API on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state)).await
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use mp_core::{Article, Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use mp_core::{ArticleFeed, Dataset, Error, ScrapeReport, TopicTable};
    use mp_storage::{ArticleStore, RefreshCoordinator};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn state() -> AppState {
        AppState::new(Arc::new(ArticleStore::bundled()), Arc::new(TopicTable::builtin()))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(app, request).await
    }

    fn ids(body: &Value) -> Vec<String> {
        body["articles"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_list_articles_default_page() {
        let (status, body) = get_json(create_app(state()), "/api/articles?page_size=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["articles"].as_array().unwrap().len(), 5);
        assert_eq!(body["pagination"]["totalItems"], 12);
        assert_eq!(body["pagination"]["totalPages"], 3);
        assert_eq!(body["pagination"]["hasNext"], true);
        assert_eq!(body["pagination"]["hasPrev"], false);
    }

    #[tokio::test]
    async fn test_list_articles_with_filters() {
        let (status, body) = get_json(
            create_app(state()),
            "/api/articles?audience=studerende&difficulty=begynder&sort=relevance",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["ump-001", "nn-006", "ump-007"]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (_, upper) = get_json(create_app(state()), "/api/articles?q=SU").await;
        let (_, lower) = get_json(create_app(state()), "/api/articles?q=su").await;
        assert_eq!(upper, lower);
        assert!(ids(&upper).contains(&"ump-001".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_parameters() {
        let (status, _) = get_json(create_app(state()), "/api/articles?difficulty=ekspert").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(create_app(state()), "/api/articles?sort=random").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = get_json(create_app(state()), "/api/articles?page=0&page_size=-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pagination"]["currentPage"], 1);
        assert_eq!(body["pagination"]["pageSize"], 20);
    }

    #[tokio::test]
    async fn test_get_article() {
        let (status, body) = get_json(create_app(state()), "/api/articles/nn-002").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "Nordnet");

        let (status, body) = get_json(create_app(state()), "/api/articles/ukendt").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ukendt"));
    }

    #[tokio::test]
    async fn test_filters_topics_and_statistics() {
        let (_, filters) = get_json(create_app(state()), "/api/filters").await;
        assert_eq!(filters["difficulties"], json!(["begynder", "øvet", "avanceret"]));
        assert_eq!(filters["sources"].as_array().unwrap().len(), 5);

        let (_, topics) = get_json(create_app(state()), "/api/topics").await;
        assert_eq!(topics["version"], 1);
        assert_eq!(topics["topics"][0]["label"], "Opsparing");

        let (_, stats) = get_json(create_app(state()), "/api/statistics").await;
        assert_eq!(stats["totalArticles"], 12);
        assert_eq!(stats["articlesPerSource"]["Nordnet"], 3);
    }

    #[tokio::test]
    async fn test_widget() {
        let (status, body) =
            get_json(create_app(state()), "/api/widget?theme=opsparing&limit=2&show_source=false").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "MinePenge.dk - Opsparing");
        let articles = body["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 2);
        assert!(articles.iter().all(|a| a.get("source").is_none()));
    }

    #[tokio::test]
    async fn test_feedback_round_trip() {
        let app = create_app(state());
        let (status, _) = post_json(
            app.clone(),
            "/api/feedback",
            json!({ "articleId": "bn-004", "rating": "positive", "comment": "Brugbart" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = post_json(
            app.clone(),
            "/api/feedback",
            json!({ "articleId": "findes-ikke", "rating": "negative" }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, stats) = get_json(app, "/api/feedback/statistics").await;
        assert_eq!(stats["totalFeedback"], 1);
        assert_eq!(stats["positiveRatio"], 100.0);
    }

    #[tokio::test]
    async fn test_refresh_without_remote_is_unavailable() {
        let (status, _) = post_json(create_app(state()), "/api/refresh", json!({})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    struct FixedFeed(Option<Dataset>);

    #[async_trait]
    impl ArticleFeed for FixedFeed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn fetch_articles(&self) -> mp_core::Result<Dataset> {
            self.0
                .clone()
                .ok_or_else(|| Error::HttpStatus { status: 500, url: "http://backend".into() })
        }

        async fn trigger_scrape(&self, _sources: &[String]) -> mp_core::Result<ScrapeReport> {
            Ok(ScrapeReport::default())
        }
    }

    fn state_with_feed(feed: FixedFeed) -> AppState {
        let state = state();
        let refresher = RefreshCoordinator::new(
            Arc::new(feed),
            state.store.clone(),
            Duration::from_secs(300),
        );
        state.with_refresher(Arc::new(refresher))
    }

    #[tokio::test]
    async fn test_refresh_applies_remote_collection() {
        let dataset = Dataset::new(vec![mp_core::Article::new("r1", "Fra API", "Nordnet")]);
        let app = create_app(state_with_feed(FixedFeed(Some(dataset))));

        let (status, body) = post_json(app.clone(), "/api/refresh", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "applied");

        let (_, list) = get_json(app, "/api/articles").await;
        assert_eq!(ids(&list), vec!["r1"]);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_articles() {
        let app = create_app(state_with_feed(FixedFeed(None)));

        let (status, body) = post_json(app.clone(), "/api/refresh", json!({})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].is_string());

        let (_, list) = get_json(app, "/api/articles").await;
        assert_eq!(list["pagination"]["totalItems"], 12);
    }
}
