use anyhow::{anyhow, bail, Context as _};
use mp_client::HttpFeed;
use mp_core::{
    Article, ArticleId, Config, Error, Feedback, FeedbackSink, QueryResult, QuerySpec, Rating,
    TopicTable,
};
use mp_storage::{ArticleStore, RefreshCoordinator, RefreshOutcome};
use mp_web::AppState;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::duration::HumanDuration;
use crate::QueryArgs;

/// Store, topic table and settings shared by every subcommand.
pub struct Context {
    pub store: Arc<ArticleStore>,
    pub topics: Arc<TopicTable>,
    pub config: Config,
}

impl Context {
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        let store = match &config.dataset_path {
            Some(path) => {
                let store = ArticleStore::new();
                store.load_file(path);
                store
            }
            None => ArticleStore::bundled(),
        };

        let topics = match &config.topics_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading topic table {}", path.display()))?;
                let table = TopicTable::from_json_str(&json)?;
                info!("🏷️ Loaded {} topics (version {})", table.entries().len(), table.version());
                table
            }
            None => TopicTable::builtin(),
        };

        Ok(Self {
            store: Arc::new(store),
            topics: Arc::new(topics),
            config: config.clone(),
        })
    }

    fn feed(&self) -> mp_core::Result<Arc<HttpFeed>> {
        Ok(Arc::new(HttpFeed::from_config(&self.config)?))
    }

    fn coordinator(&self) -> mp_core::Result<RefreshCoordinator> {
        Ok(RefreshCoordinator::new(
            self.feed()?,
            self.store.clone(),
            self.config.cache_ttl,
        ))
    }
}

impl QueryArgs {
    fn to_spec(&self) -> QuerySpec {
        QuerySpec {
            topic: self.topic.clone(),
            audience: self.audience.clone(),
            difficulty: self.difficulty,
            source: self.source.clone(),
            search_text: self.search.clone(),
            search_mode: self.mode,
            tag: self.tag.clone(),
            min_relevance: self.min_score,
            sort: self.sort,
        }
    }
}

pub fn query(ctx: &Context, args: QueryArgs) -> anyhow::Result<()> {
    let page_size = args
        .page_size
        .unwrap_or(i64::try_from(ctx.config.default_page_size)?);
    let result = ctx.store.query(&ctx.topics, &args.to_spec(), args.page, page_size);

    if args.json {
        let body = json!({ "articles": result.items, "pagination": result.pagination });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", render_page(&result));
    }
    Ok(())
}

fn render_article_line(article: &Article) -> String {
    let date = article
        .effective_date()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    format!(
        "{}  {:<10} {} ({})",
        date,
        article.id.as_str(),
        article.title.as_deref().unwrap_or("(uden titel)"),
        article.source
    )
}

fn render_page(result: &QueryResult) -> String {
    let mut out = String::new();
    for article in &result.items {
        out.push_str(&render_article_line(article));
        out.push('\n');
    }
    let p = &result.pagination;
    out.push_str(&format!(
        "Side {} af {} ({} artikler)\n",
        p.current_page, p.total_pages, p.total_items
    ));
    out
}

pub fn show(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let article = ctx
        .store
        .get(&ArticleId::new(id))
        .ok_or_else(|| Error::NotFound(format!("article '{}'", id)))?;
    println!("{}", serde_json::to_string_pretty(&article)?);
    Ok(())
}

pub fn filters(ctx: &Context) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&ctx.store.vocabulary())?);
    Ok(())
}

pub fn stats(ctx: &Context) -> anyhow::Result<()> {
    let stats = ctx.store.statistics(ctx.config.default_page_size);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn describe(outcome: RefreshOutcome) -> String {
    match outcome {
        RefreshOutcome::Applied { articles } => format!("fetched {} articles", articles),
        RefreshOutcome::Cached { articles } => format!("kept {} cached articles", articles),
        RefreshOutcome::Superseded => "superseded by a newer refresh".to_string(),
    }
}

/// One refresh cycle. A failure is logged and the current articles kept; an
/// applied refresh is written to `save_to` when given.
async fn refresh_cycle(store: &ArticleStore, coordinator: &RefreshCoordinator, save_to: Option<&Path>) {
    match coordinator.refresh_if_stale().await {
        Ok(outcome) => {
            info!("✨ Refresh {}", describe(outcome));
            if let (RefreshOutcome::Applied { .. }, Some(path)) = (outcome, save_to) {
                if let Err(e) = store.save_file(path) {
                    warn!("⚠️ Could not save articles to {}: {}", path.display(), e);
                }
            }
        }
        Err(e) => warn!("⚠️ Refresh failed, keeping current articles: {}", e),
    }
}

/// Keeps `store` fresh in the background for as long as the task runs.
pub fn spawn_periodic_refresh(
    store: Arc<ArticleStore>,
    coordinator: Arc<RefreshCoordinator>,
    interval: HumanDuration,
) -> JoinHandle<()> {
    info!("Refreshing served articles every {}", interval);
    tokio::spawn(async move {
        loop {
            refresh_cycle(&store, &coordinator, None).await;
            tokio::time::sleep(interval.0).await;
        }
    })
}

/// Fetches the article list and saves it to `output`, or to `--dataset` when
/// no output is given, so later commands and servers load it.
pub async fn refresh(
    ctx: &Context,
    output: Option<PathBuf>,
    interval: Option<HumanDuration>,
) -> anyhow::Result<()> {
    let target = output
        .or_else(|| ctx.config.dataset_path.clone())
        .ok_or_else(|| anyhow!("refresh needs --output or --dataset to save the articles to"))?;
    let coordinator = ctx.coordinator()?;

    let Some(interval) = interval else {
        let outcome = coordinator.refresh().await?;
        ctx.store.save_file(&target)?;
        println!("Refresh {}, saved to {}", describe(outcome), target.display());
        return Ok(());
    };

    info!("Running in periodic mode with {} interval", interval);
    loop {
        refresh_cycle(&ctx.store, &coordinator, Some(&target)).await;
        info!("Waiting {} before next refresh", interval);
        tokio::time::sleep(interval.0).await;
    }
}

pub async fn scrape(ctx: &Context, sources: Vec<String>) -> anyhow::Result<()> {
    let coordinator = ctx.coordinator()?;
    let sources = (!sources.is_empty()).then_some(sources);

    let (report, outcome) = coordinator.trigger_scrape(sources).await?;
    if let Some(message) = report.message {
        println!("{}", message);
    }
    if let (Some(new), Some(total)) = (report.new_articles, report.total_articles) {
        println!("{} nye artikler, {} i alt", new, total);
    }
    println!("Refresh {}", describe(outcome));
    Ok(())
}

pub async fn feedback(ctx: &Context, id: &str, rating: Rating, comment: String) -> anyhow::Result<()> {
    let feedback = Feedback::new(ArticleId::new(id), rating, comment);
    ctx.feed()?.submit_feedback(&feedback).await?;
    println!("Feedback on {} sent", id);
    Ok(())
}

pub async fn serve(
    ctx: Context,
    config: &Config,
    with_remote: bool,
    refresh_interval: Option<HumanDuration>,
) -> anyhow::Result<()> {
    let mut state = AppState::new(ctx.store.clone(), ctx.topics.clone())
        .with_default_page_size(config.default_page_size);

    let mut background = None;
    if with_remote {
        let coordinator = Arc::new(ctx.coordinator()?);
        if let Err(e) = coordinator.refresh().await {
            warn!("⚠️ Initial refresh from {} failed, serving local articles: {}", config.api_url, e);
        }
        if let Some(interval) = refresh_interval {
            background = Some(spawn_periodic_refresh(
                ctx.store.clone(),
                coordinator.clone(),
                interval,
            ));
        }
        state = state.with_refresher(coordinator);
    } else if refresh_interval.is_some() {
        bail!("--refresh-interval needs --api-url");
    }

    let served = mp_web::serve(state, &config.listen_addr).await;
    if let Some(handle) = background {
        handle.abort();
    }
    served?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mp_core::Pagination;
    use std::io::Write;

    #[test]
    fn test_load_dataset_and_topics_from_files() {
        let mut dataset = tempfile::NamedTempFile::new().unwrap();
        write!(
            dataset,
            r#"[{{"id": "a", "title": "Boligjob", "tags": ["bolig"], "source": "Test"}}]"#
        )
        .unwrap();
        let mut topics = tempfile::NamedTempFile::new().unwrap();
        write!(topics, r#"{{"version": 2, "topics": [{{"label": "Hus", "synonyms": ["bolig"]}}]}}"#).unwrap();

        let config = Config::default()
            .with_dataset(Some(dataset.path().to_path_buf()))
            .with_topics(Some(topics.path().to_path_buf()));
        let ctx = Context::load(&config).unwrap();

        assert_eq!(ctx.store.len(), 1);
        assert_eq!(ctx.topics.version(), 2);
        let result = ctx.store.query(&ctx.topics, &QuerySpec::default().topic("Hus"), 1, 20);
        assert_eq!(result.items.len(), 1);
    }

    async fn spawn_backend() -> String {
        use axum::{routing::get, Json, Router};

        let router = Router::new().route(
            "/api/articles",
            get(|| async {
                Json(json!({
                    "articles": [
                        { "id": "r1", "title": "Ny pensionsguide", "tags": ["pension"], "source": "Nordnet" },
                        { "id": "r2", "title": "Budget for to", "tags": ["budget"], "source": "Moneypenny" }
                    ]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_refresh_saves_dataset_for_later_runs() {
        let base = spawn_backend().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");

        let config = Config::default()
            .with_api_url(base)
            .with_dataset(Some(path.clone()));
        let ctx = Context::load(&config).unwrap();
        refresh(&ctx, None, None).await.unwrap();

        let next_run = Context::load(&config).unwrap();
        assert_eq!(next_run.store.len(), 2);
        assert!(next_run.store.get(&ArticleId::new("r1")).is_some());
    }

    #[tokio::test]
    async fn test_refresh_writes_explicit_output() {
        let base = spawn_backend().await;
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("ud.json");

        let ctx = Context::load(&Config::default().with_api_url(base)).unwrap();
        refresh(&ctx, Some(output.clone()), None).await.unwrap();

        let saved = ArticleStore::new();
        saved.load_file(&output);
        assert_eq!(saved.len(), 2);
    }

    #[tokio::test]
    async fn test_refresh_without_target_is_an_error() {
        let ctx = Context::load(&Config::default()).unwrap();
        assert!(refresh(&ctx, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_periodic_refresh_updates_served_store() {
        let base = spawn_backend().await;
        let ctx = Context::load(&Config::default().with_api_url(base).with_cache_ttl(std::time::Duration::ZERO)).unwrap();
        assert_eq!(ctx.store.len(), 12);

        let coordinator = Arc::new(ctx.coordinator().unwrap());
        let handle = spawn_periodic_refresh(
            ctx.store.clone(),
            coordinator,
            HumanDuration(std::time::Duration::from_millis(20)),
        );

        let mut refreshed = false;
        for _ in 0..250 {
            if ctx.store.len() == 2 {
                refreshed = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        handle.abort();
        assert!(refreshed, "served store was never refreshed");
    }

    #[test]
    fn test_missing_topic_file_is_an_error() {
        let config = Config::default().with_topics(Some("/nonexistent/topics.json".into()));
        assert!(Context::load(&config).is_err());
    }

    #[test]
    fn test_render_page() {
        let mut article = Article::new("nn-002", "Aktiesparekonto", "Nordnet");
        article.published_date = Some("2024-05-13T09:00:00Z".parse().unwrap());
        let result = QueryResult {
            items: vec![article],
            pagination: Pagination {
                current_page: 1,
                page_size: 20,
                total_items: 1,
                total_pages: 1,
                has_next: false,
                has_prev: false,
            },
        };

        let out = render_page(&result);
        assert!(out.starts_with("2024-05-13  nn-002"));
        assert!(out.contains("Aktiesparekonto (Nordnet)"));
        assert!(out.ends_with("Side 1 af 1 (1 artikler)\n"));
    }
}
