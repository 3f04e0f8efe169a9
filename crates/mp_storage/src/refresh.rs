use chrono::{DateTime, Utc};
use mp_core::{ArticleFeed, ArticleRepository, Error, Result, ScrapeReport};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// True when there is no previous fetch or it is at least `ttl` old.
pub fn is_stale(last_fetch: Option<DateTime<Utc>>, now: DateTime<Utc>, ttl: Duration) -> bool {
    let Some(last) = last_fetch else {
        return true;
    };
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(last) >= ttl,
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fetched collection replaced the store.
    Applied { articles: usize },
    /// The last fetch is still fresh; nothing was fetched.
    Cached { articles: usize },
    /// A newer refresh was applied while this one was in flight.
    Superseded,
}

#[derive(Debug, Default)]
struct ApplyState {
    sequence: u64,
    last_fetch: Option<DateTime<Utc>>,
}

/// Pulls replacement collections from an [`ArticleFeed`] into a store.
///
/// `replace` is only ever called while holding the apply lock, and a response
/// is dropped if a refresh that started later has already been applied. A
/// failed fetch leaves the store as it was.
pub struct RefreshCoordinator {
    feed: Arc<dyn ArticleFeed>,
    store: Arc<dyn ArticleRepository>,
    ttl: Duration,
    issued: AtomicU64,
    applied: Mutex<ApplyState>,
}

impl RefreshCoordinator {
    pub fn new(feed: Arc<dyn ArticleFeed>, store: Arc<dyn ArticleRepository>, ttl: Duration) -> Self {
        Self {
            feed,
            store,
            ttl,
            issued: AtomicU64::new(0),
            applied: Mutex::new(ApplyState::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.applied.lock().await.last_fetch
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        info!("🔄 Refreshing articles from {} (request #{})", self.feed.name(), ticket);

        let dataset = match self.feed.fetch_articles().await {
            Ok(dataset) => dataset,
            Err(e) => {
                warn!("⚠️ Refresh #{} failed, keeping current articles: {}", ticket, e);
                return Err(e);
            }
        };

        let mut state = self.applied.lock().await;
        if ticket < state.sequence {
            info!(
                "⏭️ Discarding refresh #{}, #{} is already applied",
                ticket, state.sequence
            );
            return Ok(RefreshOutcome::Superseded);
        }

        let articles = dataset.articles.len();
        self.store.replace_dataset(dataset);
        state.sequence = ticket;
        state.last_fetch = Some(Utc::now());
        info!("✨ Refresh #{} applied {} articles", ticket, articles);

        Ok(RefreshOutcome::Applied { articles })
    }

    pub async fn refresh_if_stale(&self) -> Result<RefreshOutcome> {
        let last_fetch = self.last_fetch().await;
        if !is_stale(last_fetch, Utc::now(), self.ttl) {
            let articles = self.store.get_all().len();
            info!("Using cached articles ({} articles)", articles);
            return Ok(RefreshOutcome::Cached { articles });
        }
        self.refresh().await
    }

    /// Asks the backend to re-scrape and then refreshes. Without explicit
    /// sources, the sources of the current collection are sent.
    pub async fn trigger_scrape(
        &self,
        sources: Option<Vec<String>>,
    ) -> Result<(ScrapeReport, RefreshOutcome)> {
        let sources = sources.unwrap_or_else(|| {
            let current = self.store.get_all();
            if current.metadata().sources.is_empty() {
                current.vocabulary().sources.clone()
            } else {
                current.metadata().sources.clone()
            }
        });

        info!("🦗 Triggering scrape of {} sources", sources.len());
        let report = self
            .feed
            .trigger_scrape(&sources)
            .await
            .map_err(|e| match e {
                Error::Scrape(_) => e,
                other => Error::Scrape(other.to_string()),
            })?;

        let outcome = self.refresh().await?;
        Ok((report, outcome))
    }
}
