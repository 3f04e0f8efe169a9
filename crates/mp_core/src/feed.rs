use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::types::Feedback;
use crate::Result;

/// What the scrape trigger endpoint reports back. Every field is optional;
/// older backends answer with an empty body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeReport {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub new_articles: Option<usize>,
    #[serde(default)]
    pub total_articles: Option<usize>,
}

/// Remote source of article collections.
#[async_trait]
pub trait ArticleFeed: Send + Sync {
    /// Human-readable name used in logs
    fn name(&self) -> &str;

    /// Fetch a complete replacement collection.
    async fn fetch_articles(&self) -> Result<Dataset>;

    /// Ask the backend to re-scrape the given sources.
    async fn trigger_scrape(&self, sources: &[String]) -> Result<ScrapeReport>;
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn submit_feedback(&self, feedback: &Feedback) -> Result<()>;
}
