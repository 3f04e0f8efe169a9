use std::path::PathBuf;
use std::time::Duration;

use crate::query::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the article API, without the `/api/...` suffix
    pub api_url: String,
    /// Dataset file to load instead of the bundled one
    pub dataset_path: Option<PathBuf>,
    /// Topic table file to use instead of the built-in one
    pub topics_path: Option<PathBuf>,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
    pub default_page_size: usize,
    pub listen_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            dataset_path: None,
            topics_path: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            default_page_size: DEFAULT_PAGE_SIZE,
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
        }
    }
}

impl Config {
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_dataset(mut self, path: Option<PathBuf>) -> Self {
        self.dataset_path = path;
        self
    }

    pub fn with_topics(mut self, path: Option<PathBuf>) -> Self {
        self.topics_path = path;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}
