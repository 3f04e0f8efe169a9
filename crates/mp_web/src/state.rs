use mp_core::{TopicTable, DEFAULT_PAGE_SIZE};
use mp_storage::{ArticleStore, FeedbackLog, RefreshCoordinator};
use std::sync::Arc;

pub struct AppState {
    pub store: Arc<ArticleStore>,
    pub topics: Arc<TopicTable>,
    pub feedback: Arc<FeedbackLog>,
    /// Present when a remote article API is configured
    pub refresher: Option<Arc<RefreshCoordinator>>,
    pub default_page_size: usize,
}

impl AppState {
    pub fn new(store: Arc<ArticleStore>, topics: Arc<TopicTable>) -> Self {
        Self {
            store,
            topics,
            feedback: Arc::new(FeedbackLog::new()),
            refresher: None,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_refresher(mut self, refresher: Arc<RefreshCoordinator>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }
}
