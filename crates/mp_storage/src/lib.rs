pub mod feedback;
pub mod refresh;
pub mod store;

pub use feedback::{FeedbackLog, FeedbackStatistics};
pub use refresh::{is_stale, RefreshCoordinator, RefreshOutcome};
pub use store::ArticleStore;

/// The dataset shipped with the service, used when no dataset file is given.
pub const BUNDLED_DATASET: &str = include_str!("../data/articles.json");

pub mod prelude {
    pub use super::{ArticleStore, FeedbackLog, RefreshCoordinator, RefreshOutcome};
    pub use mp_core::{Article, ArticleRepository, Error, Result};
}
