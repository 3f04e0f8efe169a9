use std::sync::Arc;

use crate::collection::Collection;
use crate::dataset::Dataset;
use crate::types::Article;

/// Holder of the current article collection.
///
/// Readers get an immutable snapshot; writers only ever swap the whole
/// collection.
pub trait ArticleRepository: Send + Sync {
    /// The current snapshot. Later replaces do not affect it.
    fn get_all(&self) -> Arc<Collection>;

    /// Swap in a new article list, keeping the current metadata.
    fn replace(&self, articles: Vec<Article>);

    /// Swap in a new article list together with its metadata.
    fn replace_dataset(&self, dataset: Dataset);
}
