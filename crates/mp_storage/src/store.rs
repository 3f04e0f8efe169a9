use mp_core::{
    Article, ArticleId, ArticleRepository, Collection, Dataset, DatasetMetadata, QueryResult,
    QuerySpec, Result, Statistics, TopicTable, Vocabulary,
};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

/// In-memory article store.
///
/// The current [`Collection`] sits behind an `Arc`; readers clone the `Arc`
/// and keep working on their snapshot while a refresh swaps in a new one.
/// The lock is only held for that pointer clone or swap.
#[derive(Debug)]
pub struct ArticleStore {
    current: RwLock<Arc<Collection>>,
}

impl ArticleStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Collection::empty())),
        }
    }

    /// A store loaded with the dataset compiled into this crate.
    pub fn bundled() -> Self {
        let store = Self::new();
        store.load_json(crate::BUNDLED_DATASET);
        store
    }

    pub fn from_dataset(dataset: Dataset) -> Self {
        let store = Self::new();
        store.load(dataset);
        store
    }

    pub fn load(&self, dataset: Dataset) {
        let collection = Collection::from(dataset);
        info!("📚 Loaded {} articles", collection.len());
        self.swap(collection);
    }

    /// Loads a JSON dataset. Malformed input leaves an empty collection.
    pub fn load_json(&self, json: &str) {
        match Dataset::from_json_str(json) {
            Ok(dataset) => self.load(dataset),
            Err(e) => {
                warn!("⚠️ Could not read article dataset, starting empty: {}", e);
                self.swap(Collection::empty());
            }
        }
    }

    /// Loads a JSON dataset file. An unreadable file leaves an empty collection.
    pub fn load_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => self.load_json(&json),
            Err(e) => {
                warn!("⚠️ Could not open {}, starting empty: {}", path.display(), e);
                self.swap(Collection::empty());
            }
        }
    }

    /// Writes the current collection as a canonical dataset document, so a
    /// later `load_file` on the same path sees it.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = self.snapshot();
        let dataset = Dataset {
            articles: snapshot.articles().to_vec(),
            metadata: snapshot.metadata().clone(),
        };
        let json = serde_json::to_string_pretty(&dataset)?;

        // Write next to the target and rename so readers never see half a file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        info!("💾 Saved {} articles to {}", dataset.articles.len(), path.display());
        Ok(())
    }

    pub fn get(&self, id: &ArticleId) -> Option<Article> {
        self.snapshot().get(id).cloned()
    }

    pub fn vocabulary(&self) -> Vocabulary {
        self.snapshot().vocabulary().clone()
    }

    pub fn metadata(&self) -> DatasetMetadata {
        self.snapshot().metadata().clone()
    }

    pub fn statistics(&self, page_size: usize) -> Statistics {
        self.snapshot().statistics(page_size)
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn query(&self, topics: &TopicTable, spec: &QuerySpec, page: i64, page_size: i64) -> QueryResult {
        let snapshot = self.snapshot();
        mp_core::query(snapshot.articles(), topics, spec, page, page_size)
    }

    fn snapshot(&self) -> Arc<Collection> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn swap(&self, collection: Collection) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(collection);
    }
}

impl Default for ArticleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleRepository for ArticleStore {
    fn get_all(&self) -> Arc<Collection> {
        self.snapshot()
    }

    fn replace(&self, articles: Vec<Article>) {
        let metadata = self.snapshot().metadata().clone();
        self.swap(Collection::new(articles, metadata));
    }

    fn replace_dataset(&self, dataset: Dataset) {
        self.swap(Collection::from(dataset));
    }
}
