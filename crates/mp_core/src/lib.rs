pub mod collection;
pub mod config;
pub mod dataset;
pub mod error;
pub mod feed;
pub mod query;
pub mod storage;
pub mod topics;
pub mod types;
pub mod widget;

pub use collection::{Collection, Statistics, Vocabulary};
pub use config::Config;
pub use dataset::{Dataset, DatasetMetadata};
pub use error::{Error, Result};
pub use feed::{ArticleFeed, FeedbackSink, ScrapeReport};
pub use query::{query, Pagination, QueryResult, QuerySpec, SearchMode, SortOrder, DEFAULT_PAGE_SIZE};
pub use storage::ArticleRepository;
pub use topics::TopicTable;
pub use types::{Article, ArticleId, Difficulty, Feedback, Rating};

pub mod prelude {
    pub use crate::{Article, ArticleId, Error, QuerySpec, Result, TopicTable};
}
