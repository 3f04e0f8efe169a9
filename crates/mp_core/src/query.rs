//! Filtering, search, ordering and pagination over an article slice.
//!
//! Everything here is a pure function of its inputs: the same collection and
//! the same [`QuerySpec`] always give the same page.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::topics::{tag_matches_any, TopicTable};
use crate::types::{Article, Difficulty};
use crate::Error;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Newest first by published date (scraped date as fallback), ties by source.
    #[default]
    Newest,
    Oldest,
    Relevance,
    Source,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "date" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "relevance" => Ok(SortOrder::Relevance),
            "source" => Ok(SortOrder::Source),
            other => Err(Error::InvalidArgument(format!(
                "unknown sort order '{}', expected newest, oldest, relevance or source",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::Relevance => "relevance",
            SortOrder::Source => "source",
        };
        f.write_str(name)
    }
}

/// How the whitespace-separated tokens of a search text combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Any,
    All,
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(SearchMode::Any),
            "all" => Ok(SearchMode::All),
            other => Err(Error::InvalidArgument(format!(
                "unknown search mode '{}', expected any or all",
                other
            ))),
        }
    }
}

/// Filter and ordering options. Every field is optional; set fields are
/// AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuerySpec {
    pub topic: Option<String>,
    pub audience: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub source: Option<String>,
    pub search_text: Option<String>,
    pub search_mode: SearchMode,
    pub tag: Option<String>,
    pub min_relevance: Option<f64>,
    pub sort: Option<SortOrder>,
}

impl QuerySpec {
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn min_relevance(mut self, score: f64) -> Self {
        self.min_relevance = Some(score);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }
}

/// A page/page size pair after clamping: page is at least 1, and a
/// non-positive page size becomes [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = if page < 1 {
            1
        } else {
            usize::try_from(page).unwrap_or(usize::MAX)
        };
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            usize::try_from(page_size).unwrap_or(usize::MAX)
        };
        Self { page, page_size }
    }

    pub fn start_index(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: usize) -> Self {
        Self {
            current_page: request.page,
            page_size: request.page_size,
            total_items,
            total_pages: total_pages(total_items, request.page_size),
            has_next: request.start_index().saturating_add(request.page_size) < total_items,
            has_prev: request.page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub items: Vec<Article>,
    pub pagination: Pagination,
}

pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    if page_size == 0 || total_items == 0 {
        0
    } else {
        (total_items - 1) / page_size + 1
    }
}

/// Runs a query over `articles`. Never fails: bad page parameters are clamped
/// and pages past the end come back empty.
pub fn query(
    articles: &[Article],
    topics: &TopicTable,
    spec: &QuerySpec,
    page: i64,
    page_size: i64,
) -> QueryResult {
    let request = PageRequest::new(page, page_size);
    let matcher = Matcher::new(spec, topics);

    let mut matched: Vec<&Article> = articles.iter().filter(|a| matcher.matches(a)).collect();
    sort_articles(&mut matched, spec.sort.unwrap_or_default());

    debug!(
        "Query matched {} of {} articles (page {}, size {})",
        matched.len(),
        articles.len(),
        request.page,
        request.page_size
    );

    let (items, pagination) = paginate(&matched, request);
    QueryResult {
        items: items.into_iter().cloned().collect(),
        pagination,
    }
}

pub fn paginate<T: Clone>(items: &[T], request: PageRequest) -> (Vec<T>, Pagination) {
    let pagination = Pagination::new(request, items.len());
    let page = items
        .iter()
        .skip(request.start_index())
        .take(request.page_size)
        .cloned()
        .collect();
    (page, pagination)
}

pub fn sort_articles(articles: &mut [&Article], order: SortOrder) {
    match order {
        SortOrder::Newest => articles.sort_by(|a, b| newest_first(a, b)),
        SortOrder::Oldest => articles.sort_by(|a, b| {
            a.effective_date()
                .cmp(&b.effective_date())
                .then_with(|| a.source.cmp(&b.source))
        }),
        SortOrder::Relevance => articles.sort_by(|a, b| {
            b.relevance()
                .total_cmp(&a.relevance())
                .then_with(|| newest_first(a, b))
        }),
        SortOrder::Source => {
            articles.sort_by(|a, b| a.source.cmp(&b.source).then_with(|| newest_first(a, b)))
        }
    }
}

fn newest_first(a: &Article, b: &Article) -> Ordering {
    b.effective_date()
        .cmp(&a.effective_date())
        .then_with(|| a.source.cmp(&b.source))
}

/// A `QuerySpec` with every needle lowercased once up front.
struct Matcher {
    topic: Option<(String, Vec<String>)>,
    audience: Option<String>,
    difficulty: Option<Difficulty>,
    source: Option<String>,
    tokens: Vec<String>,
    search_mode: SearchMode,
    tag: Option<String>,
    min_relevance: Option<f64>,
}

impl Matcher {
    fn new(spec: &QuerySpec, topics: &TopicTable) -> Self {
        let topic = lowered(&spec.topic).map(|label| {
            let synonyms = topics.expand(&label);
            (label, synonyms)
        });
        let tokens = spec
            .search_text
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        Self {
            topic,
            audience: lowered(&spec.audience),
            difficulty: spec.difficulty,
            source: lowered(&spec.source),
            tokens,
            search_mode: spec.search_mode,
            tag: lowered(&spec.tag),
            min_relevance: spec.min_relevance,
        }
    }

    fn matches(&self, article: &Article) -> bool {
        if let Some((label, synonyms)) = &self.topic {
            let by_tag = article
                .tags
                .iter()
                .any(|tag| tag_matches_any(&tag.to_lowercase(), synonyms));
            let by_audience = article.audiences.iter().any(|a| a.to_lowercase() == *label);
            let by_difficulty = article.difficulty.is_some_and(|d| d.as_str() == label);
            if !(by_tag || by_audience || by_difficulty) {
                return false;
            }
        }

        if let Some(audience) = &self.audience {
            if !article.audiences.iter().any(|a| a.to_lowercase() == *audience) {
                return false;
            }
        }

        if let Some(difficulty) = self.difficulty {
            if article.difficulty != Some(difficulty) {
                return false;
            }
        }

        if let Some(source) = &self.source {
            if !article.source.to_lowercase().contains(source.as_str()) {
                return false;
            }
        }

        if let Some(tag) = &self.tag {
            if !article.tags.iter().any(|t| t.to_lowercase() == *tag) {
                return false;
            }
        }

        if let Some(min) = self.min_relevance {
            if article.relevance() < min {
                return false;
            }
        }

        if !self.tokens.is_empty() {
            let haystack = SearchFields::new(article);
            let found = match self.search_mode {
                SearchMode::Any => self.tokens.iter().any(|t| haystack.contains(t)),
                SearchMode::All => self.tokens.iter().all(|t| haystack.contains(t)),
            };
            if !found {
                return false;
            }
        }

        true
    }
}

struct SearchFields {
    title: String,
    summary: String,
    tags: Vec<String>,
    source: String,
}

impl SearchFields {
    fn new(article: &Article) -> Self {
        Self {
            title: article.title.as_deref().unwrap_or_default().to_lowercase(),
            summary: article.summary.as_deref().unwrap_or_default().to_lowercase(),
            tags: article.tags.iter().map(|t| t.to_lowercase()).collect(),
            source: article.source.to_lowercase(),
        }
    }

    fn contains(&self, token: &str) -> bool {
        self.title.contains(token)
            || self.summary.contains(token)
            || self.tags.iter().any(|t| t.contains(token))
            || self.source.contains(token)
    }
}

fn lowered(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}
