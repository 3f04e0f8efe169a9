//! Dataset ingestion.
//!
//! Article JSON has gone through several shapes (`tags` vs `minepenge_tags`,
//! `audience` vs `target_audiences`, `id` vs `article_id`, ...). Everything is
//! folded into the canonical [`Article`] here, once, so the query engine never
//! has to look at field presence.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::types::{Article, ArticleId, Difficulty};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_articles: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub articles_per_source: BTreeMap<String, usize>,
}

/// Serializes to the canonical `{articles, metadata}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub articles: Vec<Article>,
    pub metadata: DatasetMetadata,
}

impl Dataset {
    pub fn new(articles: Vec<Article>) -> Self {
        Self {
            articles,
            metadata: DatasetMetadata::default(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Accepts `{ "articles": [...], "metadata": {...} }` or a bare array of
    /// articles. Individual entries that cannot be read are skipped.
    pub fn from_value(value: Value) -> Result<Self> {
        let (entries, metadata) = match value {
            Value::Array(entries) => (entries, DatasetMetadata::default()),
            Value::Object(mut map) => {
                let entries = match map.remove("articles") {
                    Some(Value::Array(entries)) => entries,
                    _ => {
                        return Err(Error::InvalidResponse(
                            "document has no 'articles' array".to_string(),
                        ))
                    }
                };
                let metadata = match map.remove("metadata") {
                    Some(Value::Null) | None => DatasetMetadata::default(),
                    Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
                        warn!("Ignoring malformed dataset metadata: {}", e);
                        DatasetMetadata::default()
                    }),
                };
                (entries, metadata)
            }
            _ => {
                return Err(Error::InvalidResponse(
                    "expected a JSON object or array".to_string(),
                ))
            }
        };

        let mut articles = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<RawArticle>(entry) {
                Ok(raw) => articles.push(raw.normalize(index)),
                Err(e) => warn!("Skipping malformed article at index {}: {}", index, e),
            }
        }

        Ok(Self {
            articles: dedupe_by_id(articles),
            metadata,
        })
    }
}

/// Drops later articles whose id was already seen. First occurrence wins.
pub fn dedupe_by_id(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::with_capacity(articles.len());
    let before = articles.len();
    let unique: Vec<Article> = articles
        .into_iter()
        .filter(|article| seen.insert(article.id.clone()))
        .collect();
    if unique.len() != before {
        warn!("Dropped {} articles with duplicate ids", before - unique.len());
    }
    unique
}

/// Parses the timestamp formats seen in scraped data. Relative dates such as
/// "2 dage siden" are not understood and yield `None`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> Option<String> {
        match self {
            RawId::Int(n) => Some(n.to_string()),
            RawId::Text(s) => non_blank(Some(s)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawArticle {
    id: Option<RawId>,
    article_id: Option<RawId>,
    title: Option<String>,
    summary: Option<String>,
    url: Option<String>,
    tags: Option<Vec<String>>,
    minepenge_tags: Option<Vec<String>>,
    source: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(rename = "published_date")]
    published_date_snake: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(rename = "scrapedDate")]
    scraped_date: Option<String>,
    #[serde(rename = "scraped_date")]
    scraped_date_snake: Option<String>,
    #[serde(rename = "foundAt")]
    found_at: Option<String>,
    audiences: Option<Vec<String>>,
    audience: Option<OneOrMany>,
    target_audiences: Option<Vec<String>>,
    difficulty: Option<String>,
    complexity_level: Option<String>,
    #[serde(rename = "complexityLevel")]
    complexity_level_camel: Option<String>,
    #[serde(rename = "relevanceScore")]
    relevance_score: Option<f64>,
    #[serde(rename = "relevance_score")]
    relevance_score_snake: Option<f64>,
}

impl RawArticle {
    fn normalize(self, index: usize) -> Article {
        let url = non_blank(self.url);
        let id = self
            .id
            .and_then(RawId::into_string)
            .or_else(|| self.article_id.and_then(RawId::into_string))
            .or_else(|| url.clone())
            .unwrap_or_else(|| format!("auto-{}", index + 1));

        let tags = merge_labels(
            self.tags
                .into_iter()
                .flatten()
                .chain(self.minepenge_tags.into_iter().flatten()),
        );

        let audiences = merge_labels(
            self.audiences
                .into_iter()
                .flatten()
                .chain(self.audience.into_iter().flat_map(OneOrMany::into_vec))
                .chain(self.target_audiences.into_iter().flatten()),
        );

        // Several spellings may sit on one record; the canonical one wins
        let difficulty_raw = self
            .difficulty
            .or(self.complexity_level)
            .or(self.complexity_level_camel);
        let difficulty = match difficulty_raw.as_deref() {
            Some(raw) => {
                let parsed = Difficulty::parse(raw);
                if parsed.is_none() && !raw.trim().is_empty() {
                    debug!("Article {} has unknown difficulty '{}'", id, raw);
                }
                parsed
            }
            None => tags.iter().find_map(|tag| Difficulty::parse(tag)),
        };

        Article {
            id: ArticleId::new(id),
            title: non_blank(self.title),
            summary: non_blank(self.summary),
            url,
            tags,
            source: self.source.map(|s| s.trim().to_string()).unwrap_or_default(),
            published_date: first_timestamp([
                self.published_date,
                self.published_date_snake,
                self.published_at,
            ]),
            scraped_date: first_timestamp([self.scraped_date, self.scraped_date_snake, self.found_at]),
            audiences,
            difficulty,
            relevance_score: self
                .relevance_score
                .or(self.relevance_score_snake)
                .filter(|score| score.is_finite()),
        }
    }
}

/// First spelling that parses as a timestamp.
fn first_timestamp<const N: usize>(values: [Option<String>; N]) -> Option<DateTime<Utc>> {
    values
        .iter()
        .flatten()
        .find_map(|value| parse_timestamp(value))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Trims, drops blanks and removes case-insensitive duplicates, keeping the
/// first spelling.
fn merge_labels(labels: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .filter(|label| seen.insert(label.to_lowercase()))
        .collect()
}
