use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Stable article identifier. Numeric ids from older datasets are kept in
/// their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(String);

impl ArticleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ArticleId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ArticleId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "begynder")]
    Begynder,
    #[serde(rename = "øvet")]
    Oevet,
    #[serde(rename = "avanceret")]
    Avanceret,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Begynder, Difficulty::Oevet, Difficulty::Avanceret];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Begynder => "begynder",
            Difficulty::Oevet => "øvet",
            Difficulty::Avanceret => "avanceret",
        }
    }

    /// Lenient parse used at ingestion. Accepts the ASCII spelling "oevet".
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "begynder" => Some(Difficulty::Begynder),
            "øvet" | "oevet" => Some(Difficulty::Oevet),
            "avanceret" => Some(Difficulty::Avanceret),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Difficulty::parse(s).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "unknown difficulty '{}', expected begynder, øvet or avanceret",
                s
            ))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scraped_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub audiences: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

impl Article {
    /// Minimal article, mostly useful for tests and fixtures.
    pub fn new(id: impl Into<ArticleId>, title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            summary: None,
            url: None,
            tags: Vec::new(),
            source: source.into(),
            published_date: None,
            scraped_date: None,
            audiences: Vec::new(),
            difficulty: None,
            relevance_score: None,
        }
    }

    /// The date used for ordering: published, falling back to scraped.
    pub fn effective_date(&self) -> Option<DateTime<Utc>> {
        self.published_date.or(self.scraped_date)
    }

    pub fn relevance(&self) -> f64 {
        self.relevance_score.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Positive,
    Negative,
}

impl FromStr for Rating {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(Rating::Positive),
            "negative" => Ok(Rating::Negative),
            other => Err(Error::InvalidArgument(format!(
                "unknown rating '{}', expected positive or negative",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub article_id: ArticleId,
    pub rating: Rating,
    #[serde(default)]
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

impl Feedback {
    pub fn new(article_id: ArticleId, rating: Rating, comment: impl Into<String>) -> Self {
        Self {
            article_id,
            rating,
            comment: comment.into().trim().to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse() {
        assert_eq!(Difficulty::parse("Begynder"), Some(Difficulty::Begynder));
        assert_eq!(Difficulty::parse(" øvet "), Some(Difficulty::Oevet));
        assert_eq!(Difficulty::parse("oevet"), Some(Difficulty::Oevet));
        assert_eq!(Difficulty::parse("AVANCERET"), Some(Difficulty::Avanceret));
        assert_eq!(Difficulty::parse("expert"), None);
        assert!("expert".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_difficulty_serializes_danish() {
        let json = serde_json::to_string(&Difficulty::Oevet).unwrap();
        assert_eq!(json, "\"øvet\"");
    }

    #[test]
    fn test_effective_date_falls_back_to_scraped() {
        let mut article = Article::new("1", "Title", "source");
        assert!(article.effective_date().is_none());

        let scraped = "2024-01-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        article.scraped_date = Some(scraped);
        assert_eq!(article.effective_date(), Some(scraped));

        let published = "2024-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        article.published_date = Some(published);
        assert_eq!(article.effective_date(), Some(published));
    }

    #[test]
    fn test_feedback_json_shape() {
        let feedback = Feedback {
            article_id: ArticleId::new("42"),
            rating: Rating::Negative,
            comment: "for kort".to_string(),
            timestamp: "2024-05-01T12:00:00Z".parse().unwrap(),
        };
        let value = serde_json::to_value(&feedback).unwrap();
        assert_eq!(value["articleId"], "42");
        assert_eq!(value["rating"], "negative");
        assert_eq!(value["comment"], "for kort");
    }
}
