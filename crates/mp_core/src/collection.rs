use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::dataset::{dedupe_by_id, Dataset, DatasetMetadata};
use crate::query::total_pages;
use crate::types::{Article, ArticleId, Difficulty};

/// Sorted, de-duplicated filter values present in a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Vocabulary {
    pub tags: Vec<String>,
    pub audiences: Vec<String>,
    pub difficulties: Vec<Difficulty>,
    pub sources: Vec<String>,
}

impl Vocabulary {
    pub fn from_articles(articles: &[Article]) -> Self {
        let mut tags = BTreeSet::new();
        let mut audiences = BTreeSet::new();
        let mut difficulties = BTreeSet::new();
        let mut sources = BTreeSet::new();

        for article in articles {
            tags.extend(article.tags.iter().cloned());
            audiences.extend(article.audiences.iter().cloned());
            difficulties.extend(article.difficulty);
            if !article.source.is_empty() {
                sources.insert(article.source.clone());
            }
        }

        Self {
            tags: tags.into_iter().collect(),
            audiences: audiences.into_iter().collect(),
            difficulties: difficulties.into_iter().collect(),
            sources: sources.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_articles: usize,
    pub last_updated: Option<String>,
    pub sources: Vec<String>,
    pub articles_per_source: BTreeMap<String, usize>,
    pub available_tags: usize,
    pub available_audiences: usize,
    pub available_difficulties: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// One immutable generation of the article collection. A refresh builds a
/// new `Collection` rather than editing this one.
#[derive(Debug, Clone)]
pub struct Collection {
    articles: Vec<Article>,
    metadata: DatasetMetadata,
    vocabulary: Vocabulary,
    loaded_at: DateTime<Utc>,
}

impl Collection {
    pub fn new(articles: Vec<Article>, metadata: DatasetMetadata) -> Self {
        let articles = dedupe_by_id(articles);
        let vocabulary = Vocabulary::from_articles(&articles);
        Self {
            articles,
            metadata,
            vocabulary,
            loaded_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), DatasetMetadata::default())
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn get(&self, id: &ArticleId) -> Option<&Article> {
        self.articles.iter().find(|article| &article.id == id)
    }

    pub fn statistics(&self, page_size: usize) -> Statistics {
        let mut articles_per_source = BTreeMap::new();
        for article in &self.articles {
            if !article.source.is_empty() {
                *articles_per_source.entry(article.source.clone()).or_insert(0) += 1;
            }
        }

        Statistics {
            total_articles: self.articles.len(),
            last_updated: self.metadata.last_updated.clone(),
            sources: self.vocabulary.sources.clone(),
            articles_per_source,
            available_tags: self.vocabulary.tags.len(),
            available_audiences: self.vocabulary.audiences.len(),
            available_difficulties: self.vocabulary.difficulties.len(),
            page_size,
            total_pages: total_pages(self.articles.len(), page_size),
        }
    }
}

impl From<Dataset> for Collection {
    fn from(dataset: Dataset) -> Self {
        Self::new(dataset.articles, dataset.metadata)
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, source: &str, tags: &[&str]) -> Article {
        let mut article = Article::new(id, format!("Artikel {}", id), source);
        article.tags = tags.iter().map(|t| t.to_string()).collect();
        article
    }

    #[test]
    fn test_vocabulary_is_sorted_and_unique() {
        let mut a = article("1", "Nordnet", &["pension", "aktier"]);
        a.audiences = vec!["pensionist".into()];
        a.difficulty = Some(Difficulty::Avanceret);
        let mut b = article("2", "Budgetnørd", &["budget", "aktier"]);
        b.difficulty = Some(Difficulty::Begynder);
        let c = article("3", "", &[]);

        let vocabulary = Vocabulary::from_articles(&[a, b, c]);
        assert_eq!(vocabulary.tags, vec!["aktier", "budget", "pension"]);
        assert_eq!(vocabulary.audiences, vec!["pensionist"]);
        assert_eq!(
            vocabulary.difficulties,
            vec![Difficulty::Begynder, Difficulty::Avanceret]
        );
        assert_eq!(vocabulary.sources, vec!["Budgetnørd", "Nordnet"]);
    }

    #[test]
    fn test_statistics() {
        let collection = Collection::new(
            vec![
                article("1", "Nordnet", &["pension"]),
                article("2", "Nordnet", &["aktier"]),
                article("3", "Moneypenny", &["budget"]),
            ],
            DatasetMetadata {
                last_updated: Some("2024-06-01T12:00:00".into()),
                ..Default::default()
            },
        );

        let stats = collection.statistics(2);
        assert_eq!(stats.total_articles, 3);
        assert_eq!(stats.articles_per_source["Nordnet"], 2);
        assert_eq!(stats.articles_per_source["Moneypenny"], 1);
        assert_eq!(stats.available_tags, 3);
        assert_eq!(stats.total_pages, 2);
        assert_eq!(stats.last_updated.as_deref(), Some("2024-06-01T12:00:00"));
    }

    #[test]
    fn test_get_by_id() {
        let collection = Collection::new(vec![article("x", "s", &[])], DatasetMetadata::default());
        assert!(collection.get(&ArticleId::new("x")).is_some());
        assert!(collection.get(&ArticleId::new("y")).is_none());
    }
}
