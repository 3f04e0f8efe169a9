//! Data side of the embeddable widget that third-party sites load.

use serde::{Deserialize, Serialize};

use crate::query::{query, QuerySpec};
use crate::topics::TopicTable;
use crate::types::Article;

pub const DEFAULT_WIDGET_LIMIT: usize = 3;
pub const ALL_THEMES: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetOptions {
    pub theme: String,
    pub limit: usize,
    pub show_source: bool,
    pub min_relevance: Option<f64>,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            theme: ALL_THEMES.to_string(),
            limit: DEFAULT_WIDGET_LIMIT,
            show_source: true,
            min_relevance: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetArticle {
    pub id: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetPayload {
    pub title: String,
    pub theme: String,
    pub articles: Vec<WidgetArticle>,
}

pub fn theme_title(theme: &str) -> &'static str {
    match theme.trim().to_lowercase().as_str() {
        "su" => "SU og Studerende",
        "opsparing" => "Opsparing",
        "bolig" => "Bolig og Huskøb",
        "investering" => "Investering",
        "gæld" => "Gæld og Lån",
        "pension" => "Pension",
        "budget" => "Budget",
        _ => "Personlig Økonomi",
    }
}

pub fn widget_feed(articles: &[Article], topics: &TopicTable, options: &WidgetOptions) -> WidgetPayload {
    let theme = options.theme.trim().to_lowercase();
    let theme = if theme.is_empty() { ALL_THEMES.to_string() } else { theme };

    let spec = QuerySpec {
        topic: (theme != ALL_THEMES).then(|| theme.clone()),
        min_relevance: options.min_relevance,
        ..Default::default()
    };
    let limit = if options.limit == 0 { DEFAULT_WIDGET_LIMIT } else { options.limit };
    let page_size = i64::try_from(limit).unwrap_or(i64::MAX);
    let result = query(articles, topics, &spec, 1, page_size);

    WidgetPayload {
        title: format!("MinePenge.dk - {}", theme_title(&theme)),
        articles: result
            .items
            .into_iter()
            .map(|article| WidgetArticle {
                id: article.id.to_string(),
                title: article.title,
                summary: article.summary,
                url: article.url,
                source: options.show_source.then_some(article.source),
                published_date: article.published_date.map(|d| d.to_rfc3339()),
                relevance_score: article.relevance_score,
            })
            .collect(),
        theme,
    }
}
