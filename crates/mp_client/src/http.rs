use async_trait::async_trait;
use mp_core::{ArticleFeed, Config, Dataset, Error, Feedback, FeedbackSink, Result, ScrapeReport};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const ARTICLES_PATH: &str = "api/articles";
const SCRAPE_PATH: &str = "api/scrape";
const FEEDBACK_PATH: &str = "api/feedback";
const PAGE_SIZE: usize = 100;
const MAX_PAGES: usize = 1000;

/// Reads the next-page flag of a `pagination` object. A response without
/// one is a complete list.
fn has_next_page(body: &Value) -> bool {
    let Some(pagination) = body.get("pagination") else {
        return false;
    };
    ["hasNext", "hasNextPage", "has_next"]
        .iter()
        .find_map(|key| pagination.get(key).and_then(Value::as_bool))
        .unwrap_or(false)
}

#[derive(Serialize)]
struct ScrapeRequest<'a> {
    sources: &'a [String],
}

/// Client for the article backend's JSON API.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    client: Client,
    base_url: Url,
}

impl HttpFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!("{} cannot be used as a base URL", base_url)));
        }
        // Url::join replaces the last path segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn fetch_page(&self, url: &Url, page: usize) -> Result<Value> {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &PAGE_SIZE.to_string());
        debug!("GET {}", url);
        let response = Self::check_status(self.client.get(url).send().await?).await?;

        response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(format!("article list is not JSON: {}", e)))
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            })
        }
    }
}

#[async_trait]
impl ArticleFeed for HttpFeed {
    fn name(&self) -> &str {
        self.base_url.as_str()
    }

    async fn fetch_articles(&self) -> Result<Dataset> {
        let url = self.endpoint(ARTICLES_PATH)?;
        let mut articles = Vec::new();
        let mut metadata = None;
        let mut page = 1usize;

        loop {
            let mut body = self.fetch_page(&url, page).await?;
            let entries = match body.get_mut("articles").map(Value::take) {
                Some(Value::Array(entries)) => entries,
                _ => {
                    return Err(Error::InvalidResponse(
                        "article list has no 'articles' array".to_string(),
                    ))
                }
            };
            if metadata.is_none() {
                metadata = body.get_mut("metadata").map(Value::take);
            }

            let received = entries.len();
            articles.extend(entries);
            if !has_next_page(&body) {
                break;
            }
            if received == 0 {
                return Err(Error::InvalidResponse(format!(
                    "page {} is empty but reports a next page",
                    page
                )));
            }
            if page >= MAX_PAGES {
                return Err(Error::InvalidResponse(format!(
                    "article list still reports a next page after {} pages",
                    MAX_PAGES
                )));
            }
            page += 1;
        }

        let mut document = json!({ "articles": articles });
        if let Some(metadata) = metadata {
            document["metadata"] = metadata;
        }
        let dataset = Dataset::from_value(document)?;
        info!(
            "📥 Fetched {} articles from {} ({} pages)",
            dataset.articles.len(),
            self.base_url,
            page
        );
        Ok(dataset)
    }

    async fn trigger_scrape(&self, sources: &[String]) -> Result<ScrapeReport> {
        let url = self.endpoint(SCRAPE_PATH)?;
        debug!("POST {} ({} sources)", url, sources.len());
        let response = self
            .client
            .post(url)
            .json(&ScrapeRequest { sources })
            .send()
            .await
            .map_err(|e| Error::Scrape(e.to_string()))?;
        let response = Self::check_status(response)
            .await
            .map_err(|e| Error::Scrape(e.to_string()))?;

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read the scrape trigger response: {}", e);
                return Ok(ScrapeReport::default());
            }
        };
        if body.trim().is_empty() {
            return Ok(ScrapeReport::default());
        }
        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            warn!("Scrape trigger answered with an unexpected body: {}", e);
            ScrapeReport::default()
        }))
    }
}

#[async_trait]
impl FeedbackSink for HttpFeed {
    async fn submit_feedback(&self, feedback: &Feedback) -> Result<()> {
        let url = self.endpoint(FEEDBACK_PATH)?;
        debug!("POST {}", url);
        let response = self.client.post(url).json(feedback).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
