//! Health news proxied from GNews. The API key never leaves the server.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NewsApiConfig;

pub const ARTICLES_PER_PAGE: usize = 12;
const MAX_ARTICLES: u32 = 100;
const REMOVED_MARKER: &str = "[Removed]";
const USER_AGENT: &str = "HealthBell-App/1.0";

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("News API key not configured")]
    MissingApiKey,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("News API returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Malformed news response: {0}")]
    ResponseParsing(String),
}

/// Query parameters accepted by the news endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewsQuery {
    pub country: String,
    pub category: String,
    pub max: u32,
    pub q: Option<String>,
    pub page: usize,
}

impl Default for NewsQuery {
    fn default() -> Self {
        Self {
            country: "us".into(),
            category: "health".into(),
            max: 50,
            q: None,
            page: 1,
        }
    }
}

impl NewsQuery {
    fn search_term(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    pub image_url: Option<String>,
    pub published_at: Option<String>,
    pub source_name: String,
    pub content: Option<String>,
}

/// Upstream news provider (allows mocking).
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch(&self, query: &NewsQuery) -> Result<Vec<Article>, NewsError>;
}

// ─── GNews client ────────────────────────────────────────

pub struct GNewsClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GNewsClient {
    pub fn new(config: &NewsApiConfig) -> Result<Self, NewsError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NewsError::HttpClient(e.to_string()))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// Endpoint and query pairs for a request, without the API key.
    pub fn request_for(&self, query: &NewsQuery) -> (String, Vec<(&'static str, String)>) {
        let mut params = vec![("lang", "en".to_string())];
        let endpoint = match query.search_term() {
            Some(term) => {
                params.push(("q", format!("{term} health")));
                format!("{}/search", self.base_url)
            }
            None => {
                params.push(("country", query.country.clone()));
                params.push(("category", query.category.clone()));
                format!("{}/top-headlines", self.base_url)
            }
        };
        params.push(("max", query.max.min(MAX_ARTICLES).to_string()));
        (endpoint, params)
    }
}

#[derive(Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GNewsArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    image: Option<String>,
    published_at: Option<String>,
    source: Option<GNewsSource>,
    content: Option<String>,
}

#[derive(Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

#[async_trait]
impl NewsSource for GNewsClient {
    async fn fetch(&self, query: &NewsQuery) -> Result<Vec<Article>, NewsError> {
        let api_key = self.api_key.as_deref().ok_or(NewsError::MissingApiKey)?;
        let (endpoint, params) = self.request_for(query);

        let response = self
            .client
            .get(&endpoint)
            .query(&params)
            .query(&[("apikey", api_key)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| NewsError::HttpClient(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NewsError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GNewsResponse = response
            .json()
            .await
            .map_err(|e| NewsError::ResponseParsing(e.without_url().to_string()))?;
        let fetched = parsed.articles.len();
        let articles = clean_articles(parsed.articles);
        tracing::debug!(fetched, kept = articles.len(), "News fetched");
        Ok(articles)
    }
}

fn usable(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty() && v != REMOVED_MARKER)
}

/// Drop articles missing a title, description, url or source.
fn clean_articles(raw: Vec<GNewsArticle>) -> Vec<Article> {
    raw.into_iter()
        .filter_map(|a| {
            Some(Article {
                title: usable(a.title)?,
                description: usable(a.description)?,
                url: usable(a.url)?,
                image_url: a.image,
                published_at: a.published_at,
                source_name: a.source.and_then(|s| usable(s.name))?,
                content: a.content,
            })
        })
        .collect()
}

// ─── Browsing helpers ────────────────────────────────────

/// Topic chips on the news page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsFilter {
    #[default]
    All,
    Health,
    Medical,
    Wellness,
}

impl NewsFilter {
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            NewsFilter::All => &[],
            NewsFilter::Health => &["health", "medical", "medicine", "healthcare", "wellness"],
            NewsFilter::Medical => &[
                "medical",
                "doctor",
                "hospital",
                "treatment",
                "diagnosis",
                "surgery",
            ],
            NewsFilter::Wellness => &[
                "wellness",
                "fitness",
                "nutrition",
                "mental health",
                "lifestyle",
            ],
        }
    }

    pub fn matches(self, article: &Article) -> bool {
        if self == NewsFilter::All {
            return true;
        }
        let text = format!("{} {}", article.title, article.description).to_lowercase();
        self.keywords().iter().any(|k| text.contains(k))
    }
}

/// Case-insensitive match on title, description or source name.
pub fn matches_search(article: &Article, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    term.is_empty()
        || article.title.to_lowercase().contains(&term)
        || article.description.to_lowercase().contains(&term)
        || article.source_name.to_lowercase().contains(&term)
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsPage {
    pub articles: Vec<Article>,
    pub total: usize,
    pub has_more: bool,
}

/// Filter, search, then show the first `page * 12` articles.
pub fn browse(
    articles: Vec<Article>,
    filter: NewsFilter,
    search: Option<&str>,
    page: usize,
) -> NewsPage {
    let matching: Vec<Article> = articles
        .into_iter()
        .filter(|a| filter.matches(a))
        .filter(|a| search.map_or(true, |term| matches_search(a, term)))
        .collect();
    let total = matching.len();
    let shown = page.max(1).saturating_mul(ARTICLES_PER_PAGE).min(total);
    let mut articles = matching;
    articles.truncate(shown);
    NewsPage {
        articles,
        total,
        has_more: shown < total,
    }
}

/// Canned source for tests and offline runs.
pub struct MockNewsSource {
    articles: Vec<Article>,
    fail: bool,
}

impl MockNewsSource {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            articles: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl NewsSource for MockNewsSource {
    async fn fetch(&self, query: &NewsQuery) -> Result<Vec<Article>, NewsError> {
        if self.fail {
            return Err(NewsError::Upstream {
                status: 503,
                body: "unavailable".into(),
            });
        }
        let mut articles = self.articles.clone();
        articles.truncate(query.max.min(MAX_ARTICLES) as usize);
        Ok(articles)
    }
}
