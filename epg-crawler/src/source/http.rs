//! HTTP guide-site fetcher.
//!
//! Emulates the site's navigation with plain requests: picking a category
//! follows that category's link, and picking a date re-requests the current
//! page with a `date` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use scraper::{Html, Selector};
use tracing::debug;

use crate::domain::DATE_FORMAT;

use super::error::FetchError;
use super::{PageFetcher, PageHandle};

/// Default user agent sent with every request.
const DEFAULT_USER_AGENT: &str = concat!("epg-crawler/", env!("CARGO_PKG_VERSION"));

/// Default selector for category links on the landing page.
const DEFAULT_CATEGORY_SELECTOR: &str = "ul.weishi li a";

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    /// User-Agent header value
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// CSS selector matching category links; link text is the category name
    pub category_selector: String,
}

impl HttpFetcherConfig {
    pub fn new() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            category_selector: DEFAULT_CATEGORY_SELECTOR.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetches guide pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
    category_selector: Selector,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: HttpFetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        let user_agent =
            HeaderValue::from_str(&config.user_agent).map_err(|_| FetchError::Api {
                status: 0,
                message: "Invalid user agent format".to_string(),
            })?;
        headers.insert(USER_AGENT, user_agent);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let category_selector =
            Selector::parse(&config.category_selector).map_err(|e| FetchError::Selector {
                selector: config.category_selector.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            category_selector,
        })
    }

    /// GET a page and return its body.
    async fn get(&self, url: Url) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching guide page");
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        Ok(response.text().await?)
    }

    /// Resolve where the category link for `classify` points.
    ///
    /// Returns `None` if the page has no such link.
    fn category_target(&self, page: &PageHandle, classify: &str) -> Option<Result<Url, FetchError>> {
        let document = Html::parse_document(page.content());
        let link = document
            .select(&self.category_selector)
            .find(|a| a.text().collect::<String>().trim() == classify)?;

        let target = match link.value().attr("href") {
            Some(href) if !href.trim().is_empty() && !href.starts_with("javascript:") => {
                parse_url(page.url()).and_then(|base| {
                    base.join(href.trim()).map_err(|e| FetchError::InvalidUrl {
                        url: href.to_string(),
                        message: e.to_string(),
                    })
                })
            }
            // Script-driven links: fall back to a query parameter
            _ => with_query_param(page.url(), "classify", classify),
        };
        Some(target)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_category_page(&self, url: &str) -> Result<PageHandle, FetchError> {
        let target = parse_url(url)?;
        let content = self.get(target).await?;
        Ok(PageHandle::new(url, content))
    }

    async fn select_category(
        &self,
        page: PageHandle,
        classify: &str,
    ) -> Result<PageHandle, FetchError> {
        let target = self
            .category_target(&page, classify)
            .ok_or_else(|| FetchError::CategoryNotFound {
                classify: classify.to_string(),
            })??;

        let content = self.get(target.clone()).await?;
        Ok(page
            .navigate(target.as_str(), content)
            .with_classify(classify))
    }

    async fn set_date(&self, page: PageHandle, date: NaiveDate) -> Result<PageHandle, FetchError> {
        let value = date.format(DATE_FORMAT).to_string();
        let target = with_query_param(page.url(), "date", &value)?;
        let content = self.get(target.clone()).await?;
        Ok(page.navigate(target.as_str(), content).with_date(date))
    }

    async fn raw_content(&self, page: &PageHandle) -> Result<String, FetchError> {
        Ok(page.content().to_string())
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Set `key=value` on `url`, replacing any existing value for `key`.
fn with_query_param(url: &str, key: &str, value: &str) -> Result<Url, FetchError> {
    let mut url = parse_url(url)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(key, value);
    Ok(url)
}
