//! Guide source: page navigation and content parsing.
//!
//! The crawl body only sees two capabilities. A [`PageFetcher`] behaves like
//! a browsing session over the guide site (open the landing page, pick a
//! station category, pick a date, read the content). A [`Parser`] turns that
//! content into stations and program entries. Both are traits so crawls can
//! be driven by the HTTP implementation, the mock, or test fakes.

mod error;
mod http;
mod mock;
mod parser;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{ProgramEntry, Station};

pub use error::{FetchError, ParseError};
pub use http::{HttpFetcher, HttpFetcherConfig};
pub use mock::MockFetcher;
pub use parser::{HtmlParser, ParserConfig};

/// A page the session is currently on.
///
/// Records how the page was reached so navigation steps can build on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle {
    url: String,
    classify: Option<String>,
    date: Option<NaiveDate>,
    content: String,
}

impl PageHandle {
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            classify: None,
            date: None,
            content: content.into(),
        }
    }

    /// Derive the page reached by navigating from this one.
    pub fn navigate(&self, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            classify: self.classify.clone(),
            date: self.date,
            content: content.into(),
        }
    }

    pub fn with_classify(mut self, classify: impl Into<String>) -> Self {
        self.classify = Some(classify.into());
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Category selected on this page, if any.
    pub fn classify(&self) -> Option<&str> {
        self.classify.as_deref()
    }

    /// Date selected on this page, if any. `None` means the site default (today).
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Session-style navigation over the guide site.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Open the landing page listing station categories.
    async fn fetch_category_page(&self, url: &str) -> Result<PageHandle, FetchError>;

    /// Switch the page to the given station category.
    async fn select_category(
        &self,
        page: PageHandle,
        classify: &str,
    ) -> Result<PageHandle, FetchError>;

    /// Switch the page to the given date.
    async fn set_date(&self, page: PageHandle, date: NaiveDate) -> Result<PageHandle, FetchError>;

    /// Raw content of the page.
    async fn raw_content(&self, page: &PageHandle) -> Result<String, FetchError>;
}

/// Extracts structured data from page content.
pub trait Parser: Send + Sync {
    /// Stations listed on the page, without ids.
    fn parse_stations(&self, text: &str) -> Result<Vec<Station>, ParseError>;

    /// Program entries listed on the page, without station ids.
    fn parse_program_entries(&self, text: &str) -> Result<Vec<ProgramEntry>, ParseError>;
}
