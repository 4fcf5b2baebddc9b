//! Mock fetcher for running without network access.
//!
//! Serves canned guide pages from memory or from a directory and counts how
//! often the landing page is opened, which is one per network crawl.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::parse_date;

use super::error::FetchError;
use super::{PageFetcher, PageHandle};

/// Key for a canned page: category plus an optional date (`None` = today).
type PageKey = (String, Option<NaiveDate>);

/// Mock guide site.
///
/// Directory layout for [`MockFetcher::from_dir`]:
/// - `index.html`: landing page
/// - `{classify}.html`: category page for today
/// - `{classify}@{yyyy-MM-dd}.html`: category page for a date
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    landing: String,
    pages: HashMap<PageKey, String>,
    latency: Duration,
    fetches: Arc<AtomicUsize>,
}

impl MockFetcher {
    /// Create a mock whose landing page has the given content.
    pub fn new(landing: impl Into<String>) -> Self {
        Self {
            landing: landing.into(),
            ..Self::default()
        }
    }

    /// Add a category page, for today (`date = None`) or a given date.
    pub fn with_page(
        mut self,
        classify: impl Into<String>,
        date: Option<NaiveDate>,
        content: impl Into<String>,
    ) -> Self {
        self.pages.insert((classify.into(), date), content.into());
        self
    }

    /// Delay every navigation step, to simulate a slow site.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Load pages from a directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, FetchError> {
        let dir = dir.as_ref();
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|e| FetchError::Mock {
                message: format!("Failed to read {:?}: {}", path, e),
            })
        };

        let mut mock = Self::new(read(&dir.join("index.html"))?);

        let entries = std::fs::read_dir(dir).map_err(|e| FetchError::Mock {
            message: format!("Failed to read mock page directory: {}", e),
        })?;
        for entry in entries {
            let path = entry
                .map_err(|e| FetchError::Mock {
                    message: format!("Failed to read directory entry: {}", e),
                })?
                .path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("html") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == "index" {
                continue;
            }

            let key = match stem.split_once('@') {
                Some((classify, date)) => {
                    let date = parse_date(date).map_err(|e| FetchError::Mock {
                        message: format!("Invalid date in {:?}: {}", path, e),
                    })?;
                    (classify.to_string(), Some(date))
                }
                None => (stem.to_string(), None),
            };
            mock.pages.insert(key, read(&path)?);
        }

        Ok(mock)
    }

    /// Number of times the landing page has been opened.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Categories with at least one canned page.
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self.pages.keys().map(|(c, _)| c.clone()).collect();
        categories.sort();
        categories.dedup();
        categories
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn page(&self, classify: &str, date: Option<NaiveDate>) -> Result<&String, FetchError> {
        self.pages
            .get(&(classify.to_string(), date))
            .ok_or_else(|| FetchError::Mock {
                message: format!(
                    "No mock page for category {:?} on {}. Available: {:?}",
                    classify,
                    date.map_or_else(|| "today".to_string(), |d| d.to_string()),
                    self.categories()
                ),
            })
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_category_page(&self, url: &str) -> Result<PageHandle, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(PageHandle::new(url, self.landing.clone()))
    }

    async fn select_category(
        &self,
        page: PageHandle,
        classify: &str,
    ) -> Result<PageHandle, FetchError> {
        self.delay().await;
        if !self.pages.keys().any(|(c, _)| c == classify) {
            return Err(FetchError::CategoryNotFound {
                classify: classify.to_string(),
            });
        }
        let content = self
            .pages
            .get(&(classify.to_string(), None))
            .cloned()
            .unwrap_or_default();
        Ok(page.navigate(page.url(), content).with_classify(classify))
    }

    async fn set_date(&self, page: PageHandle, date: NaiveDate) -> Result<PageHandle, FetchError> {
        self.delay().await;
        let classify = page.classify().unwrap_or_default();
        let content = self.page(classify, Some(date))?.clone();
        Ok(page.navigate(page.url(), content).with_date(date))
    }

    async fn raw_content(&self, page: &PageHandle) -> Result<String, FetchError> {
        Ok(page.content().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn navigates_to_dated_page() {
        let mock = MockFetcher::new("landing")
            .with_page("央视", None, "today")
            .with_page("央视", Some(date(20)), "tuesday");

        let page = mock.fetch_category_page("mock://guide").await.unwrap();
        assert_eq!(page.content(), "landing");

        let page = mock.select_category(page, "央视").await.unwrap();
        assert_eq!(page.content(), "today");
        assert_eq!(page.classify(), Some("央视"));

        let page = mock.set_date(page, date(20)).await.unwrap();
        assert_eq!(mock.raw_content(&page).await.unwrap(), "tuesday");
        assert_eq!(mock.fetch_count(), 1);
    }

    #[tokio::test]
    async fn unknown_category_and_date_are_errors() {
        let mock = MockFetcher::new("landing").with_page("央视", None, "today");
        let page = mock.fetch_category_page("mock://guide").await.unwrap();

        let result = mock.select_category(page.clone(), "北京").await;
        assert!(matches!(result, Err(FetchError::CategoryNotFound { .. })));

        let page = mock.select_category(page, "央视").await.unwrap();
        assert!(mock.set_date(page, date(21)).await.is_err());
    }

    #[tokio::test]
    async fn clones_share_fetch_count() {
        let mock = MockFetcher::new("landing");
        let clone = mock.clone();
        clone.fetch_category_page("mock://guide").await.unwrap();
        assert_eq!(mock.fetch_count(), 1);
    }

    #[tokio::test]
    async fn load_from_dir() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "landing").unwrap();
        std::fs::write(dir.path().join("央视.html"), "today").unwrap();
        std::fs::write(dir.path().join("央视@2026-10-20.html"), "tuesday").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mock = MockFetcher::from_dir(dir.path()).unwrap();
        assert_eq!(mock.categories(), vec!["央视".to_string()]);

        let page = mock.fetch_category_page("mock://guide").await.unwrap();
        let page = mock.select_category(page, "央视").await.unwrap();
        let page = mock.set_date(page, date(20)).await.unwrap();
        assert_eq!(page.content(), "tuesday");
    }

    #[test]
    fn missing_index_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(MockFetcher::from_dir(dir.path()).is_err());
    }
}
