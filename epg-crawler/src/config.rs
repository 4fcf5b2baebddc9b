//! Top-level configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::WindowAnchor;
use crate::fanout::{DEFAULT_TASK_TIMEOUT, FanOutConfig};
use crate::source::HttpFetcherConfig;

/// Default guide landing page.
pub const DEFAULT_BASE_URL: &str = "http://tv.cntv.cn/epg";

/// Default location of the store snapshot.
pub const DEFAULT_DATA_PATH: &str = "epg_store.json";

/// Configuration for the crawler and its collaborators.
#[derive(Debug, Clone)]
pub struct EpgConfig {
    /// Guide landing page listing the station categories
    pub base_url: String,
    /// Store snapshot file
    pub data_path: PathBuf,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// Per-station bound when crawling all stations
    pub task_timeout: Duration,
    /// How the crawlable week is anchored
    pub window_anchor: WindowAnchor,
    /// User-Agent override
    pub user_agent: Option<String>,
    /// Where to keep raw copies of crawled pages, if anywhere
    pub archive_dir: Option<PathBuf>,
}

impl EpgConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            request_timeout_secs: 30,
            task_timeout: DEFAULT_TASK_TIMEOUT,
            window_anchor: WindowAnchor::default(),
            user_agent: None,
            archive_dir: None,
        }
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_window_anchor(mut self, anchor: WindowAnchor) -> Self {
        self.window_anchor = anchor;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        let config = HttpFetcherConfig::new().with_timeout(self.request_timeout_secs);
        match &self.user_agent {
            Some(user_agent) => config.with_user_agent(user_agent.clone()),
            None => config,
        }
    }

    pub fn fanout_config(&self) -> FanOutConfig {
        FanOutConfig::new().with_task_timeout(self.task_timeout)
    }
}

impl Default for EpgConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
