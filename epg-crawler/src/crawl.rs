//! Crawling the guide site into the store.
//!
//! [`ProgramCrawler`] holds the crawl body the single-flight coordinator
//! runs for a `(station, date)` key: navigate to the station's category and
//! date, parse the page, persist it, and read the persisted rows back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::domain::{ProgramEntry, Station};
use crate::source::{FetchError, PageFetcher, ParseError, Parser};
use crate::stations::StationCache;
use crate::store::{Store, StoreError};

/// Error from a crawl.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Navigating the guide site failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The page content could not be parsed
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Persisting the crawled data failed
    #[error("persist failed: {0}")]
    Store(#[from] StoreError),
}

/// Drives a [`PageFetcher`] and [`Parser`] and persists what they produce.
pub struct ProgramCrawler {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn Parser>,
    store: Arc<dyn Store>,
    stations: StationCache,
    clock: Arc<dyn Clock>,
    base_url: String,
    archive_dir: Option<PathBuf>,
}

impl ProgramCrawler {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        parser: Arc<dyn Parser>,
        stations: StationCache,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            store,
            stations,
            clock,
            base_url: base_url.into(),
            archive_dir: None,
        }
    }

    /// Keep a copy of every crawled category page under `dir`, as
    /// `{dir}/{date}/{category}.html`.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn stations(&self) -> &StationCache {
        &self.stations
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Seed the station list from the landing page.
    ///
    /// Returns the number of stations not previously known.
    pub async fn crawl_stations(&self) -> Result<usize, CrawlError> {
        let page = self.fetcher.fetch_category_page(&self.base_url).await?;
        let text = self.fetcher.raw_content(&page).await?;
        let stations = self.parser.parse_stations(&text)?;
        let inserted = self.stations.save(&stations).await?;

        info!(
            found = stations.len(),
            inserted,
            "Station list crawled"
        );
        Ok(inserted)
    }

    /// Crawl and persist the program table for `station` on `date`.
    ///
    /// Every entry on the category page is persisted, not just the requested
    /// station's, so later lookups for sibling stations hit the store. Rows
    /// already stored are skipped. Returns what the store holds for
    /// `(station, date)` afterwards, which is what concurrent followers will
    /// also read.
    pub async fn crawl_program_table(
        &self,
        station: &Station,
        date: NaiveDate,
    ) -> Result<Vec<ProgramEntry>, CrawlError> {
        // A previous flight may have landed between the caller's check and ours
        if self.store.program_table_exists(&station.name, date).await? {
            debug!(station = %station.name, date = %date, "Program table already stored");
            return Ok(self.store.program_table(&station.name, date).await?);
        }

        info!(station = %station.name, classify = %station.classify, date = %date, "Crawling program table");
        let page = self.fetcher.fetch_category_page(&self.base_url).await?;
        let mut page = self.fetcher.select_category(page, &station.classify).await?;
        // The site shows today's schedule unless told otherwise
        if date != self.clock.today() {
            page = self.fetcher.set_date(page, date).await?;
        }
        let text = self.fetcher.raw_content(&page).await?;
        if let Some(dir) = &self.archive_dir {
            archive_page(dir, &station.classify, date, &text).await;
        }

        let discovered = self.parser.parse_stations(&text)?;
        if !discovered.is_empty() {
            self.stations.save(&discovered).await?;
        }

        let entries = self.parser.parse_program_entries(&text)?;
        let inserted = self.store.save_program_entries(&entries).await?;
        let rows = self.store.program_table(&station.name, date).await?;

        info!(
            station = %station.name,
            date = %date,
            parsed = entries.len(),
            inserted,
            rows = rows.len(),
            "Program table crawled"
        );
        Ok(rows)
    }
}

/// Path of the archived page for `classify` on `date`.
fn archive_path(dir: &Path, classify: &str, date: NaiveDate) -> PathBuf {
    let file = classify.replace(['/', '\\'], "_");
    dir.join(date.to_string()).join(format!("{file}.html"))
}

/// Write a raw page to the archive. Failures are logged, never fatal.
async fn archive_page(dir: &Path, classify: &str, date: NaiveDate, text: &str) {
    let path = archive_path(dir, classify, date);
    let written = async {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, text).await
    };
    match written.await {
        Ok(()) => debug!(path = %path.display(), "Archived page"),
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to archive page"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::source::{HtmlParser, MockFetcher};
    use crate::store::MemoryStore;
    use crate::testing::{day, guide_page, landing_page, week_start};

    async fn crawler_with(fetcher: MockFetcher, stations: &[Station]) -> (ProgramCrawler, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.save_stations(stations).await.unwrap();
        let cache = StationCache::load(store.clone()).await.unwrap();
        let crawler = ProgramCrawler::new(
            Arc::new(fetcher),
            Arc::new(HtmlParser::with_defaults().unwrap()),
            cache,
            store.clone(),
            Arc::new(FixedClock(week_start())),
            "mock://guide",
        );
        (crawler, store)
    }

    fn cctv() -> Vec<Station> {
        vec![Station::new("CCTV-1", "央视"), Station::new("CCTV-2", "央视")]
    }

    #[tokio::test]
    async fn persists_whole_category_page() {
        let fetcher = MockFetcher::new(landing_page(&["央视"]))
            .with_page("央视", Some(day(1)), guide_page("央视", day(1), &["CCTV-1", "CCTV-2"]));
        let (crawler, store) = crawler_with(fetcher.clone(), &cctv()).await;

        let station = crawler.stations().get_by_name("CCTV-1").await.unwrap();
        let rows = crawler.crawl_program_table(&station, day(1)).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.station_name == "CCTV-1"));
        assert!(rows.iter().all(|r| r.station_id == Some(station.id)));
        // Sibling station on the same page was stored too
        assert_eq!(store.program_table("CCTV-2", day(1)).await.unwrap().len(), 3);
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn second_crawl_changes_nothing() {
        let fetcher = MockFetcher::new(landing_page(&["央视"]))
            .with_page("央视", Some(day(1)), guide_page("央视", day(1), &["CCTV-1"]));
        let (crawler, store) = crawler_with(fetcher.clone(), &cctv()).await;
        let station = crawler.stations().get_by_name("CCTV-1").await.unwrap();

        let first = crawler.crawl_program_table(&station, day(1)).await.unwrap();
        let count = store.program_count().await;
        let second = crawler.crawl_program_table(&station, day(1)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.program_count().await, count);
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn today_skips_date_navigation() {
        // Only the undated page exists, so a set_date call would fail
        let fetcher = MockFetcher::new(landing_page(&["央视"]))
            .with_page("央视", None, guide_page("央视", week_start(), &["CCTV-1"]));
        let (crawler, _) = crawler_with(fetcher, &cctv()).await;
        let station = crawler.stations().get_by_name("CCTV-1").await.unwrap();

        let rows = crawler.crawl_program_table(&station, week_start()).await.unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn discovered_stations_are_saved() {
        let fetcher = MockFetcher::new(landing_page(&["央视"])).with_page(
            "央视",
            Some(day(2)),
            guide_page("央视", day(2), &["CCTV-1", "CCTV-13"]),
        );
        let (crawler, store) = crawler_with(fetcher, &cctv()).await;
        let station = crawler.stations().get_by_name("CCTV-1").await.unwrap();

        crawler.crawl_program_table(&station, day(2)).await.unwrap();

        assert!(crawler.stations().exists_by_name("CCTV-13").await);
        assert!(store.station_by_name("CCTV-13").await.unwrap().is_some());
        assert_eq!(store.program_table("CCTV-13", day(2)).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn navigation_failure_is_a_crawl_error() {
        let fetcher = MockFetcher::new(landing_page(&["央视"])).with_page("央视", None, "");
        let (crawler, store) = crawler_with(fetcher, &cctv()).await;
        let station = crawler.stations().get_by_name("CCTV-1").await.unwrap();

        let result = crawler.crawl_program_table(&station, day(3)).await;
        assert!(matches!(result, Err(CrawlError::Fetch(_))));
        assert_eq!(store.program_count().await, 0);
    }

    #[tokio::test]
    async fn archives_crawled_pages_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let page = guide_page("央视", day(1), &["CCTV-1"]);
        let fetcher = MockFetcher::new(landing_page(&["央视"])).with_page("央视", Some(day(1)), page.clone());
        let (crawler, _) = crawler_with(fetcher, &cctv()).await;
        let crawler = crawler.with_archive_dir(dir.path());
        let station = crawler.stations().get_by_name("CCTV-1").await.unwrap();

        crawler.crawl_program_table(&station, day(1)).await.unwrap();

        let archived = dir.path().join(day(1).to_string()).join("央视.html");
        assert_eq!(std::fs::read_to_string(archived).unwrap(), page);
    }

    #[tokio::test]
    async fn archive_failure_does_not_fail_crawl() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the date directory should go
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let fetcher = MockFetcher::new(landing_page(&["央视"]))
            .with_page("央视", Some(day(1)), guide_page("央视", day(1), &["CCTV-1"]));
        let (crawler, store) = crawler_with(fetcher, &cctv()).await;
        let crawler = crawler.with_archive_dir(&blocker);
        let station = crawler.stations().get_by_name("CCTV-1").await.unwrap();

        let rows = crawler.crawl_program_table(&station, day(1)).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(store.program_count().await, 3);
    }

    #[test]
    fn archive_path_escapes_separators() {
        let path = archive_path(Path::new("/srv/epg"), "a/b", day(1));
        assert_eq!(path, Path::new("/srv/epg").join(day(1).to_string()).join("a_b.html"));
    }

    #[tokio::test]
    async fn seeds_stations_from_landing_page() {
        let landing = guide_page("央视", week_start(), &["CCTV-1", "CCTV-2", "CCTV-5"]);
        let fetcher = MockFetcher::new(landing);
        let (crawler, store) = crawler_with(fetcher, &[Station::new("CCTV-1", "央视")]).await;

        assert_eq!(crawler.crawl_stations().await.unwrap(), 2);
        assert_eq!(store.all_stations().await.unwrap().len(), 3);
        assert_eq!(crawler.stations().len().await, 3);
        assert_eq!(crawler.crawl_stations().await.unwrap(), 0);
    }
}
