//! Program table lookups.
//!
//! [`LookupService`] is the entry point callers use: it resolves the
//! station, checks the date against the crawlable window, answers from the
//! store when it can and otherwise drives a single-flight crawl.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info};

use crate::coordinator::{Flight, SingleFlight};
use crate::crawl::{CrawlError, ProgramCrawler};
use crate::domain::{CrawlKey, DateWindow, ProgramEntry, Station, WindowAnchor, parse_date};
use crate::store::StoreError;

/// Error from a lookup.
///
/// Unknown stations and dates outside the window are not errors; they
/// come back as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// This caller led the crawl and it failed
    #[error("crawl failed: {0}")]
    Crawl(#[from] CrawlError),

    #[error("store read failed: {0}")]
    Store(#[from] StoreError),
}

/// Resolves stations and serves program tables, crawling on a store miss.
#[derive(Clone)]
pub struct LookupService {
    crawler: Arc<ProgramCrawler>,
    flight: Arc<SingleFlight>,
    anchor: WindowAnchor,
}

impl LookupService {
    pub fn new(crawler: Arc<ProgramCrawler>, flight: Arc<SingleFlight>) -> Self {
        Self {
            crawler,
            flight,
            anchor: WindowAnchor::default(),
        }
    }

    pub fn with_anchor(mut self, anchor: WindowAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn crawler(&self) -> &Arc<ProgramCrawler> {
        &self.crawler
    }

    /// The crawlable window as of now.
    pub fn window(&self) -> DateWindow {
        DateWindow::anchored(self.crawler.clock().today(), self.anchor)
    }

    /// Program table for a station on a `yyyy-MM-dd` date.
    ///
    /// `station` is tried as a canonical name first, then as a display name
    /// within `classify`. Returns `Ok(None)` when the station is unknown,
    /// the date does not parse, or the date is outside the window; none of
    /// these touch the store or the network.
    ///
    /// On a store hit the stored rows are returned without coordination.
    /// On a miss, concurrent callers for the same station and date share a
    /// single crawl; the one that runs it gets its rows, the rest read the
    /// store once it has finished.
    pub async fn query_program_table(
        &self,
        station: &str,
        classify: Option<&str>,
        date: &str,
    ) -> Result<Option<Vec<ProgramEntry>>, LookupError> {
        let Some(resolved) = self.resolve(station, classify).await else {
            info!(station, ?classify, "Unknown station");
            return Ok(None);
        };
        let date = match parse_date(date) {
            Ok(date) => date,
            Err(e) => {
                info!(station, error = %e, "Rejected lookup date");
                return Ok(None);
            }
        };
        self.program_table(&resolved, date).await
    }

    /// Program table for a station by canonical name.
    pub async fn lookup(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<Option<Vec<ProgramEntry>>, LookupError> {
        let Some(resolved) = self.crawler.stations().get_by_name(station).await else {
            info!(station, "Unknown station");
            return Ok(None);
        };
        self.program_table(&resolved, date).await
    }

    async fn resolve(&self, name: &str, classify: Option<&str>) -> Option<Station> {
        let stations = self.crawler.stations();
        match stations.get_by_name(name).await {
            Some(station) => Some(station),
            None => stations.get_by_display_name(name, classify).await,
        }
    }

    async fn program_table(
        &self,
        station: &Station,
        date: NaiveDate,
    ) -> Result<Option<Vec<ProgramEntry>>, LookupError> {
        let window = self.window();
        if !window.contains(date) {
            info!(
                station = %station.name,
                date = %date,
                window_start = %window.start(),
                window_end = %window.end(),
                "Date outside crawlable window"
            );
            return Ok(None);
        }

        let store = self.crawler.store();
        if store.program_table_exists(&station.name, date).await? {
            debug!(station = %station.name, date = %date, "Program table served from store");
            return Ok(Some(store.program_table(&station.name, date).await?));
        }

        let key = CrawlKey::new(station.name.clone(), date);
        let flight = self
            .flight
            .run(key.clone(), || self.crawler.crawl_program_table(station, date))
            .await;

        match flight {
            Ok(Flight::Led(rows)) => Ok(Some(rows)),
            Ok(Flight::Joined) => Ok(Some(store.program_table(&station.name, date).await?)),
            Err(e) => {
                error!(key = %key, error = %e, "Crawl failed");
                Err(e.into())
            }
        }
    }
}
