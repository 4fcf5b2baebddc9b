//! Crawling every station for one date.
//!
//! [`FanOutCrawler`] issues one lookup per station, bounded by the number
//! of distinct categories, and collects results as they complete. A
//! station that fails or exceeds the per-task timeout contributes nothing
//! and never aborts the batch.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::domain::{ProgramEntry, Station};
use crate::lookup::{LookupError, LookupService};

/// Default bound on how long one station's lookup is awaited.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Per-station lookup used by the fan-out.
#[async_trait]
pub trait ProgramLookup: Send + Sync + 'static {
    /// Program table for a canonical station name. Unknown stations and
    /// out-of-window dates yield an empty list.
    async fn lookup(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<Vec<ProgramEntry>, LookupError>;
}

#[async_trait]
impl ProgramLookup for LookupService {
    async fn lookup(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<Vec<ProgramEntry>, LookupError> {
        Ok(LookupService::lookup(self, station, date)
            .await?
            .unwrap_or_default())
    }
}

/// Configuration for [`FanOutCrawler`].
#[derive(Debug, Clone)]
pub struct FanOutConfig {
    /// How long each station is awaited, counted from submission.
    pub task_timeout: Duration,
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }
}

impl FanOutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }
}

/// Why a station contributed no entries.
#[derive(Debug, thiserror::Error)]
enum StationFailure {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    #[error("crawl task failed: {0}")]
    Task(#[from] JoinError),

    #[error("worker pool closed")]
    Closed,
}

/// Crawls many stations for one date in parallel.
pub struct FanOutCrawler {
    lookup: Arc<dyn ProgramLookup>,
    config: FanOutConfig,
}

impl FanOutCrawler {
    pub fn new(lookup: Arc<dyn ProgramLookup>, config: FanOutConfig) -> Self {
        Self { lookup, config }
    }

    /// Crawl all `stations` for `date` and concatenate what succeeded.
    ///
    /// At most one lookup per distinct category runs at a time, counting
    /// lookups that were abandoned after timing out but are still running.
    /// Each station's timeout runs from submission, so a station queued
    /// behind a hung crawl times out rather than waiting for it. Results
    /// are gathered in completion order, so the order of the returned
    /// entries across stations is unspecified.
    pub async fn crawl_all_stations(
        &self,
        stations: &[Station],
        date: NaiveDate,
    ) -> Vec<ProgramEntry> {
        if stations.is_empty() {
            return Vec::new();
        }

        let workers = stations
            .iter()
            .map(|s| s.classify.as_str())
            .collect::<HashSet<_>>()
            .len()
            .max(1);
        let permits = Arc::new(Semaphore::new(workers));
        let started = Instant::now();

        info!(
            stations = stations.len(),
            workers,
            date = %date,
            "Crawling all stations"
        );

        // Dropping the set aborts any wrapper still queued or waiting
        let mut tasks = JoinSet::new();
        for station in stations {
            let name = station.name.clone();
            let lookup = self.lookup.clone();
            let permits = permits.clone();
            let timeout = self.config.task_timeout;
            let deadline = tokio::time::Instant::now() + timeout;
            tasks.spawn(async move {
                let result =
                    crawl_station(lookup, permits, name.clone(), date, deadline, timeout).await;
                (name, result)
            });
        }

        let mut entries = Vec::new();
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((station, Ok(rows))) => {
                    debug!(station = %station, entries = rows.len(), "Station crawled");
                    entries.extend(rows);
                }
                Ok((station, Err(e))) => {
                    warn!(station = %station, error = %e, "Station contributed no entries");
                    failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Station task did not complete");
                    failed += 1;
                }
            }
        }

        info!(
            stations = stations.len(),
            failed,
            entries = entries.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            date = %date,
            "Finished crawling all stations"
        );
        entries
    }
}

/// Run one station's lookup under a worker permit, giving up at `deadline`.
///
/// The lookup runs as its own task holding the permit, so giving up on it
/// neither cancels it nor frees its worker slot; a crawl other callers are
/// following must still land. A station still queued for a permit at the
/// deadline is never started.
async fn crawl_station(
    lookup: Arc<dyn ProgramLookup>,
    permits: Arc<Semaphore>,
    station: String,
    date: NaiveDate,
    deadline: tokio::time::Instant,
    timeout: Duration,
) -> Result<Vec<ProgramEntry>, StationFailure> {
    let permit = match tokio::time::timeout_at(deadline, permits.acquire_owned()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(_)) => return Err(StationFailure::Closed),
        Err(_) => return Err(StationFailure::TimedOut(timeout)),
    };

    let crawl = tokio::spawn(async move {
        let _permit = permit;
        lookup.lookup(&station, date).await
    });
    match tokio::time::timeout_at(deadline, crawl).await {
        Ok(joined) => Ok(joined??),
        Err(_) => Err(StationFailure::TimedOut(timeout)),
    }
}
