//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{ProgramEntry, Station};
use crate::store::{MemoryStore, Store, StoreError};

/// Monday 2026-10-19, the start of the test week.
pub fn week_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// `week_start()` plus `days`.
pub fn day(days: i64) -> NaiveDate {
    week_start() + chrono::Duration::days(days)
}

/// A guide page listing `stations` under `classify`, with three programs
/// per station on `date`.
pub fn guide_page(classify: &str, date: NaiveDate, stations: &[&str]) -> String {
    let mut html = String::from("<html><body><ul class=\"channels\">");
    for station in stations {
        html.push_str(&format!(
            "<li class=\"station\" data-classify=\"{classify}\">{station}</li>"
        ));
    }
    html.push_str("</ul><ul id=\"program_list\">");
    for station in stations {
        for (time, title) in [("06:00", "早间新闻"), ("12:00", "午间剧场"), ("19:00", "新闻联播")] {
            html.push_str(&format!(
                "<li class=\"program\" data-station=\"{station}\" data-airtime=\"{date} {time}\">{title}</li>"
            ));
        }
    }
    html.push_str("</ul></body></html>");
    html
}

/// Landing page with links for each category.
pub fn landing_page(classifies: &[&str]) -> String {
    let links: String = classifies
        .iter()
        .map(|c| format!("<li><a href=\"#\">{c}</a></li>"))
        .collect();
    format!("<html><body><ul class=\"weishi\">{links}</ul></body></html>")
}

/// Store wrapper counting every call, for asserting that no I/O happened.
///
/// Can also be told to fail every program write, as a full disk would.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    calls: AtomicUsize,
    fail_program_writes: AtomicBool,
}

impl CountingStore {
    pub async fn with_stations(stations: &[Station]) -> Arc<Self> {
        let store = Self::default();
        store.inner.save_stations(stations).await.unwrap();
        Arc::new(store)
    }

    pub fn fail_program_writes(&self) {
        self.fail_program_writes.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for CountingStore {
    async fn station_by_name(&self, name: &str) -> Result<Option<Station>, StoreError> {
        self.tick();
        self.inner.station_by_name(name).await
    }

    async fn all_stations(&self) -> Result<Vec<Station>, StoreError> {
        self.tick();
        self.inner.all_stations().await
    }

    async fn save_stations(&self, stations: &[Station]) -> Result<usize, StoreError> {
        self.tick();
        self.inner.save_stations(stations).await
    }

    async fn program_table_exists(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        self.tick();
        self.inner.program_table_exists(station, date).await
    }

    async fn program_table(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<Vec<ProgramEntry>, StoreError> {
        self.tick();
        self.inner.program_table(station, date).await
    }

    async fn save_program_entries(&self, entries: &[ProgramEntry]) -> Result<usize, StoreError> {
        self.tick();
        if self.fail_program_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save_program_entries(entries).await
    }
}
