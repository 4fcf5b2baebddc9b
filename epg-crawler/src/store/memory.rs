//! In-memory store.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{ProgramEntry, Station};

use super::Store;
use super::error::StoreError;

/// Station and program tables shared by the store backends.
///
/// `program_keys` is the unique index on `(station_name, air_time)`. It is
/// rebuilt from `programs` after deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Tables {
    stations: Vec<Station>,
    programs: Vec<ProgramEntry>,
    #[serde(skip)]
    program_keys: HashSet<(String, NaiveDateTime)>,
}

impl Tables {
    /// Rebuild the unique index after loading.
    pub(crate) fn reindex(&mut self) {
        self.program_keys = self.programs.iter().map(ProgramEntry::natural_key).collect();
    }

    pub(crate) fn station_by_name(&self, name: &str) -> Option<Station> {
        self.stations.iter().find(|s| s.name == name).cloned()
    }

    pub(crate) fn all_stations(&self) -> Vec<Station> {
        self.stations.clone()
    }

    pub(crate) fn program_table_exists(&self, station: &str, date: NaiveDate) -> bool {
        self.programs
            .iter()
            .any(|p| p.station_name == station && p.air_date() == date)
    }

    pub(crate) fn program_table(&self, station: &str, date: NaiveDate) -> Vec<ProgramEntry> {
        let mut rows: Vec<ProgramEntry> = self
            .programs
            .iter()
            .filter(|p| p.station_name == station && p.air_date() == date)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.air_time);
        rows
    }

    /// Insert new stations. Rejects the whole batch if any row is invalid.
    pub(crate) fn insert_stations(&mut self, stations: &[Station]) -> Result<usize, StoreError> {
        if let Some(bad) = stations
            .iter()
            .find(|s| s.name.trim().is_empty() || s.classify.trim().is_empty())
        {
            return Err(StoreError::Constraint {
                message: format!("station {:?} needs a name and a category", bad.name),
            });
        }

        let mut next_id = self.stations.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let mut inserted = 0;
        for station in stations {
            if self.stations.iter().any(|s| s.name == station.name) {
                continue;
            }
            let mut row = station.clone();
            row.id = next_id;
            next_id += 1;
            self.stations.push(row);
            inserted += 1;
        }
        Ok(inserted)
    }

    /// Insert new program entries. Rejects the whole batch if any row is invalid.
    ///
    /// Rows are filtered against the unique index first, then inserted
    /// through it; a row the index refuses at insert time is a duplicate
    /// that slipped past the check and is dropped as a no-op.
    pub(crate) fn insert_programs(&mut self, entries: &[ProgramEntry]) -> Result<usize, StoreError> {
        if let Some(bad) = entries.iter().find(|e| e.program_name.trim().is_empty()) {
            return Err(StoreError::Constraint {
                message: format!(
                    "program at {} on {:?} has no name",
                    bad.air_time, bad.station_name
                ),
            });
        }

        let mut staged = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(station) = self.stations.iter().find(|s| s.name == entry.station_name) else {
                continue;
            };
            if self.program_keys.contains(&entry.natural_key()) {
                continue;
            }
            let mut row = entry.clone();
            row.station_id = Some(station.id);
            staged.push(row);
        }

        let mut inserted = 0;
        for row in staged {
            if !self.program_keys.insert(row.natural_key()) {
                debug!(
                    station = %row.station_name,
                    air_time = %row.air_time,
                    "Duplicate program row ignored"
                );
                continue;
            }
            self.programs.push(row);
            inserted += 1;
        }
        Ok(inserted)
    }

    pub(crate) fn program_count(&self) -> usize {
        self.programs.len()
    }
}

/// Store that keeps everything in process memory.
///
/// Useful for tests and one-shot runs; contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored program entries.
    pub async fn program_count(&self) -> usize {
        self.tables.lock().await.program_count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn station_by_name(&self, name: &str) -> Result<Option<Station>, StoreError> {
        Ok(self.tables.lock().await.station_by_name(name))
    }

    async fn all_stations(&self) -> Result<Vec<Station>, StoreError> {
        Ok(self.tables.lock().await.all_stations())
    }

    async fn save_stations(&self, stations: &[Station]) -> Result<usize, StoreError> {
        self.tables.lock().await.insert_stations(stations)
    }

    async fn program_table_exists(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.program_table_exists(station, date))
    }

    async fn program_table(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<Vec<ProgramEntry>, StoreError> {
        Ok(self.tables.lock().await.program_table(station, date))
    }

    async fn save_program_entries(&self, entries: &[ProgramEntry]) -> Result<usize, StoreError> {
        self.tables.lock().await.insert_programs(entries)
    }
}
