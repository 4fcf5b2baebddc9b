//! JSON snapshot store on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{ProgramEntry, Station};

use super::Store;
use super::error::StoreError;
use super::memory::Tables;

/// Store that keeps its tables in memory and writes a full JSON snapshot on
/// every successful save.
///
/// Each save is applied to a copy of the tables, written to a sibling temp
/// file, synced and renamed over the snapshot. Only then does the in-memory
/// copy change, so a failed write leaves both disk and memory as they were.
/// A save that returns `Ok` survives a crash or power loss.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    tables: Mutex<Tables>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading an existing snapshot if present.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tables = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let mut tables: Tables = serde_json::from_str(&contents)?;
                tables.reindex();
                tables
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Tables::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            tables: Mutex::new(tables),
        })
    }

    /// Get the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Directory holding the snapshot.
    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Write `tables` to disk. Creates parent directories if needed.
    async fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        let parent = self.parent_dir();
        if !parent.exists() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(tables)?;
        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        // Make the rename itself durable
        #[cfg(unix)]
        tokio::fs::File::open(parent).await?.sync_all().await?;

        debug!(path = %self.path.display(), "Store snapshot written");
        Ok(())
    }

    /// Apply `change` to a copy of the tables, persist it, then swap it in.
    async fn commit<F>(&self, change: F) -> Result<usize, StoreError>
    where
        F: FnOnce(&mut Tables) -> Result<usize, StoreError> + Send,
    {
        let mut guard = self.tables.lock().await;
        let mut staged = guard.clone();
        let inserted = change(&mut staged)?;
        if inserted > 0 {
            self.persist(&staged).await?;
            *guard = staged;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn station_by_name(&self, name: &str) -> Result<Option<Station>, StoreError> {
        Ok(self.tables.lock().await.station_by_name(name))
    }

    async fn all_stations(&self) -> Result<Vec<Station>, StoreError> {
        Ok(self.tables.lock().await.all_stations())
    }

    async fn save_stations(&self, stations: &[Station]) -> Result<usize, StoreError> {
        self.commit(|tables| tables.insert_stations(stations)).await
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
        self.commit(|tables| tables.insert_programs(entries)).await
    }
}
