//! Persistent storage for stations and program entries.
//!
//! The store is the system of record: the station cache and every crawl
//! outcome are read back from it. Implementations must make a `save_*`
//! call durable before returning, because returning is what releases
//! waiting followers in the single-flight coordinator.

mod error;
mod file;
mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{ProgramEntry, Station};

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Storage backend for the guide.
///
/// Both `save_*` methods skip rows that already exist and apply the rest as
/// one all-or-nothing batch, returning the number of rows inserted.
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a station by canonical name.
    async fn station_by_name(&self, name: &str) -> Result<Option<Station>, StoreError>;

    /// All stored stations, in id order.
    async fn all_stations(&self) -> Result<Vec<Station>, StoreError>;

    /// Insert stations whose names are not yet stored, assigning ids.
    async fn save_stations(&self, stations: &[Station]) -> Result<usize, StoreError>;

    /// Whether any entry airs on `date` for `station`.
    async fn program_table_exists(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<bool, StoreError>;

    /// Entries airing on `date` for `station`, ordered by air time.
    async fn program_table(
        &self,
        station: &str,
        date: NaiveDate,
    ) -> Result<Vec<ProgramEntry>, StoreError>;

    /// Insert entries not yet stored.
    ///
    /// Entries for stations the store does not know are skipped, since no
    /// station id can be attached to them.
    async fn save_program_entries(&self, entries: &[ProgramEntry]) -> Result<usize, StoreError>;
}
