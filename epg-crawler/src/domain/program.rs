//! Program guide entries.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Format of air times on the guide source (`yyyy-MM-dd HH:mm`).
pub const AIR_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One scheduled broadcast.
///
/// `(station_name, air_time)` is the natural key: the store never holds two
/// entries with the same pair, and entries are never updated once saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntry {
    /// Store id of the station. `None` until the entry has been persisted.
    pub station_id: Option<i64>,

    /// Canonical station name.
    pub station_name: String,

    /// Program title.
    pub program_name: String,

    /// Local start time of the broadcast.
    pub air_time: NaiveDateTime,

    /// ISO weekday of the air date (Monday = 1 .. Sunday = 7).
    pub weekday: u8,
}

impl ProgramEntry {
    /// Create an unpersisted entry. The weekday is derived from `air_time`.
    pub fn new(
        station_name: impl Into<String>,
        program_name: impl Into<String>,
        air_time: NaiveDateTime,
    ) -> Self {
        Self {
            station_id: None,
            station_name: station_name.into(),
            program_name: program_name.into(),
            weekday: air_time.weekday().number_from_monday() as u8,
            air_time,
        }
    }

    /// Calendar date the program airs on.
    pub fn air_date(&self) -> NaiveDate {
        self.air_time.date()
    }

    /// The natural uniqueness key of this entry.
    pub fn natural_key(&self) -> (String, NaiveDateTime) {
        (self.station_name.clone(), self.air_time)
    }
}

/// Parse an air time in the source's `yyyy-MM-dd HH:mm` format.
pub fn parse_air_time(s: &str) -> Result<NaiveDateTime, DomainError> {
    NaiveDateTime::parse_from_str(s.trim(), AIR_TIME_FORMAT)
        .map_err(|_| DomainError::InvalidAirTime(s.to_string()))
}
