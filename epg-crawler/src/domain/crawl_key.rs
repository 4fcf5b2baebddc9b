//! Single-flight deduplication key.

use std::fmt;

use chrono::NaiveDate;

/// A `(station, date)` unit of crawl work.
///
/// Two lookups with equal keys are the same logical crawl. Keys only live
/// while a crawl is in flight and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrawlKey {
    station: String,
    date: NaiveDate,
}

impl CrawlKey {
    pub fn new(station: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            station: station.into(),
            date,
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl fmt::Display for CrawlKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.station, self.date.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(CrawlKey::new("CCTV-1", date(19)), CrawlKey::new("CCTV-1", date(19)));
        assert_ne!(CrawlKey::new("CCTV-1", date(19)), CrawlKey::new("CCTV-2", date(19)));
        assert_ne!(CrawlKey::new("CCTV-1", date(19)), CrawlKey::new("CCTV-1", date(20)));
    }

    #[test]
    fn display() {
        assert_eq!(CrawlKey::new("CCTV-1", date(19)).to_string(), "CCTV-1@2026-10-19");
    }

    #[test]
    fn hash_consistent_with_eq() {
        let mut set = HashSet::new();
        set.insert(CrawlKey::new("CCTV-1", date(19)));
        assert!(set.contains(&CrawlKey::new(String::from("CCTV-1"), date(19))));
        assert!(!set.contains(&CrawlKey::new("CCTV-1", date(20))));
    }
}
