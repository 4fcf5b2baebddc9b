//! Station metadata types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A TV station as listed on the guide source.
///
/// `name` is the canonical identifier used for store lookups and as half of
/// a [`CrawlKey`](super::CrawlKey). `classify` is the source-site category
/// the station is listed under, needed to navigate to its schedule page.
///
/// # Examples
///
/// ```
/// use epg_crawler::domain::Station;
///
/// let station = Station::new("CCTV-1", "央视");
/// assert_eq!(station.display_name, "CCTV-1");
/// assert_eq!(station.id, 0);
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Store-assigned id; `0` until the station has been saved.
    pub id: i64,

    /// Canonical station name.
    pub name: String,

    /// Name shown to viewers. Defaults to the canonical name.
    pub display_name: String,

    /// Source-site category.
    pub classify: String,
}

impl Station {
    /// Create an unsaved station whose display name equals its canonical name.
    pub fn new(name: impl Into<String>, classify: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: 0,
            display_name: name.clone(),
            name,
            classify: classify.into(),
        }
    }

    /// Set a display name distinct from the canonical name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

impl fmt::Debug for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Station({}#{} [{}])", self.name, self.id, self.classify)
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
