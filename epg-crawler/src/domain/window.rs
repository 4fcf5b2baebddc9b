//! The rolling seven-day window of crawlable dates.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};

use super::error::DomainError;

/// Format of every date argument (`yyyy-MM-dd`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of days in a window.
const WINDOW_DAYS: i64 = 7;

/// How the window start is derived from today's date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowAnchor {
    /// The Monday-based calendar week containing today.
    #[default]
    Week,
    /// Today through six days out.
    Rolling,
}

impl FromStr for WindowAnchor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(WindowAnchor::Week),
            "rolling" => Ok(WindowAnchor::Rolling),
            _ => Err(DomainError::InvalidAnchor(s.to_string())),
        }
    }
}

impl fmt::Display for WindowAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowAnchor::Week => f.write_str("week"),
            WindowAnchor::Rolling => f.write_str("rolling"),
        }
    }
}

/// Inclusive range `[start, start + 6]` of dates the guide can be crawled for.
///
/// Windows are cheap and should be recomputed for every request rather than
/// cached, so a long-running process follows the calendar.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use epg_crawler::domain::{DateWindow, WindowAnchor};
///
/// // 2026-10-21 is a Wednesday
/// let today = NaiveDate::from_ymd_opt(2026, 10, 21).unwrap();
/// let window = DateWindow::anchored(today, WindowAnchor::Week);
/// assert_eq!(window.start(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
/// assert_eq!(window.end(), NaiveDate::from_ymd_opt(2026, 10, 25).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
}

impl DateWindow {
    /// Window starting on `start`.
    pub fn starting(start: NaiveDate) -> Self {
        Self::starting(start)
    }

    /// Window for `today` under the given anchoring rule.
    pub fn anchored(today: NaiveDate, anchor: WindowAnchor) -> Self {
        let start = match anchor {
            WindowAnchor::Week => {
                today - Duration::days(today.weekday().num_days_from_monday() as i64)
            }
            WindowAnchor::Rolling => today,
        };
        Self::starting(start)
    }

    /// First day of the window.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the window (inclusive).
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(WINDOW_DAYS - 1)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end()
    }
}

/// Parse a `yyyy-MM-dd` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| DomainError::InvalidDate(s.to_string()))
}
