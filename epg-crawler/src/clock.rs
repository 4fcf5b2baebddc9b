//! Source of "today" for date-window checks.

use chrono::{Local, NaiveDate};

/// Supplies the current local date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The system's local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock stuck on one date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
