//! TV program guide crawler.
//!
//! Answers "what is on this station on this date?" from a local store,
//! crawling the guide site on a miss. Concurrent lookups for the same
//! station and date share one crawl, and whole-guide crawls fan out across
//! stations with per-station timeouts.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod crawl;
pub mod domain;
pub mod fanout;
pub mod lookup;
pub mod source;
pub mod stations;
pub mod store;

#[cfg(test)]
mod testing;
