//! Station metadata lookup.
//!
//! Stations are seeded by crawling the guide's landing page, persisted in
//! the store, and served from memory for the life of the process.

mod cache;

pub use cache::StationCache;
