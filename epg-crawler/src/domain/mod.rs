//! Domain types for the program guide crawler.
//!
//! Stations, program entries, crawl keys and the crawlable date window.
//! Parsing helpers enforce the guide's date formats at the edge, so code
//! receiving these types can trust their validity.

mod crawl_key;
mod error;
mod program;
mod station;
mod window;

pub use crawl_key::CrawlKey;
pub use error::DomainError;
pub use program::{AIR_TIME_FORMAT, ProgramEntry, parse_air_time};
pub use station::Station;
pub use window::{DATE_FORMAT, DateWindow, WindowAnchor, parse_date};
