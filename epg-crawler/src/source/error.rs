//! Page fetching and parsing error types.

use crate::domain::DomainError;

/// Errors that can occur while fetching or navigating guide pages.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Guide site returned an error status
    #[error("guide site error {status}: {message}")]
    Api { status: u16, message: String },

    /// A page or link URL could not be resolved
    #[error("invalid URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The page has no link for the requested category
    #[error("category {classify:?} not found on page")]
    CategoryNotFound { classify: String },

    /// A configured CSS selector does not compile
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    /// Mock fetcher has no page for the request
    #[error("mock fetcher: {message}")]
    Mock { message: String },
}

/// Errors that can occur while extracting data from page content.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A configured CSS selector does not compile
    #[error("invalid selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    /// An element is missing a required attribute
    #[error("{element} element is missing attribute {attribute}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// A field value is malformed
    #[error(transparent)]
    Field(#[from] DomainError),
}
