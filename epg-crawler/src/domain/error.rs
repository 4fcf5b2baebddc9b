//! Domain error types.
//!
//! These errors represent malformed input at the edge of the domain layer.
//! They are distinct from fetch, parse and store errors.

/// Domain-level validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Date argument is not `yyyy-MM-dd`
    #[error("invalid date: {0:?} (expected yyyy-MM-dd)")]
    InvalidDate(String),

    /// Air time is not `yyyy-MM-dd HH:mm`
    #[error("invalid air time: {0:?} (expected yyyy-MM-dd HH:mm)")]
    InvalidAirTime(String),

    /// Unknown date window anchoring rule
    #[error("invalid window anchor: {0:?} (expected week or rolling)")]
    InvalidAnchor(String),
}
