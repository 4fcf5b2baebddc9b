//! Store error types.

/// Errors that can occur when reading or writing the program store.
///
/// A failed write never leaves part of its batch behind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file contents could not be (de)serialized
    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A row violated a table constraint; the whole batch was rejected
    #[error("constraint violation: {message}")]
    Constraint { message: String },
}
