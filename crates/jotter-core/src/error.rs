use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    /// Persisted data exists but does not have the expected shape.
    #[error("corrupt state: {0}")]
    CorruptState(String),

    /// A write to durable storage failed (quota exceeded, storage unavailable).
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn is_corrupt_state(&self) -> bool {
        matches!(self, Error::CorruptState(_))
    }
}
