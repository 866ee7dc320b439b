use thiserror::Error;

pub type Result<T> = std::result::Result<T, LibraryError>;

/// Error taxonomy of the circulation core.
///
/// Only `Storage` is transient and eligible for retry by the orchestration
/// layer; every other class is a caller or state error and propagates
/// unchanged to the boundary.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Malformed or out-of-policy input. `field` names the offender so the
    /// boundary layer can attach it to the response.
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument { field: &'static str, reason: String },
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    /// A state invariant would be violated; retrying only makes sense once
    /// the conflicting condition changes.
    #[error("{0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("catalog seed error: {0}")]
    Seed(#[from] csv::Error),
}

impl LibraryError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Whether the caller may retry the failed operation as-is.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LibraryError {
    fn from(err: rocksdb::Error) -> Self {
        Self::Storage(Box::new(err))
    }
}
