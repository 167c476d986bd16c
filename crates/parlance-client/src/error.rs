use parlance_store::StoreError;
use thiserror::Error;

/// Failure reported by a [`crate::PagedSource`].  The message list never
/// retries on its own; retry policy belongs to the source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("History store error: {0}")]
    Store(String),

    #[error("History source unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl From<StoreError> for SourceError {
    fn from(e: StoreError) -> Self {
        SourceError::Store(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Unknown inbox: {0}")]
    UnknownInbox(String),
}
