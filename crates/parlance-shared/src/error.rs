use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid message hash: {0:?}")]
    InvalidHash(String),

    #[error("Invalid origin flag: {0:?} (expected \"local\" or \"remote\")")]
    InvalidOrigin(String),
}
