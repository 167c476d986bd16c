use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No home directory to derive the default database location from.
    #[error("No platform data directory available for the history database")]
    NoDataDir,

    #[error("No such record")]
    NotFound,

    #[error("Schema migration failed: {0}")]
    Migration(String),

    /// A pagination cursor names a message that is not in the inbox.
    #[error("Cursor {0} is not a message of this inbox")]
    UnknownCursor(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
