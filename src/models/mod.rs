pub mod de;
pub mod record;
pub mod snapshot;
pub mod summary;

pub use record::*;
pub use snapshot::*;
pub use summary::*;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Snapshot unavailable: {0}")]
    SnapshotUnavailable(String),

    #[error("Snapshot malformed: {0}")]
    SnapshotMalformed(String),

    #[error("Airtable find error in {table}: {message}")]
    Lookup { table: String, message: String },

    #[error("Airtable write error in {table}: {message}")]
    Mutation { table: String, message: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Table setup error: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
