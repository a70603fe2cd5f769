pub mod airtable;

pub use airtable::*;

use async_trait::async_trait;

use crate::models::{Fields, Result, StoreRecord};

/// Minimal contract the sync engine needs from a remote tabular store.
///
/// Implementations do not retry at this level's granularity and do not log
/// failures; errors propagate to the caller unchanged.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Equality lookup on `field`. Returns the first match when several exist.
    async fn find_by_field(&self, table: &str, field: &str, value: &str) -> Result<Option<StoreRecord>>;

    async fn create(&self, table: &str, fields: &Fields) -> Result<StoreRecord>;

    async fn update(&self, table: &str, id: &str, fields: &Fields) -> Result<StoreRecord>;
}

#[async_trait]
impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    async fn find_by_field(&self, table: &str, field: &str, value: &str) -> Result<Option<StoreRecord>> {
        (**self).find_by_field(table, field, value).await
    }

    async fn create(&self, table: &str, fields: &Fields) -> Result<StoreRecord> {
        (**self).create(table, fields).await
    }

    async fn update(&self, table: &str, id: &str, fields: &Fields) -> Result<StoreRecord> {
        (**self).update(table, id, fields).await
    }
}
