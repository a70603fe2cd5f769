use futures::future::join_all;

use crate::clients::RecordStore;
use crate::models::*;

/// Find-or-create one record by natural key.
///
/// Lookup always precedes the write, so repeated calls with the same key converge
/// on a single remote record. Store errors propagate unchanged.
pub async fn upsert<S>(store: &S, table: &str, request: &UpsertRequest) -> Result<StoreRecord>
where
    S: RecordStore + ?Sized,
{
    match store
        .find_by_field(table, request.key_field, &request.key_value)
        .await?
    {
        Some(existing) => store.update(table, &existing.id, &request.fields).await,
        None => store.create(table, &request.fields).await,
    }
}

/// Upsert every item in windows of `chunk_size`.
///
/// Chunks run one after another; the items of a chunk run concurrently and the whole
/// chunk settles before the next starts. A failing item is logged and counted, never
/// fatal, so `id_map.len() + failed == items.len()` whenever `id_of` is unique per item.
pub async fn batch_upsert<S, T, M, K>(
    store: &S,
    table: &str,
    items: &[T],
    chunk_size: usize,
    mapper: M,
    id_of: K,
) -> BatchOutcome
where
    S: RecordStore + ?Sized,
    M: Fn(&T) -> UpsertRequest,
    K: Fn(&T) -> String,
{
    let mut outcome = BatchOutcome::default();
    let mapper = &mapper;
    let id_of = &id_of;

    for chunk in items.chunks(chunk_size.max(1)) {
        let settled = join_all(chunk.iter().map(|item| async move {
            let request = mapper(item);
            (id_of(item), upsert(store, table, &request).await)
        }))
        .await;

        for (item_id, result) in settled {
            match result {
                Ok(record) => {
                    outcome.id_map.insert(item_id, record.id);
                }
                Err(e) => {
                    tracing::warn!(table = %table, key = %item_id, error = %e, "Failed to upsert record");
                    outcome.failed += 1;
                }
            }
        }
    }

    outcome
}
