use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field payload sent to or read from a remote table, keyed by remote field name.
pub type Fields = serde_json::Map<String, Value>;

/// Natural key -> store-generated record id, produced by one stage and read by later ones.
pub type IdMap = HashMap<String, String>;

/// A record as returned by the remote store. `id` is the store-generated identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

/// What to upsert for one item: the natural key to look up and the full field set to write.
#[derive(Debug, Clone)]
pub struct UpsertRequest {
    pub key_field: &'static str,
    pub key_value: String,
    pub fields: Fields,
}

impl UpsertRequest {
    pub fn new(key_field: &'static str, key_value: impl Into<String>, fields: Fields) -> Self {
        Self { key_field, key_value: key_value.into(), fields }
    }
}

/// Result of a batch upsert over one table.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub id_map: IdMap,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.id_map.len()
    }

    pub fn attempted(&self) -> usize {
        self.id_map.len() + self.failed
    }
}
