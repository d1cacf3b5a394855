//! Storage-agnostic persistence for operations, templates and rules.
//!
//! Collections are whole-array load/save of JSON records keyed by each
//! record's stable `id`. Built-in template/rule ids are filtered out by the
//! callers before saving so defaults can be re-seeded on every startup.

mod json;

pub use json::JsonFileStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;

/// Collection name for persisted batch operations.
pub const OPERATIONS: &str = "batch_operations";
/// Collection name for user-defined document templates.
pub const TEMPLATES: &str = "document_templates";
/// Collection name for user-defined workflow rules.
pub const RULES: &str = "workflow_rules";

pub trait PersistenceStore: Send + Sync {
    /// Loads all records of a collection. A collection that was never
    /// written loads as an empty vector.
    fn load(&self, collection: &str) -> Result<Vec<serde_json::Value>, StoreError>;

    /// Replaces a collection with the given records.
    fn save(&self, collection: &str, records: Vec<serde_json::Value>) -> Result<(), StoreError>;
}

/// Typed load with the startup degradation policy: corrupt or unreadable
/// state is logged and treated as empty rather than aborting.
pub fn load_records<T: DeserializeOwned>(store: &dyn PersistenceStore, collection: &str) -> Vec<T> {
    let values = match store.load(collection) {
        Ok(values) => values,
        Err(e) => {
            tracing::error!(collection, error = %e, "Failed to load persisted state, starting empty");
            return Vec::new();
        }
    };

    let mut records = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(collection, error = %e, "Skipping malformed persisted record");
            }
        }
    }
    records
}

/// Typed save through the `serde_json::Value` store interface.
pub fn save_records<T: Serialize>(
    store: &dyn PersistenceStore,
    collection: &str,
    records: &[T],
) -> Result<(), StoreError> {
    let values = records
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Json {
            collection: collection.to_string(),
            source: e,
        })?;

    store.save(collection, values)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory store for unit tests.
    #[derive(Default)]
    pub struct MemoryStore {
        collections: Mutex<HashMap<String, Vec<serde_json::Value>>>,
    }

    impl PersistenceStore for MemoryStore {
        fn load(&self, collection: &str) -> Result<Vec<serde_json::Value>, StoreError> {
            Ok(self
                .collections
                .lock()
                .unwrap()
                .get(collection)
                .cloned()
                .unwrap_or_default())
        }

        fn save(
            &self,
            collection: &str,
            records: Vec<serde_json::Value>,
        ) -> Result<(), StoreError> {
            self.collections
                .lock()
                .unwrap()
                .insert(collection.to_string(), records);
            Ok(())
        }
    }
}
