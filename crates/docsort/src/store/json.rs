use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::store::PersistenceStore;

/// File-backed store mapping each collection to `<dir>/<collection>.json`.
///
/// Writes go through a temp file in the same directory followed by a rename,
/// so a crash mid-save never leaves a half-written collection behind.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }
}

impl PersistenceStore for JsonFileStore {
    fn load(&self, collection: &str) -> Result<Vec<serde_json::Value>, StoreError> {
        let path = self.collection_path(collection);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::ReadFile { path, source: e }),
        };

        serde_json::from_str(&content).map_err(|e| StoreError::Json {
            collection: collection.to_string(),
            source: e,
        })
    }

    fn save(&self, collection: &str, records: Vec<serde_json::Value>) -> Result<(), StoreError> {
        let path = self.collection_path(collection);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::WriteFile {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(&records).map_err(|e| StoreError::Json {
            collection: collection.to_string(),
            source: e,
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| StoreError::WriteFile {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, &path).map_err(|e| StoreError::WriteFile { path, source: e })
    }
}
