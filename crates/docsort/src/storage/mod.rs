//! Moving classified documents into the sorted directory tree.

mod mover;

pub use mover::FileMover;

use std::path::{Path, PathBuf};

use crate::error::StorageError;

pub trait Mover: Send + Sync {
    /// Moves a document to the target path, resolving name collisions.
    /// Returns the path the document actually landed at.
    fn move_document(&self, source: &Path, target: &Path) -> Result<PathBuf, StorageError>;
}
