use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StorageError;

use super::Mover;

/// Moves a file from `src` to `dst`. Uses `rename` first (fast, atomic on
/// same filesystem) and falls back to copy + delete for cross-device moves.
fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    std::fs::copy(src, dst).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Local-filesystem mover with `_2`, `_3`, … collision suffixes.
pub struct FileMover;

impl FileMover {
    pub fn new() -> Self {
        Self
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Reserves an available name in the target directory. Suffixes go
    /// before the extension: `doc.pdf`, `doc_2.pdf`, `doc_3.pdf`.
    ///
    /// Each candidate is claimed with `create_new` (O_CREAT | O_EXCL), so
    /// two movers racing for the same name can never both win it; the
    /// loser moves on to the next suffix. The placeholder is replaced by
    /// the actual move, or cleaned up if the move fails.
    fn claim_target(&self, source: &Path, target: &Path) -> Result<PathBuf, StorageError> {
        let directory = target.parent().unwrap_or_else(|| Path::new(""));
        let filename = target
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dokument");
        let (base, ext) = match filename.rfind('.') {
            Some(dot_pos) => (&filename[..dot_pos], Some(&filename[dot_pos..])),
            None => (filename, None),
        };

        for counter in 1..=1000 {
            let candidate = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };
            let candidate_path = directory.join(&candidate);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate_path)
            {
                Ok(_) => return Ok(candidate_path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::MoveFile {
                        from: source.to_path_buf(),
                        to: candidate_path,
                        source: e,
                    })
                }
            }
        }

        Err(StorageError::FileExists(target.to_path_buf()))
    }
}

impl Default for FileMover {
    fn default() -> Self {
        Self::new()
    }
}

impl Mover for FileMover {
    fn move_document(&self, source: &Path, target: &Path) -> Result<PathBuf, StorageError> {
        if !source.exists() {
            return Err(StorageError::SourceMissing(source.to_path_buf()));
        }

        if let Some(parent) = target.parent() {
            self.ensure_directory(parent)?;
        }

        let final_target = self.claim_target(source, target)?;
        if let Err(e) = move_file(source, &final_target) {
            let _ = std::fs::remove_file(&final_target);
            return Err(e);
        }
        debug!(target = %final_target.display(), "document moved");
        Ok(final_target)
    }
}
