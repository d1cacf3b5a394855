//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Scanned documents frequently carry personal data in their directory
//! names; span fields only ever see the final path component.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
