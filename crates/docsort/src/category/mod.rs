//! Category discovery from the sorted directory tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// German default categories used while the sorted directory is empty.
const FALLBACK_CATEGORIES: &[&str] = &[
    "Steuern",
    "Versicherungen",
    "Verträge",
    "Banken",
    "Medizin",
    "Behörden",
    "Sonstiges",
];

/// Maximum subdirectories rendered per category in the model context.
const MAX_SUBDIRS_SHOWN: usize = 5;

/// Supplies the valid category list and a rendering of the category tree
/// for classifier prompts.
pub trait CategoryProvider: Send + Sync {
    fn categories(&self) -> Vec<String>;
    fn category_context(&self) -> String;
}

/// Derives categories from the first-level directories of the sorted
/// root, minus a blacklist.
pub struct DirectoryCategories {
    sorted_dir: PathBuf,
    blacklist: Vec<String>,
}

impl DirectoryCategories {
    pub fn new<P: AsRef<Path>>(sorted_dir: P, blacklist: Vec<String>) -> Self {
        Self {
            sorted_dir: sorted_dir.as_ref().to_path_buf(),
            blacklist,
        }
    }

    fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.iter().any(|b| b == name)
    }

    /// First-level directory names below `path`, blacklist applied,
    /// sorted by name. Unreadable directories read as empty.
    fn list_dirs(&self, path: &Path) -> Vec<String> {
        let mut names: Vec<String> = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_dir())
            .filter_map(|entry| entry.file_name().to_str().map(|s| s.to_string()))
            .filter(|name| !self.is_blacklisted(name))
            .collect();
        names.sort();
        names
    }
}

impl CategoryProvider for DirectoryCategories {
    fn categories(&self) -> Vec<String> {
        let categories = self.list_dirs(&self.sorted_dir);
        if categories.is_empty() {
            debug!(dir = %self.sorted_dir.display(), "no category directories, using defaults");
            return FALLBACK_CATEGORIES.iter().map(|s| s.to_string()).collect();
        }
        categories
    }

    /// Two-level tree rendering for the classifier prompt. Each category
    /// shows at most five subdirectories plus an overflow line.
    fn category_context(&self) -> String {
        let categories = self.list_dirs(&self.sorted_dir);
        if categories.is_empty() {
            return format!("Verfügbare Kategorien: {}", self.categories().join(", "));
        }

        let mut tree: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for category in categories {
            let subdirs = self.list_dirs(&self.sorted_dir.join(&category));
            tree.insert(category, subdirs);
        }

        let mut lines = Vec::new();
        for (category, subdirs) in &tree {
            lines.push(format!("📁 {category}"));
            for subdir in subdirs.iter().take(MAX_SUBDIRS_SHOWN) {
                lines.push(format!("   └── {subdir}"));
            }
            if subdirs.len() > MAX_SUBDIRS_SHOWN {
                lines.push(format!(
                    "   └── ... ({} weitere)",
                    subdirs.len() - MAX_SUBDIRS_SHOWN
                ));
            }
        }
        lines.join("\n")
    }
}
