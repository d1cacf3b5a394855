//! Runtime configuration, loaded from a JSON file with serde defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_endpoint() -> String {
    "http://localhost:1234/v1/chat/completions".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_model() -> String {
    "deepseek-r1-distill-qwen-7b".to_string()
}

fn default_max_pages() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the sorted category tree documents are moved into.
    pub sorted_dir: PathBuf,
    /// Directory for persisted operations, templates and rules.
    pub state_dir: PathBuf,
    /// Worker threads for batch processing.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// First-level directories excluded from category discovery.
    #[serde(default)]
    pub blacklist_dirs: Vec<String>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sorted_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: "sorted_dir must not be empty".to_string(),
            });
        }
        if self.state_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation {
                message: "state_dir must not be empty".to_string(),
            });
        }
        if self.worker_count == 0 {
            return Err(ConfigError::Validation {
                message: "worker_count must be at least 1".to_string(),
            });
        }
        if self.extraction.max_pages == 0 {
            return Err(ConfigError::Validation {
                message: "extraction.max_pages must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"sorted_dir": "/data/sorted", "state_dir": "/data/state"}"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.worker_count, num_cpus::get());
        assert_eq!(config.classifier.timeout_secs, 5);
        assert_eq!(config.extraction.max_pages, 3);
        assert!(config.blacklist_dirs.is_empty());
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "sorted_dir": "/data/sorted",
                "state_dir": "/data/state",
                "worker_count": 2,
                "blacklist_dirs": [".trash"],
                "classifier": {"endpoint": "http://model:8080/v1/chat/completions"}
            }"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.blacklist_dirs, vec![".trash"]);
        assert_eq!(
            config.classifier.endpoint,
            "http://model:8080/v1/chat/completions"
        );
        // Unset classifier fields still default.
        assert_eq!(config.classifier.model, "deepseek-r1-distill-qwen-7b");
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{"sorted_dir": "/data/sorted", "state_dir": "/data/state", "worker_count": 0}"#,
        );

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        assert!(matches!(
            Config::load("/nonexistent/config.json"),
            Err(ConfigError::ReadFile { .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{not json");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ParseJson(_))
        ));
    }
}
