use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocsortError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Source file not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free filename available for: {0}")]
    FileExists(PathBuf),
}

/// Errors from the persistence store backing operations, templates and rules.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read collection file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write collection file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize collection '{collection}': {source}")]
    Json {
        collection: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from mutating the template catalog or the workflow rule set.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Record with id '{0}' already exists")]
    DuplicateId(String),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, DocsortError>;
