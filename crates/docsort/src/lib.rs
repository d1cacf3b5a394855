pub mod batch;
pub mod category;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod rename;
pub mod sanitize;
pub mod storage;
pub mod store;
pub mod template;
pub mod workflow;

pub use batch::{BatchJob, BatchOperation, BatchProcessor, JobStatus, OperationSummary};
pub use category::{CategoryProvider, DirectoryCategories};
pub use classify::{Classification, Classifier, ClassifierConfidence, LmStudioClassifier};
pub use config::{ClassifierConfig, Config, ExtractionConfig};
pub use error::{
    ConfigError, DocsortError, RegistryError, Result, StorageError, StoreError,
};
pub use extract::{PdfTextExtractor, TextExtractor};
pub use logging::init_logging;
pub use rename::{FilenameSuggester, FilenameSuggestion, SmartRenamer};
pub use storage::{FileMover, Mover};
pub use store::{JsonFileStore, PersistenceStore};
pub use template::{DocumentTypeResult, Template, TemplateEngine};
pub use workflow::{
    RuleAction, RuleConditions, WorkflowAction, WorkflowContext, WorkflowEngine, WorkflowResult,
    WorkflowRule,
};
