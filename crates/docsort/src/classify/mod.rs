//! AI-assisted category classification with a deterministic fallback.

pub mod fallback;
pub mod lm_studio;

pub use lm_studio::LmStudioClassifier;

use serde::{Deserialize, Serialize};

/// Coarse confidence band reported by a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierConfidence {
    High,
    Low,
}

/// A classification outcome. `fallback_used` marks answers that did not
/// come from the model itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    /// Optional subdirectory below the category, when the classifier can
    /// name one.
    #[serde(default)]
    pub subdirectory: Option<String>,
    pub confidence: ClassifierConfidence,
    pub fallback_used: bool,
}

/// One classification request. `categories` is the closed list of valid
/// answers; `category_context` is a human-readable rendering of the
/// category tree for the model prompt.
pub struct ClassifyRequest<'a> {
    pub text: &'a str,
    pub filename: &'a str,
    pub categories: &'a [String],
    pub category_context: &'a str,
}

/// Classifiers are total: transport and parse failures degrade to the
/// keyword fallback instead of surfacing as errors.
pub trait Classifier: Send + Sync {
    fn classify(&self, request: &ClassifyRequest<'_>) -> Classification;
}
