use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_language() -> String {
    "de".to_string()
}

fn default_threshold() -> f64 {
    0.7
}

fn default_priority() -> i32 {
    1
}

/// A document type template: regex patterns, substring keywords, and
/// structural markers, each contributing a weighted share of the match
/// confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub document_type: String,
    pub patterns: Vec<String>,
    pub keywords: Vec<String>,
    pub structural_markers: Vec<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub created_at: String,
}

impl Template {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            document_type: document_type.into(),
            patterns: vec![],
            keywords: vec![],
            structural_markers: vec![],
            language: default_language(),
            confidence_threshold: default_threshold(),
            priority: default_priority(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Outcome of matching a document against the template registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTypeResult {
    pub document_type: String,
    pub template_id: String,
    pub confidence: f64,
    pub matched_patterns: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub structural_matches: Vec<String>,
    pub language: String,
    pub metadata: HashMap<String, serde_json::Value>,
}
