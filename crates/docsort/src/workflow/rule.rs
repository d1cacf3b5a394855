use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::template::DocumentTypeResult;

use super::WorkflowContext;

fn default_priority() -> i32 {
    1
}

fn default_enabled() -> bool {
    true
}

/// Conditions of a rule. Every condition that is present must hold (AND
/// semantics); an absent condition imposes no constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConditions {
    /// Recognized document type must be one of these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<Vec<String>>,
    /// Template confidence must be at least this. Requires that a
    /// template matched at all, even for `0.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_template_confidence: Option<f64>,
    /// Case-insensitive substring match of any pattern in the filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename_patterns: Option<Vec<String>>,
    /// File extension must be one of these (leading dots ignored).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_extensions: Option<Vec<String>>,
    /// Must equal the context's batch flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_mode: Option<bool>,
}

impl RuleConditions {
    pub fn matches(
        &self,
        file_path: &Path,
        template_result: Option<&DocumentTypeResult>,
        context: &WorkflowContext,
    ) -> bool {
        if let Some(types) = &self.document_type {
            match template_result {
                Some(t) if types.contains(&t.document_type) => {}
                _ => return false,
            }
        }

        if let Some(min_confidence) = self.min_template_confidence {
            match template_result {
                Some(t) if t.confidence >= min_confidence => {}
                _ => return false,
            }
        }

        if let Some(patterns) = &self.filename_patterns {
            let filename = file_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_lowercase();
            if !patterns.iter().any(|p| filename.contains(&p.to_lowercase())) {
                return false;
            }
        }

        if let Some(extensions) = &self.file_extensions {
            let ext = file_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            if !extensions
                .iter()
                .any(|e| e.trim_start_matches('.').to_lowercase() == ext)
            {
                return false;
            }
        }

        if let Some(batch_mode) = self.batch_mode {
            if context.batch != batch_mode {
                return false;
            }
        }

        true
    }
}

/// Typed action carried by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    Classify,
    ForceCategory {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
    ManualReview,
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub conditions: RuleConditions,
    pub actions: Vec<RuleAction>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub created_at: String,
}

impl WorkflowRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            conditions: RuleConditions::default(),
            actions: vec![],
            priority: default_priority(),
            enabled: default_enabled(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
