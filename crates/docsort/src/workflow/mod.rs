//! Rule-driven document workflow: recognition, rule evaluation, action
//! execution.

pub mod defaults;
pub mod engine;
pub mod rule;

pub use engine::WorkflowEngine;
pub use rule::{RuleAction, RuleConditions, WorkflowRule};

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::template::DocumentTypeResult;

/// The action a workflow run decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    AutoClassify,
    ForceCategory,
    ManualReview,
    Skip,
}

/// Extra context supplied by the caller, e.g. the batch processor.
#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    /// Whether this run is part of a batch operation.
    pub batch: bool,
    /// Operator-requested category, recorded with the job but not used
    /// to override rule routing.
    pub target_category: Option<String>,
}

/// Uniform outcome of one workflow run. `success=false` means the chosen
/// action could not be carried out (in practice: the move failed); the
/// failure detail is under `metadata["error"]`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    pub success: bool,
    pub action_taken: WorkflowAction,
    pub target_category: Option<String>,
    pub target_path: Option<PathBuf>,
    pub confidence: f64,
    pub template_result: Option<DocumentTypeResult>,
    pub ai_result: Option<Classification>,
    pub applied_rules: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub processing_time: Duration,
}
