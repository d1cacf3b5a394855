use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::{WorkflowAction, WorkflowResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Compact, serializable summary of a workflow run, kept with the job
/// instead of the full result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub success: bool,
    pub action_taken: WorkflowAction,
    pub target_category: Option<String>,
    pub target_path: Option<PathBuf>,
    pub confidence: f64,
    pub applied_rules: Vec<String>,
}

impl From<&WorkflowResult> for JobOutcome {
    fn from(result: &WorkflowResult) -> Self {
        Self {
            success: result.success,
            action_taken: result.action_taken,
            target_category: result.target_category.clone(),
            target_path: result.target_path.clone(),
            confidence: result.confidence,
            applied_rules: result.applied_rules.clone(),
        }
    }
}

/// One file inside a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub file_path: PathBuf,
    /// Operator-requested category, recorded for the workflow context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_category: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobOutcome>,
    /// 0 or 100 in practice; jobs have no intermediate progress.
    #[serde(default)]
    pub progress: f64,
}

impl BatchJob {
    pub fn new(file_path: PathBuf, target_category: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            file_path,
            target_category,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            result: None,
            progress: 0.0,
        }
    }
}

/// A named group of jobs processed together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOperation {
    pub id: String,
    pub name: String,
    pub jobs: Vec<BatchJob>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchOperation {
    pub fn new(name: impl Into<String>, jobs: Vec<BatchJob>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            jobs,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn completed_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count()
    }

    pub fn failed_jobs(&self) -> usize {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Failed)
            .count()
    }

    /// Percentage of jobs that reached a completed or failed state.
    pub fn progress(&self) -> f64 {
        if self.jobs.is_empty() {
            return 0.0;
        }
        (self.completed_jobs() + self.failed_jobs()) as f64 / self.jobs.len() as f64 * 100.0
    }

    pub fn all_jobs_terminal(&self) -> bool {
        self.jobs.iter().all(|j| j.status.is_terminal())
    }
}

/// Job-free view of an operation for status queries and listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSummary {
    pub id: String,
    pub name: String,
    pub status: JobStatus,
    pub total_jobs: usize,
    pub completed_jobs: usize,
    pub failed_jobs: usize,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&BatchOperation> for OperationSummary {
    fn from(operation: &BatchOperation) -> Self {
        Self {
            id: operation.id.clone(),
            name: operation.name.clone(),
            status: operation.status,
            total_jobs: operation.jobs.len(),
            completed_jobs: operation.completed_jobs(),
            failed_jobs: operation.failed_jobs(),
            progress: operation.progress(),
            created_at: operation.created_at,
            started_at: operation.started_at,
            completed_at: operation.completed_at,
        }
    }
}
