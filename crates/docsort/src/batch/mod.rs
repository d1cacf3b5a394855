//! Concurrent batch processing of documents with persisted, crash
//! survivable operation state.

mod job;
mod processor;

pub use job::{BatchJob, BatchOperation, JobOutcome, JobStatus, OperationSummary};
pub use processor::BatchProcessor;
