use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::category::DirectoryCategories;
use crate::classify::LmStudioClassifier;
use crate::config::Config;
use crate::error::Result;
use crate::extract::PdfTextExtractor;
use crate::rename::SmartRenamer;
use crate::storage::FileMover;
use crate::store::{self, JsonFileStore, PersistenceStore};
use crate::template::TemplateEngine;
use crate::workflow::{WorkflowContext, WorkflowEngine};

use super::job::{BatchJob, BatchOperation, JobOutcome, JobStatus, OperationSummary};

/// A queue item; `None` is the shutdown sentinel, one per worker.
type QueueItem = Option<(String, String)>;

struct Shared {
    engine: Arc<WorkflowEngine>,
    store: Arc<dyn PersistenceStore>,
    operations: Mutex<HashMap<String, BatchOperation>>,
    job_sender: Sender<QueueItem>,
    job_receiver: Receiver<QueueItem>,
    running: AtomicBool,
}

impl Shared {
    fn operations_lock(&self) -> MutexGuard<'_, HashMap<String, BatchOperation>> {
        match self.operations.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Writes the full operations snapshot. Called after the map lock has
    /// been released; the store serializes concurrent writers itself.
    fn persist(&self) {
        let operations: Vec<BatchOperation> = self.operations_lock().values().cloned().collect();
        if let Err(e) = store::save_records(self.store.as_ref(), store::OPERATIONS, &operations) {
            warn!("Failed to persist batch operations: {}", e);
        }
    }
}

/// Runs batch operations over a fixed worker pool. Each job id is
/// enqueued exactly once, at `start_operation` time; the worker-side
/// "not PENDING, drop" check only covers jobs cancelled while queued.
pub struct BatchProcessor {
    shared: Arc<Shared>,
    worker_count: usize,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BatchProcessor {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        store: Arc<dyn PersistenceStore>,
        worker_count: usize,
    ) -> Self {
        let (job_sender, job_receiver) = unbounded::<QueueItem>();

        let mut operations = HashMap::new();
        for mut operation in
            store::load_records::<BatchOperation>(store.as_ref(), store::OPERATIONS)
        {
            reconcile(&mut operation);
            operations.insert(operation.id.clone(), operation);
        }
        if !operations.is_empty() {
            info!("Loaded {} batch operations", operations.len());
        }

        let processor = Self {
            shared: Arc::new(Shared {
                engine,
                store,
                operations: Mutex::new(operations),
                job_sender,
                job_receiver,
                running: AtomicBool::new(false),
            }),
            worker_count: worker_count.max(1),
            workers: Mutex::new(Vec::new()),
        };
        processor.shared.persist();
        processor
    }

    /// Wires the full production object graph from a loaded config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn PersistenceStore> = Arc::new(JsonFileStore::new(&config.state_dir));
        let templates = Arc::new(TemplateEngine::new(Arc::clone(&store)));
        let classifier = Arc::new(LmStudioClassifier::new(&config.classifier)?);
        let categories = Arc::new(DirectoryCategories::new(
            &config.sorted_dir,
            config.blacklist_dirs.clone(),
        ));
        let extractor = Arc::new(PdfTextExtractor::new(config.extraction.max_pages));

        let engine = Arc::new(WorkflowEngine::new(
            Arc::clone(&store),
            templates,
            classifier,
            categories,
            extractor,
            Arc::new(SmartRenamer::new()),
            Arc::new(FileMover::new()),
            config.sorted_dir.clone(),
        ));

        Ok(Self::new(engine, store, config.worker_count))
    }

    /// Creates a new operation with one `PENDING` job per file and starts
    /// it right away when `auto_process` is set. Returns the operation id.
    pub fn create_operation(
        &self,
        name: &str,
        file_paths: Vec<PathBuf>,
        auto_process: bool,
        target_category: Option<String>,
    ) -> String {
        let jobs = file_paths
            .into_iter()
            .map(|path| BatchJob::new(path, target_category.clone()))
            .collect::<Vec<_>>();
        let operation = BatchOperation::new(name, jobs);
        let operation_id = operation.id.clone();

        info!(
            "Created operation '{}' ({}) with {} jobs",
            name,
            operation_id,
            operation.jobs.len()
        );

        self.shared
            .operations_lock()
            .insert(operation_id.clone(), operation);
        self.shared.persist();

        if auto_process {
            self.start_operation(&operation_id);
        }
        operation_id
    }

    /// Flips a `PENDING` operation to `RUNNING` and enqueues its jobs.
    /// Returns `false` when the operation is missing or already started.
    pub fn start_operation(&self, operation_id: &str) -> bool {
        let to_enqueue: Vec<(String, String)> = {
            let mut operations = self.shared.operations_lock();
            let Some(operation) = operations.get_mut(operation_id) else {
                return false;
            };
            if operation.status != JobStatus::Pending {
                debug!(
                    "Not starting operation {} in state {:?}",
                    operation_id, operation.status
                );
                return false;
            }
            operation.status = JobStatus::Running;
            operation.started_at = Some(Utc::now());
            if operation.all_jobs_terminal() {
                // Nothing to enqueue, typically an empty operation.
                operation.status = JobStatus::Completed;
                operation.completed_at = Some(Utc::now());
                info!("Operation {} completed with no pending jobs", operation_id);
                Vec::new()
            } else {
                operation
                    .jobs
                    .iter()
                    .filter(|j| j.status == JobStatus::Pending)
                    .map(|j| (operation.id.clone(), j.id.clone()))
                    .collect()
            }
        };
        self.shared.persist();

        if !to_enqueue.is_empty() {
            self.start_workers();
            info!(
                "Starting operation {} ({} jobs queued)",
                operation_id,
                to_enqueue.len()
            );
            for item in to_enqueue {
                if self.shared.job_sender.send(Some(item)).is_err() {
                    error!("Job queue disconnected");
                    break;
                }
            }
        }
        true
    }

    /// Cancels a `PENDING` or `RUNNING` operation. Still-pending jobs are
    /// cancelled; a job already running finishes and records its result
    /// without reviving the operation.
    pub fn cancel_operation(&self, operation_id: &str) -> bool {
        {
            let mut operations = self.shared.operations_lock();
            let Some(operation) = operations.get_mut(operation_id) else {
                return false;
            };
            if operation.status.is_terminal() {
                return false;
            }
            operation.status = JobStatus::Cancelled;
            operation.completed_at = Some(Utc::now());
            for job in &mut operation.jobs {
                if job.status == JobStatus::Pending {
                    job.status = JobStatus::Cancelled;
                    job.completed_at = Some(Utc::now());
                }
            }
            info!("Cancelled operation {}", operation_id);
        }
        self.shared.persist();
        true
    }

    /// Full snapshot of one operation, per-job records included.
    pub fn get_operation_status(&self, operation_id: &str) -> Option<BatchOperation> {
        self.shared.operations_lock().get(operation_id).cloned()
    }

    /// Job-free summaries, newest first, optionally filtered by status.
    pub fn list_operations(&self, status: Option<JobStatus>) -> Vec<OperationSummary> {
        let operations = self.shared.operations_lock();
        let mut summaries: Vec<OperationSummary> = operations
            .values()
            .filter(|op| status.map_or(true, |s| op.status == s))
            .map(OperationSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Removes an operation. Refused while the operation is `RUNNING`.
    pub fn delete_operation(&self, operation_id: &str) -> bool {
        let removed = {
            let mut operations = self.shared.operations_lock();
            match operations.get(operation_id) {
                None => return false,
                Some(op) if op.status == JobStatus::Running => {
                    debug!("Refusing to delete running operation {}", operation_id);
                    return false;
                }
                Some(_) => operations.remove(operation_id).is_some(),
            }
        };
        if removed {
            info!("Deleted operation {}", operation_id);
            self.shared.persist();
        }
        removed
    }

    pub fn start_workers(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut workers = self.workers_lock();
        for worker_id in 0..self.worker_count {
            let shared = Arc::clone(&self.shared);
            workers.push(thread::spawn(move || run_worker(worker_id, shared)));
        }
        info!("Started {} batch workers", self.worker_count);
    }

    pub fn stop_workers(&self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down batch workers...");
        let mut workers = self.workers_lock();
        for _ in 0..workers.len() {
            let _ = self.shared.job_sender.send(None);
        }
        for (i, handle) in workers.drain(..).enumerate() {
            if let Err(e) = handle.join() {
                error!("Batch worker {} panicked: {:?}", i, e);
            } else {
                debug!("Batch worker {} finished", i);
            }
        }
        info!("All batch workers have stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }

    fn workers_lock(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.workers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for BatchProcessor {
    fn drop(&mut self) {
        self.stop_workers();
    }
}

/// Repairs operations reloaded after an unclean shutdown. Jobs frozen in
/// `RUNNING` cannot be resumed and become `FAILED`; an interrupted
/// operation completes if everything else already finished, otherwise its
/// leftover pending jobs and the operation itself are cancelled.
fn reconcile(operation: &mut BatchOperation) {
    for job in &mut operation.jobs {
        if job.status == JobStatus::Running {
            job.status = JobStatus::Failed;
            job.error_message = Some("interrupted by restart".to_string());
            job.completed_at = Some(Utc::now());
            job.progress = 100.0;
            warn!("Job {} was interrupted by restart", job.id);
        }
    }

    if operation.status == JobStatus::Running {
        if operation.all_jobs_terminal() {
            operation.status = JobStatus::Completed;
        } else {
            for job in &mut operation.jobs {
                if job.status == JobStatus::Pending {
                    job.status = JobStatus::Cancelled;
                    job.completed_at = Some(Utc::now());
                }
            }
            operation.status = JobStatus::Cancelled;
        }
        operation.completed_at = Some(Utc::now());
    }
}

fn run_worker(worker_id: usize, shared: Arc<Shared>) {
    debug!("Batch worker {} started", worker_id);

    loop {
        if !shared.running.load(Ordering::Relaxed) {
            debug!("Batch worker {} received shutdown signal", worker_id);
            break;
        }

        match shared.job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(Some((operation_id, job_id))) => {
                process_job(worker_id, &shared, &operation_id, &job_id);
            }
            Ok(None) => {
                debug!("Batch worker {} received sentinel", worker_id);
                break;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Batch worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Batch worker {} stopped", worker_id);
}

fn process_job(worker_id: usize, shared: &Shared, operation_id: &str, job_id: &str) {
    let claimed = {
        let mut operations = shared.operations_lock();
        let Some(operation) = operations.get_mut(operation_id) else {
            return;
        };
        let Some(job) = operation.jobs.iter_mut().find(|j| j.id == job_id) else {
            return;
        };
        if job.status != JobStatus::Pending {
            debug!("Dropping job {} in state {:?}", job_id, job.status);
            None
        } else {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
            Some((job.file_path.clone(), job.target_category.clone()))
        }
    };
    let Some((file_path, target_category)) = claimed else {
        return;
    };
    shared.persist();

    debug!("Worker {} processing job {}", worker_id, job_id);

    let (status, error_message, outcome) = if !file_path.exists() {
        (
            JobStatus::Failed,
            Some(format!("File not found: {}", file_path.display())),
            None,
        )
    } else {
        let context = WorkflowContext {
            batch: true,
            target_category,
        };
        let result = shared.engine.process(&file_path, &context);
        let outcome = JobOutcome::from(&result);
        if result.success {
            (JobStatus::Completed, None, Some(outcome))
        } else {
            let message = result
                .metadata
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| "workflow failed".to_string());
            (JobStatus::Failed, Some(message), Some(outcome))
        }
    };

    {
        let mut operations = shared.operations_lock();
        if let Some(operation) = operations.get_mut(operation_id) {
            if let Some(job) = operation.jobs.iter_mut().find(|j| j.id == job_id) {
                job.status = status;
                job.completed_at = Some(Utc::now());
                job.error_message = error_message;
                job.result = outcome;
                job.progress = 100.0;
            }
            // A cancelled operation never flips back to completed.
            if operation.status == JobStatus::Running && operation.all_jobs_terminal() {
                operation.status = JobStatus::Completed;
                operation.completed_at = Some(Utc::now());
                info!(
                    "Operation {} completed ({} ok, {} failed)",
                    operation_id,
                    operation.completed_jobs(),
                    operation.failed_jobs()
                );
            }
        }
    }
    shared.persist();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryProvider;
    use crate::classify::{Classification, Classifier, ClassifierConfidence, ClassifyRequest};
    use crate::extract::TextExtractor;
    use crate::store::testing::MemoryStore;
    use std::fs;
    use std::path::Path;
    use std::sync::mpsc;
    use std::time::Instant;

    struct StaticClassifier;

    impl Classifier for StaticClassifier {
        fn classify(&self, _request: &ClassifyRequest<'_>) -> Classification {
            Classification {
                category: "Sonstiges".to_string(),
                subdirectory: None,
                confidence: ClassifierConfidence::Low,
                fallback_used: true,
            }
        }
    }

    struct StaticCategories;

    impl CategoryProvider for StaticCategories {
        fn categories(&self) -> Vec<String> {
            vec!["Sonstiges".to_string()]
        }

        fn category_context(&self) -> String {
            "📁 Sonstiges".to_string()
        }
    }

    /// Extractor that blocks until the test releases it, to pin jobs in
    /// the RUNNING state.
    struct GatedExtractor {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl TextExtractor for GatedExtractor {
        fn extract(&self, _path: &Path) -> String {
            let _ = self.gate.lock().unwrap().recv();
            String::new()
        }
    }

    fn engine_with_extractor(
        store: &Arc<dyn PersistenceStore>,
        extractor: Arc<dyn TextExtractor>,
        sorted_dir: &Path,
    ) -> Arc<WorkflowEngine> {
        Arc::new(WorkflowEngine::new(
            Arc::clone(store),
            Arc::new(TemplateEngine::new(Arc::clone(store))),
            Arc::new(StaticClassifier),
            Arc::new(StaticCategories),
            extractor,
            Arc::new(SmartRenamer::new()),
            Arc::new(FileMover::new()),
            sorted_dir.to_path_buf(),
        ))
    }

    fn processor(store: Arc<dyn PersistenceStore>, sorted_dir: &Path) -> BatchProcessor {
        let engine = engine_with_extractor(&store, Arc::new(PdfTextExtractor::new(3)), sorted_dir);
        BatchProcessor::new(engine, store, 2)
    }

    fn wait_until(deadline_ms: u64, mut check: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(deadline_ms);
        while Instant::now() < deadline {
            if check() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_operation_completes_with_mixed_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let sorted = tempfile::tempdir().unwrap();
        let existing = dir.path().join("a.txt");
        fs::write(&existing, "lorem ipsum").unwrap();
        let missing = dir.path().join("missing.pdf");

        let store: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::default());
        let processor = processor(Arc::clone(&store), sorted.path());

        let id = processor.create_operation("mixed", vec![existing, missing], true, None);

        assert!(wait_until(5000, || {
            processor
                .get_operation_status(&id)
                .is_some_and(|op| op.status == JobStatus::Completed)
        }));

        let operation = processor.get_operation_status(&id).unwrap();
        assert_eq!(operation.completed_jobs(), 1);
        assert_eq!(operation.failed_jobs(), 1);
        assert!((operation.progress() - 100.0).abs() < 1e-9);

        let failed = operation
            .jobs
            .iter()
            .find(|j| j.status == JobStatus::Failed)
            .unwrap();
        assert!(failed
            .error_message
            .as_deref()
            .unwrap()
            .starts_with("File not found"));

        processor.stop_workers();

        let persisted: Vec<BatchOperation> = store::load_records(store.as_ref(), store::OPERATIONS);
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].status, JobStatus::Completed);
    }

    #[test]
    fn test_start_requires_pending_operation() {
        let sorted = tempfile::tempdir().unwrap();
        let store: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::default());
        let processor = processor(store, sorted.path());

        assert!(!processor.start_operation("no-such-id"));

        let id = processor.create_operation("once", vec![], false, None);
        assert!(processor.start_operation(&id));
        assert!(!processor.start_operation(&id));
        processor.stop_workers();
    }

    #[test]
    fn test_empty_operation_completes_at_start() {
        let sorted = tempfile::tempdir().unwrap();
        let store: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::default());
        let processor = processor(store, sorted.path());

        let id = processor.create_operation("empty", vec![], true, None);

        let operation = processor.get_operation_status(&id).unwrap();
        assert_eq!(operation.status, JobStatus::Completed);
        assert!(operation.completed_at.is_some());
        assert!(processor.delete_operation(&id));
    }

    #[test]
    fn test_cancel_pending_operation_cancels_jobs() {
        let sorted = tempfile::tempdir().unwrap();
        let store: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::default());
        let processor = processor(store, sorted.path());

        let id = processor.create_operation(
            "cancel-me",
            vec![PathBuf::from("/in/a.pdf"), PathBuf::from("/in/b.pdf")],
            false,
            None,
        );
        assert!(processor.cancel_operation(&id));

        let operation = processor.get_operation_status(&id).unwrap();
        assert_eq!(operation.status, JobStatus::Cancelled);
        assert!(operation
            .jobs
            .iter()
            .all(|j| j.status == JobStatus::Cancelled));

        assert!(!processor.start_operation(&id));
        assert!(!processor.cancel_operation(&id));
    }

    #[test]
    fn test_cancelled_operation_stays_cancelled_after_running_job_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let sorted = tempfile::tempdir().unwrap();
        let file_a = dir.path().join("a.txt");
        let file_b = dir.path().join("b.txt");
        fs::write(&file_a, "text a").unwrap();
        fs::write(&file_b, "text b").unwrap();

        let (release, gate) = mpsc::channel();
        let store: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::default());
        let engine = engine_with_extractor(
            &store,
            Arc::new(GatedExtractor {
                gate: Mutex::new(gate),
            }),
            sorted.path(),
        );
        let processor = BatchProcessor::new(engine, store, 1);

        let id = processor.create_operation("gated", vec![file_a, file_b], true, None);

        assert!(wait_until(5000, || {
            processor
                .get_operation_status(&id)
                .is_some_and(|op| op.jobs.iter().any(|j| j.status == JobStatus::Running))
        }));

        assert!(!processor.delete_operation(&id));
        assert!(processor.cancel_operation(&id));

        let operation = processor.get_operation_status(&id).unwrap();
        assert_eq!(operation.status, JobStatus::Cancelled);
        assert!(operation
            .jobs
            .iter()
            .any(|j| j.status == JobStatus::Cancelled));

        release.send(()).unwrap();
        release.send(()).unwrap();

        assert!(wait_until(5000, || {
            processor
                .get_operation_status(&id)
                .is_some_and(|op| op.all_jobs_terminal())
        }));

        let operation = processor.get_operation_status(&id).unwrap();
        assert_eq!(operation.status, JobStatus::Cancelled);
        assert!(operation
            .jobs
            .iter()
            .any(|j| j.status == JobStatus::Completed));

        processor.stop_workers();
        assert!(processor.delete_operation(&id));
    }

    #[test]
    fn test_list_operations_newest_first_with_filter() {
        let sorted = tempfile::tempdir().unwrap();
        let store: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::default());
        let processor = processor(store, sorted.path());

        let first = processor.create_operation("first", vec![], false, None);
        thread::sleep(Duration::from_millis(5));
        let second = processor.create_operation("second", vec![], false, None);

        let all = processor.list_operations(None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second);
        assert_eq!(all[1].id, first);

        processor.cancel_operation(&first);
        let cancelled = processor.list_operations(Some(JobStatus::Cancelled));
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, first);
    }

    #[test]
    fn test_delete_refuses_missing_and_running() {
        let sorted = tempfile::tempdir().unwrap();
        let store: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::default());
        let processor = processor(store, sorted.path());

        assert!(!processor.delete_operation("no-such-id"));

        let id = processor.create_operation("deletable", vec![], false, None);
        assert!(processor.delete_operation(&id));
        assert!(processor.get_operation_status(&id).is_none());
    }

    #[test]
    fn test_restart_reconciliation() {
        let sorted = tempfile::tempdir().unwrap();
        let store: Arc<dyn PersistenceStore> = Arc::new(MemoryStore::default());

        let mut interrupted = BatchOperation::new(
            "interrupted",
            vec![
                BatchJob::new(PathBuf::from("/in/a.pdf"), None),
                BatchJob::new(PathBuf::from("/in/b.pdf"), None),
            ],
        );
        interrupted.status = JobStatus::Running;
        interrupted.jobs[0].status = JobStatus::Running;

        let mut finished = BatchOperation::new(
            "finished",
            vec![BatchJob::new(PathBuf::from("/in/c.pdf"), None)],
        );
        finished.status = JobStatus::Running;
        finished.jobs[0].status = JobStatus::Completed;

        store::save_records(
            store.as_ref(),
            store::OPERATIONS,
            &[interrupted.clone(), finished.clone()],
        )
        .unwrap();

        let processor = processor(Arc::clone(&store), sorted.path());

        let reloaded = processor.get_operation_status(&interrupted.id).unwrap();
        assert_eq!(reloaded.status, JobStatus::Cancelled);
        assert_eq!(reloaded.jobs[0].status, JobStatus::Failed);
        assert_eq!(
            reloaded.jobs[0].error_message.as_deref(),
            Some("interrupted by restart")
        );
        assert_eq!(reloaded.jobs[1].status, JobStatus::Cancelled);

        let reloaded = processor.get_operation_status(&finished.id).unwrap();
        assert_eq!(reloaded.status, JobStatus::Completed);
    }
}
