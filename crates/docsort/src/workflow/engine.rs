use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::{info, info_span, warn};

use crate::category::CategoryProvider;
use crate::classify::{Classifier, ClassifierConfidence, ClassifyRequest};
use crate::error::{RegistryError, StoreError};
use crate::extract::TextExtractor;
use crate::rename::FilenameSuggester;
use crate::sanitize::redact_path;
use crate::storage::Mover;
use crate::store::{self, PersistenceStore};
use crate::template::{DocumentTypeResult, TemplateEngine};

use super::defaults::{builtin_rules, BUILTIN_RULE_IDS};
use super::rule::{RuleAction, WorkflowRule};
use super::{WorkflowAction, WorkflowContext, WorkflowResult};

const TEMPLATE_WEIGHT: f64 = 0.6;
const CLASSIFIER_WEIGHT: f64 = 0.4;
const HIGH_CONFIDENCE_SCORE: f64 = 0.8;
const LOW_CONFIDENCE_SCORE: f64 = 0.5;

/// Without an applicable rule, documents above this template confidence
/// are classified automatically, the rest go to manual review.
const AUTO_CLASSIFY_THRESHOLD: f64 = 0.8;

/// Category used when a force rule carries no category of its own.
const DEFAULT_FORCED_CATEGORY: &str = "Sonstiges";

/// Drives a document through recognition, rule evaluation and the
/// resulting action. `process` is total: every failure mode ends up as a
/// `WorkflowResult`, never a panic or an error return.
pub struct WorkflowEngine {
    rules: RwLock<Vec<WorkflowRule>>,
    templates: Arc<TemplateEngine>,
    classifier: Arc<dyn Classifier>,
    categories: Arc<dyn CategoryProvider>,
    extractor: Arc<dyn TextExtractor>,
    renamer: Arc<dyn FilenameSuggester>,
    mover: Arc<dyn Mover>,
    store: Arc<dyn PersistenceStore>,
    sorted_dir: PathBuf,
}

impl WorkflowEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn PersistenceStore>,
        templates: Arc<TemplateEngine>,
        classifier: Arc<dyn Classifier>,
        categories: Arc<dyn CategoryProvider>,
        extractor: Arc<dyn TextExtractor>,
        renamer: Arc<dyn FilenameSuggester>,
        mover: Arc<dyn Mover>,
        sorted_dir: PathBuf,
    ) -> Self {
        let mut rules = builtin_rules();
        let custom: Vec<WorkflowRule> = store::load_records(store.as_ref(), store::RULES);
        if !custom.is_empty() {
            info!(count = custom.len(), "loaded custom workflow rules");
        }
        rules.extend(custom);

        Self {
            rules: RwLock::new(rules),
            templates,
            classifier,
            categories,
            extractor,
            renamer,
            mover,
            store,
            sorted_dir,
        }
    }

    /// Runs the full workflow for one document.
    pub fn process(&self, file_path: &Path, context: &WorkflowContext) -> WorkflowResult {
        let start = Instant::now();
        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        let text = {
            let _span = info_span!("extract_text", file = %redact_path(file_path)).entered();
            self.extractor.extract(file_path)
        };

        let template_result = {
            let _span = info_span!("recognize_template").entered();
            self.templates.recognize(&text, &filename)
        };

        let applicable = self.applicable_rules(file_path, template_result.as_ref(), context);
        let applied_rules: Vec<String> = applicable.iter().map(|r| r.id.clone()).collect();
        let (action, forced_category) = decide(&applicable, template_result.as_ref());

        info!(
            file = %redact_path(file_path),
            ?action,
            rules = applicable.len(),
            "workflow action determined"
        );

        let mut result = match action {
            WorkflowAction::AutoClassify => {
                self.auto_classify(file_path, &filename, &text, template_result)
            }
            WorkflowAction::ForceCategory => {
                self.force_category(file_path, &filename, &text, forced_category)
            }
            WorkflowAction::ManualReview => finish_without_move(
                WorkflowAction::ManualReview,
                template_result,
                "manual_review_required",
            ),
            WorkflowAction::Skip => {
                finish_without_move(WorkflowAction::Skip, template_result, "skipped_by_rule")
            }
        };
        result.applied_rules = applied_rules;
        result.processing_time = start.elapsed();
        result
    }

    fn auto_classify(
        &self,
        file_path: &Path,
        filename: &str,
        text: &str,
        template_result: Option<DocumentTypeResult>,
    ) -> WorkflowResult {
        let categories = self.categories.categories();
        let category_context = self.categories.category_context();
        let classification = {
            let _span = info_span!("classify", file = %redact_path(file_path)).entered();
            self.classifier.classify(&ClassifyRequest {
                text,
                filename,
                categories: &categories,
                category_context: &category_context,
            })
        };

        let suggestion = self.renamer.suggest(filename, text, &classification.category);

        let mut target_dir = self.sorted_dir.join(&classification.category);
        if let Some(subdirectory) = &classification.subdirectory {
            target_dir = target_dir.join(subdirectory);
        }
        let target = target_dir.join(&suggestion.suggested_filename);

        let template_confidence = template_result.as_ref().map(|t| t.confidence).unwrap_or(0.0);
        let classifier_score = match classification.confidence {
            ClassifierConfidence::High => HIGH_CONFIDENCE_SCORE,
            ClassifierConfidence::Low => LOW_CONFIDENCE_SCORE,
        };
        let confidence = TEMPLATE_WEIGHT * template_confidence + CLASSIFIER_WEIGHT * classifier_score;

        let mut metadata = HashMap::new();
        if let Ok(value) = serde_json::to_value(&suggestion) {
            metadata.insert("filename_suggestion".to_string(), value);
        }

        let (success, target_path) = self.execute_move(file_path, &target, &mut metadata);

        WorkflowResult {
            success,
            action_taken: WorkflowAction::AutoClassify,
            target_category: Some(classification.category.clone()),
            target_path,
            confidence,
            template_result,
            ai_result: Some(classification),
            applied_rules: vec![],
            metadata,
            processing_time: Duration::default(),
        }
    }

    fn force_category(
        &self,
        file_path: &Path,
        filename: &str,
        text: &str,
        category: String,
    ) -> WorkflowResult {
        let suggestion = self.renamer.suggest(filename, text, &category);
        let target = self
            .sorted_dir
            .join(&category)
            .join(&suggestion.suggested_filename);

        let mut metadata = HashMap::new();
        metadata.insert(
            "forced_category".to_string(),
            serde_json::Value::String(category.clone()),
        );
        if let Ok(value) = serde_json::to_value(&suggestion) {
            metadata.insert("filename_suggestion".to_string(), value);
        }

        let (success, target_path) = self.execute_move(file_path, &target, &mut metadata);

        WorkflowResult {
            success,
            action_taken: WorkflowAction::ForceCategory,
            target_category: Some(category),
            target_path,
            confidence: 1.0,
            template_result: None,
            ai_result: None,
            applied_rules: vec![],
            metadata,
            processing_time: Duration::default(),
        }
    }

    fn execute_move(
        &self,
        source: &Path,
        target: &Path,
        metadata: &mut HashMap<String, serde_json::Value>,
    ) -> (bool, Option<PathBuf>) {
        let _span = info_span!("move_document", to = %redact_path(target)).entered();
        match self.mover.move_document(source, target) {
            Ok(final_path) => {
                info!(to = %redact_path(&final_path), "document moved");
                (true, Some(final_path))
            }
            Err(e) => {
                warn!(file = %redact_path(source), error = %e, "move failed");
                metadata.insert(
                    "error".to_string(),
                    serde_json::Value::String(e.to_string()),
                );
                (false, Some(target.to_path_buf()))
            }
        }
    }

    /// Enabled rules whose conditions hold, highest priority first.
    fn applicable_rules(
        &self,
        file_path: &Path,
        template_result: Option<&DocumentTypeResult>,
        context: &WorkflowContext,
    ) -> Vec<WorkflowRule> {
        let rules = self.rules_read();
        let mut applicable: Vec<WorkflowRule> = rules
            .iter()
            .filter(|r| r.enabled && r.conditions.matches(file_path, template_result, context))
            .cloned()
            .collect();
        applicable.sort_by(|a, b| b.priority.cmp(&a.priority));
        applicable
    }

    pub fn add_rule(&self, rule: WorkflowRule) -> Result<(), RegistryError> {
        let mut rules = self.rules_write();
        if rules.iter().any(|r| r.id == rule.id) {
            warn!(rule_id = %rule.id, "rule id already exists");
            return Err(RegistryError::DuplicateId(rule.id));
        }
        info!(rule_id = %rule.id, "workflow rule added");
        rules.push(rule);
        self.persist_custom(&rules)?;
        Ok(())
    }

    /// Removes a rule by id. Built-in rules can be removed for the
    /// lifetime of the engine but reappear on the next startup.
    pub fn remove_rule(&self, rule_id: &str) -> bool {
        let mut rules = self.rules_write();
        let before = rules.len();
        rules.retain(|r| r.id != rule_id);
        let removed = rules.len() != before;
        if removed {
            info!(rule_id, "workflow rule removed");
            if let Err(e) = self.persist_custom(&rules) {
                warn!(error = %e, "failed to persist workflow rules");
            }
        }
        removed
    }

    pub fn rules(&self) -> Vec<WorkflowRule> {
        self.rules_read().clone()
    }

    fn persist_custom(&self, rules: &[WorkflowRule]) -> Result<(), StoreError> {
        let custom: Vec<&WorkflowRule> = rules
            .iter()
            .filter(|r| !BUILTIN_RULE_IDS.contains(&r.id.as_str()))
            .collect();
        store::save_records(self.store.as_ref(), store::RULES, &custom)
    }

    fn rules_read(&self) -> RwLockReadGuard<'_, Vec<WorkflowRule>> {
        match self.rules.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn rules_write(&self) -> RwLockWriteGuard<'_, Vec<WorkflowRule>> {
        match self.rules.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Picks the workflow action and the category a force rule would apply.
fn decide(
    rules: &[WorkflowRule],
    template_result: Option<&DocumentTypeResult>,
) -> (WorkflowAction, String) {
    let forced_category = rules
        .iter()
        .find_map(|rule| {
            rule.actions.iter().find_map(|action| match action {
                RuleAction::ForceCategory { category } => Some(
                    category
                        .clone()
                        .unwrap_or_else(|| DEFAULT_FORCED_CATEGORY.to_string()),
                ),
                _ => None,
            })
        })
        .unwrap_or_else(|| DEFAULT_FORCED_CATEGORY.to_string());

    let action = match rules.first() {
        None => {
            let confidence = template_result.map(|t| t.confidence).unwrap_or(0.0);
            if confidence > AUTO_CLASSIFY_THRESHOLD {
                WorkflowAction::AutoClassify
            } else {
                WorkflowAction::ManualReview
            }
        }
        Some(rule) => match rule.actions.first() {
            None | Some(RuleAction::Classify) => WorkflowAction::AutoClassify,
            Some(RuleAction::ForceCategory { .. }) => WorkflowAction::ForceCategory,
            Some(RuleAction::ManualReview) => WorkflowAction::ManualReview,
            Some(RuleAction::Skip) => WorkflowAction::Skip,
        },
    };

    (action, forced_category)
}

fn finish_without_move(
    action: WorkflowAction,
    template_result: Option<DocumentTypeResult>,
    reason: &str,
) -> WorkflowResult {
    let mut metadata = HashMap::new();
    metadata.insert(
        "reason".to_string(),
        serde_json::Value::String(reason.to_string()),
    );

    WorkflowResult {
        success: true,
        action_taken: action,
        target_category: None,
        target_path: None,
        confidence: 0.0,
        template_result,
        ai_result: None,
        applied_rules: vec![],
        metadata,
        processing_time: Duration::default(),
    }
}
