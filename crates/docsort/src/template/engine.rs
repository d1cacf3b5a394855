use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::store::{load_records, save_records, PersistenceStore, TEMPLATES};

use super::defaults::{builtin_templates, BUILTIN_TEMPLATE_IDS};
use super::extract::extract_metadata;
use super::schema::{DocumentTypeResult, Template};

const PATTERN_WEIGHT: f64 = 0.4;
const KEYWORD_WEIGHT: f64 = 0.4;
const STRUCTURAL_WEIGHT: f64 = 0.2;

struct EngineState {
    templates: Vec<Template>,
    /// Pre-compiled regex patterns, indexed by pattern string
    compiled: HashMap<String, Regex>,
}

/// Template-based document type recognition.
///
/// Holds the built-in templates plus any custom templates loaded from the
/// store; only custom templates are written back on change.
pub struct TemplateEngine {
    state: RwLock<EngineState>,
    store: Arc<dyn PersistenceStore>,
}

impl TemplateEngine {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        let mut templates = builtin_templates();
        let custom: Vec<Template> = load_records(store.as_ref(), TEMPLATES);
        if !custom.is_empty() {
            info!(count = custom.len(), "loaded custom templates");
        }
        templates.extend(custom);

        let compiled = compile_patterns(&templates);
        Self {
            state: RwLock::new(EngineState {
                templates,
                compiled,
            }),
            store,
        }
    }

    /// Matches the document against all templates and returns the best
    /// result, or `None` when no template clears its own threshold.
    ///
    /// Templates are tried in descending priority order; a later template
    /// replaces the current best only with a strictly higher confidence,
    /// so ties go to the higher-priority template.
    pub fn recognize(&self, text: &str, filename: &str) -> Option<DocumentTypeResult> {
        if text.is_empty() {
            return None;
        }

        let state = match self.state.read() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut sorted: Vec<&Template> = state.templates.iter().collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut best: Option<DocumentTypeResult> = None;
        for template in sorted {
            let Some(result) = match_template(template, &state.compiled, text, filename) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| result.confidence > b.confidence) {
                best = Some(result);
            }
        }

        if let Some(result) = &best {
            info!(
                document_type = %result.document_type,
                template_id = %result.template_id,
                confidence = result.confidence,
                "document type recognized"
            );
        }

        best
    }

    /// Registers a new template. IDs must be unique across built-in and
    /// custom templates.
    pub fn add_template(&self, template: Template) -> Result<(), RegistryError> {
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        if state.templates.iter().any(|t| t.id == template.id) {
            warn!(template_id = %template.id, "template id already exists");
            return Err(RegistryError::DuplicateId(template.id));
        }

        for pattern in &template.patterns {
            compile_into(pattern, &mut state.compiled);
        }
        info!(template_id = %template.id, document_type = %template.document_type, "template added");
        state.templates.push(template);

        self.persist_custom(&state.templates)?;
        Ok(())
    }

    /// Removes a template by id. Returns `false` when no such template
    /// exists. Built-in templates can be removed for the lifetime of the
    /// engine but reappear on the next startup.
    pub fn remove_template(&self, template_id: &str) -> bool {
        let mut state = match self.state.write() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };

        let before = state.templates.len();
        state.templates.retain(|t| t.id != template_id);
        if state.templates.len() == before {
            warn!(template_id, "template not found");
            return false;
        }

        info!(template_id, "template removed");
        if let Err(e) = self.persist_custom(&state.templates) {
            warn!(error = %e, "failed to persist templates after removal");
        }
        true
    }

    pub fn templates(&self) -> Vec<Template> {
        match self.state.read() {
            Ok(state) => state.templates.clone(),
            Err(poisoned) => poisoned.into_inner().templates.clone(),
        }
    }

    pub fn templates_by_type(&self, document_type: &str) -> Vec<Template> {
        self.templates()
            .into_iter()
            .filter(|t| t.document_type == document_type)
            .collect()
    }

    fn persist_custom(&self, templates: &[Template]) -> Result<(), RegistryError> {
        let custom: Vec<&Template> = templates
            .iter()
            .filter(|t| !BUILTIN_TEMPLATE_IDS.contains(&t.id.as_str()))
            .collect();
        save_records(self.store.as_ref(), TEMPLATES, &custom)?;
        Ok(())
    }
}

fn compile_patterns(templates: &[Template]) -> HashMap<String, Regex> {
    let mut compiled = HashMap::new();
    for template in templates {
        for pattern in &template.patterns {
            compile_into(pattern, &mut compiled);
        }
    }
    compiled
}

fn compile_into(pattern: &str, compiled: &mut HashMap<String, Regex>) {
    if compiled.contains_key(pattern) {
        return;
    }
    match RegexBuilder::new(pattern)
        .case_insensitive(true)
        .multi_line(true)
        .build()
    {
        Ok(regex) => {
            compiled.insert(pattern.to_string(), regex);
        }
        Err(e) => warn!(pattern, error = %e, "invalid template pattern"),
    }
}

/// Scores one template against the document. Patterns contribute 40% of
/// the confidence, keywords 40%, structural markers 20%; a component a
/// template does not declare contributes nothing (the weights are not
/// renormalized). Returns `None` below the template's own threshold.
fn match_template(
    template: &Template,
    compiled: &HashMap<String, Regex>,
    text: &str,
    filename: &str,
) -> Option<DocumentTypeResult> {
    let text_lower = text.to_lowercase();
    let filename_lower = filename.to_lowercase();

    let mut matched_patterns = Vec::new();
    for pattern in &template.patterns {
        if let Some(regex) = compiled.get(pattern) {
            if regex.is_match(text) {
                matched_patterns.push(pattern.clone());
            }
        }
    }

    let mut matched_keywords = Vec::new();
    for keyword in &template.keywords {
        let kw = keyword.to_lowercase();
        if text_lower.contains(&kw) || filename_lower.contains(&kw) {
            matched_keywords.push(keyword.clone());
        }
    }

    let mut structural_matches = Vec::new();
    for marker in &template.structural_markers {
        if text_lower.contains(&marker.to_lowercase()) {
            structural_matches.push(marker.clone());
        }
    }

    // A malformed pattern still counts towards the denominator.
    let total_patterns = template.patterns.len();
    let total_keywords = template.keywords.len();
    let total_structural = template.structural_markers.len();
    if total_patterns + total_keywords + total_structural == 0 {
        return None;
    }

    let mut confidence = 0.0;
    if total_patterns > 0 {
        confidence += (matched_patterns.len() as f64 / total_patterns as f64) * PATTERN_WEIGHT;
    }
    if total_keywords > 0 {
        confidence += (matched_keywords.len() as f64 / total_keywords as f64) * KEYWORD_WEIGHT;
    }
    if total_structural > 0 {
        confidence +=
            (structural_matches.len() as f64 / total_structural as f64) * STRUCTURAL_WEIGHT;
    }

    if confidence < template.confidence_threshold {
        debug!(
            template_id = %template.id,
            confidence,
            threshold = template.confidence_threshold,
            "template below threshold"
        );
        return None;
    }

    Some(DocumentTypeResult {
        document_type: template.document_type.clone(),
        template_id: template.id.clone(),
        confidence,
        matched_patterns,
        matched_keywords,
        structural_matches,
        language: template.language.clone(),
        metadata: extract_metadata(&template.document_type, text),
    })
}
