//! Test harness providing an isolated pipeline environment: temp inbox,
//! sorted tree and state directory, wired with a deterministic classifier
//! so no test depends on a running model endpoint.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use docsort::batch::BatchProcessor;
use docsort::category::CategoryProvider;
use docsort::classify::{Classification, Classifier, ClassifierConfidence, ClassifyRequest};
use docsort::extract::PdfTextExtractor;
use docsort::rename::SmartRenamer;
use docsort::storage::FileMover;
use docsort::store::{JsonFileStore, PersistenceStore};
use docsort::template::TemplateEngine;
use docsort::workflow::WorkflowEngine;

/// Deterministic stand-in for the model classifier: routes on document
/// keywords, mirroring what the real endpoint would answer.
pub struct ScriptedClassifier;

impl Classifier for ScriptedClassifier {
    fn classify(&self, request: &ClassifyRequest<'_>) -> Classification {
        let haystack = format!("{} {}", request.filename, request.text).to_lowercase();
        let category = if haystack.contains("rechnung") || haystack.contains("invoice") {
            Some("Finanzen")
        } else if haystack.contains("vertrag") {
            Some("Verträge")
        } else {
            None
        };

        match category {
            Some(category) => Classification {
                category: category.to_string(),
                subdirectory: None,
                confidence: ClassifierConfidence::High,
                fallback_used: false,
            },
            None => Classification {
                category: "Sonstiges".to_string(),
                subdirectory: None,
                confidence: ClassifierConfidence::Low,
                fallback_used: true,
            },
        }
    }
}

struct FixedCategories;

impl CategoryProvider for FixedCategories {
    fn categories(&self) -> Vec<String> {
        vec![
            "Finanzen".to_string(),
            "Verträge".to_string(),
            "Banken".to_string(),
            "Sonstiges".to_string(),
        ]
    }

    fn category_context(&self) -> String {
        self.categories()
            .iter()
            .map(|c| format!("📁 {c}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub inbox_dir: PathBuf,
    pub sorted_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let inbox_dir = base.join("inbox");
        let sorted_dir = base.join("sorted");
        let state_dir = base.join("state");
        fs::create_dir_all(&inbox_dir).expect("Failed to create inbox dir");
        fs::create_dir_all(&sorted_dir).expect("Failed to create sorted dir");
        fs::create_dir_all(&state_dir).expect("Failed to create state dir");

        Self {
            temp_dir,
            inbox_dir,
            sorted_dir,
            state_dir,
        }
    }

    pub fn store(&self) -> Arc<dyn PersistenceStore> {
        Arc::new(JsonFileStore::new(&self.state_dir))
    }

    /// Workflow engine over a fresh store handle; separate calls share the
    /// same on-disk state, which lets tests simulate restarts.
    pub fn engine(&self) -> Arc<WorkflowEngine> {
        let store = self.store();
        Arc::new(WorkflowEngine::new(
            Arc::clone(&store),
            Arc::new(TemplateEngine::new(Arc::clone(&store))),
            Arc::new(ScriptedClassifier),
            Arc::new(FixedCategories),
            Arc::new(PdfTextExtractor::new(3)),
            Arc::new(SmartRenamer::new()),
            Arc::new(FileMover::new()),
            self.sorted_dir.clone(),
        ))
    }

    pub fn processor(&self, worker_count: usize) -> BatchProcessor {
        BatchProcessor::new(self.engine(), self.store(), worker_count)
    }

    pub fn write_document(&self, name: &str, text: &str) -> PathBuf {
        let path = self.inbox_dir.join(name);
        fs::write(&path, text).expect("Failed to write test document");
        path
    }

    pub fn sorted_files(&self, category: &str) -> Vec<String> {
        let dir = self.sorted_dir.join(category);
        let Ok(entries) = fs::read_dir(&dir) else {
            return vec![];
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Hits every pattern, keyword and structural marker of the built-in
/// invoice template, scoring 1.0.
pub const STRONG_INVOICE_TEXT: &str = "Rechnung Invoice Rechnungs-Nr 4711 Invoice-Number RG-123\n\
    Betrag Summe Total Netto Brutto Umsatzsteuer MwSt VAT USt-ID Steuer-Nr\n\
    Fälligkeitsdatum Rechnungsempfänger Gesamtbetrag Rechnungsdatum 15.01.2024\n\
    Leistungsdatum Rechnungssteller Zahlungsziel Betrag netto";

/// Passes the invoice threshold (0.4) but stays under the high confidence
/// cutoff (0.8): 4/6 patterns, 7/15 keywords, 1/8 markers ≈ 0.48.
pub const MIDDLING_INVOICE_TEXT: &str =
    "Rechnung invoice Rechnungs-Nr 4711 Betrag Summe netto brutto mwst Zahlungsziel 14 Tage";
