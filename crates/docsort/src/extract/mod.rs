//! Text extraction from input documents.

use std::path::Path;

use tracing::warn;

/// Extractors are total: every failure degrades to an empty string so a
/// single unreadable document never aborts a batch.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> String;
}

/// lopdf-based extractor with a page cap. Non-PDF files are read as
/// plain text.
pub struct PdfTextExtractor {
    max_pages: usize,
}

impl PdfTextExtractor {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    fn extract_pdf(&self, path: &Path) -> Option<String> {
        let doc = match lopdf::Document::load(path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to parse PDF");
                return None;
            }
        };

        let mut text = String::new();
        for (page_num, _) in doc.get_pages().into_iter().take(self.max_pages) {
            if let Ok(page_text) = doc.extract_text(&[page_num]) {
                text.push_str(&page_text);
                text.push('\n');
            }
        }
        Some(text)
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, path: &Path) -> String {
        let _span = tracing::info_span!("extract.text").entered();

        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            return self.extract_pdf(path).unwrap_or_default();
        }

        match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read document");
                String::new()
            }
        }
    }
}
