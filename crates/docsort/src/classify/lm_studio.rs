//! OpenAI-style chat-completions client against a local LM Studio server.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;

use super::fallback::keyword_classify;
use super::{Classification, Classifier, ClassifierConfidence, ClassifyRequest};

/// Filename/content keyword groups surfaced to the model as hints.
const FILENAME_HINTS: &[(&str, &[&str])] = &[
    ("Rechnung", &["rechnung", "invoice", "bill"]),
    ("Vertrag", &["vertrag", "contract"]),
    ("Kita", &["kita", "kindergarten"]),
    ("Arbeit", &["arbeit", "job", "gehalt"]),
    ("Steuern", &["steuer", "tax"]),
];

const CONTENT_HINTS: &[(&str, &[&str])] = &[
    ("Finanzendokument", &["rechnung", "betrag", "euro", "umsatzsteuer"]),
    ("Arbeitsdokument", &["arbeitsvertrag", "gehalt", "lohn", "arbeitgeber"]),
    ("Wohnendokument", &["mietvertrag", "miete", "wohnung", "hausverwaltung"]),
    ("Fahrzeugdokument", &["fahrzeug", "auto", "kfz", "tüv"]),
    ("Kitadokument", &["kindergarten", "kita", "betreuung"]),
];

const SYSTEM_MESSAGE: &str = "Du bist ein Experte für deutsche Dokumentenklassifizierung. \
                              Antworte nur mit dem exakten Kategorienamen.";

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

pub struct LmStudioClassifier {
    client: Client,
    endpoint: String,
    model: String,
}

impl LmStudioClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
        })
    }

    fn ask(&self, request: &ClassifyRequest<'_>) -> Result<String, reqwest::Error> {
        let body = json!({
            "model": self.model,
            "temperature": 0.1,
            "max_tokens": 100,
            "stop": ["\n", ".", "!", "?"],
            "messages": [
                { "role": "system", "content": SYSTEM_MESSAGE },
                { "role": "user", "content": build_prompt(request) },
            ],
        });

        let response: ChatResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default())
    }
}

impl Classifier for LmStudioClassifier {
    fn classify(&self, request: &ClassifyRequest<'_>) -> Classification {
        match self.ask(request) {
            Ok(raw) => {
                debug!(answer = %raw, "model answered");
                let answer = parse_response(&raw, request.categories);
                if request.categories.iter().any(|c| *c == answer) {
                    Classification {
                        category: answer,
                        subdirectory: None,
                        confidence: ClassifierConfidence::High,
                        fallback_used: false,
                    }
                } else {
                    warn!(answer = %answer, "model answer not in category list");
                    Classification {
                        category: keyword_classify(
                            request.text,
                            request.filename,
                            request.categories,
                        ),
                        subdirectory: None,
                        confidence: ClassifierConfidence::Low,
                        fallback_used: true,
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "model request failed, using keyword fallback");
                Classification {
                    category: keyword_classify(request.text, request.filename, request.categories),
                    subdirectory: None,
                    confidence: ClassifierConfidence::Low,
                    fallback_used: true,
                }
            }
        }
    }
}

fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn context_hints(text: &str, filename: &str) -> String {
    let mut hints = Vec::new();

    let filename_lower = filename.to_lowercase();
    for (hint, patterns) in FILENAME_HINTS {
        if patterns.iter().any(|p| filename_lower.contains(p)) {
            hints.push(*hint);
        }
    }

    let text_sample = char_prefix(text, 500).to_lowercase();
    for (hint, patterns) in CONTENT_HINTS {
        if patterns.iter().any(|p| text_sample.contains(p)) {
            hints.push(*hint);
        }
    }

    if hints.is_empty() {
        "Keine spezifischen Hinweise".to_string()
    } else {
        hints.join(", ")
    }
}

fn build_prompt(request: &ClassifyRequest<'_>) -> String {
    format!(
        "Du bist ein Experte für deutsche Dokumentenklassifizierung.\n\
         Analysiere das Dokument und wähle die beste Kategorie basierend auf Inhalt, \
         Dateiname und verfügbaren Verzeichnissen.\n\n\
         DOKUMENT-KONTEXT:\n\
         - Dateiname: {filename}\n\
         - Textlänge: {text_length} Zeichen\n\
         - Erkannte Hinweise: {hints}\n\n\
         VERFÜGBARE KATEGORIEN MIT STRUKTUR:\n\
         {category_context}\n\n\
         KLASSIFIZIERUNGS-REGELN:\n\
         1. Wähle die spezifischste passende Kategorie aus der obigen Liste\n\
         2. Bei Arbeitsdokumenten die Arbeitskategorie\n\
         3. Bei Finanzen/Steuern/Versicherungen die Finanzkategorie\n\
         4. Bei Fahrzeugen die Fahrzeugkategorie\n\
         5. Bei Wohnen/Miete die Wohnkategorie\n\n\
         DOKUMENTENTEXT (erste 2000 Zeichen):\n\
         {text_sample}\n\n\
         WICHTIG: Antworte nur mit dem exakten Kategorienamen aus der Verzeichnisliste oben. \
         Kein Text davor oder danach, nur der Kategoriename.",
        filename = if request.filename.is_empty() {
            "Unbekannt"
        } else {
            request.filename
        },
        text_length = request.text.chars().count(),
        hints = context_hints(request.text, request.filename),
        category_context = request.category_context,
        text_sample = char_prefix(request.text, 2000),
    )
}

/// Extracts a category name from a raw model answer, tolerating reasoning
/// preambles and `<think>` blocks.
fn parse_response(raw: &str, categories: &[String]) -> String {
    // Exact category anywhere in the answer wins.
    for category in categories {
        if raw.contains(category.as_str()) {
            return category.clone();
        }
    }

    // Reasoning models: only the text after the final </think> counts.
    if let Some((_, tail)) = raw.rsplit_once("</think>") {
        let final_answer = tail.trim();
        for category in categories {
            if final_answer.contains(category.as_str()) {
                return category.clone();
            }
        }
        return final_answer.to_string();
    }

    // Scan lines for a short clean answer, skipping obvious preamble.
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty()
            || line.starts_with('<')
            || line.starts_with("Okay")
            || line.starts_with("Ich")
        {
            continue;
        }
        for category in categories {
            if line.contains(category.as_str()) {
                return category.clone();
            }
        }
        if line.chars().count() < 50 && !line.ends_with('?') {
            return line.to_string();
        }
    }

    raw.replace("<think>", "")
        .replace("</think>", "")
        .trim()
        .lines()
        .last()
        .unwrap_or("")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_exact_category() {
        let cats = categories(&["Finanzen", "Arbeit"]);
        assert_eq!(parse_response("Finanzen", &cats), "Finanzen");
        assert_eq!(
            parse_response("Die Kategorie ist Finanzen", &cats),
            "Finanzen"
        );
    }

    #[test]
    fn test_parse_think_block() {
        let cats = categories(&["Finanzen", "Arbeit"]);
        let raw = "<think>Das Dokument erwähnt Gehalt...</think>\nArbeit";
        assert_eq!(parse_response(raw, &cats), "Arbeit");
    }

    #[test]
    fn test_parse_think_block_without_category() {
        let cats = categories(&["Finanzen"]);
        let raw = "<think>unsicher</think>\nVielleicht Reisen";
        assert_eq!(parse_response(raw, &cats), "Vielleicht Reisen");
    }

    #[test]
    fn test_parse_skips_preamble_lines() {
        let cats = categories(&["Finanzen"]);
        let raw = "Okay, ich analysiere das Dokument.\nSonstiges";
        assert_eq!(parse_response(raw, &cats), "Sonstiges");
    }

    #[test]
    fn test_context_hints_from_filename_and_text() {
        let hints = context_hints("Der Betrag in Euro beträgt 100", "rechnung_2024.pdf");
        assert!(hints.contains("Rechnung"));
        assert!(hints.contains("Finanzendokument"));
    }

    #[test]
    fn test_context_hints_empty() {
        assert_eq!(
            context_hints("nichts", "datei.pdf"),
            "Keine spezifischen Hinweise"
        );
    }

    #[test]
    fn test_prompt_caps_text_sample() {
        let text = "a".repeat(3000);
        let request = ClassifyRequest {
            text: &text,
            filename: "datei.pdf",
            categories: &[],
            category_context: "- Sonstiges",
        };
        let prompt = build_prompt(&request);
        assert!(prompt.contains("3000 Zeichen"));
        assert!(!prompt.contains(&"a".repeat(2001)));
    }
}
