//! Document-type specific metadata extraction.
//!
//! Runs after a template matched and pulls dates, amounts, and type
//! specific identifiers (invoice number, contract number, IBAN) out of
//! the document text.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// Compiles a fixed pattern set, dropping anything that fails to build.
fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| {
            RegexBuilder::new(p)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .ok()
        })
        .collect()
}

struct Patterns {
    dates: Vec<Regex>,
    amounts: Vec<Regex>,
    invoice_number: Vec<Regex>,
    tax_id: Vec<Regex>,
    contract_number: Vec<Regex>,
    contract_end: Vec<Regex>,
    account_number: Vec<Regex>,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        dates: compile(&[
            r"\b(\d{1,2})[./](\d{1,2})[./](\d{4})\b",
            r"\b(\d{4})-(\d{2})-(\d{2})\b",
            r"\b(\d{1,2})\.\s*([A-Za-z]{3,9})\s*(\d{4})\b",
        ]),
        amounts: compile(&[
            r"\b(\d{1,3}(?:[.,]\d{3})*[.,]\d{2})\s*€",
            r"€\s*(\d{1,3}(?:[.,]\d{3})*[.,]\d{2})",
            r"\b(\d{1,3}(?:[.,]\d{3})*[.,]\d{2})\s*EUR",
        ]),
        invoice_number: compile(&[
            r"(?:rechnung|invoice)[^\w]*nr\.?\s*:?\s*([A-Z0-9\-/]+)",
            r"(?:rg|inv)[^\w]*nr\.?\s*:?\s*([A-Z0-9\-/]+)",
            r"nr\.?\s*([A-Z0-9\-/]{3,})",
        ]),
        tax_id: compile(&[
            r"ust[-\s]*id\.?\s*:?\s*([A-Z]{2}\d+)",
            r"steuer[-\s]*nr\.?\s*:?\s*([\d/\s]+)",
        ]),
        contract_number: compile(&[
            r"(?:vertrag|contract)[^\w]*nr\.?\s*:?\s*([A-Z0-9\-/]+)",
            r"(?:kunden|kunde)[^\w]*nr\.?\s*:?\s*([A-Z0-9\-/]+)",
        ]),
        contract_end: compile(&[
            r"(?:laufzeit|gültig)\s+(?:bis|until)\s+([0-9./\-]+)",
            r"(?:endet|ends)\s+(?:am|on)\s+([0-9./\-]+)",
        ]),
        account_number: compile(&[
            r"IBAN\s*:?\s*([A-Z]{2}\d{2}\s?[\d\s]{15,})",
            r"(?:konto|account)[^\w]*nr\.?\s*:?\s*([\d\s]+)",
        ]),
    })
}

/// First capture group of the first pattern that matches.
fn first_capture(pats: &[Regex], text: &str) -> Option<String> {
    for re in pats {
        if let Some(caps) = re.captures(text) {
            if let Some(group) = caps.get(1) {
                return Some(group.as_str().to_string());
            }
        }
    }
    None
}

/// Extract metadata for a matched document type. Dates come from the
/// first date pattern that matches anything, capped at three; amounts
/// are collected across all amount patterns, capped at five.
pub fn extract_metadata(document_type: &str, text: &str) -> HashMap<String, Value> {
    let pats = patterns();
    let mut metadata = HashMap::new();

    for re in &pats.dates {
        let dates: Vec<Value> = re
            .find_iter(text)
            .take(3)
            .map(|m| Value::String(m.as_str().to_string()))
            .collect();
        if !dates.is_empty() {
            metadata.insert("dates".to_string(), Value::Array(dates));
            break;
        }
    }

    let mut amounts = Vec::new();
    for re in &pats.amounts {
        for caps in re.captures_iter(text) {
            if let Some(group) = caps.get(1) {
                amounts.push(Value::String(group.as_str().to_string()));
            }
        }
    }
    if !amounts.is_empty() {
        amounts.truncate(5);
        metadata.insert("amounts".to_string(), Value::Array(amounts));
    }

    match document_type {
        "invoice" => {
            if let Some(number) = first_capture(&pats.invoice_number, text) {
                metadata.insert("invoice_number".to_string(), Value::String(number));
            }
            if let Some(tax_id) = first_capture(&pats.tax_id, text) {
                metadata.insert("tax_id".to_string(), Value::String(tax_id));
            }
        }
        "contract" => {
            if let Some(number) = first_capture(&pats.contract_number, text) {
                metadata.insert("contract_number".to_string(), Value::String(number));
            }
            if let Some(end_date) = first_capture(&pats.contract_end, text) {
                metadata.insert("end_date".to_string(), Value::String(end_date));
            }
        }
        "bank_statement" => {
            if let Some(account) = first_capture(&pats.account_number, text) {
                metadata.insert(
                    "account_number".to_string(),
                    Value::String(account.replace(' ', "")),
                );
            }
        }
        _ => {}
    }

    metadata
}
