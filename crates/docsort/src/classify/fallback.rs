//! Deterministic keyword classification used when the model is
//! unreachable or answers off-list.

use tracing::debug;

/// Keyword groups mapped to category name fragments. The group name is
/// itself matched against the category list, so a `Finanzen` directory is
/// found both via the `finanzen` fragment and via its keywords.
const KEYWORD_MAPPINGS: &[(&str, &[&str])] = &[
    (
        "arbeit",
        &["arbeit", "gehalt", "lohn", "arbeitsvertrag", "job"],
    ),
    (
        "finanzen",
        &["rechnung", "invoice", "betrag", "euro", "umsatzsteuer", "bank", "steuer"],
    ),
    ("versicherung", &["versicherung", "police", "schadensfall"]),
    ("wohnen", &["miete", "wohnung", "hausverwaltung", "mietvertrag"]),
    ("fahrzeug", &["auto", "kfz", "fahrzeug", "tüv", "motorrad"]),
    (
        "medizin",
        &["arzt", "behandlung", "patient", "medizin", "gesundheit"],
    ),
    ("kita", &["kita", "kindergarten", "betreuung"]),
];

const PREFERRED_FALLBACKS: &[&str] = &["Sonstiges", "sonstiges"];

/// First `n` characters of `text`, respecting char boundaries.
fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Best-guess category from filename and text keywords. Always returns
/// something: a keyword-matched category, a preferred fallback present in
/// the list, the first category, or `Sonstiges` for an empty list.
pub fn keyword_classify(text: &str, filename: &str, categories: &[String]) -> String {
    let filename_lower = filename.to_lowercase();
    let text_sample = char_prefix(text, 500).to_lowercase();

    for (pattern, keywords) in KEYWORD_MAPPINGS {
        let hit = keywords
            .iter()
            .any(|kw| filename_lower.contains(kw) || text_sample.contains(kw));
        if !hit {
            continue;
        }

        for category in categories {
            let category_lower = category.to_lowercase();
            if category_lower.contains(pattern)
                || keywords.iter().any(|kw| category_lower.contains(kw))
            {
                debug!(pattern, category = %category, "keyword fallback matched");
                return category.clone();
            }
        }
    }

    for fallback in PREFERRED_FALLBACKS {
        if let Some(category) = categories.iter().find(|c| c == fallback) {
            return category.clone();
        }
    }

    categories
        .first()
        .cloned()
        .unwrap_or_else(|| "Sonstiges".to_string())
}
