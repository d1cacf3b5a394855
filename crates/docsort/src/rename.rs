//! Date-aware filename suggestions.
//!
//! Suggested names follow `YYYY-MM-DD_<category>_<name>.pdf`, with the
//! date taken from the document text when possible.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{Datelike, Local, NaiveDate};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Where the suggested date came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    /// A past date found in the document text.
    Content,
    /// No usable date in the text; today's date was used.
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameSuggestion {
    pub original_filename: String,
    pub suggested_filename: String,
    pub extracted_dates: Vec<NaiveDate>,
    pub selected_date: NaiveDate,
    pub category: String,
    pub date_source: DateSource,
}

pub trait FilenameSuggester: Send + Sync {
    fn suggest(&self, original: &str, text: &str, category: &str) -> FilenameSuggestion;
}

const MONTH_NAMES: &[(&str, u32)] = &[
    ("januar", 1),
    ("februar", 2),
    ("märz", 3),
    ("april", 4),
    ("mai", 5),
    ("juni", 6),
    ("juli", 7),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("november", 11),
    ("dezember", 12),
    ("jan", 1),
    ("feb", 2),
    ("mär", 3),
    ("apr", 4),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("okt", 10),
    ("nov", 11),
    ("dez", 12),
];

struct RenamePatterns {
    date_dmy: Regex,
    date_iso: Regex,
    date_dmy_short: Regex,
    date_month_name: Regex,
    scan_artifacts: Vec<Regex>,
    leading_date: Regex,
    separators: Regex,
    leading_digits: Regex,
}

fn ci(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern).case_insensitive(true).build().ok()
}

fn patterns() -> Option<&'static RenamePatterns> {
    static PATTERNS: OnceLock<Option<RenamePatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(RenamePatterns {
                date_dmy: ci(r"(\d{1,2})[./](\d{1,2})[./](\d{4})")?,
                date_iso: ci(r"(\d{4})-(\d{1,2})-(\d{1,2})")?,
                date_dmy_short: ci(r"(\d{1,2})[./](\d{1,2})[./](\d{2})\b")?,
                date_month_name: ci(
                    r"(\d{1,2})\.\s*(Januar|Februar|März|April|Mai|Juni|Juli|August|September|Oktober|November|Dezember|Jan|Feb|Mär|Apr|Jun|Jul|Aug|Sep|Okt|Nov|Dez)\s*(\d{4})",
                )?,
                scan_artifacts: vec![
                    ci(r"[#_]*scanbot[#_]*")?,
                    ci(r"[#_]*gescanntes?\s*dokument[#_]*")?,
                    ci(r"[#_]*scan[#_]*")?,
                ],
                leading_date: ci(r"^[\d\-\./]+[_\s]*")?,
                separators: ci(r"[_\s]+")?,
                leading_digits: ci(r"^\d+[_\s]*")?,
            })
        })
        .as_ref()
}

/// Filename suggester backed by German/ISO date extraction.
pub struct SmartRenamer;

impl SmartRenamer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SmartRenamer {
    fn default() -> Self {
        Self::new()
    }
}

fn push_date(dates: &mut Vec<NaiveDate>, year: i32, month: u32, day: u32) {
    if !(1900..=2100).contains(&year) {
        return;
    }
    if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
        if !dates.contains(&date) {
            dates.push(date);
        }
    }
}

/// All distinct valid dates found in the text, sorted ascending.
pub fn extract_dates(text: &str) -> Vec<NaiveDate> {
    let Some(pats) = patterns() else {
        return Vec::new();
    };
    let mut dates = Vec::new();

    for caps in pats.date_dmy.captures_iter(text) {
        if let (Ok(day), Ok(month), Ok(year)) =
            (caps[1].parse(), caps[2].parse(), caps[3].parse())
        {
            push_date(&mut dates, year, month, day);
        }
    }

    for caps in pats.date_iso.captures_iter(text) {
        if let (Ok(year), Ok(month), Ok(day)) =
            (caps[1].parse(), caps[2].parse(), caps[3].parse())
        {
            push_date(&mut dates, year, month, day);
        }
    }

    for caps in pats.date_dmy_short.captures_iter(text) {
        if let (Ok(day), Ok(month), Ok(year_short)) =
            (caps[1].parse(), caps[2].parse(), caps[3].parse::<i32>())
        {
            // Two-digit years pivot at 50.
            let year = if year_short < 50 {
                2000 + year_short
            } else {
                1900 + year_short
            };
            push_date(&mut dates, year, month, day);
        }
    }

    for caps in pats.date_month_name.captures_iter(text) {
        let month_name = caps[2].to_lowercase();
        let month = MONTH_NAMES
            .iter()
            .find(|(name, _)| *name == month_name)
            .map(|(_, m)| *m);
        if let (Ok(day), Some(month), Ok(year)) = (caps[1].parse(), month, caps[3].parse()) {
            push_date(&mut dates, year, month, day);
        }
    }

    dates.sort();
    dates
}

fn most_recent_past_date(dates: &[NaiveDate]) -> Option<NaiveDate> {
    let today = Local::now().date_naive();
    dates.iter().filter(|d| **d <= today).max().copied()
}

/// Strips the extension, scan artifacts and leading date fragments, and
/// collapses separators to single underscores.
fn clean_filename(filename: &str) -> String {
    let Some(pats) = patterns() else {
        return filename.to_string();
    };

    let mut name = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string();

    for artifact in &pats.scan_artifacts {
        name = artifact.replace_all(&name, "").to_string();
    }
    name = pats.leading_date.replace(&name, "").to_string();
    name = pats.separators.replace_all(&name, "_").to_string();
    name.trim_matches('_').to_string()
}

/// Lowercases the category and drops a leading ordering number
/// (`01 Arbeit` becomes `arbeit`).
fn clean_category(category: &str) -> String {
    let Some(pats) = patterns() else {
        return category.to_lowercase();
    };

    let cleaned = pats.leading_digits.replace(category, "");
    let cleaned = pats.separators.replace_all(&cleaned, "_");
    cleaned.trim_matches('_').to_lowercase()
}

impl FilenameSuggester for SmartRenamer {
    fn suggest(&self, original: &str, text: &str, category: &str) -> FilenameSuggestion {
        let extracted_dates = extract_dates(text);
        let content_date = most_recent_past_date(&extracted_dates);

        let (selected_date, date_source) = match content_date {
            Some(date) => (date, DateSource::Content),
            None => (Local::now().date_naive(), DateSource::Fallback),
        };

        let clean_name = clean_filename(original);
        let category_clean = clean_category(category);
        let date_str = format!(
            "{:04}-{:02}-{:02}",
            selected_date.year(),
            selected_date.month(),
            selected_date.day()
        );

        let stem = if clean_name.is_empty() {
            "dokument"
        } else {
            clean_name.as_str()
        };
        let suggested_filename = format!("{date_str}_{category_clean}_{stem}.pdf");

        FilenameSuggestion {
            original_filename: original.to_string(),
            suggested_filename,
            extracted_dates,
            selected_date,
            category: category.to_string(),
            date_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extract_german_dates() {
        let dates = extract_dates("Rechnung vom 15.01.2024, fällig am 29.01.2024");
        assert_eq!(dates, vec![date(2024, 1, 15), date(2024, 1, 29)]);
    }

    #[test]
    fn test_extract_iso_and_short_dates() {
        let dates = extract_dates("Erstellt 2023-06-01, unterschrieben 05.07.23");
        assert_eq!(dates, vec![date(2023, 6, 1), date(2023, 7, 5)]);
    }

    #[test]
    fn test_short_year_pivot() {
        let dates = extract_dates("alt: 01.01.99 neu: 01.01.01");
        assert_eq!(dates, vec![date(1999, 1, 1), date(2001, 1, 1)]);
    }

    #[test]
    fn test_extract_month_names() {
        let dates = extract_dates("München, den 3. März 2024 und 12. Okt 2023");
        assert_eq!(dates, vec![date(2023, 10, 12), date(2024, 3, 3)]);
    }

    #[test]
    fn test_invalid_dates_skipped() {
        let dates = extract_dates("am 32.01.2024 oder 15.13.2024");
        assert!(dates.is_empty());
    }

    #[test]
    fn test_duplicates_removed() {
        let dates = extract_dates("15.01.2024 und nochmal 15.01.2024");
        assert_eq!(dates.len(), 1);
    }

    #[test]
    fn test_clean_filename_strips_artifacts() {
        assert_eq!(clean_filename("Scanbot_2024-01-15_Rechnung.pdf"), "Rechnung");
        assert_eq!(
            clean_filename("Gescanntes Dokument 5.pdf"),
            "5"
        );
    }

    #[test]
    fn test_clean_category() {
        assert_eq!(clean_category("01 Arbeit"), "arbeit");
        assert_eq!(clean_category("Finanzen"), "finanzen");
        assert_eq!(clean_category("02_Steuern Unterlagen"), "steuern_unterlagen");
    }

    #[test]
    fn test_suggest_uses_content_date() {
        let suggestion = SmartRenamer::new().suggest(
            "Scan_Rechnung.pdf",
            "Rechnung vom 15.01.2024",
            "02 Finanzen",
        );
        assert_eq!(suggestion.suggested_filename, "2024-01-15_finanzen_Rechnung.pdf");
        assert_eq!(suggestion.date_source, DateSource::Content);
        assert_eq!(suggestion.selected_date, date(2024, 1, 15));
    }

    #[test]
    fn test_suggest_falls_back_to_today() {
        let suggestion = SmartRenamer::new().suggest("notiz.pdf", "kein Datum", "Sonstiges");
        assert_eq!(suggestion.date_source, DateSource::Fallback);
        assert_eq!(suggestion.selected_date, Local::now().date_naive());
        assert!(suggestion.extracted_dates.is_empty());
    }

    #[test]
    fn test_future_dates_ignored_for_selection() {
        let suggestion =
            SmartRenamer::new().suggest("plan.pdf", "Termin am 01.01.2095", "Sonstiges");
        assert_eq!(suggestion.date_source, DateSource::Fallback);
        assert_eq!(suggestion.extracted_dates, vec![date(2095, 1, 1)]);
    }

    #[test]
    fn test_empty_stem_becomes_dokument() {
        let suggestion =
            SmartRenamer::new().suggest("Scan.pdf", "Rechnung vom 15.01.2024", "Finanzen");
        assert_eq!(
            suggestion.suggested_filename,
            "2024-01-15_finanzen_dokument.pdf"
        );
    }
}
