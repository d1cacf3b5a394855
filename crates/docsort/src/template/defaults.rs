use super::schema::Template;

/// IDs of the built-in templates. These are never written back to the
/// persistence store; only user-added templates are persisted.
pub const BUILTIN_TEMPLATE_IDS: [&str; 6] = [
    "invoice_de_standard",
    "contract_de_standard",
    "bank_statement_de",
    "insurance_de",
    "employment_contract_de",
    "rental_contract_de",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn template(
    id: &str,
    name: &str,
    document_type: &str,
    patterns: &[&str],
    keywords: &[&str],
    structural_markers: &[&str],
    confidence_threshold: f64,
    priority: i32,
) -> Template {
    let mut t = Template::new(id, name, document_type);
    t.patterns = strings(patterns);
    t.keywords = strings(keywords);
    t.structural_markers = strings(structural_markers);
    t.confidence_threshold = confidence_threshold;
    t.priority = priority;
    t
}

/// Built-in templates for common German document types.
pub fn builtin_templates() -> Vec<Template> {
    vec![
        template(
            "invoice_de_standard",
            "Deutsche Rechnung (Standard)",
            "invoice",
            &[
                r"rechnung",
                r"invoice",
                r"rechnungs[-\s]*nr",
                r"invoice[-\s]*number",
                r"rg[-\s]*\d+",
                r"betrag",
            ],
            &[
                "rechnung",
                "invoice",
                "betrag",
                "summe",
                "total",
                "netto",
                "brutto",
                "umsatzsteuer",
                "mwst",
                "vat",
                "ust-id",
                "steuer-nr",
                "fälligkeitsdatum",
                "rechnungsempfänger",
                "gesamtbetrag",
            ],
            &[
                "rechnungsdatum",
                "leistungsdatum",
                "fälligkeitsdatum",
                "rechnungsempfänger",
                "rechnungssteller",
                "zahlungsziel",
                "betrag netto",
                "gesamtbetrag",
            ],
            0.4,
            10,
        ),
        template(
            "contract_de_standard",
            "Deutscher Vertrag (Standard)",
            "contract",
            &[r"\bvertrag\b", r"\bcontract\b", r"vertragspartner", r"§\s*\d+"],
            &[
                "vertrag",
                "contract",
                "vereinbarung",
                "agreement",
                "vertragspartner",
                "laufzeit",
                "kündigung",
                "bedingungen",
                "pflichten",
                "rechte",
            ],
            &[
                "vertragsgegenstand",
                "vertragslaufzeit",
                "kündigungsfrist",
                "§",
                "artikel",
                "ziffer",
                "absatz",
            ],
            0.7,
            9,
        ),
        template(
            "bank_statement_de",
            "Deutscher Kontoauszug",
            "bank_statement",
            &[
                r"kontoauszug",
                r"bank\s*statement",
                r"IBAN\s*:\s*[A-Z]{2}\d{2}",
                r"umsatzübersicht",
            ],
            &[
                "kontoauszug",
                "bank",
                "konto",
                "saldo",
                "buchung",
                "überweisung",
                "lastschrift",
                "gutschrift",
                "iban",
                "bic",
            ],
            &[
                "buchungstag",
                "wertstellung",
                "verwendungszweck",
                "empfänger",
                "betrag",
                "saldo",
            ],
            0.8,
            8,
        ),
        template(
            "insurance_de",
            "Versicherungsdokument",
            "insurance",
            &[r"versicherung", r"insurance", r"police", r"versicherungsschein"],
            &[
                "versicherung",
                "police",
                "prämie",
                "beitrag",
                "schaden",
                "schadensfall",
                "versicherungsnehmer",
                "leistung",
            ],
            &[
                "versicherungsnummer",
                "versicherungsnehmer",
                "versicherungsschutz",
                "prämie",
                "selbstbeteiligung",
                "deckungssumme",
            ],
            0.7,
            7,
        ),
        template(
            "employment_contract_de",
            "Arbeitsvertrag",
            "employment_contract",
            &[r"arbeitsvertrag", r"employment\s*contract", r"arbeitsplatz", r"gehalt"],
            &[
                "arbeitsvertrag",
                "arbeitnehmer",
                "arbeitgeber",
                "gehalt",
                "lohn",
                "arbeitszeit",
                "urlaub",
                "kündigung",
                "probezeit",
            ],
            &[
                "arbeitsort",
                "arbeitszeit",
                "vergütung",
                "probezeit",
                "kündigungsfrist",
                "urlaubsanspruch",
            ],
            0.8,
            8,
        ),
        template(
            "rental_contract_de",
            "Mietvertrag",
            "rental_contract",
            &[r"mietvertrag", r"rental\s*contract", r"miete", r"vermieter"],
            &[
                "mietvertrag",
                "mieter",
                "vermieter",
                "miete",
                "kaution",
                "nebenkosten",
                "wohnung",
                "mietobjekt",
            ],
            &[
                "mietobjekt",
                "mietbeginn",
                "mietpreis",
                "kaution",
                "nebenkosten",
                "kündigungsfrist",
            ],
            0.8,
            8,
        ),
    ]
}
