//! Built-in rules shipped with every installation. These cover the
//! common German document types without any configuration.

use super::rule::{RuleAction, RuleConditions, WorkflowRule};

pub const BUILTIN_RULE_IDS: [&str; 5] = [
    "template_high_confidence",
    "invoice_to_finance",
    "contracts_to_legal",
    "bank_to_banking",
    "low_confidence_manual",
];

pub fn builtin_rules() -> Vec<WorkflowRule> {
    vec![
        WorkflowRule {
            conditions: RuleConditions {
                min_template_confidence: Some(0.8),
                ..Default::default()
            },
            actions: vec![RuleAction::Classify],
            priority: 10,
            ..WorkflowRule::new(
                "template_high_confidence",
                "Hohe Template-Konfidenz",
            )
        },
        WorkflowRule {
            conditions: RuleConditions {
                document_type: Some(vec!["invoice".to_string()]),
                ..Default::default()
            },
            actions: vec![RuleAction::ForceCategory {
                category: Some("Finanzen".to_string()),
            }],
            priority: 9,
            ..WorkflowRule::new("invoice_to_finance", "Rechnungen nach Finanzen")
        },
        WorkflowRule {
            conditions: RuleConditions {
                document_type: Some(vec![
                    "contract".to_string(),
                    "employment_contract".to_string(),
                    "rental_contract".to_string(),
                ]),
                ..Default::default()
            },
            actions: vec![RuleAction::ForceCategory {
                category: Some("Verträge".to_string()),
            }],
            priority: 9,
            ..WorkflowRule::new("contracts_to_legal", "Verträge sammeln")
        },
        WorkflowRule {
            conditions: RuleConditions {
                document_type: Some(vec!["bank_statement".to_string()]),
                ..Default::default()
            },
            actions: vec![RuleAction::ForceCategory {
                category: Some("Banken".to_string()),
            }],
            priority: 9,
            ..WorkflowRule::new("bank_to_banking", "Kontoauszüge nach Banken")
        },
        WorkflowRule {
            conditions: RuleConditions {
                min_template_confidence: Some(0.0),
                ..Default::default()
            },
            actions: vec![RuleAction::ManualReview],
            priority: 1,
            ..WorkflowRule::new("low_confidence_manual", "Unsichere Dokumente prüfen")
        },
    ]
}
