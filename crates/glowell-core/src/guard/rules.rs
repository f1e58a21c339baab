//! Built-in compliance rules.
//!
//! Order matters: banned-term rules run first, then any configured extra
//! rules, then [`soften_rule`] last.

use serde::{Deserialize, Serialize};

/// Replacement used when a rule does not name one.
pub const REDACTED: &str = "[redacted]";

/// One disallowed term class: pattern, replacement, and the reason shown to
/// the caller. Patterns are matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRule {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ComplianceRule {
    /// Create a rule that redacts matches with [`REDACTED`].
    pub fn new(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: None,
            reason: reason.into(),
            suggestion: None,
        }
    }

    /// Set the replacement text.
    pub fn replacement(mut self, text: impl Into<String>) -> Self {
        self.replacement = Some(text.into());
        self
    }

    /// Set the suggestion shown alongside violations.
    pub fn suggestion(mut self, text: impl Into<String>) -> Self {
        self.suggestion = Some(text.into());
        self
    }

    pub fn effective_replacement(&self) -> &str {
        self.replacement.as_deref().unwrap_or(REDACTED)
    }
}

/// Banned-term rules: medicine names, doses, diagnostic language, and
/// cure/treatment claims.
pub fn builtin_rules() -> Vec<ComplianceRule> {
    vec![
        ComplianceRule::new(
            r"\b(?:metformin|insulin|ibuprofen|paracetamol|acetaminophen|aspirin|antibiotics?|steroids?|statins?|antidepressants?)\b",
            "names a medicine",
        )
        .suggestion("Discuss any medicines with your doctor."),
        ComplianceRule::new(
            r"\b\d+(?:\.\d+)?\s?(?:mg|mcg|ml|iu)\b",
            "gives a dose",
        )
        .suggestion("Leave dosing to a qualified professional."),
        ComplianceRule::new(
            r"\b(?:diagnos(?:e|es|ed|is|ing)|prescri(?:be|bes|bed|ption|ptions))\b",
            "uses diagnostic or prescribing language",
        )
        .suggestion("Describe habits, not conditions."),
        ComplianceRule::new(
            r"\b(?:cures?|cured|curing|treats?|treated|treating|treatment|heals?|healed|reverses?|reversed)\b",
            "claims to cure or treat a condition",
        )
        .replacement("supports")
        .suggestion("Describe benefits as support, not cure."),
    ]
}

/// Global pass that turns absolute claims into hedged ones.
pub fn soften_rule() -> ComplianceRule {
    ComplianceRule::new(
        r"\b(?:guarantee[sd]?|will|certainly|definitely)\b|\b100\s?%",
        "absolute claim softened",
    )
    .replacement("may")
}
