//! Content safety filter.
//!
//! [`ComplianceGuard`] rewrites every string reachable in a plan (or any
//! JSON tree) using an ordered list of [`ComplianceRule`]s, records a
//! [`Violation`] per match, and attaches the disclaimer.
//!
//! The whole rule set is re-applied until a pass changes nothing, bounded by
//! `max_passes`. A string that still matches after the last pass is replaced
//! wholesale by [`REDACTED`], so a filtered tree never contains a match.
//!
//! Rules may not match the fixed values a plan is built around: meal labels,
//! `HH:MM` clock times and the disclaimer id. Those are rejected when the
//! guard is built, so filtering never rewrites plan structure.

pub mod rules;
pub mod walk;

use regex::{NoExpand, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{DEFAULT_DISCLAIMER, DEFAULT_MAX_FILTER_PASSES, GenerateConfig};
use crate::plan::{MEAL_ORDER, PlanDraft, SafePlan};

pub use rules::{ComplianceRule, REDACTED, builtin_rules, soften_rule};
pub use walk::TextFields;

/// Errors from building a guard.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("invalid rule pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("replacement {replacement:?} is itself matched by rule {pattern:?}")]
    UnstableReplacement { replacement: String, pattern: String },

    #[error("disclaimer text is matched by rule {pattern:?}")]
    UnsafeDisclaimer { pattern: String },

    #[error("rule {pattern:?} matches the fixed plan value {value:?}")]
    StructuralMatch { value: String, pattern: String },
}

/// One rewritten match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Path of the string that matched, e.g. `day.meals[0].ideas[1]`.
    pub section: String,
    /// The matched text.
    pub text: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A filtered plan plus everything the filter rewrote.
#[derive(Debug, Clone, Serialize)]
pub struct GuardResult {
    pub plan: SafePlan,
    pub violations: Vec<Violation>,
}

impl GuardResult {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug)]
struct CompiledRule {
    rule: ComplianceRule,
    regex: Regex,
}

// ---------------------------------------------------------------------------
// ComplianceGuard
// ---------------------------------------------------------------------------

/// Compiled, ordered rule set. Cheap to share; filtering never fails.
#[derive(Debug)]
pub struct ComplianceGuard {
    rules: Vec<CompiledRule>,
    max_passes: usize,
    disclaimer_text: String,
    disclaimer_id: String,
}

impl ComplianceGuard {
    /// Build a guard from an explicit, ordered rule list with the default
    /// disclaimer and pass bound.
    pub fn new(rules: Vec<ComplianceRule>) -> Result<Self, GuardError> {
        let compiled = rules
            .into_iter()
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;
        let guard = Self {
            rules: compiled,
            max_passes: DEFAULT_MAX_FILTER_PASSES,
            disclaimer_text: DEFAULT_DISCLAIMER.to_string(),
            disclaimer_id: crate::config::SchemaVersion::default()
                .default_disclaimer_id()
                .to_string(),
        };
        guard.check_replacements()?;
        guard.check_structure()?;
        guard.check_disclaimer()?;
        Ok(guard)
    }

    /// Built-in rules, then `config.rules`, then the soften rule; disclaimer
    /// and pass bound taken from the config.
    pub fn from_config(config: &GenerateConfig) -> Result<Self, GuardError> {
        let mut rules = builtin_rules();
        rules.extend(config.rules.iter().cloned());
        rules.push(soften_rule());
        Self::new(rules)?
            .max_passes(config.max_filter_passes)
            .disclaimer(
                config.effective_disclaimer_text(),
                config.effective_disclaimer_id(),
            )
    }

    /// Set the pass bound (at least one pass always runs).
    pub fn max_passes(mut self, passes: usize) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    /// Replace the disclaimer. Fails if any rule matches the new text or id.
    pub fn disclaimer(
        mut self,
        text: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<Self, GuardError> {
        self.disclaimer_text = text.into();
        self.disclaimer_id = id.into();
        self.check_disclaimer()?;
        Ok(self)
    }

    /// Active rules in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = &ComplianceRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn disclaimer_text(&self) -> &str {
        &self.disclaimer_text
    }

    /// First rule whose pattern matches `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&ComplianceRule> {
        self.rules
            .iter()
            .find(|c| c.regex.is_match(text))
            .map(|c| &c.rule)
    }

    /// Filter a draft into a [`SafePlan`].
    pub fn filter(&self, draft: PlanDraft) -> GuardResult {
        let mut plan = draft;
        let violations = self.filter_tree(&mut plan);

        let meta = &mut plan.meta;
        if meta.disclaimer_text.as_deref().is_none_or(|t| t.trim().is_empty()) {
            meta.disclaimer_text = Some(self.disclaimer_text.clone());
        }
        if meta.disclaimer_id.trim().is_empty() {
            meta.disclaimer_id = self.disclaimer_id.clone();
        }

        GuardResult {
            plan: SafePlan::from_filtered(plan),
            violations,
        }
    }

    /// Filter an arbitrary JSON tree in place. Non-string leaves pass
    /// through unchanged.
    pub fn filter_value(&self, value: &mut Value) -> Vec<Violation> {
        self.filter_tree(value)
    }

    fn filter_tree<T: TextFields + ?Sized>(&self, tree: &mut T) -> Vec<Violation> {
        let mut violations = Vec::new();
        tree.visit_text_mut("", &mut |section, text| {
            self.clean_text(section, text, &mut violations);
        });
        violations
    }

    /// Apply the rule set to one string until it reaches a fixed point.
    fn clean_text(&self, section: &str, text: &mut String, violations: &mut Vec<Violation>) {
        for _ in 0..self.max_passes {
            let mut changed = false;
            for compiled in &self.rules {
                if !compiled.regex.is_match(text.as_str()) {
                    continue;
                }
                for m in compiled.regex.find_iter(text.as_str()) {
                    violations.push(Violation {
                        section: section.to_string(),
                        text: m.as_str().to_string(),
                        reason: compiled.rule.reason.clone(),
                        suggestion: compiled.rule.suggestion.clone(),
                    });
                }
                let replacement = compiled.rule.effective_replacement();
                let rewritten = compiled
                    .regex
                    .replace_all(text.as_str(), NoExpand(replacement))
                    .into_owned();
                *text = rewritten;
                changed = true;
            }
            if !changed {
                return;
            }
        }

        if let Some(rule) = self.first_match(text.as_str()) {
            tracing::warn!(
                section,
                pattern = %rule.pattern,
                passes = self.max_passes,
                "text still matches after the last filter pass; redacting it entirely"
            );
            violations.push(Violation {
                section: section.to_string(),
                text: std::mem::take(text),
                reason: format!("unresolved after {} passes: {}", self.max_passes, rule.reason),
                suggestion: rule.suggestion.clone(),
            });
            *text = REDACTED.to_string();
        }
    }

    fn check_replacements(&self) -> Result<(), GuardError> {
        let replacements = self
            .rules
            .iter()
            .map(|c| c.rule.effective_replacement())
            .chain(std::iter::once(REDACTED));
        for replacement in replacements {
            if let Some(rule) = self.first_match(replacement) {
                return Err(GuardError::UnstableReplacement {
                    replacement: replacement.to_string(),
                    pattern: rule.pattern.clone(),
                });
            }
        }
        Ok(())
    }

    /// Meal labels and every `HH:MM` from `00:00` to `23:59`.
    fn check_structure(&self) -> Result<(), GuardError> {
        let times = (0..24).flat_map(|h| (0..60).map(move |m| format!("{h:02}:{m:02}")));
        let values = MEAL_ORDER.iter().map(|l| l.to_string()).chain(times);
        for value in values {
            if let Some(rule) = self.first_match(&value) {
                return Err(GuardError::StructuralMatch {
                    pattern: rule.pattern.clone(),
                    value,
                });
            }
        }
        Ok(())
    }

    fn check_disclaimer(&self) -> Result<(), GuardError> {
        if let Some(rule) = self.first_match(&self.disclaimer_text) {
            return Err(GuardError::UnsafeDisclaimer {
                pattern: rule.pattern.clone(),
            });
        }
        if let Some(rule) = self.first_match(&self.disclaimer_id) {
            return Err(GuardError::StructuralMatch {
                value: self.disclaimer_id.clone(),
                pattern: rule.pattern.clone(),
            });
        }
        Ok(())
    }
}

fn compile(rule: ComplianceRule) -> Result<CompiledRule, GuardError> {
    let regex = RegexBuilder::new(&rule.pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| GuardError::InvalidPattern {
            pattern: rule.pattern.clone(),
            source,
        })?;
    Ok(CompiledRule { rule, regex })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn default_guard() -> ComplianceGuard {
        ComplianceGuard::from_config(&GenerateConfig::default()).unwrap()
    }

    fn clean(guard: &ComplianceGuard, input: &str) -> (String, Vec<Violation>) {
        let mut value = Value::String(input.to_string());
        let violations = guard.filter_value(&mut value);
        (value.as_str().unwrap().to_string(), violations)
    }

    #[test]
    fn redacts_medicine_and_dose_case_insensitively() {
        let (text, violations) = clean(&default_guard(), "Take 500 mg METFORMIN daily");
        assert_eq!(text, "Take [redacted] [redacted] daily");
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].reason, "names a medicine");
        assert_eq!(violations[0].text, "METFORMIN");
        assert_eq!(violations[1].reason, "gives a dose");
        assert_eq!(violations[1].text, "500 mg");
    }

    #[test]
    fn cure_claims_become_support() {
        let (text, violations) = clean(&default_guard(), "Turmeric cures colds");
        assert_eq!(text, "Turmeric supports colds");
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].suggestion.as_deref(),
            Some("Describe benefits as support, not cure.")
        );
    }

    #[test]
    fn soften_pass_runs_after_banned_terms() {
        let (text, _) = clean(&default_guard(), "This will work, 100% guaranteed");
        assert_eq!(text, "This may work, may may");
    }

    #[test]
    fn word_boundaries_are_respected() {
        let guard = default_guard();
        let (text, violations) = clean(&guard, "A healthy willow tree");
        assert_eq!(text, "A healthy willow tree");
        assert!(violations.is_empty());
    }

    #[test]
    fn every_match_is_recorded() {
        let (_, violations) = clean(&default_guard(), "aspirin or ibuprofen");
        let texts: Vec<&str> = violations.iter().map(|v| v.text.as_str()).collect();
        assert_eq!(texts, vec!["aspirin", "ibuprofen"]);
    }

    #[test]
    fn later_rule_sees_earlier_rewrite_in_same_pass() {
        let guard = ComplianceGuard::new(vec![
            ComplianceRule::new("foo", "foo").replacement("bar"),
            ComplianceRule::new("xbar", "xbar").replacement("ok"),
        ])
        .unwrap();
        let (text, violations) = clean(&guard, "xfoo");
        assert_eq!(text, "ok");
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn earlier_rule_rematched_after_later_replacement() {
        // Rule 2 rewrites into something rule 1 matches; only a second pass
        // reaches the fixed point.
        let guard = ComplianceGuard::new(vec![
            ComplianceRule::new("xy", "xy").replacement("z"),
            ComplianceRule::new("q", "q").replacement("y"),
        ])
        .unwrap();
        let (text, violations) = clean(&guard, "xq");
        assert_eq!(text, "z");
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn unresolved_text_is_redacted_wholesale() {
        // "aab" -> "ab" still matches; one pass cannot reach the fixed point.
        let guard = ComplianceGuard::new(vec![ComplianceRule::new("ab", "ab").replacement("b")])
            .unwrap()
            .max_passes(1);
        let (text, violations) = clean(&guard, "aab");
        assert_eq!(text, REDACTED);
        assert!(violations.last().unwrap().reason.starts_with("unresolved after 1 passes"));
    }

    #[test]
    fn replacement_with_dollar_is_literal() {
        let guard =
            ComplianceGuard::new(vec![ComplianceRule::new("price", "p").replacement("$1")]).unwrap();
        let (text, _) = clean(&guard, "price");
        assert_eq!(text, "$1");
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let err = ComplianceGuard::new(vec![ComplianceRule::new("(", "broken")]).unwrap_err();
        assert!(matches!(err, GuardError::InvalidPattern { .. }));
    }

    #[test]
    fn self_matching_replacement_is_rejected() {
        let err = ComplianceGuard::new(vec![
            ComplianceRule::new("cat", "animal").replacement("wildcat"),
        ])
        .unwrap_err();
        assert!(matches!(err, GuardError::UnstableReplacement { .. }));
    }

    #[test]
    fn rule_matching_placeholder_is_rejected() {
        let err =
            ComplianceGuard::new(vec![ComplianceRule::new("redacted", "meta").replacement("x")])
                .unwrap_err();
        assert!(matches!(err, GuardError::UnstableReplacement { .. }));
    }

    #[test]
    fn disclaimer_matching_a_rule_is_rejected() {
        let config = GenerateConfig::default().rule(ComplianceRule::new("advice", "no advice"));
        let err = ComplianceGuard::from_config(&config).unwrap_err();
        assert!(matches!(err, GuardError::UnsafeDisclaimer { .. }));
    }

    #[test]
    fn rule_matching_meal_label_is_rejected() {
        let config = GenerateConfig::default().rule(ComplianceRule::new(r"\bevening\b", "late"));
        let err = ComplianceGuard::from_config(&config).unwrap_err();
        match err {
            GuardError::StructuralMatch { value, .. } => assert_eq!(value, "Evening"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rule_matching_clock_time_is_rejected() {
        let config =
            GenerateConfig::default().rule(ComplianceRule::new(r"\b\d{2}:\d{2}\b", "time"));
        let err = ComplianceGuard::from_config(&config).unwrap_err();
        match err {
            GuardError::StructuralMatch { value, .. } => assert_eq!(value, "00:00"),
            other => panic!("unexpected error: {other}"),
        }

        let late_only = ComplianceRule::new(r"\b23:5\d\b", "late night");
        let err = ComplianceGuard::new(vec![late_only]).unwrap_err();
        assert!(matches!(err, GuardError::StructuralMatch { value, .. } if value == "23:50"));
    }

    #[test]
    fn rule_matching_disclaimer_id_is_rejected() {
        let config = GenerateConfig {
            disclaimer_id: Some("clinic-7".into()),
            ..GenerateConfig::default()
        }
        .rule(ComplianceRule::new(r"\bclinic\b", "clinical language"));
        let err = ComplianceGuard::from_config(&config).unwrap_err();
        assert!(matches!(err, GuardError::StructuralMatch { value, .. } if value == "clinic-7"));
    }

    #[test]
    fn filter_value_leaves_non_strings_alone() {
        let guard = default_guard();
        let mut value = json!({ "n": 500, "ok": true, "s": "take insulin", "z": null });
        let violations = guard.filter_value(&mut value);
        assert_eq!(value, json!({ "n": 500, "ok": true, "s": "take [redacted]", "z": null }));
        assert_eq!(violations[0].section, "s");
    }

    #[test]
    fn rules_are_listed_in_order() {
        let config = GenerateConfig::default().rule(ComplianceRule::new("miracle", "hype"));
        let guard = ComplianceGuard::from_config(&config).unwrap();
        let reasons: Vec<&str> = guard.rules().map(|r| r.reason.as_str()).collect();
        assert_eq!(reasons.len(), 6);
        assert_eq!(reasons[4], "hype");
        assert_eq!(reasons[5], "absolute claim softened");
    }
}
