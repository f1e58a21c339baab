//! End-to-end generation: normalize, validate, compose, filter.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::SafePlan;
use crate::config::{GenerateConfig, ViolationPolicy};
use crate::guard::{ComplianceGuard, GuardError, Violation};
use crate::intake::{self, Intake, ValidationIssue};
use crate::rules;

/// Internal generation failures. Validation problems are not errors; they
/// come back in [`GenerateOutcome::issues`].
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("malformed intake: {field} = {value:?}")]
    MalformedIntake { field: &'static str, value: String },

    #[error("meal slot {label:?} has no ideas")]
    EmptyMeal { label: String },

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("failed to encode cache key: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result of one generation request.
///
/// `plan` is `None` when validation failed, or when the policy is
/// [`ViolationPolicy::Block`] and the filter recorded violations.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOutcome {
    pub plan: Option<SafePlan>,
    pub issues: Vec<ValidationIssue>,
    pub violations: Vec<Violation>,
}

impl GenerateOutcome {
    fn rejected(issues: Vec<ValidationIssue>) -> Self {
        Self {
            plan: None,
            issues,
            violations: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.plan.is_some()
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// A config paired with its compiled guard, reusable across requests.
#[derive(Debug)]
pub struct Generator {
    config: GenerateConfig,
    guard: ComplianceGuard,
}

impl Generator {
    /// Compile the guard for `config`.
    pub fn new(config: GenerateConfig) -> Result<Self, GuardError> {
        let guard = ComplianceGuard::from_config(&config)?;
        Ok(Self { config, guard })
    }

    pub fn config(&self) -> &GenerateConfig {
        &self.config
    }

    pub fn guard(&self) -> &ComplianceGuard {
        &self.guard
    }

    /// Generate a plan stamped with the current time.
    pub fn generate(&self, raw: &Value) -> Result<GenerateOutcome, GenerateError> {
        self.generate_at(raw, Utc::now())
    }

    /// Generate a plan stamped with `now`. Identical inputs give identical
    /// output.
    pub fn generate_at(
        &self,
        raw: &Value,
        now: DateTime<Utc>,
    ) -> Result<GenerateOutcome, GenerateError> {
        let intake = intake::normalize(raw);
        self.generate_intake_at(&intake, now)
    }

    /// Run everything after normalization on an already-normalized intake.
    pub fn generate_intake_at(
        &self,
        intake: &Intake,
        now: DateTime<Utc>,
    ) -> Result<GenerateOutcome, GenerateError> {
        let issues = intake::validate(intake);
        if !issues.is_empty() {
            tracing::info!(count = issues.len(), "intake rejected by validation");
            return Ok(GenerateOutcome::rejected(issues));
        }

        let draft = rules::build_draft(intake, &self.config, now)?;
        tracing::debug!(
            recommendations = draft.recommendations.len(),
            version = %draft.meta.version,
            "draft composed"
        );

        let filtered = self.guard.filter(draft);
        tracing::debug!(violations = filtered.violations.len(), "draft filtered");

        if self.config.policy == ViolationPolicy::Block && !filtered.is_clean() {
            tracing::info!(
                violations = filtered.violations.len(),
                "plan withheld by block policy"
            );
            return Ok(GenerateOutcome {
                plan: None,
                issues: Vec::new(),
                violations: filtered.violations,
            });
        }

        Ok(GenerateOutcome {
            plan: Some(filtered.plan),
            issues: Vec::new(),
            violations: filtered.violations,
        })
    }
}

/// One-shot generation with a freshly compiled guard.
pub fn generate(raw: &Value, config: &GenerateConfig) -> Result<GenerateOutcome, GenerateError> {
    generate_at(raw, config, Utc::now())
}

/// [`generate`] with an injected clock.
pub fn generate_at(
    raw: &Value,
    config: &GenerateConfig,
    now: DateTime<Utc>,
) -> Result<GenerateOutcome, GenerateError> {
    Generator::new(config.clone())?.generate_at(raw, now)
}
