//! Rule-based wellness plan composer.
//!
//! Raw intake JSON flows through [`intake::normalize`], [`intake::validate`],
//! [`rules::build_draft`] and the [`guard::ComplianceGuard`] before being
//! wrapped into a [`plan::SafePlan`] by [`plan::generate`].

pub mod config;
pub mod export;
pub mod guard;
pub mod intake;
pub mod plan;
pub mod rules;

pub use config::{GenerateConfig, SchemaVersion, ViolationPolicy};
pub use export::ExportFormat;
pub use guard::{ComplianceGuard, ComplianceRule, GuardError, GuardResult, Violation};
pub use intake::{Intake, ValidationIssue, normalize, validate};
pub use plan::{
    GenerateError, GenerateOutcome, Generator, PlanCache, PlanDraft, SafePlan, generate, generate_at,
};
