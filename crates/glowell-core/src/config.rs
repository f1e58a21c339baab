//! Generation settings passed explicitly into every pipeline call.
//!
//! There is no ambient or global state: feature toggles that influence
//! output live on [`GenerateConfig`] and are part of the plan cache key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::guard::ComplianceRule;

/// Canonical disclaimer attached to every plan.
pub const DEFAULT_DISCLAIMER: &str = "This plan offers general wellness suggestions and is not \
     medical advice. Consult a qualified healthcare professional before changing your diet, \
     activity, or any medicines you take.";

/// Age at and above which low-impact movement caveats are added.
pub const DEFAULT_SENIOR_AGE: i64 = 55;

/// Upper bound on full rule-set passes per string.
pub const DEFAULT_MAX_FILTER_PASSES: usize = 4;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Output schema version. One generator serves every version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Core sections only.
    V1,
    /// Adds education notes.
    #[default]
    V2,
}

impl SchemaVersion {
    /// Disclaimer identifier used when the config does not override it.
    pub fn default_disclaimer_id(self) -> &'static str {
        match self {
            Self::V1 => "glowell-general-v1",
            Self::V2 => "glowell-general-v2",
        }
    }

    pub fn includes_education(self) -> bool {
        matches!(self, Self::V2)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        };
        f.write_str(s)
    }
}

impl FromStr for SchemaVersion {
    type Err = SchemaVersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "v1" => Ok(Self::V1),
            "v2" => Ok(Self::V2),
            other => Err(SchemaVersionParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`SchemaVersion`] string.
#[derive(Debug, Clone)]
pub struct SchemaVersionParseError(pub String);

impl fmt::Display for SchemaVersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid schema version: {:?} (expected v1 or v2)", self.0)
    }
}

impl std::error::Error for SchemaVersionParseError {}

// ---------------------------------------------------------------------------

/// What generation does when the safety filter recorded violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationPolicy {
    /// Redact and always return the plan.
    #[default]
    Redact,
    /// Withhold the plan when any violation was recorded.
    Block,
}

impl fmt::Display for ViolationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Redact => "redact",
            Self::Block => "block",
        };
        f.write_str(s)
    }
}

impl FromStr for ViolationPolicy {
    type Err = ViolationPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redact" => Ok(Self::Redact),
            "block" => Ok(Self::Block),
            other => Err(ViolationPolicyParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ViolationPolicy`] string.
#[derive(Debug, Clone)]
pub struct ViolationPolicyParseError(pub String);

impl fmt::Display for ViolationPolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid violation policy: {:?} (expected redact or block)", self.0)
    }
}

impl std::error::Error for ViolationPolicyParseError {}

// ---------------------------------------------------------------------------
// GenerateConfig
// ---------------------------------------------------------------------------

/// Settings for one generation call.
///
/// Deserializable so the CLI can load it from the `[generate]` table of its
/// config file; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub version: SchemaVersion,
    pub policy: ViolationPolicy,
    pub senior_age: i64,
    pub max_filter_passes: usize,
    /// Overrides [`DEFAULT_DISCLAIMER`] when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer_text: Option<String>,
    /// Overrides [`SchemaVersion::default_disclaimer_id`] when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer_id: Option<String>,
    /// Appended after the built-in rule set, in order.
    pub rules: Vec<ComplianceRule>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            version: SchemaVersion::default(),
            policy: ViolationPolicy::default(),
            senior_age: DEFAULT_SENIOR_AGE,
            max_filter_passes: DEFAULT_MAX_FILTER_PASSES,
            disclaimer_text: None,
            disclaimer_id: None,
            rules: Vec::new(),
        }
    }
}

impl GenerateConfig {
    /// Set the schema version.
    pub fn version(mut self, version: SchemaVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the violation policy.
    pub fn policy(mut self, policy: ViolationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append an extra compliance rule.
    pub fn rule(mut self, rule: ComplianceRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn effective_disclaimer_text(&self) -> &str {
        self.disclaimer_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_DISCLAIMER)
    }

    pub fn effective_disclaimer_id(&self) -> &str {
        self.disclaimer_id
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.version.default_disclaimer_id())
    }
}
