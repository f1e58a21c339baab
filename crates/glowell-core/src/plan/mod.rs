//! Plan records and the generation entry point.
//!
//! A [`PlanDraft`] is what the rule evaluator produces; a [`SafePlan`] is the
//! same record after the compliance guard has rewritten it. Only the guard
//! can mint a `SafePlan`, and it exposes no mutable access.

pub mod cache;
pub mod generate;

use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::SchemaVersion;
use crate::guard::walk::{TextFields, child_path};
use crate::intake::Locale;

pub use cache::PlanCache;
pub use generate::{GenerateError, GenerateOutcome, Generator, generate, generate_at};

/// Meal slot labels, in the only order a plan may list them.
pub const MEAL_ORDER: [&str; 5] = ["Breakfast", "Mid-morning", "Lunch", "Evening", "Dinner"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Unfiltered generated plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDraft {
    pub meta: PlanMeta,
    pub day: Day,
    pub movement: Movement,
    pub mind: Mind,
    pub recommendations: Vec<String>,
    /// The user's own problems and symptoms, echoed back.
    pub focus_areas: Vec<String>,
    /// Empty for [`SchemaVersion::V1`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMeta {
    pub generated_at: DateTime<Utc>,
    pub locale: Locale,
    pub version: SchemaVersion,
    pub title: String,
    pub disclaimer_id: String,
    /// Set by the guard; absent on drafts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disclaimer_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub wake: String,
    pub sleep: String,
    pub hydration: Hydration,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hydration {
    /// `HH:MM` reminders, ascending.
    pub schedule: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub label: String,
    pub ideas: Vec<String>,
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub blocks: Vec<MovementBlock>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementBlock {
    pub label: String,
    pub minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mind {
    pub practices: Vec<String>,
}

// ---------------------------------------------------------------------------
// SafePlan
// ---------------------------------------------------------------------------

/// A filtered, disclaimer-bearing plan. Read access goes through `Deref`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SafePlan(PlanDraft);

impl SafePlan {
    pub(crate) fn from_filtered(plan: PlanDraft) -> Self {
        Self(plan)
    }

    /// The disclaimer attached by the guard (never empty).
    pub fn disclaimer(&self) -> &str {
        self.0.meta.disclaimer_text.as_deref().unwrap_or_default()
    }

    /// Hex SHA-256 of the plan's JSON serialization, for export naming and
    /// caching by consumers.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

impl Deref for SafePlan {
    type Target = PlanDraft;

    fn deref(&self) -> &PlanDraft {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// String traversal
// ---------------------------------------------------------------------------

impl TextFields for PlanDraft {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        self.meta.visit_text_mut(&child_path(path, "meta"), visit);
        self.day.visit_text_mut(&child_path(path, "day"), visit);
        self.movement
            .visit_text_mut(&child_path(path, "movement"), visit);
        self.mind
            .practices
            .visit_text_mut(&child_path(path, "mind.practices"), visit);
        self.recommendations
            .visit_text_mut(&child_path(path, "recommendations"), visit);
        self.focus_areas
            .visit_text_mut(&child_path(path, "focusAreas"), visit);
        self.education
            .visit_text_mut(&child_path(path, "education"), visit);
    }
}

impl TextFields for PlanMeta {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        self.title.visit_text_mut(&child_path(path, "title"), visit);
        self.disclaimer_id
            .visit_text_mut(&child_path(path, "disclaimerId"), visit);
        self.disclaimer_text
            .visit_text_mut(&child_path(path, "disclaimerText"), visit);
    }
}

impl TextFields for Day {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        self.wake.visit_text_mut(&child_path(path, "wake"), visit);
        self.sleep.visit_text_mut(&child_path(path, "sleep"), visit);
        self.hydration
            .schedule
            .visit_text_mut(&child_path(path, "hydration.schedule"), visit);
        self.hydration
            .notes
            .visit_text_mut(&child_path(path, "hydration.notes"), visit);
        self.meals.visit_text_mut(&child_path(path, "meals"), visit);
    }
}

impl TextFields for Meal {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        self.label.visit_text_mut(&child_path(path, "label"), visit);
        self.ideas.visit_text_mut(&child_path(path, "ideas"), visit);
        self.avoid.visit_text_mut(&child_path(path, "avoid"), visit);
    }
}

impl TextFields for Movement {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        self.blocks.visit_text_mut(&child_path(path, "blocks"), visit);
        self.notes.visit_text_mut(&child_path(path, "notes"), visit);
    }
}

impl TextFields for MovementBlock {
    fn visit_text_mut(&mut self, path: &str, visit: &mut dyn FnMut(&str, &mut String)) {
        self.label.visit_text_mut(&child_path(path, "label"), visit);
    }
}
