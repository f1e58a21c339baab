//! Validation pre-check run before plan generation.
//!
//! Every check runs; the caller receives all issues at once so the form can
//! surface them together. Out-of-range values are reported, never clamped.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Intake;

/// Inclusive age range in years.
pub const AGE_RANGE: (i64, i64) = (0, 120);
/// Inclusive meals-per-day range.
pub const MEALS_PER_DAY_RANGE: (i64, i64) = (3, 6);
/// Inclusive height range in centimetres.
pub const HEIGHT_CM_RANGE: (f64, f64) = (50.0, 250.0);
/// Inclusive weight range in kilograms.
pub const WEIGHT_KG_RANGE: (f64, f64) = (10.0, 350.0);

/// A single user-facing validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// camelCase JSON path of the offending field, e.g. `schedule.sleepTime`.
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Check an intake. An empty result means generation may proceed.
pub fn validate(intake: &Intake) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if let Some(age) = intake.age {
        if !(AGE_RANGE.0..=AGE_RANGE.1).contains(&age) {
            issues.push(ValidationIssue::new(
                "age",
                format!("age must be between {} and {}", AGE_RANGE.0, AGE_RANGE.1),
            ));
        }
    }

    if intake.schedule.wake_time == intake.schedule.sleep_time {
        issues.push(ValidationIssue::new(
            "schedule.sleepTime",
            "sleep time must differ from wake time",
        ));
    }

    if let Some(meals) = intake.schedule.meals_per_day {
        if !(MEALS_PER_DAY_RANGE.0..=MEALS_PER_DAY_RANGE.1).contains(&meals) {
            issues.push(ValidationIssue::new(
                "schedule.mealsPerDay",
                format!(
                    "meals per day must be between {} and {}",
                    MEALS_PER_DAY_RANGE.0, MEALS_PER_DAY_RANGE.1
                ),
            ));
        }
    }

    if let Some(height) = intake.body.height_cm {
        if !(HEIGHT_CM_RANGE.0..=HEIGHT_CM_RANGE.1).contains(&height) {
            issues.push(ValidationIssue::new(
                "body.heightCm",
                format!(
                    "height must be between {} and {} cm",
                    HEIGHT_CM_RANGE.0, HEIGHT_CM_RANGE.1
                ),
            ));
        }
    }

    if let Some(weight) = intake.body.weight_kg {
        if !(WEIGHT_KG_RANGE.0..=WEIGHT_KG_RANGE.1).contains(&weight) {
            issues.push(ValidationIssue::new(
                "body.weightKg",
                format!(
                    "weight must be between {} and {} kg",
                    WEIGHT_KG_RANGE.0, WEIGHT_KG_RANGE.1
                ),
            ));
        }
    }

    match (intake.health.pregnant, intake.health.trimester) {
        (true, None) => issues.push(ValidationIssue::new(
            "health.trimester",
            "trimester is required during pregnancy",
        )),
        (_, Some(t)) if !(1..=3).contains(&t) => issues.push(ValidationIssue::new(
            "health.trimester",
            "trimester must be 1, 2, or 3",
        )),
        _ => {}
    }

    let start = parse_date(
        intake.goal_window.start_date.as_deref(),
        "goalWindow.startDate",
        &mut issues,
    );
    let end = parse_date(
        intake.goal_window.end_date.as_deref(),
        "goalWindow.endDate",
        &mut issues,
    );
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            issues.push(ValidationIssue::new(
                "goalWindow.endDate",
                "goal end date must not be before the start date",
            ));
        }
    }

    issues
}

fn parse_date(
    raw: Option<&str>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<NaiveDate> {
    let raw = raw?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            issues.push(ValidationIssue::new(
                path,
                format!("{raw:?} is not a date (expected YYYY-MM-DD)"),
            ));
            None
        }
    }
}
