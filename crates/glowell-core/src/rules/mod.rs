//! Rule evaluator: composes a [`PlanDraft`] from an [`Intake`].
//!
//! Output starts from the baseline fragments in the embedded
//! `fragments.toml` and grows through ordered overrides: dosha, goal, age
//! band, then locale. Overrides only append, except the locale step, which
//! swaps the opening hydration note for a translated one.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::GenerateConfig;
use crate::intake::normalize::is_clock_time;
use crate::intake::{Dosha, Goal, Intake, Locale};
use crate::plan::{
    Day, GenerateError, Hydration, Meal, Mind, Movement, MovementBlock, PlanDraft, PlanMeta,
};

/// Ages below this get youth caveats.
pub const YOUTH_AGE_LIMIT: i64 = 18;

/// Plan heading. The intake name is never echoed into filtered text.
pub const PLAN_TITLE: &str = "Your daily wellness plan";

// ---------------------------------------------------------------------------
// Fragment library
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FragmentLibrary {
    baseline: Baseline,
    dosha: DoshaTable,
    goal: GoalTable,
    age: AgeTable,
    locale: LocaleLines,
}

#[derive(Debug, Deserialize)]
struct Baseline {
    hydration_schedule: Vec<String>,
    hydration_notes: Vec<String>,
    movement_notes: Vec<String>,
    mind_practices: Vec<String>,
    recommendations: Vec<String>,
    education: Vec<String>,
    meals: Vec<Meal>,
    movement_blocks: Vec<MovementBlock>,
}

/// Text appended by one override branch.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FragmentSet {
    recommendations: Vec<String>,
    hydration_notes: Vec<String>,
    movement_notes: Vec<String>,
    mind_practices: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DoshaTable {
    vata: FragmentSet,
    pitta: FragmentSet,
    kapha: FragmentSet,
    mixed: FragmentSet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct GoalTable {
    weight_loss: FragmentSet,
    energy_boost: FragmentSet,
    mental_peace: FragmentSet,
    better_sleep: FragmentSet,
    digestion: FragmentSet,
    immunity: FragmentSet,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgeTable {
    youth: FragmentSet,
    senior: FragmentSet,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocaleLines {
    hi: String,
    mr: String,
}

static FRAGMENTS_TOML: &str = include_str!("fragments.toml");

static LIBRARY: LazyLock<FragmentLibrary> = LazyLock::new(|| {
    toml::from_str(FRAGMENTS_TOML).expect("embedded fragments.toml is invalid")
});

/// The parsed fragment library.
///
/// # Panics
///
/// Panics on first use if the embedded TOML is malformed. The library tests
/// parse it, so a passing build carries a valid library.
fn library() -> &'static FragmentLibrary {
    &LIBRARY
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Coarse age grouping used to pick caveats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    Youth,
    Adult,
    Senior,
}

impl AgeBand {
    /// Unknown ages count as adult.
    pub fn classify(age: Option<i64>, senior_age: i64) -> Self {
        match age {
            Some(a) if a >= senior_age => Self::Senior,
            Some(a) if a < YOUTH_AGE_LIMIT => Self::Youth,
            _ => Self::Adult,
        }
    }
}

fn dosha_fragments(dosha: Dosha) -> &'static FragmentSet {
    let table = &library().dosha;
    match dosha {
        Dosha::Vata => &table.vata,
        Dosha::Pitta => &table.pitta,
        Dosha::Kapha => &table.kapha,
        Dosha::Mixed => &table.mixed,
    }
}

fn goal_fragments(goal: Goal) -> &'static FragmentSet {
    let table = &library().goal;
    match goal {
        Goal::WeightLoss => &table.weight_loss,
        Goal::EnergyBoost => &table.energy_boost,
        Goal::MentalPeace => &table.mental_peace,
        Goal::BetterSleep => &table.better_sleep,
        Goal::Digestion => &table.digestion,
        Goal::Immunity => &table.immunity,
    }
}

fn age_fragments(band: AgeBand) -> Option<&'static FragmentSet> {
    let table = &library().age;
    match band {
        AgeBand::Youth => Some(&table.youth),
        AgeBand::Adult => None,
        AgeBand::Senior => Some(&table.senior),
    }
}

/// Translated opening hydration line. `None` keeps the English line.
fn locale_line(locale: Locale) -> Option<&'static str> {
    let lines = &library().locale;
    match locale {
        Locale::En => None,
        Locale::Hi => Some(&lines.hi),
        Locale::Mr => Some(&lines.mr),
        // No Tamil copy yet.
        Locale::Ta => None,
    }
}

fn apply(draft: &mut PlanDraft, set: &FragmentSet) {
    draft
        .recommendations
        .extend(set.recommendations.iter().cloned());
    draft
        .day
        .hydration
        .notes
        .extend(set.hydration_notes.iter().cloned());
    draft
        .movement
        .notes
        .extend(set.movement_notes.iter().cloned());
    draft
        .mind
        .practices
        .extend(set.mind_practices.iter().cloned());
}

// ---------------------------------------------------------------------------
// Draft composition
// ---------------------------------------------------------------------------

/// Compose the unfiltered plan for a validated intake.
///
/// Fails only when the intake is malformed in a way normalization should
/// have prevented (non `HH:MM` times) or a meal slot ends up empty.
pub fn build_draft(
    intake: &Intake,
    config: &GenerateConfig,
    generated_at: DateTime<Utc>,
) -> Result<PlanDraft, GenerateError> {
    let schedule = &intake.schedule;
    for (field, value) in [
        ("schedule.wakeTime", &schedule.wake_time),
        ("schedule.sleepTime", &schedule.sleep_time),
    ] {
        if !is_clock_time(value) {
            return Err(GenerateError::MalformedIntake {
                field,
                value: value.clone(),
            });
        }
    }

    let base = &library().baseline;
    let mut draft = PlanDraft {
        meta: PlanMeta {
            generated_at,
            locale: intake.locale,
            version: config.version,
            title: PLAN_TITLE.to_string(),
            disclaimer_id: config.effective_disclaimer_id().to_string(),
            disclaimer_text: None,
        },
        day: Day {
            wake: schedule.wake_time.clone(),
            sleep: schedule.sleep_time.clone(),
            hydration: Hydration {
                schedule: base.hydration_schedule.clone(),
                notes: base.hydration_notes.clone(),
            },
            meals: base.meals.clone(),
        },
        movement: Movement {
            blocks: base.movement_blocks.clone(),
            notes: base.movement_notes.clone(),
        },
        mind: Mind {
            practices: base.mind_practices.clone(),
        },
        recommendations: base.recommendations.clone(),
        focus_areas: focus_areas(intake),
        education: if config.version.includes_education() {
            base.education.clone()
        } else {
            Vec::new()
        },
    };

    if let Some(dosha) = intake.dosha {
        apply(&mut draft, dosha_fragments(dosha));
    }
    if let Some(goal) = intake.goal {
        apply(&mut draft, goal_fragments(goal));
    }
    let band = AgeBand::classify(intake.age, config.senior_age);
    if let Some(set) = age_fragments(band) {
        apply(&mut draft, set);
    }
    if let Some(line) = locale_line(intake.locale) {
        if let Some(first) = draft.day.hydration.notes.first_mut() {
            *first = line.to_string();
        }
    }

    if let Some(meal) = draft.day.meals.iter().find(|m| m.ideas.is_empty()) {
        return Err(GenerateError::EmptyMeal {
            label: meal.label.clone(),
        });
    }

    tracing::debug!(
        dosha = ?intake.dosha,
        goal = ?intake.goal,
        band = ?band,
        locale = %intake.locale,
        "fragments applied"
    );
    Ok(draft)
}


/// Problems then symptoms, first spelling kept for case-insensitive repeats.
fn focus_areas(intake: &Intake) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    let lifestyle = &intake.lifestyle;
    for item in lifestyle.problems.iter().chain(&lifestyle.symptoms) {
        let folded = item.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::config::SchemaVersion;
    use crate::guard::ComplianceGuard;
    use crate::plan::MEAL_ORDER;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 6, 0, 0).unwrap()
    }

    fn draft_for(intake: &Intake) -> PlanDraft {
        build_draft(intake, &GenerateConfig::default(), now()).unwrap()
    }

    fn intake_with(dosha: Option<Dosha>, goal: Option<Goal>, age: Option<i64>) -> Intake {
        Intake {
            dosha,
            goal,
            age,
            ..Intake::default()
        }
    }

    #[test]
    fn embedded_library_parses() {
        let lib: FragmentLibrary = toml::from_str(FRAGMENTS_TOML).unwrap();
        assert_eq!(lib.baseline.hydration_schedule.len(), 5);
        assert_eq!(lib.baseline.movement_blocks.len(), 1);
    }

    #[test]
    fn meals_follow_fixed_order_with_ideas() {
        let draft = draft_for(&Intake::default());
        let labels: Vec<&str> = draft.day.meals.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, MEAL_ORDER);
        assert!(draft.day.meals.iter().all(|m| !m.ideas.is_empty()));
    }

    #[test]
    fn no_fragment_combination_trips_the_default_guard() {
        let guard = ComplianceGuard::from_config(&GenerateConfig::default()).unwrap();
        let doshas = [None, Some(Dosha::Vata), Some(Dosha::Pitta), Some(Dosha::Kapha), Some(Dosha::Mixed)];
        let goals = [
            None,
            Some(Goal::WeightLoss),
            Some(Goal::EnergyBoost),
            Some(Goal::MentalPeace),
            Some(Goal::BetterSleep),
            Some(Goal::Digestion),
            Some(Goal::Immunity),
        ];
        for dosha in doshas {
            for goal in goals {
                for age in [Some(12), Some(30), Some(70)] {
                    for locale in [Locale::En, Locale::Hi, Locale::Mr, Locale::Ta] {
                        let intake = Intake {
                            locale,
                            ..intake_with(dosha, goal, age)
                        };
                        let result = guard.filter(draft_for(&intake));
                        assert!(
                            result.is_clean(),
                            "{dosha:?}/{goal:?}/{age:?}/{locale}: {:?}",
                            result.violations
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn goal_override_only_appends() {
        let vata = draft_for(&intake_with(Some(Dosha::Vata), None, None));
        let both = draft_for(&intake_with(Some(Dosha::Vata), Some(Goal::WeightLoss), None));
        assert!(both.recommendations.starts_with(&vata.recommendations));
        assert!(both.recommendations.len() > vata.recommendations.len());
        assert!(both.movement.notes.starts_with(&vata.movement.notes));
        assert!(both.day.hydration.notes.starts_with(&vata.day.hydration.notes));
    }

    #[test]
    fn age_bands() {
        assert_eq!(AgeBand::classify(None, 55), AgeBand::Adult);
        assert_eq!(AgeBand::classify(Some(17), 55), AgeBand::Youth);
        assert_eq!(AgeBand::classify(Some(18), 55), AgeBand::Adult);
        assert_eq!(AgeBand::classify(Some(55), 55), AgeBand::Senior);
        assert_eq!(AgeBand::classify(Some(60), 65), AgeBand::Adult);
    }

    #[test]
    fn senior_gets_low_impact_caveat() {
        let draft = draft_for(&intake_with(None, None, Some(60)));
        assert!(draft.movement.notes.iter().any(|n| n.contains("low-impact")));
        let adult = draft_for(&intake_with(None, None, Some(40)));
        assert!(!adult.movement.notes.iter().any(|n| n.contains("low-impact")));
    }

    #[test]
    fn locale_replaces_opening_note_or_falls_back() {
        let english = draft_for(&Intake::default());
        let hindi = draft_for(&Intake {
            locale: Locale::Hi,
            ..Intake::default()
        });
        let tamil = draft_for(&Intake {
            locale: Locale::Ta,
            ..Intake::default()
        });
        assert_eq!(english.day.hydration.notes[0], "Start your day with a glass of warm water.");
        assert_eq!(hindi.day.hydration.notes[0], library().locale.hi);
        assert_eq!(hindi.day.hydration.notes[1..], english.day.hydration.notes[1..]);
        assert_eq!(tamil.day.hydration.notes, english.day.hydration.notes);
        assert_eq!(tamil.meta.locale, Locale::Ta);
    }

    #[test]
    fn version_controls_education_and_disclaimer_id() {
        let intake = Intake::default();
        let v1 = build_draft(&intake, &GenerateConfig::default().version(SchemaVersion::V1), now())
            .unwrap();
        let v2 = draft_for(&intake);
        assert!(v1.education.is_empty());
        assert_eq!(v1.meta.disclaimer_id, "glowell-general-v1");
        assert!(!v2.education.is_empty());
        assert_eq!(v2.meta.disclaimer_id, "glowell-general-v2");
    }

    #[test]
    fn malformed_time_is_an_error() {
        let mut intake = Intake::default();
        intake.schedule.wake_time = "7am".into();
        let err = build_draft(&intake, &GenerateConfig::default(), now()).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::MalformedIntake { field: "schedule.wakeTime", .. }
        ));
    }

    #[test]
    fn title_and_focus_areas() {
        let mut intake = Intake {
            name: "Asha".into(),
            ..Intake::default()
        };
        intake.lifestyle.problems = vec!["Acidity".into(), "stress".into()];
        intake.lifestyle.symptoms = vec!["acidity".into(), "bloating".into()];
        let draft = draft_for(&intake);
        assert_eq!(draft.meta.title, PLAN_TITLE);
        assert!(!serde_json::to_string(&draft).unwrap().contains("Asha"));
        assert_eq!(draft.focus_areas, vec!["Acidity", "stress", "bloating"]);
    }

    #[test]
    fn identical_inputs_compose_identical_drafts() {
        let intake = intake_with(Some(Dosha::Kapha), Some(Goal::Immunity), Some(33));
        assert_eq!(draft_for(&intake), draft_for(&intake));
    }
}
