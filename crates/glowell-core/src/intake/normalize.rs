//! Intake normalizer: coerces loosely-typed form JSON into an [`Intake`].
//!
//! Never fails. Missing, mistyped, or malformed values are replaced with
//! defaults; rejection is left to [`super::validate`].

use chrono::NaiveTime;
use serde_json::{Map, Value};

use super::{Body, DietType, Dosha, Goal, GoalWindow, Health, Intake, Lifestyle, Locale, Schedule};

/// Wake time used when the input is missing or not `HH:MM`.
pub const DEFAULT_WAKE_TIME: &str = "06:30";
/// Sleep time used when the input is missing or not `HH:MM`.
pub const DEFAULT_SLEEP_TIME: &str = "22:30";

/// Top-level keys consumed by the normalizer. Everything else is passed
/// through in [`Intake::extra`].
const KNOWN_FIELDS: &[&str] = &[
    "name",
    "age",
    "locale",
    "language",
    "dosha",
    "goal",
    "schedule",
    "body",
    "health",
    "goalWindow",
    "lifestyle",
];

/// Normalize raw intake JSON.
///
/// A non-object input yields [`Intake::default`].
pub fn normalize(raw: &Value) -> Intake {
    let Some(obj) = raw.as_object() else {
        return Intake::default();
    };

    let empty = Map::new();
    let schedule = object_field(obj, "schedule").unwrap_or(&empty);
    let body = object_field(obj, "body").unwrap_or(&empty);
    let health = object_field(obj, "health").unwrap_or(&empty);
    let window = object_field(obj, "goalWindow").unwrap_or(&empty);
    let lifestyle = object_field(obj, "lifestyle").unwrap_or(&empty);

    let locale = string_field(obj, "locale")
        .or_else(|| string_field(obj, "language"))
        .map(|s| parse_locale(&s))
        .unwrap_or_default();

    let extra = obj
        .iter()
        .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Intake {
        name: string_field(obj, "name").unwrap_or_default(),
        age: int_field(obj, "age"),
        locale,
        dosha: string_field(obj, "dosha").and_then(|s| parse_dosha(&s)),
        goal: string_field(obj, "goal").and_then(|s| canonical_token(&s).parse::<Goal>().ok()),
        schedule: Schedule {
            wake_time: time_field(schedule, "wakeTime", DEFAULT_WAKE_TIME),
            sleep_time: time_field(schedule, "sleepTime", DEFAULT_SLEEP_TIME),
            meals_per_day: int_field(schedule, "mealsPerDay"),
        },
        body: Body {
            height_cm: float_field(body, "heightCm"),
            weight_kg: float_field(body, "weightKg"),
        },
        health: Health {
            pregnant: bool_field(health, "pregnant"),
            trimester: int_field(health, "trimester"),
        },
        goal_window: GoalWindow {
            start_date: string_field(window, "startDate"),
            end_date: string_field(window, "endDate"),
        },
        lifestyle: Lifestyle {
            diet_type: string_field(lifestyle, "dietType")
                .and_then(|s| canonical_token(&s).parse::<DietType>().ok()),
            religion: string_field(lifestyle, "religion"),
            problems: list_field(lifestyle, "problems"),
            symptoms: list_field(lifestyle, "symptoms"),
        },
        extra,
    }
}

/// Return `true` if `s` is a zero-padded 24-hour `HH:MM` time.
pub fn is_clock_time(s: &str) -> bool {
    s.len() == 5 && s.as_bytes()[2] == b':' && NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

/// Lowercase, trim, and unify `_`/space separators to `-`.
fn canonical_token(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// `hi-IN`, `HI_in`, and `hi` all resolve to [`Locale::Hi`]. Unsupported
/// languages fall back to English.
fn parse_locale(s: &str) -> Locale {
    let token = canonical_token(s);
    let primary = token.split('-').next().unwrap_or_default();
    primary.parse().unwrap_or_default()
}

/// Dual constitutions such as `vata-pitta` count as [`Dosha::Mixed`].
fn parse_dosha(s: &str) -> Option<Dosha> {
    let token = canonical_token(s);
    if let Ok(dosha) = token.parse::<Dosha>() {
        return Some(dosha);
    }
    let parts: Vec<&str> = token.split('-').collect();
    let all_doshas = parts
        .iter()
        .all(|p| matches!(*p, "vata" | "pitta" | "kapha"));
    if parts.len() >= 2 && all_doshas {
        Some(Dosha::Mixed)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Field coercion
// ---------------------------------------------------------------------------

fn object_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn int_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_field(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    value.filter(|f: &f64| f.is_finite())
}

fn bool_field(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

fn time_field(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    match obj.get(key).and_then(Value::as_str).map(str::trim) {
        Some(t) if is_clock_time(t) => t.to_string(),
        _ => default.to_string(),
    }
}

fn list_field(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(items) = obj.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
