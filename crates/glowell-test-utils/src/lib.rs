//! Shared fixtures for glowell integration tests.
//!
//! Raw intakes are plain `serde_json::Value`s in the form's camelCase shape,
//! so this crate does not depend on `glowell-core` and can be used from its
//! tests without a dependency cycle.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Value, json};

/// Fixed generation timestamp: 2026-04-01T06:00:00Z.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 6, 0, 0)
        .single()
        .expect("fixed timestamp is valid")
}

/// Asha: 60, pitta, mental-peace, wakes 06:00, sleeps 22:00.
pub fn asha_raw() -> Value {
    json!({
        "name": "Asha",
        "age": 60,
        "dosha": "pitta",
        "goal": "mental-peace",
        "schedule": { "wakeTime": "06:00", "sleepTime": "22:00", "mealsPerDay": 4 },
        "lifestyle": { "dietType": "veg", "problems": [], "symptoms": [] }
    })
}

/// An intake that fails validation only on wake == sleep.
pub fn same_wake_sleep_raw() -> Value {
    json!({
        "name": "Dev",
        "age": 34,
        "schedule": { "wakeTime": "07:00", "sleepTime": "07:00" }
    })
}

/// An intake whose free-text fields carry banned terms.
pub fn risky_raw() -> Value {
    json!({
        "name": "Kiran",
        "age": 45,
        "dosha": "kapha",
        "goal": "weight-loss",
        "lifestyle": {
            "problems": ["takes metformin 500 mg", "wants a cure for acidity"],
            "symptoms": ["will definitely sleep better"]
        }
    })
}

/// A spread of valid intakes across doshas, goals, ages and locales.
pub fn sample_raws() -> Vec<(&'static str, Value)> {
    vec![
        ("asha", asha_raw()),
        (
            "teen-vata",
            json!({ "name": "Ria", "age": 15, "dosha": "vata", "goal": "energy-boost" }),
        ),
        (
            "hindi-kapha",
            json!({ "name": "Sunil", "age": 41, "dosha": "kapha", "goal": "digestion", "locale": "hi-IN" }),
        ),
        (
            "marathi-mixed",
            json!({ "name": "Neha", "age": 29, "dosha": "vata-pitta", "goal": "better-sleep", "language": "mr" }),
        ),
        ("tamil-empty", json!({ "locale": "ta" })),
        ("bare", json!({})),
    ]
}

/// Every string leaf in `value`, depth first.
pub fn collect_strings(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_into(value, &mut out);
    out
}

fn collect_into(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_into(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_into(v, out)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Write `value` as JSON to `dir/name` and return the path.
pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    let body = serde_json::to_string_pretty(value).expect("fixture serializes");
    std::fs::write(&path, body).expect("fixture file is writable");
    path
}
