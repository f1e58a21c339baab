use anyhow::{Result, bail};

use glowell_core::{normalize, validate};

use crate::input;

/// Execute `glowell validate`: show how an intake normalizes and list every
/// validation issue.
pub fn run_validate(source: &str) -> Result<()> {
    let raw = input::read_json(source)?;
    let intake = normalize(&raw);

    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!("Name:     {}", if intake.name.is_empty() { "-" } else { intake.name.as_str() });
    println!("Age:      {}", or_dash(intake.age.map(|a| a.to_string())));
    println!("Locale:   {}", intake.locale);
    println!("Dosha:    {}", or_dash(intake.dosha.map(|d| d.to_string())));
    println!("Goal:     {}", or_dash(intake.goal.map(|g| g.to_string())));
    println!(
        "Schedule: wake {} / sleep {}",
        intake.schedule.wake_time, intake.schedule.sleep_time
    );
    if !intake.extra.is_empty() {
        let keys: Vec<&str> = intake.extra.keys().map(String::as_str).collect();
        println!("Extra:    {}", keys.join(", "));
    }

    let issues = validate(&intake);
    if issues.is_empty() {
        println!("\nNo issues.");
        return Ok(());
    }

    println!("\nIssues:");
    for issue in &issues {
        println!("  {}: {}", issue.path, issue.message);
    }
    bail!("intake failed validation with {} issue(s)", issues.len())
}
