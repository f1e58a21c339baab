use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};

use glowell_core::export::{self, ExportFormat};
use glowell_core::{GenerateOutcome, Generator};

use crate::config::GlowellConfig;
use crate::input;

/// Execute `glowell generate`: compose, filter and export one plan.
///
/// Validation issues and block-policy withholding are reported on stderr and
/// turned into a non-zero exit.
pub fn run_generate(
    config: &GlowellConfig,
    source: &str,
    format: ExportFormat,
    output: Option<&Path>,
    at: Option<DateTime<Utc>>,
) -> Result<()> {
    let raw = input::read_json(source)?;
    let generator =
        Generator::new(config.generate.clone()).context("invalid compliance rules in config")?;
    let outcome = generator.generate_at(&raw, at.unwrap_or_else(Utc::now))?;
    report_violations(&outcome);

    let Some(plan) = outcome.plan else {
        if !outcome.issues.is_empty() {
            for issue in &outcome.issues {
                eprintln!("  {}: {}", issue.path, issue.message);
            }
            bail!("intake failed validation with {} issue(s)", outcome.issues.len());
        }
        bail!(
            "plan withheld: {} violation(s) under the block policy",
            outcome.violations.len()
        );
    };

    let body = export::render(&plan, format)?;
    match output {
        Some(path) => {
            let target = if path.is_dir() {
                path.join(export::export_file_name(&plan, format)?)
            } else {
                path.to_path_buf()
            };
            std::fs::write(&target, &body)
                .with_context(|| format!("cannot write output file: {}", target.display()))?;
            println!("Wrote {format} plan to {}", target.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}

fn report_violations(outcome: &GenerateOutcome) {
    for v in &outcome.violations {
        eprintln!("rewrote {}: {:?} ({})", v.section, v.text, v.reason);
    }
}

/// Parse an RFC 3339 timestamp for `--at`.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp {s:?}: {e}"))
}
