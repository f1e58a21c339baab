use anyhow::{Context, Result, bail};

use glowell_core::ComplianceGuard;

use crate::config::GlowellConfig;
use crate::input;

/// Execute `glowell scan`: run the safety filter over any JSON document.
///
/// Without `--fix`, finding a violation is an error (lint style). With
/// `--fix`, the filtered document is printed to stdout and violations go to
/// stderr.
pub fn run_scan(config: &GlowellConfig, source: &str, fix: bool) -> Result<()> {
    let guard =
        ComplianceGuard::from_config(&config.generate).context("invalid compliance rules in config")?;
    let mut value = input::read_json(source)?;
    let violations = guard.filter_value(&mut value);

    for v in &violations {
        let section = if v.section.is_empty() { "<root>" } else { v.section.as_str() };
        eprintln!("{section}: {:?} ({})", v.text, v.reason);
        if let Some(suggestion) = &v.suggestion {
            eprintln!("  suggestion: {suggestion}");
        }
    }

    if fix {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    if !violations.is_empty() {
        bail!("found {} violation(s); rerun with --fix to rewrite", violations.len());
    }
    println!("No violations.");
    Ok(())
}

/// Execute `glowell rules`: list active rules in evaluation order.
pub fn run_rules(config: &GlowellConfig) -> Result<()> {
    let guard =
        ComplianceGuard::from_config(&config.generate).context("invalid compliance rules in config")?;
    for (i, rule) in guard.rules().enumerate() {
        println!("{:>2}. {}", i + 1, rule.reason);
        println!("    pattern:     {}", rule.pattern);
        println!("    replacement: {}", rule.effective_replacement());
    }
    println!("\nDisclaimer: {}", guard.disclaimer_text());
    Ok(())
}
