//! Renderers that turn a [`SafePlan`] into shareable text.
//!
//! Every exporter takes a `SafePlan`, so nothing unfiltered can be exported.

use std::fmt;
use std::str::FromStr;

use crate::plan::SafePlan;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    /// Chat-friendly text with `*bold*` headings.
    Text,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Text => "text/plain; charset=utf-8",
            Self::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Csv => "csv",
        };
        f.write_str(s)
    }
}

impl FromStr for ExportFormat {
    type Err = ExportFormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "text" | "txt" | "whatsapp" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            other => Err(ExportFormatParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ExportFormat`] string.
#[derive(Debug, Clone)]
pub struct ExportFormatParseError(pub String);

impl fmt::Display for ExportFormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid export format: {:?} (expected json, text or csv)", self.0)
    }
}

impl std::error::Error for ExportFormatParseError {}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

/// Render `plan` in `format`.
pub fn render(plan: &SafePlan, format: ExportFormat) -> Result<String, serde_json::Error> {
    match format {
        ExportFormat::Json => to_json(plan),
        ExportFormat::Text => Ok(to_whatsapp_text(plan)),
        ExportFormat::Csv => Ok(to_csv(plan)),
    }
}

/// Pretty-printed JSON with a trailing newline.
pub fn to_json(plan: &SafePlan) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(plan)?;
    out.push('\n');
    Ok(out)
}

/// A message-sized text block: one `*Heading*` per section, `- ` bullets,
/// disclaimer last.
pub fn to_whatsapp_text(plan: &SafePlan) -> String {
    let mut out = String::new();
    out.push_str(&format!("*{}*\n", plan.meta.title));
    out.push_str(&format!("Wake {} | Sleep {}\n", plan.day.wake, plan.day.sleep));

    out.push_str("\n*Hydration*\n");
    out.push_str(&format!("- Reminders: {}\n", plan.day.hydration.schedule.join(", ")));
    push_bullets(&mut out, &plan.day.hydration.notes);

    out.push_str("\n*Meals*\n");
    for meal in &plan.day.meals {
        out.push_str(&format!("- {}: {}\n", meal.label, meal.ideas.join(" / ")));
        if !meal.avoid.is_empty() {
            out.push_str(&format!("  Avoid: {}\n", meal.avoid.join(", ")));
        }
    }

    out.push_str("\n*Movement*\n");
    for block in &plan.movement.blocks {
        out.push_str(&format!("- {} ({} min)\n", block.label, block.minutes));
    }
    push_bullets(&mut out, &plan.movement.notes);

    push_section(&mut out, "Mind", &plan.mind.practices);
    push_section(&mut out, "Recommendations", &plan.recommendations);
    push_section(&mut out, "Focus areas", &plan.focus_areas);
    push_section(&mut out, "Good to know", &plan.education);

    out.push_str(&format!("\n_{}_\n", plan.disclaimer()));
    out
}

fn push_section(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("\n*{heading}*\n"));
    push_bullets(out, items);
}

fn push_bullets(out: &mut String, items: &[String]) {
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

/// One `section,label,item` row per plan line, RFC 4180 quoted.
pub fn to_csv(plan: &SafePlan) -> String {
    let mut rows: Vec<[String; 3]> = Vec::new();
    let mut row = |section: &str, label: &str, item: &str| {
        rows.push([section.to_string(), label.to_string(), item.to_string()]);
    };

    row("meta", "title", &plan.meta.title);
    row("meta", "version", &plan.meta.version.to_string());
    row("meta", "locale", &plan.meta.locale.to_string());
    row("meta", "generatedAt", &plan.meta.generated_at.to_rfc3339());
    row("day", "wake", &plan.day.wake);
    row("day", "sleep", &plan.day.sleep);
    for time in &plan.day.hydration.schedule {
        row("hydration", "reminder", time);
    }
    for note in &plan.day.hydration.notes {
        row("hydration", "note", note);
    }
    for meal in &plan.day.meals {
        for idea in &meal.ideas {
            row("meal", &meal.label, idea);
        }
        for avoid in &meal.avoid {
            row("avoid", &meal.label, avoid);
        }
    }
    for block in &plan.movement.blocks {
        row("movement", &block.label, &format!("{} min", block.minutes));
    }
    for note in &plan.movement.notes {
        row("movement", "note", note);
    }
    for practice in &plan.mind.practices {
        row("mind", "practice", practice);
    }
    for rec in &plan.recommendations {
        row("recommendation", "", rec);
    }
    for area in &plan.focus_areas {
        row("focus", "", area);
    }
    for note in &plan.education {
        row("education", "", note);
    }
    row("meta", "disclaimerId", &plan.meta.disclaimer_id);
    row("meta", "disclaimer", plan.disclaimer());

    let mut out = String::from("section,label,item\r\n");
    for fields in &rows {
        let quoted: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&quoted.join(","));
        out.push_str("\r\n");
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `glowell-plan-<12 hex of the content hash>.<ext>`.
pub fn export_file_name(plan: &SafePlan, format: ExportFormat) -> Result<String, serde_json::Error> {
    let hash = plan.content_hash()?;
    Ok(format!("glowell-plan-{}.{}", &hash[..12], format.extension()))
}
