use std::fmt::Write as _;

use anyhow::Context;
use changelens_core::ImpactReport;
use changelens_core::types::{ClassChange, MethodChange, SignatureDelta};
use clap::ValueEnum;
use serde::Serialize;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

pub fn render(report: &ImpactReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(report).context("Cannot serialize report")
        }
        OutputFormat::Text => {
            let mut out = String::new();
            write_text(&mut out, report).context("Cannot format report")?;
            Ok(out)
        }
    }
}

/// Lowercase wire name of a serializable enum value.
fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "?".to_string())
}

fn delta_aspect(delta: &SignatureDelta) -> &'static str {
    match delta {
        SignatureDelta::Visibility { .. } => "visibility",
        SignatureDelta::Static { .. } => "static",
        SignatureDelta::Parameters { .. } => "parameters",
        SignatureDelta::ReturnType { .. } => "return type",
        SignatureDelta::ReturnAnnotation { .. } => "@return",
    }
}

fn write_text(out: &mut String, report: &ImpactReport) -> std::fmt::Result {
    let risk = report.risk();
    let version = report.version();
    writeln!(out, "Risk: {} ({})", risk.level, risk.rationale)?;
    writeln!(
        out,
        "Recommended bump: {} (confidence: {}{})",
        version.bump,
        label(&version.confidence),
        if version.requires_manual_review {
            ", manual review"
        } else {
            ""
        }
    )?;
    for reason in &version.reasons {
        writeln!(
            out,
            "  [{}] {}: {} ({})",
            reason.bump, reason.category, reason.description, reason.count
        )?;
    }
    for note in &version.notes {
        writeln!(out, "  note: {note}")?;
    }

    let s = report.summary();
    writeln!(out)?;
    writeln!(out, "Summary:")?;
    for (name, count) in [
        ("Modified public API", s.modified_public_api),
        ("New public API", s.new_public_api),
        ("Modified config methods", s.modified_config_methods),
        ("New config methods", s.new_config_methods),
        ("Communication layer", s.modified_communication_layer),
        ("Internal with impact", s.internal_with_impact),
        ("Internal without impact", s.internal_no_impact),
        ("New internal methods", s.new_internal),
        ("Removed methods", s.removed_methods),
        ("New classes", s.new_classes),
        ("Removed classes", s.removed_classes),
        ("Deprecated classes", s.deprecated_classes),
        ("Transfer changes", s.transfer_changes),
        ("Constant changes", s.constant_changes),
        ("Schema changes", s.schema_changes),
        ("Dependency changes", s.dependency_changes),
        ("PHP version changes", s.php_version_changes),
        ("Touched files", s.touched_files),
        ("Skipped files", s.skipped_files),
    ] {
        writeln!(out, "  {name:<25} {count}")?;
    }

    let changes = report.changes();
    write_methods(out, "Modified Public API", &changes.modified_public_api)?;
    write_methods(out, "New Public API", &changes.new_public_api)?;
    write_methods(out, "Modified Config Methods", &changes.modified_config_methods)?;
    write_methods(out, "New Config Methods", &changes.new_config_methods)?;
    write_methods(out, "Modified Communication Layer", &changes.modified_communication_layer)?;
    write_methods(out, "Internal Changes With Impact", &changes.internal_with_impact)?;
    write_methods(out, "Internal Changes Without Impact", &changes.internal_no_impact)?;
    write_methods(out, "New Internal Methods", &changes.new_internal)?;
    write_methods(out, "Removed Methods", &changes.removed_methods)?;
    write_classes(out, "New Classes", &changes.new_classes)?;
    write_classes(out, "Removed Classes", &changes.removed_classes)?;
    write_classes(out, "Deprecated Classes", &changes.deprecated_classes)?;

    let transfers = report.transfer_changes();
    if !transfers.is_empty() {
        writeln!(out)?;
        writeln!(out, "Transfer Changes ({}):", transfers.len())?;
        for t in transfers {
            let subject = match &t.property {
                Some(property) => format!("{}.{property}", t.owner),
                None => t.owner.to_string(),
            };
            write!(out, "  {subject}  {}", label(&t.change))?;
            if t.old_type.is_some() || t.new_type.is_some() {
                write!(
                    out,
                    "  {} -> {}",
                    t.old_type.as_deref().unwrap_or("-"),
                    t.new_type.as_deref().unwrap_or("-")
                )?;
            }
            writeln!(out)?;
        }
    }

    let constants = report.constant_changes();
    if !constants.is_empty() {
        writeln!(out)?;
        writeln!(out, "Constant Changes ({}):", constants.len())?;
        for c in constants {
            write!(out, "  {}::{}  {} ({})", c.owner, c.name, label(&c.change), label(&c.visibility))?;
            if c.old_value.is_some() || c.new_value.is_some() {
                write!(
                    out,
                    "  {} -> {}",
                    c.old_value.as_deref().unwrap_or("-"),
                    c.new_value.as_deref().unwrap_or("-")
                )?;
            }
            writeln!(out)?;
        }
    }

    let schema = report.schema_changes();
    if !schema.is_empty() {
        writeln!(out)?;
        writeln!(out, "Schema Changes ({}):", schema.len())?;
        for c in schema {
            let subject = match &c.element {
                Some(element) => format!("{}.{element}", c.table),
                None => c.table.clone(),
            };
            write!(out, "  {subject}  {}", label(&c.change))?;
            if c.old.is_some() || c.new.is_some() {
                write!(
                    out,
                    "  {} -> {}",
                    c.old.as_deref().unwrap_or("-"),
                    c.new.as_deref().unwrap_or("-")
                )?;
            }
            writeln!(out)?;
        }
    }

    let dependencies = report.dependency_changes();
    if !dependencies.is_empty() {
        writeln!(out)?;
        writeln!(out, "Dependency Changes ({}):", dependencies.len())?;
        for d in dependencies {
            let constraint = report
                .constraint_changes()
                .iter()
                .find(|c| c.file == d.file && c.package == d.package)
                .map(|c| format!(", constraint {}", label(&c.change)))
                .unwrap_or_default();
            writeln!(
                out,
                "  {}  {}  {} -> {}  {}{constraint}",
                d.file.display(),
                d.package,
                d.old.as_deref().unwrap_or("-"),
                d.new.as_deref().unwrap_or("-"),
                label(&d.change)
            )?;
        }
    }

    let php = report.php_version_changes();
    if !php.is_empty() {
        writeln!(out)?;
        writeln!(out, "PHP Version Changes ({}):", php.len())?;
        for p in php {
            writeln!(
                out,
                "  {}  {} -> {}  {}",
                p.file.display(),
                p.old.as_deref().unwrap_or("-"),
                p.new.as_deref().unwrap_or("-"),
                label(&p.change)
            )?;
        }
    }

    let skipped = report.skipped_files();
    if !skipped.is_empty() {
        writeln!(out)?;
        writeln!(out, "Skipped Files ({}):", skipped.len())?;
        for file in skipped {
            writeln!(out, "  {}  {}", file.path.display(), file.reason.as_str())?;
        }
    }

    let diagnostics = report.diagnostics();
    if !diagnostics.is_empty() {
        writeln!(out)?;
        writeln!(out, "Diagnostics ({}):", diagnostics.len())?;
        for d in diagnostics {
            writeln!(out, "  [{}] {} {}: {}", d.side, label(&d.code), d.subject, d.message)?;
        }
    }
    Ok(())
}

fn write_methods(out: &mut String, title: &str, methods: &[MethodChange]) -> std::fmt::Result {
    if methods.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{title} ({}):", methods.len())?;
    for m in methods {
        write!(out, "  {}", m.key)?;
        if !m.signature_deltas.is_empty() {
            let aspects: Vec<&str> = m.signature_deltas.iter().map(delta_aspect).collect();
            write!(out, "  [{}]", aspects.join(", "))?;
        } else if let Some(internal) = m.internal {
            write!(out, "  [{}]", label(&internal))?;
        }
        if m.is_deprecated {
            write!(out, "  @deprecated")?;
        }
        writeln!(out)?;
        for entry in &m.impacted_entrypoints {
            writeln!(out, "    reached from {} ({} hops)", entry.key, entry.hops)?;
        }
    }
    Ok(())
}

fn write_classes(out: &mut String, title: &str, classes: &[ClassChange]) -> std::fmt::Result {
    if classes.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{title} ({}):", classes.len())?;
    for c in classes {
        writeln!(out, "  {} ({})", c.fqn, label(&c.kind))?;
    }
    Ok(())
}
