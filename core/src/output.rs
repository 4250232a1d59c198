//! Output formatting for comparison results and schema sets.

use crate::report::{ComparisonResult, DetectorStatus};
use crate::{DriftIssue, IssueKind, SchemaSet, Severity};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
    Markdown,
    /// One line per issue, for CI logs.
    Ci,
}

/// Formats a comparison result in the requested output format.
pub fn format_result(result: &ComparisonResult, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)
            .map(|mut out| {
                out.push('\n');
                out
            })
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(result).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(result_to_markdown(result)),
        OutputFormat::Text => Ok(result_to_text(result)),
        OutputFormat::Ci => Ok(result_to_ci(result)),
    }
}

/// Formats the type listing of one loaded source.
pub fn format_schema_set(set: &SchemaSet, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(set)
            .map(|mut out| {
                out.push('\n');
                out
            })
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(set).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(set_to_markdown(set)),
        OutputFormat::Text | OutputFormat::Ci => Ok(set_to_text(set)),
    }
}

fn severity_heading(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "Errors",
        Severity::Warning => "Warnings",
        Severity::Info => "Info",
    }
}

/// Splits sorted issues into per-severity, per-kind groups, skipping empty
/// ones.
fn grouped(result: &ComparisonResult) -> Vec<(Severity, Vec<(IssueKind, Vec<&DriftIssue>)>)> {
    let sorted = result.sorted_issues();
    Severity::ALL
        .iter()
        .filter_map(|&severity| {
            let kinds: Vec<(IssueKind, Vec<&DriftIssue>)> = IssueKind::ALL
                .iter()
                .filter_map(|&kind| {
                    let issues: Vec<&DriftIssue> = sorted
                        .iter()
                        .copied()
                        .filter(|i| i.severity == severity && i.kind == kind)
                        .collect();
                    (!issues.is_empty()).then_some((kind, issues))
                })
                .collect();
            (!kinds.is_empty()).then_some((severity, kinds))
        })
        .collect()
}

fn version_line(label: &str, version: Option<&str>, digest: Option<&str>) -> String {
    let mut line = format!("{label}: {}", version.unwrap_or("unknown"));
    if let Some(digest) = digest {
        let short: String = digest.chars().take(12).collect();
        line.push_str(&format!(" (sha256 {short})"));
    }
    line
}

fn detector_line(result: &ComparisonResult) -> Option<String> {
    let detector = &result.detector;
    match detector.status {
        DetectorStatus::NotConfigured => None,
        DetectorStatus::Ran => Some(format!("detector: ran ({} issues)", detector.issues)),
        DetectorStatus::Skipped => Some(format!(
            "detector: skipped ({})",
            detector.reason.as_deref().unwrap_or("no reason given")
        )),
    }
}

fn result_to_text(result: &ComparisonResult) -> String {
    let mut out = String::new();

    out.push_str("Schema drift report\n");
    out.push_str(&format!(
        "  {}\n",
        version_line(
            &result.labels.a,
            result.source_version_a.as_deref(),
            result.digest_a.as_deref()
        )
    ));
    out.push_str(&format!(
        "  {}\n",
        version_line(
            &result.labels.b,
            result.source_version_b.as_deref(),
            result.digest_b.as_deref()
        )
    ));
    out.push_str(&format!("  checked at: {}\n", result.timestamp));
    if let Some(line) = detector_line(result) {
        out.push_str(&format!("  {line}\n"));
    }

    for (severity, kinds) in grouped(result) {
        out.push_str(&format!(
            "\n{} ({})\n",
            severity_heading(severity).to_uppercase(),
            result.summary.count(severity)
        ));
        for (kind, issues) in kinds {
            out.push_str(&format!("  {kind}\n"));
            for issue in issues {
                out.push_str(&format!("    {}: {}\n", issue.path, issue.message));
            }
        }
    }

    out.push_str(&format!("\n{}\n", result.summary));
    out
}

fn result_to_ci(result: &ComparisonResult) -> String {
    let mut out = String::new();
    for issue in result.sorted_issues() {
        out.push_str(&format!("{issue}\n"));
    }
    out.push_str(&format!("{}\n", result.summary));
    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn result_to_markdown(result: &ComparisonResult) -> String {
    let mut out = String::new();

    out.push_str("# Schema Drift Report\n\n");
    out.push_str(&format!(
        "- **{}:** {}\n",
        result.labels.a,
        result.source_version_a.as_deref().unwrap_or("unknown")
    ));
    out.push_str(&format!(
        "- **{}:** {}\n",
        result.labels.b,
        result.source_version_b.as_deref().unwrap_or("unknown")
    ));
    out.push_str(&format!("- **Checked at:** {}\n", result.timestamp));
    if let Some(line) = detector_line(result) {
        out.push_str(&format!("- **Detector:** {}\n", line.trim_start_matches("detector: ")));
    }
    out.push_str(&format!(
        "- **Result:** {}\n",
        if result.passed() { "passed" } else { "failed" }
    ));

    for (severity, kinds) in grouped(result) {
        out.push_str(&format!(
            "\n## {} ({})\n",
            severity_heading(severity),
            result.summary.count(severity)
        ));
        for (kind, issues) in kinds {
            out.push_str(&format!("\n### {kind}\n\n"));
            out.push_str("| Path | Message |\n");
            out.push_str("|------|---------|\n");
            for issue in issues {
                out.push_str(&format!(
                    "| `{}` | {} |\n",
                    issue.path,
                    escape_cell(&issue.message)
                ));
            }
        }
    }

    out.push_str(&format!("\n**{}**\n", result.summary));
    out
}

fn set_to_text(set: &SchemaSet) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Version: {}  Types: {}",
        set.version.as_deref().unwrap_or("unknown"),
        set.len()
    ));
    if let Some(ref digest) = set.digest {
        out.push_str(&format!("  SHA-256: {digest}"));
    }
    out.push('\n');

    let names: Vec<String> = set.iter().map(|t| t.qualified_name()).collect();
    let width = names.iter().map(String::len).max().unwrap_or(4);
    for (name, entry) in names.iter().zip(set.iter()) {
        let nullable = if entry.tree.nullable { " (nullable)" } else { "" };
        out.push_str(&format!(
            "  {:<width$}  {}{nullable}\n",
            name,
            entry.tree.kind(),
            width = width
        ));
    }

    out
}

fn set_to_markdown(set: &SchemaSet) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# Schema Set {}\n\n",
        set.version.as_deref().unwrap_or("unknown")
    ));
    out.push_str("| Type | Kind | Nullable |\n");
    out.push_str("|------|------|----------|\n");
    for entry in set.iter() {
        let nullable = if entry.tree.nullable { "yes" } else { "no" };
        out.push_str(&format!(
            "| `{}` | {} | {nullable} |\n",
            entry.qualified_name(),
            entry.tree.kind()
        ));
    }

    out
}
