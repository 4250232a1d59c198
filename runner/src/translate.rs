//! Translation of structural diff tool output into drift issues.
//!
//! The tool prints a JSON array of change entries (or an object with a
//! `changes` array). Each entry becomes one [`IssueKind::Breaking`] issue
//! carrying the tool's own severity; nothing is re-derived.

use schema_drift_core::{DriftIssue, IssueKind, Severity};
use serde_json::Value;

/// Parses the tool's stdout.
///
/// Empty output means no changes. Anything that is not a list of change
/// objects is rejected with a reason suitable for a skipped detector step.
///
/// # Examples
///
/// ```
/// use schema_drift_core::Severity;
/// use schema_drift_runner::translate_changes;
///
/// let output = r#"[{"id": "response-property-removed", "text": "removed `name`",
///                   "level": 3, "operation": "GET", "path": "/sessions"}]"#;
/// let issues = translate_changes(output).unwrap();
/// assert_eq!(issues[0].severity, Severity::Error);
/// assert_eq!(issues[0].path, "GET /sessions");
/// ```
pub fn translate_changes(output: &str) -> Result<Vec<DriftIssue>, String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| format!("unparseable tool output: {e}"))?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut root) => match root.remove("changes") {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => Vec::new(),
            Some(_) => return Err("`changes` in tool output is not an array".to_string()),
        },
        Value::Null => Vec::new(),
        _ => return Err("tool output is neither a list nor an object".to_string()),
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| translate_entry(index, entry))
        .collect()
}

fn translate_entry(index: usize, entry: Value) -> Result<DriftIssue, String> {
    let Value::Object(fields) = &entry else {
        return Err(format!("change entry {index} is not an object"));
    };
    let text_field = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    let severity = fields.get("level").map_or(Severity::Error, level_severity);
    let path = match (text_field("operation"), text_field("path")) {
        (Some(operation), Some(path)) => format!("{operation} {path}"),
        (None, Some(path)) => path.to_string(),
        _ => text_field("id").unwrap_or("<unknown>").to_string(),
    };
    let message = text_field("text")
        .or_else(|| text_field("id"))
        .unwrap_or("change reported by breaking-change detector")
        .to_string();

    Ok(DriftIssue::new(severity, IssueKind::Breaking, path, message).with_details(entry))
}

/// Maps the tool's level to a severity. Unrecognized levels count as errors:
/// the tool already flagged the change.
fn level_severity(level: &Value) -> Severity {
    match level {
        Value::Number(n) => match n.as_u64() {
            Some(1) => Severity::Info,
            Some(2) => Severity::Warning,
            _ => Severity::Error,
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "info" | "non-breaking" => Severity::Info,
            "warn" | "warning" => Severity::Warning,
            _ => Severity::Error,
        },
        _ => Severity::Error,
    }
}
