//! Loading schema sources into [`SchemaSet`]s.
//!
//! Two document layouts are understood:
//!
//! - **Library export** ([`InputFormat::Library`]): a `metadata` block
//!   (alias `$metadata`) with a `version`, and one member per logical group
//!   mapping type names to schemas. A `groups` member, when present, holds
//!   the groups instead.
//! - **Generated specification** ([`InputFormat::Spec`]): OpenAPI 3
//!   (`components.schemas`) or Swagger 2 (`definitions`), version from
//!   `info.version`.
//!
//! # Loading patterns
//!
//! ```no_run
//! use schema_drift_loader::{load_library, load_spec};
//!
//! let library = load_library("schemas/export.json").unwrap();
//! let generated = load_spec("openapi.json").unwrap();
//! println!(
//!     "{} library types, {} generated types",
//!     library.len(),
//!     generated.len()
//! );
//! ```

use std::collections::HashSet;
use std::path::Path;

use schema_drift_core::{AdditionalProperties, SchemaNode, SchemaSet, SchemaTree};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{LoaderError, Result};
use crate::normalize::normalize;

/// Layout of an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Hand-authored schema library export.
    Library,
    /// Generated OpenAPI / Swagger specification.
    Spec,
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Library => write!(f, "library"),
            Self::Spec => write!(f, "spec"),
        }
    }
}

/// Loads a schema library export from a file.
pub fn load_library(path: impl AsRef<Path>) -> Result<SchemaSet> {
    load(path, InputFormat::Library)
}

/// Loads a generated specification from a file.
pub fn load_spec(path: impl AsRef<Path>) -> Result<SchemaSet> {
    load(path, InputFormat::Spec)
}

/// Loads a file in the given layout and records its SHA-256 digest.
///
/// # Errors
///
/// Returns [`LoaderError::Io`] if the file cannot be read,
/// [`LoaderError::Json`] if it is not valid JSON, and any normalization
/// error for its schemas.
pub fn load(path: impl AsRef<Path>, format: InputFormat) -> Result<SchemaSet> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_slice(&bytes).map_err(|source| LoaderError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut set = from_value(&value, format, &path.display().to_string())?;
    set.digest = Some(digest(&bytes));
    debug!(
        path = %path.display(),
        format = %format,
        types = set.len(),
        version = ?set.version,
        "loaded schema source"
    );
    Ok(set)
}

/// Builds a [`SchemaSet`] from an in-memory document.
///
/// `document` names the source in error messages. No digest is recorded.
///
/// # Examples
///
/// ```
/// use schema_drift_loader::{InputFormat, from_value};
/// use serde_json::json;
///
/// let spec = json!({
///     "openapi": "3.0.3",
///     "info": {"title": "sessions", "version": "2.4.0"},
///     "components": {"schemas": {
///         "Session": {"type": "object", "properties": {"id": {"type": "string"}}}
///     }}
/// });
/// let set = from_value(&spec, InputFormat::Spec, "openapi.json").unwrap();
/// assert_eq!(set.version.as_deref(), Some("2.4.0"));
/// assert!(set.contains("Session"));
/// ```
pub fn from_value(value: &Value, format: InputFormat, document: &str) -> Result<SchemaSet> {
    let Value::Object(root) = value else {
        return Err(LoaderError::invalid("#", format!("{document} is not a JSON object")));
    };
    match format {
        InputFormat::Library => library_from_object(root),
        InputFormat::Spec => spec_from_object(root, document),
    }
}

/// Lower-case hex SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn version_string(value: &Value) -> Option<String> {
    match value {
        Value::String(version) => Some(version.clone()),
        Value::Number(version) => Some(version.to_string()),
        _ => None,
    }
}

fn library_from_object(root: &Map<String, Value>) -> Result<SchemaSet> {
    let version = root
        .get("metadata")
        .or_else(|| root.get("$metadata"))
        .and_then(|metadata| metadata.get("version"))
        .and_then(version_string);

    let (groups, prefix): (Vec<(&String, &Value)>, &str) = match root.get("groups") {
        Some(Value::Object(groups)) => (groups.iter().collect(), "#/groups"),
        Some(_) => return Err(LoaderError::invalid("#/groups", "`groups` must be an object")),
        None => (
            root.iter()
                .filter(|(key, _)| *key != "metadata" && !key.starts_with('$'))
                .collect(),
            "#",
        ),
    };

    let mut typed_groups = Vec::with_capacity(groups.len());
    for (group, types) in groups {
        let group_pointer = format!("{prefix}/{group}");
        let Value::Object(types) = types else {
            return Err(LoaderError::invalid(
                &group_pointer,
                "a group must map type names to schemas",
            ));
        };
        typed_groups.push((group, group_pointer, types));
    }
    let group_names: HashSet<&str> = typed_groups.iter().map(|(g, _, _)| g.as_str()).collect();
    let type_names: HashSet<&str> = typed_groups
        .iter()
        .flat_map(|(_, _, types)| types.keys().map(String::as_str))
        .collect();

    let mut set = SchemaSet::new(version);
    for (group, group_pointer, types) in typed_groups {
        for (name, schema) in types {
            let mut tree = normalize(schema, &format!("{group_pointer}/{name}"))?;
            strip_group_prefixes(&mut tree, &group_names, &type_names);
            if !set.insert(Some(group), name, tree) {
                let kept = set
                    .entry(name)
                    .and_then(|entry| entry.group.clone())
                    .unwrap_or_default();
                warn!(
                    type_name = %name,
                    group = %group,
                    kept_group = %kept,
                    "duplicate type name in library export, keeping first definition"
                );
            }
        }
    }
    Ok(set)
}

/// Rewrites `group.Name` reference targets to `Name` when `group` is one of
/// the export's groups and `Name` one of its types. Targets that name a type
/// exactly, dots included, are left alone.
fn strip_group_prefixes(tree: &mut SchemaTree, groups: &HashSet<&str>, types: &HashSet<&str>) {
    match &mut tree.node {
        SchemaNode::Reference { target } => {
            if types.contains(target.as_str()) {
                return;
            }
            if let Some((group, name)) = target.split_once('.') {
                if groups.contains(group) && types.contains(name) {
                    *target = name.to_string();
                }
            }
        }
        SchemaNode::Object {
            properties,
            additional_properties,
            ..
        } => {
            for property in properties {
                strip_group_prefixes(&mut property.schema, groups, types);
            }
            if let AdditionalProperties::Typed(schema) = additional_properties {
                strip_group_prefixes(schema, groups, types);
            }
        }
        SchemaNode::Array { items } => strip_group_prefixes(items, groups, types),
        SchemaNode::Union { branches, .. } => {
            for branch in branches {
                strip_group_prefixes(branch, groups, types);
            }
        }
        SchemaNode::Leaf { .. } => {}
    }
}

fn spec_from_object(root: &Map<String, Value>, document: &str) -> Result<SchemaSet> {
    let version = root
        .get("info")
        .and_then(|info| info.get("version"))
        .and_then(version_string);

    let (schemas, pointer) = if let Some(schemas) = root
        .get("components")
        .and_then(|components| components.get("schemas"))
    {
        (schemas, "#/components/schemas")
    } else if let Some(definitions) = root.get("definitions") {
        (definitions, "#/definitions")
    } else {
        return Err(LoaderError::MissingSection {
            document: document.to_string(),
            section: "components.schemas".to_string(),
        });
    };

    let Value::Object(schemas) = schemas else {
        return Err(LoaderError::invalid(pointer, "expected a mapping of type names to schemas"));
    };

    let mut set = SchemaSet::new(version);
    for (name, schema) in schemas {
        let tree = normalize(schema, &format!("{pointer}/{name}"))?;
        set.insert(None, name, tree);
    }
    Ok(set)
}
