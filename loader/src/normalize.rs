//! JSON-Schema to [`SchemaTree`] normalization.
//!
//! Source-specific spellings are folded here so the diff engine only ever
//! sees the tagged model:
//!
//! - `$ref` as a JSON pointer (`#/components/schemas/X`, `#/definitions/X`)
//!   becomes a reference to its last segment, unescaped; bare names are kept
//!   whole (the library loader resolves its `group.X` form)
//! - `nullable: true`, `type: [T, "null"]`, `null` enum members and
//!   `{type: "null"}` union branches become the `nullable` flag
//! - `integer` is a number, `const` is a one-value enumeration
//! - single-branch unions collapse, `allOf` over inline objects merges
//!
//! Nodes that already carry a `shape` tag are deserialized as-is.
//!
//! # Example
//!
//! ```
//! use schema_drift_core::Kind;
//! use schema_drift_loader::normalize;
//! use serde_json::json;
//!
//! let tree = normalize(
//!     &json!({
//!         "type": "object",
//!         "properties": {
//!             "count": {"type": ["integer", "null"]},
//!             "owner": {"$ref": "#/components/schemas/User"}
//!         },
//!         "required": ["count"],
//!         "additionalProperties": false
//!     }),
//!     "#/Session",
//! )
//! .unwrap();
//!
//! let count = tree.property("count").unwrap();
//! assert_eq!(count.kind(), Kind::Number);
//! assert!(count.nullable);
//! assert_eq!(tree.property("owner").unwrap().reference_target(), Some("User"));
//! assert!(tree.is_required("count"));
//! ```

use serde_json::{Map, Value};

use schema_drift_core::{AdditionalProperties, LeafKind, SchemaNode, SchemaTree, UnionMode};

use crate::error::{LoaderError, Result};

const UNION_KEYWORDS: [(&str, UnionMode); 3] = [
    ("oneOf", UnionMode::ExactlyOne),
    ("anyOf", UnionMode::AnyOf),
    ("allOf", UnionMode::AllOf),
];

/// Normalizes one serialized schema node.
///
/// `pointer` is the JSON location of `value`, used in error messages.
///
/// # Errors
///
/// Returns [`LoaderError::InvalidSchema`] for values that are not schema
/// objects, and [`LoaderError::InvariantViolation`] when a node mixes
/// enumeration, object, array and union fields.
pub fn normalize(value: &Value, pointer: &str) -> Result<SchemaTree> {
    let map = match value {
        Value::Object(map) => map,
        Value::Bool(true) => return Ok(SchemaTree::unknown()),
        other => {
            return Err(LoaderError::invalid(
                pointer,
                format!("expected a schema object, found {}", json_type_name(other)),
            ));
        }
    };

    if map.contains_key("shape") {
        return serde_json::from_value(value.clone())
            .map_err(|e| LoaderError::invalid(pointer, e.to_string()));
    }

    let mut nullable = map.get("nullable").and_then(Value::as_bool).unwrap_or(false);
    let description = map
        .get("description")
        .and_then(Value::as_str)
        .map(String::from);

    if let Some(reference) = map.get("$ref") {
        let target = reference
            .as_str()
            .ok_or_else(|| LoaderError::invalid(pointer, "`$ref` must be a string"))?;
        let mut tree = SchemaTree::reference(&reference_name(target));
        tree.nullable = nullable;
        tree.description = description;
        return Ok(tree);
    }

    check_exclusive(map, pointer)?;

    let (types, null_type) = declared_types(map.get("type"), pointer)?;
    nullable |= null_type;

    let mut tree = if let Some(mut values) = enum_values(map, pointer)? {
        if values.iter().any(Value::is_null) {
            nullable = true;
            values.retain(|v| !v.is_null());
        }
        let kind = match types.first() {
            Some(name) => leaf_kind(name),
            None => infer_leaf_kind(&values),
        };
        SchemaTree::enumeration(kind, values)
    } else if let Some((keyword, mode, branches)) = union_field(map) {
        normalize_union(keyword, mode, branches, pointer)?
    } else if map.contains_key("properties")
        || map.contains_key("additionalProperties")
        || types.iter().any(|t| t == "object")
    {
        normalize_object(map, pointer)?
    } else if map.contains_key("items") || types.iter().any(|t| t == "array") {
        let items = match map.get("items") {
            Some(items) => normalize(items, &format!("{pointer}/items"))?,
            None => SchemaTree::unknown(),
        };
        SchemaTree::array(items)
    } else {
        match types.as_slice() {
            [] => SchemaTree::unknown(),
            [single] => bare_type(single),
            several => SchemaTree::union(
                UnionMode::AnyOf,
                several.iter().map(|t| bare_type(t)).collect(),
            ),
        }
    };

    tree.nullable |= nullable;
    if description.is_some() {
        tree.description = description;
    }
    Ok(tree)
}

/// Extracts the type name from a reference string.
///
/// JSON pointers yield their last segment with `~1` and `~0` unescaped.
/// Anything else is returned whole, dots included.
///
/// # Examples
///
/// ```
/// use schema_drift_loader::reference_name;
///
/// assert_eq!(reference_name("#/components/schemas/Session"), "Session");
/// assert_eq!(reference_name("#/components/schemas/v1.User"), "v1.User");
/// assert_eq!(reference_name("#/definitions/io~1k8s~0Pod"), "io/k8s~Pod");
/// assert_eq!(reference_name("updates.Session"), "updates.Session");
/// ```
pub fn reference_name(target: &str) -> String {
    match target.rsplit_once('/') {
        Some((_, last)) => last.replace("~1", "/").replace("~0", "~"),
        None => target.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn check_exclusive(map: &Map<String, Value>, pointer: &str) -> Result<()> {
    let mut fields = Vec::new();
    for key in ["enum", "const"] {
        if map.contains_key(key) {
            fields.push(key.to_string());
            break;
        }
    }
    if map.contains_key("properties") {
        fields.push("properties".to_string());
    }
    if map.contains_key("items") {
        fields.push("items".to_string());
    }
    if let Some((keyword, _, _)) = union_field(map) {
        fields.push(keyword.to_string());
    }

    if fields.len() > 1 {
        return Err(LoaderError::InvariantViolation {
            path: pointer.to_string(),
            fields,
        });
    }
    Ok(())
}

/// Returns the non-null type names and whether `null` was among them.
fn declared_types(value: Option<&Value>, pointer: &str) -> Result<(Vec<String>, bool)> {
    let names: Vec<&str> = match value {
        None => return Ok((Vec::new(), false)),
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    LoaderError::invalid(pointer, "`type` entries must be strings")
                })
            })
            .collect::<Result<_>>()?,
        Some(_) => {
            return Err(LoaderError::invalid(
                pointer,
                "`type` must be a string or an array of strings",
            ));
        }
    };

    let null = names.contains(&"null");
    let types = names
        .into_iter()
        .filter(|name| *name != "null")
        .map(String::from)
        .collect();
    Ok((types, null))
}

fn enum_values(map: &Map<String, Value>, pointer: &str) -> Result<Option<Vec<Value>>> {
    if let Some(values) = map.get("enum") {
        return match values {
            Value::Array(values) => Ok(Some(values.clone())),
            _ => Err(LoaderError::invalid(pointer, "`enum` must be an array")),
        };
    }
    Ok(map.get("const").map(|value| vec![value.clone()]))
}

fn union_field(map: &Map<String, Value>) -> Option<(&'static str, UnionMode, &Value)> {
    UNION_KEYWORDS
        .iter()
        .find_map(|&(keyword, mode)| map.get(keyword).map(|branches| (keyword, mode, branches)))
}

fn leaf_kind(name: &str) -> LeafKind {
    match name {
        "string" => LeafKind::String,
        "number" | "integer" => LeafKind::Number,
        "boolean" => LeafKind::Boolean,
        _ => LeafKind::Unknown,
    }
}

/// Tree for a `type` name with no further constraints.
fn bare_type(name: &str) -> SchemaTree {
    match name {
        "object" => SchemaTree::object(),
        "array" => SchemaTree::array(SchemaTree::unknown()),
        other => SchemaTree::leaf(leaf_kind(other)),
    }
}

fn infer_leaf_kind(values: &[Value]) -> LeafKind {
    if values.is_empty() {
        LeafKind::Unknown
    } else if values.iter().all(Value::is_string) {
        LeafKind::String
    } else if values.iter().all(Value::is_number) {
        LeafKind::Number
    } else if values.iter().all(Value::is_boolean) {
        LeafKind::Boolean
    } else {
        LeafKind::Unknown
    }
}

fn normalize_object(map: &Map<String, Value>, pointer: &str) -> Result<SchemaTree> {
    let mut tree = SchemaTree::object();

    if let Some(properties) = map.get("properties") {
        let Value::Object(properties) = properties else {
            return Err(LoaderError::invalid(pointer, "`properties` must be an object"));
        };
        for (name, schema) in properties {
            let child = normalize(schema, &format!("{pointer}/properties/{name}"))?;
            tree = tree.with_property(name, child);
        }
    }

    if let Some(required) = map.get("required") {
        let Value::Array(required) = required else {
            return Err(LoaderError::invalid(pointer, "`required` must be an array"));
        };
        for name in required {
            let name = name
                .as_str()
                .ok_or_else(|| LoaderError::invalid(pointer, "`required` entries must be strings"))?;
            tree = tree.with_required(name);
        }
    }

    let additional = match map.get("additionalProperties") {
        None | Some(Value::Bool(true)) => AdditionalProperties::Unconstrained,
        Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
        Some(schema) => AdditionalProperties::Typed(Box::new(normalize(
            schema,
            &format!("{pointer}/additionalProperties"),
        )?)),
    };
    Ok(tree.with_additional_properties(additional))
}

/// `{type: "null"}`, `{enum: [null]}` or `{const: null}`.
fn is_null_schema(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    match map.get("type") {
        Some(Value::String(name)) => name == "null",
        Some(Value::Array(names)) => names.iter().all(|n| n.as_str() == Some("null")),
        Some(_) => false,
        None => match (map.get("enum"), map.get("const")) {
            (Some(Value::Array(values)), _) => values.iter().all(Value::is_null),
            (None, Some(value)) => value.is_null(),
            _ => false,
        },
    }
}

fn normalize_union(
    keyword: &str,
    mode: UnionMode,
    branches: &Value,
    pointer: &str,
) -> Result<SchemaTree> {
    let Value::Array(branches) = branches else {
        return Err(LoaderError::invalid(pointer, format!("`{keyword}` must be an array")));
    };

    let mut nullable = false;
    let mut trees = Vec::with_capacity(branches.len());
    for (index, branch) in branches.iter().enumerate() {
        if is_null_schema(branch) {
            nullable = true;
            continue;
        }
        trees.push(normalize(branch, &format!("{pointer}/{keyword}/{index}"))?);
    }

    let mut tree = match trees.len() {
        0 => SchemaTree::unknown(),
        1 => trees.remove(0),
        _ if mode == UnionMode::AllOf && trees.iter().all(is_inline_object) => merge_objects(trees),
        _ => SchemaTree::union(mode, trees),
    };
    tree.nullable |= nullable;
    Ok(tree)
}

fn is_inline_object(tree: &SchemaTree) -> bool {
    matches!(tree.node, SchemaNode::Object { .. })
}

fn strictness(policy: &AdditionalProperties) -> u8 {
    match policy {
        AdditionalProperties::Forbidden => 2,
        AdditionalProperties::Typed(_) => 1,
        AdditionalProperties::Unconstrained => 0,
    }
}

/// Merges `allOf` object branches: properties and required sets are unioned
/// (first definition of a property wins) and the strictest
/// additional-properties policy is kept.
fn merge_objects(branches: Vec<SchemaTree>) -> SchemaTree {
    let mut merged = SchemaTree::object();
    let mut policy = AdditionalProperties::Unconstrained;
    let mut nullable = true;

    for branch in branches {
        nullable &= branch.nullable;
        let SchemaNode::Object {
            properties,
            required,
            additional_properties,
        } = branch.node
        else {
            continue;
        };
        for property in properties {
            if merged.property(&property.name).is_none() {
                merged = merged.with_property(&property.name, property.schema);
            }
        }
        for name in &required {
            merged = merged.with_required(name);
        }
        if strictness(&additional_properties) > strictness(&policy) {
            policy = additional_properties;
        }
    }

    let mut merged = merged.with_additional_properties(policy);
    merged.nullable = nullable;
    merged
}
