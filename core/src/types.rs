//! Schema tree model and drift issue definitions.
//!
//! This module defines the normalized in-memory representation that both
//! schema sources are loaded into, and the [`DriftIssue`] records the diff
//! engine produces when the two trees disagree. The types are designed for
//! serialization with [`serde`] so a normalized tree can round-trip through
//! JSON and be passed straight back into the loader.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primary kind of a schema node.
///
/// Derived from the node shape rather than stored, see [`SchemaTree::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Union,
    Reference,
    Unknown,
}

impl Kind {
    /// Returns the lower-case wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Union => "union",
            Self::Reference => "reference",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar kind carried by a [`SchemaNode::Leaf`].
///
/// `integer` schemas are folded into [`LeafKind::Number`] by the loader;
/// free-form schemas (`{}`) become [`LeafKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeafKind {
    String,
    Number,
    Boolean,
    #[default]
    Unknown,
}

impl LeafKind {
    fn kind(self) -> Kind {
        match self {
            Self::String => Kind::String,
            Self::Number => Kind::Number,
            Self::Boolean => Kind::Boolean,
            Self::Unknown => Kind::Unknown,
        }
    }
}

/// Flavor of a union node.
///
/// The three JSON-Schema combinators are kept apart because a value must
/// match exactly one `oneOf` branch, at least one `anyOf` branch, and every
/// `allOf` branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnionMode {
    /// `oneOf`
    ExactlyOne,
    /// `anyOf`
    AnyOf,
    /// `allOf`
    AllOf,
}

impl UnionMode {
    /// Returns the JSON-Schema keyword for this mode (used in issue paths).
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_drift_core::UnionMode;
    ///
    /// assert_eq!(UnionMode::ExactlyOne.keyword(), "oneOf");
    /// assert_eq!(UnionMode::AllOf.keyword(), "allOf");
    /// ```
    pub fn keyword(self) -> &'static str {
        match self {
            Self::ExactlyOne => "oneOf",
            Self::AnyOf => "anyOf",
            Self::AllOf => "allOf",
        }
    }
}

/// Tolerance of an object node for properties it does not declare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "policy", content = "schema", rename_all = "snake_case")]
pub enum AdditionalProperties {
    /// `additionalProperties: false`
    Forbidden,
    /// `additionalProperties: true` or absent.
    #[default]
    Unconstrained,
    /// `additionalProperties: { ... }`
    Typed(Box<SchemaTree>),
}

impl AdditionalProperties {
    /// Short label used in issue messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::Unconstrained => "unconstrained",
            Self::Typed(_) => "typed",
        }
    }
}

/// A named property of an object node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub schema: SchemaTree,
}

/// Shape-specific payload of a [`SchemaTree`].
///
/// Each variant carries only the fields relevant to that shape, so a node
/// cannot be both an enumeration and a union, or both an object and an
/// array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SchemaNode {
    /// Scalar or free-form value, optionally closed by an enumeration.
    Leaf {
        kind: LeafKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enum_values: Option<Vec<Value>>,
    },
    /// Object with named properties.
    Object {
        #[serde(default)]
        properties: Vec<Property>,
        #[serde(default)]
        required: BTreeSet<String>,
        #[serde(default)]
        additional_properties: AdditionalProperties,
    },
    /// Homogeneous array.
    Array { items: Box<SchemaTree> },
    /// `oneOf` / `anyOf` / `allOf` combinator.
    Union {
        mode: UnionMode,
        branches: Vec<SchemaTree>,
    },
    /// Reference to another top-level type by name.
    Reference { target: String },
}

/// One normalized schema node.
///
/// Build trees with the constructor helpers and chain the builder methods:
///
/// # Examples
///
/// ```
/// use schema_drift_core::{Kind, SchemaTree};
///
/// let session = SchemaTree::object()
///     .with_property("id", SchemaTree::string())
///     .with_property("expires", SchemaTree::number().allow_null())
///     .with_required("id");
///
/// assert_eq!(session.kind(), Kind::Object);
/// assert!(session.property("expires").unwrap().nullable);
/// assert!(session.is_required("id"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTree {
    #[serde(flatten)]
    pub node: SchemaNode,
    /// Whether `null` is accepted in addition to the node's own shape.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    /// Documentation only; never compared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaTree {
    /// Wraps a node shape with no nullability and no description.
    pub fn new(node: SchemaNode) -> Self {
        Self {
            node,
            nullable: false,
            description: None,
        }
    }

    /// Creates a leaf of the given kind.
    pub fn leaf(kind: LeafKind) -> Self {
        Self::new(SchemaNode::Leaf {
            kind,
            enum_values: None,
        })
    }

    pub fn string() -> Self {
        Self::leaf(LeafKind::String)
    }

    pub fn number() -> Self {
        Self::leaf(LeafKind::Number)
    }

    pub fn boolean() -> Self {
        Self::leaf(LeafKind::Boolean)
    }

    /// Free-form node that accepts any value.
    pub fn unknown() -> Self {
        Self::leaf(LeafKind::Unknown)
    }

    /// Creates a closed enumeration leaf.
    pub fn enumeration(kind: LeafKind, values: Vec<Value>) -> Self {
        Self::new(SchemaNode::Leaf {
            kind,
            enum_values: Some(values),
        })
    }

    /// Creates a string enumeration.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_drift_core::{Kind, SchemaTree};
    ///
    /// let status = SchemaTree::string_enum(&["active", "paused"]);
    /// assert_eq!(status.kind(), Kind::String);
    /// assert_eq!(status.enum_values().unwrap().len(), 2);
    /// ```
    pub fn string_enum(values: &[&str]) -> Self {
        Self::enumeration(
            LeafKind::String,
            values.iter().map(|v| Value::String((*v).to_string())).collect(),
        )
    }

    /// Creates an empty object with an unconstrained additional-properties
    /// policy.
    pub fn object() -> Self {
        Self::new(SchemaNode::Object {
            properties: Vec::new(),
            required: BTreeSet::new(),
            additional_properties: AdditionalProperties::Unconstrained,
        })
    }

    pub fn array(items: SchemaTree) -> Self {
        Self::new(SchemaNode::Array {
            items: Box::new(items),
        })
    }

    pub fn union(mode: UnionMode, branches: Vec<SchemaTree>) -> Self {
        Self::new(SchemaNode::Union { mode, branches })
    }

    pub fn reference(target: &str) -> Self {
        Self::new(SchemaNode::Reference {
            target: target.to_string(),
        })
    }

    /// Adds (or replaces) a property. No-op on non-object nodes.
    pub fn with_property(mut self, name: &str, schema: SchemaTree) -> Self {
        if let SchemaNode::Object { properties, .. } = &mut self.node {
            match properties.iter_mut().find(|p| p.name == name) {
                Some(existing) => existing.schema = schema,
                None => properties.push(Property {
                    name: name.to_string(),
                    schema,
                }),
            }
        }
        self
    }

    /// Marks a property as required. No-op on non-object nodes.
    pub fn with_required(mut self, name: &str) -> Self {
        if let SchemaNode::Object { required, .. } = &mut self.node {
            required.insert(name.to_string());
        }
        self
    }

    /// Sets the additional-properties policy. No-op on non-object nodes.
    pub fn with_additional_properties(mut self, policy: AdditionalProperties) -> Self {
        if let SchemaNode::Object {
            additional_properties,
            ..
        } = &mut self.node
        {
            *additional_properties = policy;
        }
        self
    }

    /// Marks the node as also accepting `null`.
    pub fn allow_null(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Adds a description.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Returns the primary kind of this node.
    pub fn kind(&self) -> Kind {
        match &self.node {
            SchemaNode::Leaf { kind, .. } => kind.kind(),
            SchemaNode::Object { .. } => Kind::Object,
            SchemaNode::Array { .. } => Kind::Array,
            SchemaNode::Union { .. } => Kind::Union,
            SchemaNode::Reference { .. } => Kind::Reference,
        }
    }

    /// Coarse type string used for type-mismatch detection.
    ///
    /// Ignores nullability and enum refinement. Returns `None` for unknown
    /// and reference nodes, which are never compared by type string.
    ///
    /// # Examples
    ///
    /// ```
    /// use schema_drift_core::SchemaTree;
    ///
    /// assert_eq!(SchemaTree::string_enum(&["a"]).allow_null().coarse_type(), Some("string"));
    /// assert_eq!(SchemaTree::unknown().coarse_type(), None);
    /// ```
    pub fn coarse_type(&self) -> Option<&'static str> {
        match self.kind() {
            Kind::Unknown | Kind::Reference => None,
            kind => Some(kind.as_str()),
        }
    }

    /// Returns the enumeration values of a closed leaf.
    pub fn enum_values(&self) -> Option<&[Value]> {
        match &self.node {
            SchemaNode::Leaf {
                enum_values: Some(values),
                ..
            } => Some(values),
            _ => None,
        }
    }

    /// Looks up a property of an object node by name.
    pub fn property(&self, name: &str) -> Option<&SchemaTree> {
        match &self.node {
            SchemaNode::Object { properties, .. } => properties
                .iter()
                .find(|p| p.name == name)
                .map(|p| &p.schema),
            _ => None,
        }
    }

    /// Returns `true` if `name` is in the object's required set.
    pub fn is_required(&self, name: &str) -> bool {
        match &self.node {
            SchemaNode::Object { required, .. } => required.contains(name),
            _ => false,
        }
    }

    /// Returns the reference target of a reference node.
    pub fn reference_target(&self) -> Option<&str> {
        match &self.node {
            SchemaNode::Reference { target } => Some(target),
            _ => None,
        }
    }
}

/// Blocking power of a drift issue.
///
/// Ordered so that sorting puts errors first.
///
/// # Examples
///
/// ```
/// use schema_drift_core::Severity;
///
/// assert!(Severity::Error < Severity::Warning);
/// assert!(Severity::Error.is_blocking());
/// assert!(!Severity::Info.is_blocking());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// All severities in report order.
    pub const ALL: [Severity; 3] = [Severity::Error, Severity::Warning, Severity::Info];

    /// Only errors fail a run.
    pub fn is_blocking(self) -> bool {
        self == Self::Error
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a drift issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A property or type exists on one side only.
    Missing,
    /// The coarse types of the two sides differ.
    TypeMismatch,
    /// Nullability, required-ness, additional-properties or union-mode
    /// divergence.
    PropertyDiff,
    /// Enumeration values differ.
    EnumDiff,
    /// Reported by the external breaking-change detector.
    Breaking,
}

impl IssueKind {
    pub const ALL: [IssueKind; 5] = [
        IssueKind::Missing,
        IssueKind::TypeMismatch,
        IssueKind::PropertyDiff,
        IssueKind::EnumDiff,
        IssueKind::Breaking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::TypeMismatch => "type_mismatch",
            Self::PropertyDiff => "property_diff",
            Self::EnumDiff => "enum_diff",
            Self::Breaking => "breaking",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported divergence between the two schema sources.
///
/// # Examples
///
/// ```
/// use schema_drift_core::{DriftIssue, IssueKind, Severity};
///
/// let issue = DriftIssue::new(
///     Severity::Error,
///     IssueKind::TypeMismatch,
///     "updates.Session.count",
///     "type differs: string vs number",
/// );
/// assert!(issue.is_blocking());
/// assert_eq!(issue.to_string(), "error[type_mismatch] updates.Session.count: type differs: string vs number");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftIssue {
    pub severity: Severity,
    pub kind: IssueKind,
    /// Dotted location in the type graph, e.g. `updates.NewSession.sid`.
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DriftIssue {
    pub fn new(
        severity: Severity,
        kind: IssueKind,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            path: path.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attaches a structured payload for machine consumption.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

impl fmt::Display for DriftIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}: {}",
            self.severity, self.kind, self.path, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_ignores_properties_on_non_objects() {
        let tree = SchemaTree::string()
            .with_property("id", SchemaTree::string())
            .with_required("id");
        assert_eq!(tree.kind(), Kind::String);
        assert!(tree.property("id").is_none());
        assert!(!tree.is_required("id"));
    }

    #[test]
    fn test_with_property_replaces_existing() {
        let tree = SchemaTree::object()
            .with_property("id", SchemaTree::string())
            .with_property("id", SchemaTree::number());
        assert_eq!(tree.property("id").unwrap().kind(), Kind::Number);
        match &tree.node {
            SchemaNode::Object { properties, .. } => assert_eq!(properties.len(), 1),
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_coarse_type_ignores_refinements() {
        assert_eq!(SchemaTree::number().allow_null().coarse_type(), Some("number"));
        assert_eq!(
            SchemaTree::union(UnionMode::AnyOf, vec![SchemaTree::string()]).coarse_type(),
            Some("union")
        );
        assert_eq!(SchemaTree::reference("Session").coarse_type(), None);
    }

    #[test]
    fn test_severity_and_kind_serde_wire_names() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
        assert_eq!(
            serde_json::to_string(&IssueKind::TypeMismatch).unwrap(),
            "\"type_mismatch\""
        );
        assert_eq!(
            serde_json::to_string(&UnionMode::ExactlyOne).unwrap(),
            "\"exactly-one\""
        );
        for kind in IssueKind::ALL {
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
    }

    #[test]
    fn test_schema_tree_serializes_with_shape_tag() {
        let tree = SchemaTree::object()
            .with_property("tags", SchemaTree::array(SchemaTree::string()))
            .with_required("tags")
            .allow_null();
        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(value["shape"], "object");
        assert_eq!(value["nullable"], true);
        assert_eq!(value["properties"][0]["name"], "tags");
        assert_eq!(value["properties"][0]["schema"]["shape"], "array");

        let back: SchemaTree = serde_json::from_value(value).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_issue_omits_empty_details() {
        let issue = DriftIssue::new(Severity::Info, IssueKind::EnumDiff, "a.b", "msg");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(!json.contains("details"));

        let issue = issue.with_details(json!({"value": "archived"}));
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains("\"details\":{\"value\":\"archived\"}"));
    }
}
