//! Recursive drift comparison between two schema trees.
//!
//! The [`DiffEngine`] walks a pair of [`SchemaTree`]s in lock-step and
//! returns every divergence as a [`DriftIssue`]. Mismatches are data, never
//! errors: the walk always completes and reports the full set of issues.
//!
//! Rules, in the order they apply to each node pair:
//!
//! 1. nullability (`property_diff`)
//! 2. references: equal names match, anything else is resolved through the
//!    source's definitions with a visited set of `(A, B)` reference pairs
//! 3. coarse type (`type_mismatch`, always an error); `unknown` on either
//!    side matches anything
//! 4. enumerations (`enum_diff`)
//! 5. objects: presence of every property on either side (`missing`),
//!    required-ness, recursion into shared properties, additional-properties
//!    policy
//! 6. arrays: recursion into `items` (`path[]`)
//! 7. unions: order-independent branch matching; branches left unmatched on
//!    both sides are paired by index, then by kind, and compared directly
//!
//! # Example
//!
//! ```
//! use schema_drift_core::{IssueKind, SchemaTree, Severity, compare};
//!
//! let library = SchemaTree::object().with_property("count", SchemaTree::string());
//! let generated = SchemaTree::object().with_property("count", SchemaTree::number());
//!
//! let issues = compare("Session", &library, "Session", &generated, "updates.Session");
//! assert_eq!(issues.len(), 1);
//! assert_eq!(issues[0].kind, IssueKind::TypeMismatch);
//! assert_eq!(issues[0].severity, Severity::Error);
//! assert_eq!(issues[0].path, "updates.Session.count");
//! ```

use std::collections::BTreeSet;

use serde_json::{Value, json};

use crate::policy::{SeverityPolicy, Side, SourceLabels};
use crate::{
    AdditionalProperties, DriftIssue, IssueKind, Property, SchemaNode, SchemaSet, SchemaTree,
    Severity, UnionMode,
};

/// Reference pairs already entered on the current recursion path.
type VisitedPairs = BTreeSet<(String, String)>;

/// Compares two standalone trees with the default policy.
///
/// Each tree is its own only definition, so a self-reference resolves. Use
/// [`DiffEngine::compare`] with the full [`SchemaSet`]s to resolve references
/// to other types; here they are reported as unresolved when they face an
/// inline definition.
pub fn compare(
    name_a: &str,
    tree_a: &SchemaTree,
    name_b: &str,
    tree_b: &SchemaTree,
    path: &str,
) -> Vec<DriftIssue> {
    let mut defs_a = SchemaSet::default();
    defs_a.insert(None, name_a, tree_a.clone());
    let mut defs_b = SchemaSet::default();
    defs_b.insert(None, name_b, tree_b.clone());
    DiffEngine::new(&defs_a, &defs_b).compare(name_a, tree_a, name_b, tree_b, path)
}

/// Drift comparison over two schema sources.
///
/// Borrows both [`SchemaSet`]s so references can be resolved one level at a
/// time while walking.
///
/// # Examples
///
/// ```
/// use schema_drift_core::{DiffEngine, IssueKind, SchemaSet, SchemaTree, Severity};
///
/// let mut library = SchemaSet::new(Some("2.0.0".into()));
/// library.insert(Some("common"), "Status", SchemaTree::string_enum(&["active", "paused"]));
///
/// let mut generated = SchemaSet::new(Some("2.0.1".into()));
/// generated.insert(None, "Status", SchemaTree::string_enum(&["active", "paused", "archived"]));
///
/// let issues = DiffEngine::new(&library, &generated).compare_all();
/// assert_eq!(issues.len(), 1);
/// assert_eq!(issues[0].kind, IssueKind::EnumDiff);
/// assert_eq!(issues[0].severity, Severity::Info);
/// assert_eq!(issues[0].path, "common.Status");
/// ```
#[derive(Debug, Clone)]
pub struct DiffEngine<'a> {
    defs_a: &'a SchemaSet,
    defs_b: &'a SchemaSet,
    policy: SeverityPolicy,
    labels: SourceLabels,
}

/// Borrowed view of an object node's fields.
#[derive(Clone, Copy)]
struct ObjectParts<'t> {
    properties: &'t [Property],
    required: &'t BTreeSet<String>,
    additional: &'t AdditionalProperties,
}

impl<'t> ObjectParts<'t> {
    fn find(&self, name: &str) -> Option<&'t Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    fn requires(&self, name: &str) -> bool {
        self.required.contains(name)
    }
}

impl<'a> DiffEngine<'a> {
    pub fn new(defs_a: &'a SchemaSet, defs_b: &'a SchemaSet) -> Self {
        Self {
            defs_a,
            defs_b,
            policy: SeverityPolicy::default(),
            labels: SourceLabels::default(),
        }
    }

    pub fn with_policy(mut self, policy: SeverityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_labels(mut self, labels: SourceLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn policy(&self) -> &SeverityPolicy {
        &self.policy
    }

    pub fn labels(&self) -> &SourceLabels {
        &self.labels
    }

    /// Compares every type of source A against the same-named type of
    /// source B, in A's document order, then reports B-only types.
    pub fn compare_all(&self) -> Vec<DriftIssue> {
        let mut issues = Vec::new();

        for entry in self.defs_a.iter() {
            let path = entry.qualified_name();
            match self.defs_b.get(&entry.name) {
                Some(tree_b) => issues.extend(self.compare(
                    &entry.name,
                    &entry.tree,
                    &entry.name,
                    tree_b,
                    &path,
                )),
                None => issues.push(self.missing_type(Side::A, &entry.name, &path)),
            }
        }

        for entry in self.defs_b.iter() {
            if !self.defs_a.contains(&entry.name) {
                issues.push(self.missing_type(Side::B, &entry.name, &entry.qualified_name()));
            }
        }

        issues
    }

    /// Compares one pair of trees for the logical type `name_a` / `name_b`,
    /// rooted at `path`.
    pub fn compare(
        &self,
        name_a: &str,
        tree_a: &SchemaTree,
        name_b: &str,
        tree_b: &SchemaTree,
        path: &str,
    ) -> Vec<DriftIssue> {
        let mut visited = VisitedPairs::new();
        visited.insert((name_a.to_string(), name_b.to_string()));
        self.compare_nodes(tree_a, tree_b, path, &visited)
    }

    fn compare_nodes(
        &self,
        a: &SchemaTree,
        b: &SchemaTree,
        path: &str,
        visited: &VisitedPairs,
    ) -> Vec<DriftIssue> {
        // Same-target references: the target's own nullability is reported
        // once at its top-level path.
        let (nullable_a, nullable_b) = match (a.reference_target(), b.reference_target()) {
            (Some(target_a), Some(target_b)) if target_a == target_b => (a.nullable, b.nullable),
            _ => (
                self.effective_nullable(a, Side::A),
                self.effective_nullable(b, Side::B),
            ),
        };
        let mut issues = self.compare_nullability(nullable_a, nullable_b, path);
        issues.extend(self.compare_shapes(a, b, path, visited));
        issues
    }

    fn compare_shapes(
        &self,
        a: &SchemaTree,
        b: &SchemaTree,
        path: &str,
        visited: &VisitedPairs,
    ) -> Vec<DriftIssue> {
        match (&a.node, &b.node) {
            (SchemaNode::Reference { target: ta }, SchemaNode::Reference { target: tb })
                if ta == tb =>
            {
                return Vec::new();
            }
            (SchemaNode::Reference { .. }, _) | (_, SchemaNode::Reference { .. }) => {
                return self.compare_through_references(a, b, path, visited);
            }
            _ => {}
        }

        let (Some(type_a), Some(type_b)) = (a.coarse_type(), b.coarse_type()) else {
            return Vec::new();
        };
        if type_a != type_b {
            return vec![self.type_mismatch(type_a, type_b, path)];
        }

        match (&a.node, &b.node) {
            (
                SchemaNode::Leaf {
                    enum_values: values_a,
                    ..
                },
                SchemaNode::Leaf {
                    enum_values: values_b,
                    ..
                },
            ) => self.compare_enums(values_a.as_deref(), values_b.as_deref(), path),
            (
                SchemaNode::Object {
                    properties: properties_a,
                    required: required_a,
                    additional_properties: additional_a,
                },
                SchemaNode::Object {
                    properties: properties_b,
                    required: required_b,
                    additional_properties: additional_b,
                },
            ) => self.compare_objects(
                ObjectParts {
                    properties: properties_a,
                    required: required_a,
                    additional: additional_a,
                },
                ObjectParts {
                    properties: properties_b,
                    required: required_b,
                    additional: additional_b,
                },
                path,
                visited,
            ),
            (SchemaNode::Array { items: items_a }, SchemaNode::Array { items: items_b }) => {
                self.compare_nodes(items_a, items_b, &format!("{path}[]"), visited)
            }
            (
                SchemaNode::Union {
                    mode: mode_a,
                    branches: branches_a,
                },
                SchemaNode::Union {
                    mode: mode_b,
                    branches: branches_b,
                },
            ) => self.compare_unions(
                (*mode_a, branches_a.as_slice()),
                (*mode_b, branches_b.as_slice()),
                path,
                visited,
            ),
            _ => Vec::new(),
        }
    }

    fn compare_through_references(
        &self,
        a: &SchemaTree,
        b: &SchemaTree,
        path: &str,
        visited: &VisitedPairs,
    ) -> Vec<DriftIssue> {
        let key = (reference_key(a, path), reference_key(b, path));
        if visited.contains(&key) {
            return vec![self.recursive_reference(&key, path)];
        }

        let resolved_a = match self.resolve(a, Side::A, path) {
            Ok(tree) => tree,
            Err(issue) => return vec![issue],
        };
        let resolved_b = match self.resolve(b, Side::B, path) {
            Ok(tree) => tree,
            Err(issue) => return vec![issue],
        };

        let mut visited = visited.clone();
        visited.insert(key);
        self.compare_shapes(resolved_a, resolved_b, path, &visited)
    }

    /// Follows a reference node one level into its source's definitions.
    fn resolve<'t>(
        &'t self,
        tree: &'t SchemaTree,
        side: Side,
        path: &str,
    ) -> Result<&'t SchemaTree, DriftIssue> {
        let Some(target) = tree.reference_target() else {
            return Ok(tree);
        };
        self.definitions(side)
            .get(target)
            .ok_or_else(|| self.unresolved_reference(side, target, path))
    }

    fn definitions(&self, side: Side) -> &'a SchemaSet {
        match side {
            Side::A => self.defs_a,
            Side::B => self.defs_b,
        }
    }

    /// Nullability of a node, looking through a reference to its target.
    fn effective_nullable(&self, tree: &SchemaTree, side: Side) -> bool {
        if tree.nullable {
            return true;
        }
        tree.reference_target()
            .and_then(|target| self.definitions(side).get(target))
            .is_some_and(|target| target.nullable)
    }

    fn compare_nullability(&self, nullable_a: bool, nullable_b: bool, path: &str) -> Vec<DriftIssue> {
        if nullable_a == nullable_b {
            return Vec::new();
        }
        let (accepts, rejects) = if nullable_a {
            (Side::A, Side::B)
        } else {
            (Side::B, Side::A)
        };
        vec![
            DriftIssue::new(
                self.policy.nullability,
                IssueKind::PropertyDiff,
                path,
                format!(
                    "nullable in {} but not in {}",
                    self.labels.of(accepts),
                    self.labels.of(rejects)
                ),
            )
            .with_details(json!({
                "nullableA": nullable_a,
                "nullableB": nullable_b,
            })),
        ]
    }

    fn compare_enums(
        &self,
        values_a: Option<&[Value]>,
        values_b: Option<&[Value]>,
        path: &str,
    ) -> Vec<DriftIssue> {
        match (values_a, values_b) {
            (Some(values_a), Some(values_b)) => {
                let mut issues = Vec::new();
                for value in values_missing_from(values_a, values_b) {
                    issues.push(self.enum_value_diff(Side::A, value, path));
                }
                for value in values_missing_from(values_b, values_a) {
                    issues.push(self.enum_value_diff(Side::B, value, path));
                }
                issues
            }
            (Some(values), None) => vec![self.enum_constraint_diff(Side::A, values, path)],
            (None, Some(values)) => vec![self.enum_constraint_diff(Side::B, values, path)],
            (None, None) => Vec::new(),
        }
    }

    fn compare_objects(
        &self,
        a: ObjectParts<'_>,
        b: ObjectParts<'_>,
        path: &str,
        visited: &VisitedPairs,
    ) -> Vec<DriftIssue> {
        let mut issues = Vec::new();

        for prop in a.properties {
            let prop_path = child_path(path, &prop.name);
            match b.find(&prop.name) {
                Some(other) => {
                    issues.extend(self.compare_required(
                        &prop.name,
                        a.requires(&prop.name),
                        b.requires(&prop.name),
                        &prop_path,
                    ));
                    issues.extend(self.compare_nodes(
                        &prop.schema,
                        &other.schema,
                        &prop_path,
                        visited,
                    ));
                }
                None => issues.push(self.missing_property(
                    Side::A,
                    &prop.name,
                    a.requires(&prop.name),
                    &prop_path,
                )),
            }
        }

        for prop in b.properties {
            if a.find(&prop.name).is_none() {
                issues.push(self.missing_property(
                    Side::B,
                    &prop.name,
                    b.requires(&prop.name),
                    &child_path(path, &prop.name),
                ));
            }
        }

        issues.extend(self.compare_additional(a.additional, b.additional, path, visited));
        issues
    }

    fn compare_required(
        &self,
        name: &str,
        required_a: bool,
        required_b: bool,
        path: &str,
    ) -> Option<DriftIssue> {
        if required_a == required_b {
            return None;
        }
        let (requires, optional) = if required_a {
            (Side::A, Side::B)
        } else {
            (Side::B, Side::A)
        };
        Some(
            DriftIssue::new(
                self.policy.required_mismatch,
                IssueKind::PropertyDiff,
                path,
                format!(
                    "property `{name}` is required in {} but optional in {}",
                    self.labels.of(requires),
                    self.labels.of(optional)
                ),
            )
            .with_details(json!({
                "property": name,
                "requiredA": required_a,
                "requiredB": required_b,
            })),
        )
    }

    fn compare_additional(
        &self,
        additional_a: &AdditionalProperties,
        additional_b: &AdditionalProperties,
        path: &str,
        visited: &VisitedPairs,
    ) -> Vec<DriftIssue> {
        match (additional_a, additional_b) {
            (AdditionalProperties::Forbidden, AdditionalProperties::Forbidden) => Vec::new(),
            (AdditionalProperties::Forbidden, other) => {
                vec![self.additional_properties_diff(Side::A, other, path)]
            }
            (other, AdditionalProperties::Forbidden) => {
                vec![self.additional_properties_diff(Side::B, other, path)]
            }
            (AdditionalProperties::Typed(typed_a), AdditionalProperties::Typed(typed_b)) => self
                .compare_nodes(
                    typed_a,
                    typed_b,
                    &format!("{path}.<additionalProperties>"),
                    visited,
                ),
            _ => Vec::new(),
        }
    }

    fn compare_unions(
        &self,
        (mode_a, branches_a): (UnionMode, &[SchemaTree]),
        (mode_b, branches_b): (UnionMode, &[SchemaTree]),
        path: &str,
        visited: &VisitedPairs,
    ) -> Vec<DriftIssue> {
        let mut issues = Vec::new();

        if mode_a != mode_b {
            issues.push(
                DriftIssue::new(
                    self.policy.union_mode,
                    IssueKind::PropertyDiff,
                    path,
                    format!(
                        "union mode differs: {} uses {}, {} uses {}",
                        self.labels.a,
                        mode_a.keyword(),
                        self.labels.b,
                        mode_b.keyword()
                    ),
                )
                .with_details(json!({ "modeA": mode_a, "modeB": mode_b })),
            );
        }

        // Every A branch reports the issues of its closest error-free
        // counterpart; B branches only need to find one.
        let mut leftover_a = Vec::new();
        for (index, branch) in branches_a.iter().enumerate() {
            let branch_path = format!("{path}.<{}:{index}>", mode_a.keyword());
            match self.best_branch_match(branch, branches_b, &branch_path, visited) {
                Some(found) => issues.extend(found),
                None => leftover_a.push(index),
            }
        }

        let mut leftover_b: Vec<usize> = Vec::new();
        for (index, branch) in branches_b.iter().enumerate() {
            let branch_path = format!("{path}.<{}:{index}>", mode_b.keyword());
            let matched = branches_a.iter().any(|candidate| {
                !has_blocking(&self.compare_nodes(candidate, branch, &branch_path, visited))
            });
            if !matched {
                leftover_b.push(index);
            }
        }

        // A leftover pair is one branch changed in place: report its own
        // differences once instead of an unmatched error on each side.
        for index in leftover_a {
            let branch = &branches_a[index];
            let branch_path = format!("{path}.<{}:{index}>", mode_a.keyword());
            match pair_leftover(index, branch, branches_b, &leftover_b) {
                Some(position) => {
                    let counterpart = &branches_b[leftover_b.remove(position)];
                    issues.extend(self.compare_nodes(branch, counterpart, &branch_path, visited));
                }
                None => issues.push(self.unmatched_branch(Side::A, index, branch, &branch_path)),
            }
        }

        for index in leftover_b {
            let branch_path = format!("{path}.<{}:{index}>", mode_b.keyword());
            issues.push(self.unmatched_branch(Side::B, index, &branches_b[index], &branch_path));
        }

        issues
    }

    /// Returns the issues of the candidate that matches `branch` without any
    /// blocking issue and with the fewest issues overall.
    fn best_branch_match(
        &self,
        branch: &SchemaTree,
        candidates: &[SchemaTree],
        path: &str,
        visited: &VisitedPairs,
    ) -> Option<Vec<DriftIssue>> {
        let mut best: Option<Vec<DriftIssue>> = None;
        for candidate in candidates {
            let found = self.compare_nodes(branch, candidate, path, visited);
            if has_blocking(&found) {
                continue;
            }
            if best.as_ref().is_none_or(|current| found.len() < current.len()) {
                let exact = found.is_empty();
                best = Some(found);
                if exact {
                    break;
                }
            }
        }
        best
    }

    fn type_mismatch(&self, type_a: &str, type_b: &str, path: &str) -> DriftIssue {
        DriftIssue::new(
            Severity::Error,
            IssueKind::TypeMismatch,
            path,
            format!(
                "type differs: {} declares {type_a}, {} declares {type_b}",
                self.labels.a, self.labels.b
            ),
        )
        .with_details(json!({ "typeA": type_a, "typeB": type_b }))
    }

    fn missing_property(
        &self,
        present_in: Side,
        name: &str,
        required: bool,
        path: &str,
    ) -> DriftIssue {
        let present = self.labels.of(present_in);
        let absent = self.labels.of(present_in.other());
        let suffix = if required {
            format!(" (required in {present})")
        } else {
            String::new()
        };
        DriftIssue::new(
            self.policy.missing_property(present_in, required),
            IssueKind::Missing,
            path,
            format!("property `{name}` is declared in {present} but missing from {absent}{suffix}"),
        )
        .with_details(json!({
            "property": name,
            "presentIn": present,
            "missingFrom": absent,
            "required": required,
        }))
    }

    fn missing_type(&self, present_in: Side, name: &str, path: &str) -> DriftIssue {
        let present = self.labels.of(present_in);
        let absent = self.labels.of(present_in.other());
        DriftIssue::new(
            self.policy.missing_type,
            IssueKind::Missing,
            path,
            format!("type `{name}` is defined in {present} but not in {absent}"),
        )
        .with_details(json!({
            "type": name,
            "presentIn": present,
            "missingFrom": absent,
        }))
    }

    fn enum_value_diff(&self, present_in: Side, value: &Value, path: &str) -> DriftIssue {
        let present = self.labels.of(present_in);
        let absent = self.labels.of(present_in.other());
        DriftIssue::new(
            self.policy.enum_value(present_in),
            IssueKind::EnumDiff,
            path,
            format!("enum value {value} is accepted by {present} but not by {absent}"),
        )
        .with_details(json!({
            "value": value,
            "presentIn": present,
            "missingFrom": absent,
        }))
    }

    fn enum_constraint_diff(&self, present_in: Side, values: &[Value], path: &str) -> DriftIssue {
        let present = self.labels.of(present_in);
        let absent = self.labels.of(present_in.other());
        DriftIssue::new(
            self.policy.enum_constraint(present_in),
            IssueKind::EnumDiff,
            path,
            format!(
                "{present} restricts values to {} but {absent} accepts any value",
                Value::Array(values.to_vec())
            ),
        )
        .with_details(json!({ "values": values, "presentIn": present }))
    }

    fn additional_properties_diff(
        &self,
        forbidding: Side,
        other: &AdditionalProperties,
        path: &str,
    ) -> DriftIssue {
        DriftIssue::new(
            self.policy.additional_properties,
            IssueKind::PropertyDiff,
            path,
            format!(
                "additional properties are forbidden in {} but {} in {}",
                self.labels.of(forbidding),
                other.label(),
                self.labels.of(forbidding.other())
            ),
        )
        .with_details(json!({
            "forbiddenIn": self.labels.of(forbidding),
            "otherPolicy": other.label(),
        }))
    }

    fn unmatched_branch(
        &self,
        side: Side,
        index: usize,
        branch: &SchemaTree,
        path: &str,
    ) -> DriftIssue {
        DriftIssue::new(
            Severity::Error,
            IssueKind::TypeMismatch,
            path,
            format!(
                "union branch {index} ({}) of {} matches no branch of {}",
                branch.kind(),
                self.labels.of(side),
                self.labels.of(side.other())
            ),
        )
        .with_details(json!({
            "branch": index,
            "kind": branch.kind(),
            "side": self.labels.of(side),
        }))
    }

    fn unresolved_reference(&self, side: Side, target: &str, path: &str) -> DriftIssue {
        DriftIssue::new(
            self.policy.unresolved_reference,
            IssueKind::Missing,
            path,
            format!(
                "reference target `{target}` is not defined in {}",
                self.labels.of(side)
            ),
        )
        .with_details(json!({ "target": target, "side": self.labels.of(side) }))
    }

    fn recursive_reference(&self, key: &(String, String), path: &str) -> DriftIssue {
        DriftIssue::new(
            self.policy.recursive_reference,
            IssueKind::PropertyDiff,
            path,
            format!(
                "recursive reference `{}` vs `{}` assumed equal; review manually",
                key.0, key.1
            ),
        )
        .with_details(json!({ "targetA": key.0, "targetB": key.1 }))
    }
}

fn child_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

/// Identity used for cycle detection: the reference target, or the path for
/// an inline node.
fn reference_key(tree: &SchemaTree, path: &str) -> String {
    match tree.reference_target() {
        Some(target) => target.to_string(),
        None => format!("<inline>{path}"),
    }
}

/// Distinct values of `source` that `other` does not contain, in `source`
/// order.
fn values_missing_from<'v>(source: &'v [Value], other: &[Value]) -> Vec<&'v Value> {
    let mut missing: Vec<&Value> = Vec::new();
    for value in source {
        if !other.contains(value) && !missing.contains(&value) {
            missing.push(value);
        }
    }
    missing
}

fn has_blocking(issues: &[DriftIssue]) -> bool {
    issues.iter().any(DriftIssue::is_blocking)
}

/// Position in `leftover` of the B branch to compare an unmatched A branch
/// against: the one at the same index, else the first of the same kind.
fn pair_leftover(
    index: usize,
    branch: &SchemaTree,
    branches_b: &[SchemaTree],
    leftover: &[usize],
) -> Option<usize> {
    leftover
        .iter()
        .position(|&candidate| candidate == index)
        .or_else(|| {
            leftover
                .iter()
                .position(|&candidate| branches_b[candidate].kind() == branch.kind())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(fields: &[(&str, SchemaTree)]) -> SchemaTree {
        fields
            .iter()
            .fold(SchemaTree::object(), |tree, (name, schema)| {
                tree.with_property(name, schema.clone())
            })
    }

    fn kinds(issues: &[DriftIssue]) -> Vec<(IssueKind, Severity, &str)> {
        issues
            .iter()
            .map(|i| (i.kind, i.severity, i.path.as_str()))
            .collect()
    }

    #[test]
    fn test_identical_trees_produce_no_issues() {
        let tree = session(&[
            ("id", SchemaTree::string()),
            ("tags", SchemaTree::array(SchemaTree::string_enum(&["a", "b"]))),
            (
                "payload",
                SchemaTree::union(
                    UnionMode::ExactlyOne,
                    vec![SchemaTree::number(), SchemaTree::object().allow_null()],
                ),
            ),
            ("owner", SchemaTree::reference("User").allow_null()),
        ])
        .with_required("id")
        .with_additional_properties(AdditionalProperties::Forbidden);

        assert!(compare("Session", &tree, "Session", &tree, "Session").is_empty());
    }

    #[test]
    fn test_missing_property_escalates_when_required() {
        let a = session(&[("id", SchemaTree::string()), ("sid", SchemaTree::string())])
            .with_required("sid");
        let b = session(&[("id", SchemaTree::string())]);

        let issues = compare("S", &a, "S", &b, "S");
        assert_eq!(kinds(&issues), vec![(IssueKind::Missing, Severity::Error, "S.sid")]);
        assert!(issues[0].message.contains("required in library"));
    }

    #[test]
    fn test_nullability_is_property_diff_warning() {
        let a = session(&[("name", SchemaTree::string().allow_null())]);
        let b = session(&[("name", SchemaTree::string())]);

        let issues = compare("S", &a, "S", &b, "S");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::PropertyDiff, Severity::Warning, "S.name")]
        );
        assert_eq!(issues[0].message, "nullable in library but not in generated");
    }

    #[test]
    fn test_required_mismatch_on_shared_property() {
        let a = session(&[("id", SchemaTree::string())]).with_required("id");
        let b = session(&[("id", SchemaTree::string())]);

        let issues = compare("S", &a, "S", &b, "S");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::PropertyDiff, Severity::Warning, "S.id")]
        );
    }

    #[test]
    fn test_descriptions_and_property_order_are_ignored() {
        let a = session(&[
            ("id", SchemaTree::string().with_description("identifier")),
            ("name", SchemaTree::string()),
        ])
        .with_required("id")
        .with_required("name");
        let b = session(&[("name", SchemaTree::string()), ("id", SchemaTree::string())])
            .with_required("name")
            .with_required("id")
            .with_description("generated");

        assert!(compare("S", &a, "S", &b, "S").is_empty());
    }

    #[test]
    fn test_unknown_matches_any_type() {
        let a = session(&[("meta", SchemaTree::unknown())]);
        let b = session(&[("meta", SchemaTree::object().with_property("x", SchemaTree::string()))]);
        assert!(compare("S", &a, "S", &b, "S").is_empty());
    }

    #[test]
    fn test_array_items_recurse_with_brackets() {
        let a = SchemaTree::array(session(&[("id", SchemaTree::string())]));
        let b = SchemaTree::array(session(&[("id", SchemaTree::boolean())]));

        let issues = compare("List", &a, "List", &b, "List");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::TypeMismatch, Severity::Error, "List[].id")]
        );
    }

    #[test]
    fn test_enum_value_and_constraint_differences() {
        let a = SchemaTree::string_enum(&["active", "paused", "paused"]);
        let b = SchemaTree::string_enum(&["active"]);
        let issues = compare("Status", &a, "Status", &b, "Status");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::EnumDiff, Severity::Warning, "Status")]
        );
        assert_eq!(issues[0].details.as_ref().unwrap()["value"], "paused");

        let issues = compare("Status", &SchemaTree::string(), "Status", &b, "Status");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::EnumDiff, Severity::Warning, "Status")]
        );
        let issues = compare("Status", &b, "Status", &SchemaTree::string(), "Status");
        assert_eq!(kinds(&issues), vec![(IssueKind::EnumDiff, Severity::Info, "Status")]);
    }

    #[test]
    fn test_additional_properties_policy() {
        let a = SchemaTree::object().with_additional_properties(AdditionalProperties::Forbidden);
        let b = SchemaTree::object();
        let issues = compare("S", &a, "S", &b, "S");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::PropertyDiff, Severity::Warning, "S")]
        );
        assert!(issues[0].message.contains("forbidden in library but unconstrained in generated"));

        let typed = |tree: SchemaTree| {
            SchemaTree::object()
                .with_additional_properties(AdditionalProperties::Typed(Box::new(tree)))
        };
        let issues = compare("M", &typed(SchemaTree::string()), "M", &typed(SchemaTree::number()), "M");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::TypeMismatch, Severity::Error, "M.<additionalProperties>")]
        );

        assert!(compare("M", &typed(SchemaTree::string()), "M", &b, "M").is_empty());
    }

    #[test]
    fn test_union_reordering_is_ignored() {
        let a = SchemaTree::union(
            UnionMode::AnyOf,
            vec![
                SchemaTree::string(),
                SchemaTree::array(SchemaTree::number()),
                session(&[("id", SchemaTree::string())]),
            ],
        );
        let b = SchemaTree::union(
            UnionMode::AnyOf,
            vec![
                session(&[("id", SchemaTree::string())]),
                SchemaTree::string(),
                SchemaTree::array(SchemaTree::number()),
            ],
        );
        assert!(compare("U", &a, "U", &b, "U").is_empty());
    }

    #[test]
    fn test_unmatched_union_branch_reports_single_error() {
        let a = SchemaTree::union(
            UnionMode::ExactlyOne,
            vec![SchemaTree::string(), SchemaTree::boolean()],
        );
        let b = SchemaTree::union(
            UnionMode::ExactlyOne,
            vec![SchemaTree::string(), SchemaTree::number(), SchemaTree::object()],
        );

        let issues = compare("U", &a, "U", &b, "U");
        assert_eq!(
            kinds(&issues),
            vec![
                (IssueKind::TypeMismatch, Severity::Error, "U.<oneOf:1>"),
                (IssueKind::TypeMismatch, Severity::Error, "U.<oneOf:2>"),
            ]
        );
        assert!(issues[0].message.contains("library declares boolean, generated declares number"));
        assert!(issues[1].message.contains("branch 2 (object) of generated"));
    }

    #[test]
    fn test_changed_union_leaf_is_reported_once() {
        let a = session(&[(
            "v",
            SchemaTree::union(UnionMode::ExactlyOne, vec![SchemaTree::string(), SchemaTree::number()]),
        )]);
        let b = session(&[(
            "v",
            SchemaTree::union(UnionMode::ExactlyOne, vec![SchemaTree::string(), SchemaTree::boolean()]),
        )]);

        let issues = compare("T", &a, "T", &b, "T");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::TypeMismatch, Severity::Error, "T.v.<oneOf:1>")]
        );
        assert_eq!(
            issues[0].details,
            Some(json!({"typeA": "number", "typeB": "boolean"}))
        );
    }

    #[test]
    fn test_moved_union_branch_pairs_by_kind() {
        let a = SchemaTree::union(
            UnionMode::AnyOf,
            vec![session(&[("id", SchemaTree::string())]), SchemaTree::string()],
        );
        let b = SchemaTree::union(
            UnionMode::AnyOf,
            vec![SchemaTree::string(), SchemaTree::boolean(), session(&[("id", SchemaTree::number())])],
        );

        let issues = compare("U", &a, "U", &b, "U");
        assert_eq!(
            kinds(&issues),
            vec![
                (IssueKind::TypeMismatch, Severity::Error, "U.<anyOf:0>.id"),
                (IssueKind::TypeMismatch, Severity::Error, "U.<anyOf:1>"),
            ]
        );
        assert!(issues[1].message.contains("branch 1 (boolean) of generated"));
    }

    #[test]
    fn test_union_branch_keeps_warnings_of_best_match() {
        let a = SchemaTree::union(
            UnionMode::AnyOf,
            vec![session(&[("id", SchemaTree::string()), ("extra", SchemaTree::string())])],
        );
        let b = SchemaTree::union(
            UnionMode::AnyOf,
            vec![session(&[("id", SchemaTree::string())]), SchemaTree::string()],
        );

        let issues = compare("U", &a, "U", &b, "U");
        assert_eq!(
            kinds(&issues),
            vec![
                (IssueKind::Missing, Severity::Warning, "U.<anyOf:0>.extra"),
                (IssueKind::TypeMismatch, Severity::Error, "U.<anyOf:1>"),
            ]
        );
    }

    #[test]
    fn test_union_mode_difference() {
        let a = SchemaTree::union(UnionMode::ExactlyOne, vec![SchemaTree::string()]);
        let b = SchemaTree::union(UnionMode::AnyOf, vec![SchemaTree::string()]);

        let issues = compare("U", &a, "U", &b, "U");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::PropertyDiff, Severity::Warning, "U")]
        );
        assert!(issues[0].message.contains("oneOf"));
        assert!(issues[0].message.contains("anyOf"));
    }

    #[test]
    fn test_reference_resolved_against_inline_definition() {
        let mut set_a = SchemaSet::new(None);
        set_a.insert(None, "Session", session(&[("owner", SchemaTree::reference("User"))]));
        set_a.insert(None, "User", session(&[("id", SchemaTree::string())]));

        let mut set_b = SchemaSet::new(None);
        set_b.insert(
            None,
            "Session",
            session(&[("owner", session(&[("id", SchemaTree::number())]))]),
        );
        set_b.insert(None, "User", session(&[("id", SchemaTree::string())]));

        let issues = DiffEngine::new(&set_a, &set_b).compare_all();
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::TypeMismatch, Severity::Error, "Session.owner.id")]
        );
    }

    #[test]
    fn test_unresolved_reference_is_reported() {
        let a = session(&[("owner", SchemaTree::reference("User"))]);
        let b = session(&[("owner", SchemaTree::object())]);

        let issues = compare("S", &a, "S", &b, "S");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::Missing, Severity::Warning, "S.owner")]
        );
        assert!(issues[0].message.contains("`User` is not defined in library"));
    }

    #[test]
    fn test_standalone_compare_resolves_self_reference() {
        let a = session(&[("next", SchemaTree::reference("Node"))]);
        let b = session(&[("next", SchemaTree::object())]);

        let issues = compare("Node", &a, "Node", &b, "Node");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::Missing, Severity::Warning, "Node.next.next")]
        );
        assert!(issues[0].message.contains("property `next` is declared in library"));
    }

    #[test]
    fn test_recursive_reference_terminates() {
        let mut set_a = SchemaSet::new(None);
        set_a.insert(None, "Node", session(&[("next", SchemaTree::reference("Node"))]));

        let mut set_b = SchemaSet::new(None);
        set_b.insert(None, "Node", session(&[("next", SchemaTree::reference("Item"))]));
        set_b.insert(None, "Item", session(&[("next", SchemaTree::reference("Item"))]));

        let issues = DiffEngine::new(&set_a, &set_b).compare_all();
        assert_eq!(
            kinds(&issues),
            vec![
                (IssueKind::PropertyDiff, Severity::Info, "Node.next.next"),
                (IssueKind::Missing, Severity::Info, "Item"),
            ]
        );
        assert!(issues[0].message.ends_with("assumed equal; review manually"));
    }

    #[test]
    fn test_nullability_follows_reference_targets() {
        let mut set_a = SchemaSet::new(None);
        set_a.insert(None, "S", session(&[("owner", SchemaTree::reference("User"))]));
        set_a.insert(None, "User", SchemaTree::object().allow_null());

        let mut set_b = SchemaSet::new(None);
        set_b.insert(None, "S", session(&[("owner", SchemaTree::object().allow_null())]));
        set_b.insert(None, "User", SchemaTree::object());

        let issues = DiffEngine::new(&set_a, &set_b).compare_all();
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::PropertyDiff, Severity::Warning, "User")]
        );
    }

    #[test]
    fn test_target_nullability_reported_once_for_shared_references() {
        let uses = session(&[
            ("owner", SchemaTree::reference("User")),
            ("editor", SchemaTree::reference("User")),
        ]);

        let mut set_a = SchemaSet::new(None);
        set_a.insert(None, "S", uses.clone());
        set_a.insert(None, "User", SchemaTree::object().allow_null());

        let mut set_b = SchemaSet::new(None);
        set_b.insert(None, "S", uses);
        set_b.insert(None, "User", SchemaTree::object());

        let issues = DiffEngine::new(&set_a, &set_b).compare_all();
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::PropertyDiff, Severity::Warning, "User")]
        );

        // The use site's own flag still counts.
        let nullable_use = session(&[("owner", SchemaTree::reference("User").allow_null())]);
        let plain_use = session(&[("owner", SchemaTree::reference("User"))]);
        let issues = compare("S", &nullable_use, "S", &plain_use, "S");
        assert_eq!(
            kinds(&issues),
            vec![(IssueKind::PropertyDiff, Severity::Warning, "S.owner")]
        );
    }

    #[test]
    fn test_policy_and_labels_shape_messages() {
        let a = session(&[("id", SchemaTree::string())]);
        let b = session(&[("id", SchemaTree::string()), ("extra", SchemaTree::string())]);
        let empty = SchemaSet::default();
        let engine = DiffEngine::new(&empty, &empty)
            .with_policy(SeverityPolicy {
                missing_from_a: Severity::Error,
                ..SeverityPolicy::default()
            })
            .with_labels(SourceLabels::new("sdk", "openapi"));

        let issues = engine.compare("S", &a, "S", &b, "S");
        assert_eq!(kinds(&issues), vec![(IssueKind::Missing, Severity::Error, "S.extra")]);
        assert_eq!(
            issues[0].message,
            "property `extra` is declared in openapi but missing from sdk"
        );
        assert_eq!(engine.labels().a, "sdk");
    }
}
