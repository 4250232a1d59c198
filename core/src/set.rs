use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::SchemaTree;

/// A top-level type as it appears in one schema source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedType {
    /// Logical group the type was declared in (e.g. `updates`), if the
    /// source groups its types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub name: String,
    pub tree: SchemaTree,
}

impl NamedType {
    /// Returns `group.Name`, or just `Name` for ungrouped sources.
    ///
    /// This is the root path of every issue reported for the type.
    pub fn qualified_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Named collection of top-level types loaded from one source.
///
/// Keeps document order for deterministic comparison and an index for O(1)
/// lookup by bare type name. Type names are unique: the first insertion of a
/// name wins.
///
/// # Examples
///
/// ```
/// use schema_drift_core::{SchemaSet, SchemaTree};
///
/// let mut set = SchemaSet::new(Some("1.4.0".into()));
/// assert!(set.insert(Some("common"), "Session", SchemaTree::object()));
/// assert!(set.insert(None, "Status", SchemaTree::string_enum(&["active"])));
/// assert!(!set.insert(Some("updates"), "Session", SchemaTree::string()));
///
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.entry("Session").unwrap().qualified_name(), "common.Session");
/// assert_eq!(set.names(), vec!["Session", "Status"]);
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaSet {
    /// Version string reported by the source's metadata.
    pub version: Option<String>,
    /// SHA-256 of the raw input document, lower-case hex.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    types: Vec<NamedType>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SchemaSet {
    pub fn new(version: Option<String>) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Adds a type. Returns `false` (and keeps the existing entry) if the
    /// name is already present.
    pub fn insert(&mut self, group: Option<&str>, name: &str, tree: SchemaTree) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.to_string(), self.types.len());
        self.types.push(NamedType {
            group: group.map(String::from),
            name: name.to_string(),
            tree,
        });
        true
    }

    pub fn get(&self, name: &str) -> Option<&SchemaTree> {
        self.entry(name).map(|entry| &entry.tree)
    }

    pub fn entry(&self, name: &str) -> Option<&NamedType> {
        self.index.get(name).map(|&i| &self.types[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterates types in document order.
    pub fn iter(&self) -> impl Iterator<Item = &NamedType> {
        self.types.iter()
    }

    /// Type names in document order.
    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Keeps only the types whose name satisfies `keep`.
    pub fn retain_names(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.types.retain(|t| keep(&t.name));
        self.reindex();
    }

    fn reindex(&mut self) {
        self.index = self
            .types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();
    }
}
