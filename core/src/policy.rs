//! Severity policy for drift classification.
//!
//! Which side of a comparison is authoritative differs between teams, so
//! every severity the diff engine assigns (other than type mismatches, which
//! always block) is looked up in a [`SeverityPolicy`]. The defaults treat
//! side A as the hand-authored schema library and side B as the generated
//! specification.
//!
//! # Example
//!
//! ```
//! use schema_drift_core::{SeverityPolicy, Severity};
//!
//! // A team that treats the generated side as the authority escalates
//! // properties the generated side declares but the library lacks.
//! let policy = SeverityPolicy {
//!     missing_from_a: Severity::Error,
//!     ..SeverityPolicy::default()
//! };
//! assert_eq!(policy.missing_from_b, Severity::Warning);
//! ```

use serde::{Deserialize, Serialize};

use crate::Severity;

/// Identifies one side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Display names for the two sides, used in issue messages and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLabels {
    pub a: String,
    pub b: String,
}

impl Default for SourceLabels {
    fn default() -> Self {
        Self {
            a: "library".to_string(),
            b: "generated".to_string(),
        }
    }
}

impl SourceLabels {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Returns the label of `side`.
    pub fn of(&self, side: Side) -> &str {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    /// Returns the labels with the two sides exchanged.
    pub fn swapped(&self) -> Self {
        Self::new(self.b.clone(), self.a.clone())
    }
}

/// Severity assigned to each drift rule.
///
/// Deserializes from a partial YAML/JSON mapping; omitted rules keep their
/// defaults.
///
/// # Examples
///
/// ```
/// use schema_drift_core::{SeverityPolicy, Severity};
///
/// let policy: SeverityPolicy = serde_json::from_str(r#"{"enum_only_in_b": "warning"}"#).unwrap();
/// assert_eq!(policy.enum_only_in_b, Severity::Warning);
/// assert_eq!(policy.missing_required, Severity::Error);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPolicy {
    /// Property declared by B but absent from A.
    pub missing_from_a: Severity,
    /// Property declared by A but absent from B.
    pub missing_from_b: Severity,
    /// Missing property that the declaring side lists as required.
    pub missing_required: Severity,
    /// Enum value present in A only (B may reject valid payloads).
    pub enum_only_in_a: Severity,
    /// Enum value present in B only (usually a benign superset).
    pub enum_only_in_b: Severity,
    /// A closes the value set with an enum, B accepts any value.
    pub enum_constraint_only_in_a: Severity,
    /// B closes the value set with an enum, A accepts any value.
    pub enum_constraint_only_in_b: Severity,
    /// One side accepts `null`, the other does not.
    pub nullability: Severity,
    /// A shared property is required on one side only.
    pub required_mismatch: Severity,
    /// `additionalProperties: false` on one side only.
    pub additional_properties: Severity,
    /// Union flavors differ (e.g. `oneOf` vs `anyOf`).
    pub union_mode: Severity,
    /// Top-level type present in one source only.
    pub missing_type: Severity,
    /// Reference target not found among the source's types.
    pub unresolved_reference: Severity,
    /// Comparison re-entered a reference pair already being compared.
    pub recursive_reference: Severity,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            missing_from_a: Severity::Warning,
            missing_from_b: Severity::Warning,
            missing_required: Severity::Error,
            enum_only_in_a: Severity::Warning,
            enum_only_in_b: Severity::Info,
            enum_constraint_only_in_a: Severity::Info,
            enum_constraint_only_in_b: Severity::Warning,
            nullability: Severity::Warning,
            required_mismatch: Severity::Warning,
            additional_properties: Severity::Warning,
            union_mode: Severity::Warning,
            missing_type: Severity::Info,
            unresolved_reference: Severity::Warning,
            recursive_reference: Severity::Info,
        }
    }
}

impl SeverityPolicy {
    /// Severity of a property that is declared on `present_in` only.
    pub fn missing_property(&self, present_in: Side, required: bool) -> Severity {
        if required {
            return self.missing_required;
        }
        match present_in {
            Side::A => self.missing_from_b,
            Side::B => self.missing_from_a,
        }
    }

    /// Severity of an enum value present on `present_in` only.
    pub fn enum_value(&self, present_in: Side) -> Severity {
        match present_in {
            Side::A => self.enum_only_in_a,
            Side::B => self.enum_only_in_b,
        }
    }

    /// Severity of an enum constraint declared on `present_in` only.
    pub fn enum_constraint(&self, present_in: Side) -> Severity {
        match present_in {
            Side::A => self.enum_constraint_only_in_a,
            Side::B => self.enum_constraint_only_in_b,
        }
    }

    /// Returns the policy with every side-specific rule exchanged.
    ///
    /// Comparing `(B, A)` with the swapped policy assigns the same severities
    /// as comparing `(A, B)` with the original one.
    pub fn swapped(&self) -> Self {
        Self {
            missing_from_a: self.missing_from_b,
            missing_from_b: self.missing_from_a,
            enum_only_in_a: self.enum_only_in_b,
            enum_only_in_b: self.enum_only_in_a,
            enum_constraint_only_in_a: self.enum_constraint_only_in_b,
            enum_constraint_only_in_b: self.enum_constraint_only_in_a,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_overrides_side() {
        let policy = SeverityPolicy::default();
        assert_eq!(policy.missing_property(Side::A, false), Severity::Warning);
        assert_eq!(policy.missing_property(Side::B, false), Severity::Warning);
        assert_eq!(policy.missing_property(Side::A, true), Severity::Error);
        assert_eq!(policy.missing_property(Side::B, true), Severity::Error);
    }

    #[test]
    fn test_enum_defaults_are_asymmetric() {
        let policy = SeverityPolicy::default();
        assert_eq!(policy.enum_value(Side::A), Severity::Warning);
        assert_eq!(policy.enum_value(Side::B), Severity::Info);
    }

    #[test]
    fn test_swapped_exchanges_side_rules_only() {
        let policy = SeverityPolicy {
            missing_from_a: Severity::Error,
            nullability: Severity::Info,
            ..SeverityPolicy::default()
        };
        let swapped = policy.swapped();
        assert_eq!(swapped.missing_from_b, Severity::Error);
        assert_eq!(swapped.missing_from_a, Severity::Warning);
        assert_eq!(swapped.enum_only_in_a, Severity::Info);
        assert_eq!(swapped.nullability, Severity::Info);
        assert_eq!(swapped.swapped(), policy);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let policy: SeverityPolicy =
            serde_yaml::from_str("missing_from_b: error\nnullability: info\n").unwrap();
        assert_eq!(policy.missing_from_b, Severity::Error);
        assert_eq!(policy.nullability, Severity::Info);
        assert_eq!(policy.missing_type, Severity::Info);
    }

    #[test]
    fn test_labels_swap() {
        let labels = SourceLabels::default();
        assert_eq!(labels.of(Side::A), "library");
        assert_eq!(labels.swapped().of(Side::A), "generated");
        assert_eq!(Side::A.other(), Side::B);
    }
}
