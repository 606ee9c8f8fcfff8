//! Stable test-case identity.
//!
//! A [`TestCaseId`] joins a qualified method name with the ordered list of
//! variable assignments that produced one concrete case. It is the join key
//! between "before" and "after" runs, so equality is structural and the
//! display form is stable: `Class.Method(var1: 1, var2: 2)`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single named integer variable assignment attached to a test case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableValue {
    pub name: String,
    pub value: i64,
}

impl VariableValue {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Structural identity for one test case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestCaseId {
    method: String,
    variables: Vec<VariableValue>,
}

impl TestCaseId {
    /// Create an identity for a case without variables.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            variables: Vec::new(),
        }
    }

    /// Create an identity for a case with an ordered list of variable
    /// assignments. The order is part of the identity and of the display name.
    pub fn with_variables<S, I>(method: impl Into<String>, variables: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, i64)>,
    {
        Self {
            method: method.into(),
            variables: variables
                .into_iter()
                .map(|(name, value)| VariableValue::new(name, value))
                .collect(),
        }
    }

    /// The qualified method name, e.g. `SortBench.sort_random`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The ordered variable assignments.
    pub fn variables(&self) -> &[VariableValue] {
        &self.variables
    }

    /// Look up a variable value by name.
    pub fn variable(&self, name: &str) -> Option<i64> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value)
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.method)?;
        for (i, var) in self.variables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", var.name, var.value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_variables() {
        let id = TestCaseId::with_variables("SortBench.sort_random", [("n", 1000), ("seed", 7)]);
        assert_eq!(id.to_string(), "SortBench.sort_random(n: 1000, seed: 7)");
    }

    #[test]
    fn test_display_without_variables() {
        let id = TestCaseId::new("ParseBench.parse_small");
        assert_eq!(id.to_string(), "ParseBench.parse_small()");
    }

    #[test]
    fn test_structural_equality() {
        let a = TestCaseId::with_variables("M.run", [("n", 10)]);
        let b = TestCaseId::with_variables("M.run", [("n", 10)]);
        let c = TestCaseId::with_variables("M.run", [("n", 20)]);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_variable_order_is_part_of_identity() {
        let a = TestCaseId::with_variables("M.run", [("a", 1), ("b", 2)]);
        let b = TestCaseId::with_variables("M.run", [("b", 2), ("a", 1)]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_variable_lookup() {
        let id = TestCaseId::with_variables("M.run", [("n", 64)]);
        assert_eq!(id.variable("n"), Some(64));
        assert_eq!(id.variable("missing"), None);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let id = TestCaseId::with_variables("M.run", [("n", 64)]);
        let json = serde_json::to_string(&id).unwrap();
        let back: TestCaseId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
