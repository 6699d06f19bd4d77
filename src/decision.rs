//! Decision data model
//!
//! A `Decision` is a compound boolean expression extracted from source:
//! two or more atomic conditions joined by `&&`/`||`. Decisions are created
//! once by extraction and never mutated afterwards; everything downstream
//! (truth tables, independence pairs, coverage) is derived from them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single atomic boolean condition within a compound decision.
///
/// `index` is the stable 0-based position assigned in order of first
/// appearance; repeated condition text collapses onto the first-seen index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    pub text: String,
    pub index: u32,
}

/// Top-level connective structure of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Operator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "MIXED")]
    Mixed,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::And => write!(f, "AND"),
            Operator::Or => write!(f, "OR"),
            Operator::Mixed => write!(f, "MIXED"),
        }
    }
}

/// A compound boolean decision extracted from source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    /// Stable identifier, e.g. `CBE-SM-001`
    pub id: String,
    /// Source path as given to the extractor
    pub file: String,
    /// 1-based line number of the decision
    pub line: u32,
    /// Enclosing function name, best effort (`unknown` when not found)
    pub function: String,
    /// Full decision text, best effort
    pub text: String,
    /// Atomic conditions in first-seen order
    pub conditions: Vec<Condition>,
    pub operator: Operator,
    /// Always `conditions.len()`, kept explicit in the serialized form
    pub num_conditions: u32,
}

impl Decision {
    /// Canonical row label for this decision, 1-based and zero-padded.
    pub fn row_label(&self, row_id: u32) -> String {
        format!("TC-{}-{:02}", self.id, row_id + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(id: &str, n: u32) -> Decision {
        Decision {
            id: id.to_string(),
            file: "src/safety_monitor.c".into(),
            line: 42,
            function: "sm_check".into(),
            text: String::new(),
            conditions: (0..n)
                .map(|i| Condition {
                    text: format!("c{}", i),
                    index: i,
                })
                .collect(),
            operator: Operator::And,
            num_conditions: n,
        }
    }

    #[test]
    fn test_row_label_is_one_based_and_padded() {
        let d = decision("CBE-SM-001", 3);
        assert_eq!(d.row_label(0), "TC-CBE-SM-001-01");
        assert_eq!(d.row_label(7), "TC-CBE-SM-001-08");
        assert_eq!(d.row_label(99), "TC-CBE-SM-001-100");
    }

    #[test]
    fn test_operator_serializes_as_upper_case() {
        assert_eq!(serde_json::to_string(&Operator::And).unwrap(), "\"AND\"");
        assert_eq!(serde_json::to_string(&Operator::Mixed).unwrap(), "\"MIXED\"");
        let op: Operator = serde_json::from_str("\"OR\"").unwrap();
        assert_eq!(op, Operator::Or);
    }
}
