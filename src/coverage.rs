//! Coverage mapping — test execution results onto MC/DC vectors
//!
//! Consumes a previously generated vector dataset plus externally supplied
//! test-execution records and produces the coverage report: per-decision
//! vector/condition percentages, covered and missing independence pairs,
//! aggregates, and an ordered gap list.
//!
//! Matching policy, in priority order per record:
//! 1. explicit decision id + row index -> canonical row label
//! 2. the record's own id is exactly a known row label
//! 3. a row label embedded in the id or test-function name
//!
//! Only passing records (PASS, PASSED, OK; case-insensitive) mark anything
//! covered. A pair is covered when both endpoint rows are; a condition when
//! at least one of its pairs is; a decision when all conditions AND all
//! minimal vectors are.

use crate::dataset::{DecisionVectors, VectorDataset};
use crate::decision::Operator;
use crate::error::{Error, Result};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::LazyLock;

static EMBEDDED_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TC-CBE-[A-Z]+-\d{3}-\d+").expect("static regex"));

/// One externally executed test case.
///
/// The structured schema links a record to a decision and row explicitly;
/// the simplified schema is a bare id + status and is matched fuzzily.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TestCase {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub decision_id: Option<String>,
    #[serde(default)]
    pub row_id: Option<u32>,
    #[serde(default)]
    pub condition_values: Option<BTreeMap<u32, bool>>,
    #[serde(default)]
    pub outcome: Option<bool>,
    #[serde(default)]
    pub test_function: Option<String>,
}

impl TestCase {
    /// Recognized pass synonyms, case-insensitive.
    pub fn passed(&self) -> bool {
        matches!(
            self.status.to_uppercase().as_str(),
            "PASS" | "PASSED" | "OK"
        )
    }
}

/// Externally supplied test execution results.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TestResults {
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub sil_level: Option<u32>,
    pub test_cases: Vec<TestCase>,
}

impl TestResults {
    /// Load from disk. Structurally invalid input is fatal for the coverage
    /// operation.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Results(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| Error::Results(e.to_string()))
    }
}

/// Coverage status of one independence pair.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PairCoverage {
    pub condition_index: u32,
    pub condition_text: String,
    pub row_false_label: String,
    pub row_true_label: String,
    pub row_false_covered: bool,
    pub row_true_covered: bool,
    pub pair_covered: bool,
}

/// MC/DC coverage for one decision.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DecisionCoverage {
    pub decision_id: String,
    pub file: String,
    pub line: u32,
    pub function: String,
    pub text: String,
    pub operator: Operator,
    pub num_conditions: u32,
    pub total_vectors: usize,
    pub covered_vectors: usize,
    pub conditions_covered: usize,
    pub conditions_total: usize,
    pub vector_coverage_pct: f64,
    pub condition_coverage_pct: f64,
    pub pairs_covered: Vec<PairCoverage>,
    pub pairs_missing: Vec<PairCoverage>,
    pub is_fully_covered: bool,
}

/// Overall MC/DC coverage report.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CoverageReport {
    pub project: String,
    pub sil_level: u32,
    pub timestamp: String,
    pub decisions: Vec<DecisionCoverage>,
    pub total_decisions: usize,
    pub fully_covered_decisions: usize,
    /// fully covered decisions / total decisions
    pub overall_coverage_pct: f64,
    /// covered vectors / total vectors, across all decisions
    pub overall_vector_coverage_pct: f64,
    /// MC/DC at the governing integrity level is binary: 100% or fail
    pub meets_requirement: bool,
    pub gap_summary: Vec<String>,
}

impl CoverageReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Compute MC/DC coverage by mapping test results onto vector requirements.
pub fn compute_coverage(dataset: &VectorDataset, results: &TestResults) -> CoverageReport {
    let known = dataset.known_labels();
    let covered = covered_labels(results, &known);

    let mut decisions = Vec::new();
    let mut total_vectors_all = 0usize;
    let mut covered_vectors_all = 0usize;

    for entry in &dataset.decisions {
        let record = decision_coverage(entry, &covered);
        total_vectors_all += record.total_vectors;
        covered_vectors_all += record.covered_vectors;
        decisions.push(record);
    }

    let total = decisions.len();
    let fully_covered = decisions.iter().filter(|d| d.is_fully_covered).count();
    let overall_coverage_pct = percentage(fully_covered, total);
    let overall_vector_coverage_pct = percentage(covered_vectors_all, total_vectors_all);

    let gap_summary: Vec<String> = decisions
        .iter()
        .filter(|d| !d.is_fully_covered)
        .map(|d| {
            let missing = d.conditions_total - d.conditions_covered;
            format!(
                "{} ({}:{}): {}/{} conditions covered ({} independence pair(s) missing)",
                d.decision_id,
                d.function,
                d.line,
                d.conditions_covered,
                d.conditions_total,
                missing
            )
        })
        .collect();

    CoverageReport {
        project: dataset.project.clone(),
        sil_level: dataset.sil_level,
        timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        decisions,
        total_decisions: total,
        fully_covered_decisions: fully_covered,
        overall_coverage_pct,
        overall_vector_coverage_pct,
        meets_requirement: fully_covered == total,
        gap_summary,
    }
}

/// Resolve every passing record to the set of row labels it covers.
fn covered_labels(results: &TestResults, known: &HashSet<String>) -> HashSet<String> {
    let mut covered = HashSet::new();

    for tc in &results.test_cases {
        if !tc.passed() {
            continue;
        }

        // Rule 1: explicit decision id + row index.
        if let (Some(decision_id), Some(row_id)) = (&tc.decision_id, tc.row_id) {
            let label = format!("TC-{}-{:02}", decision_id, row_id + 1);
            if known.contains(&label) {
                covered.insert(label);
                continue;
            }
        }

        // Rule 2: the id is exactly a known label.
        if known.contains(&tc.id) {
            covered.insert(tc.id.clone());
            continue;
        }

        // Rule 3: labels embedded in the id or test-function name.
        let haystacks = [Some(tc.id.as_str()), tc.test_function.as_deref()];
        for text in haystacks.into_iter().flatten() {
            for m in EMBEDDED_LABEL_RE.find_iter(text) {
                if known.contains(m.as_str()) {
                    covered.insert(m.as_str().to_string());
                }
            }
            for label in known {
                if text.contains(label.as_str()) {
                    covered.insert(label.clone());
                }
            }
        }
    }

    covered
}

fn decision_coverage(entry: &DecisionVectors, covered: &HashSet<String>) -> DecisionCoverage {
    let total_vectors = entry.minimal_vectors.len();
    let covered_vectors = entry
        .minimal_vectors
        .iter()
        .filter(|v| covered.contains(&v.label))
        .count();

    let mut pairs_covered = Vec::new();
    let mut pairs_missing = Vec::new();
    let mut conditions_hit: BTreeSet<u32> = BTreeSet::new();

    for (cond_idx, pairs) in &entry.independence_pairs {
        for pair in pairs {
            let false_covered = covered.contains(&pair.row_false_label);
            let true_covered = covered.contains(&pair.row_true_label);
            let pair_info = PairCoverage {
                condition_index: *cond_idx,
                condition_text: pair.condition_text.clone(),
                row_false_label: pair.row_false_label.clone(),
                row_true_label: pair.row_true_label.clone(),
                row_false_covered: false_covered,
                row_true_covered: true_covered,
                pair_covered: false_covered && true_covered,
            };
            if pair_info.pair_covered {
                conditions_hit.insert(*cond_idx);
                pairs_covered.push(pair_info);
            } else {
                pairs_missing.push(pair_info);
            }
        }
    }

    let conditions_total = entry.num_conditions as usize;
    let conditions_covered = conditions_hit.len();
    let is_fully_covered =
        conditions_covered == conditions_total && covered_vectors == total_vectors;

    DecisionCoverage {
        decision_id: entry.id.clone(),
        file: entry.file.clone(),
        line: entry.line,
        function: entry.function.clone(),
        text: entry.text.clone(),
        operator: entry.operator,
        num_conditions: entry.num_conditions,
        total_vectors,
        covered_vectors,
        conditions_covered,
        conditions_total,
        vector_coverage_pct: percentage(covered_vectors, total_vectors),
        condition_coverage_pct: percentage(conditions_covered, conditions_total),
        pairs_covered,
        pairs_missing,
        is_fully_covered,
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Condition, Decision};
    use crate::engine;

    fn dataset_and3() -> VectorDataset {
        let decision = Decision {
            id: "CBE-SM-001".into(),
            file: "src/safety_monitor.c".into(),
            line: 21,
            function: "sm_interlock".into(),
            text: "a && b && c".into(),
            conditions: (0..3)
                .map(|i| Condition {
                    text: ["a", "b", "c"][i].into(),
                    index: i as u32,
                })
                .collect(),
            operator: Operator::And,
            num_conditions: 3,
        };
        let results = engine::analyze_all(&[decision]);
        VectorDataset::from_results(&results, "train_door_control", 3)
    }

    fn results(cases: &[(&str, &str)]) -> TestResults {
        TestResults {
            project: None,
            timestamp: None,
            sil_level: None,
            test_cases: cases
                .iter()
                .map(|(id, status)| TestCase {
                    id: id.to_string(),
                    status: status.to_string(),
                    decision_id: None,
                    row_id: None,
                    condition_values: None,
                    outcome: None,
                    test_function: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_full_coverage_passes() {
        let dataset = dataset_and3();
        // AND-3 minimal set: rows 4,6,7,8 in 1-based labels
        let input = results(&[
            ("TC-CBE-SM-001-04", "PASS"),
            ("TC-CBE-SM-001-06", "pass"),
            ("TC-CBE-SM-001-07", "PASSED"),
            ("TC-CBE-SM-001-08", "OK"),
        ]);
        let report = compute_coverage(&dataset, &input);

        assert!(report.meets_requirement);
        assert_eq!(report.fully_covered_decisions, 1);
        assert_eq!(report.overall_coverage_pct, 100.0);
        assert_eq!(report.overall_vector_coverage_pct, 100.0);
        assert!(report.gap_summary.is_empty());
    }

    #[test]
    fn test_three_of_four_vectors_leaves_one_pair_missing() {
        let dataset = dataset_and3();
        // Drop the row with only `a` false (row_id 3, label -04): condition
        // `a` loses its pair while b and c keep theirs.
        let input = results(&[
            ("TC-CBE-SM-001-06", "PASS"),
            ("TC-CBE-SM-001-07", "PASS"),
            ("TC-CBE-SM-001-08", "PASS"),
        ]);
        let report = compute_coverage(&dataset, &input);

        assert!(!report.meets_requirement);
        let d = &report.decisions[0];
        assert!(!d.is_fully_covered);
        assert_eq!(d.conditions_covered, 2);
        assert_eq!(d.covered_vectors, 3);
        assert_eq!(report.gap_summary.len(), 1);
        assert!(report.gap_summary[0]
            .contains("2/3 conditions covered (1 independence pair(s) missing)"));
        assert!(report.gap_summary[0].starts_with("CBE-SM-001 (sm_interlock:21)"));
    }

    #[test]
    fn test_failing_records_cover_nothing() {
        let dataset = dataset_and3();
        let input = results(&[
            ("TC-CBE-SM-001-08", "FAIL"),
            ("TC-CBE-SM-001-07", "ERROR"),
        ]);
        let report = compute_coverage(&dataset, &input);
        assert_eq!(report.decisions[0].covered_vectors, 0);
        assert_eq!(report.overall_vector_coverage_pct, 0.0);
    }

    #[test]
    fn test_explicit_decision_and_row_match() {
        let dataset = dataset_and3();
        let input = TestResults {
            project: None,
            timestamp: None,
            sil_level: None,
            test_cases: vec![TestCase {
                id: "test_interlock_all_true".into(),
                status: "PASS".into(),
                decision_id: Some("CBE-SM-001".into()),
                row_id: Some(7),
                condition_values: None,
                outcome: Some(true),
                test_function: None,
            }],
        };
        let report = compute_coverage(&dataset, &input);
        assert_eq!(report.decisions[0].covered_vectors, 1);
    }

    #[test]
    fn test_embedded_label_in_test_function() {
        let dataset = dataset_and3();
        let input = TestResults {
            project: None,
            timestamp: None,
            sil_level: None,
            test_cases: vec![TestCase {
                id: "unity_case_12".into(),
                status: "PASS".into(),
                decision_id: None,
                row_id: None,
                condition_values: None,
                outcome: None,
                test_function: Some("test_sm_interlock_TC-CBE-SM-001-08_all_true".into()),
            }],
        };
        let report = compute_coverage(&dataset, &input);
        assert_eq!(report.decisions[0].covered_vectors, 1);
    }

    #[test]
    fn test_malformed_results_are_fatal() {
        assert!(matches!(
            TestResults::from_json("{\"no_test_cases\": true}").unwrap_err(),
            Error::Results(_)
        ));
        assert!(matches!(
            TestResults::from_json("[1, 2, 3]").unwrap_err(),
            Error::Results(_)
        ));
    }

    #[test]
    fn test_deterministic_apart_from_timestamp() {
        let dataset = dataset_and3();
        let input = results(&[("TC-CBE-SM-001-08", "PASS")]);
        let a = compute_coverage(&dataset, &input);
        let b = compute_coverage(&dataset, &input);
        assert_eq!(a.overall_coverage_pct, b.overall_coverage_pct);
        assert_eq!(a.overall_vector_coverage_pct, b.overall_vector_coverage_pct);
        assert_eq!(a.gap_summary, b.gap_summary);
    }
}
