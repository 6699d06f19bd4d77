//! Truth table and independence pair engine
//!
//! For one `Decision` this module:
//! - Enumerates all `2^N` truth assignments and evaluates the outcome
//! - Collects the independence pairs for every condition
//! - Runs the greedy selector for the minimal vector set
//!
//! Masking MC/DC definitions:
//!
//! An independence pair for condition `Ci` is two truth-table rows that
//! differ only in `Ci` and whose outcomes differ; the pair demonstrates that
//! `Ci` independently affects the decision. A condition with no pair at all
//! cannot be demonstrated and flags the decision `is_achievable = false`.
//!
//! Counting order: condition 0 varies slowest. Row `r`'s value for condition
//! `i` is bit `N-1-i` of `r`, so row 0 is all-false and row `2^N - 1` is
//! all-true. The order is fixed so labels are reproducible across runs.

use crate::decision::{Decision, Operator};
use crate::formula;
use crate::select;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// One row of an MC/DC truth table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TruthRow {
    pub row_id: u32,
    /// condition index -> assigned value
    pub assignments: BTreeMap<u32, bool>,
    pub outcome: bool,
    /// e.g. `TC-CBE-SM-001-03`
    pub label: String,
}

/// An independence pair for a single condition.
///
/// `row_false` is always the row where the condition is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IndependencePair {
    pub condition_index: u32,
    pub condition_text: String,
    pub row_false: u32,
    pub row_true: u32,
}

/// Full MC/DC analysis result for one decision.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub decision: Decision,
    pub truth_table: Vec<TruthRow>,
    /// condition index -> independence pairs
    pub pairs: BTreeMap<u32, Vec<IndependencePair>>,
    /// Greedy-minimal covering set, ascending row_id
    pub minimal_vectors: Vec<TruthRow>,
    /// N+1
    pub min_required: u32,
    /// False iff some condition has no independence pair
    pub is_achievable: bool,
    /// Analysis limitations, e.g. the MIXED evaluation fallback
    pub warnings: Vec<String>,
}

/// Analyze a single decision
pub fn analyze(decision: &Decision) -> AnalysisResult {
    let mut warnings = Vec::new();

    // MIXED decisions evaluate their own connective tree; if the tree cannot
    // be rebuilt from the extracted text, degrade to pure-AND semantics.
    let formula = match decision.operator {
        Operator::Mixed => {
            let built = formula::build(&decision.text, &decision.conditions);
            if built.is_none() {
                warn!(
                    decision = %decision.id,
                    "could not reconstruct MIXED structure, evaluating as pure AND"
                );
                warnings.push(format!(
                    "MIXED structure of {} not reconstructible; evaluated with AND semantics",
                    decision.id
                ));
            }
            built
        }
        _ => None,
    };

    let truth_table = build_truth_table(decision, formula.as_ref());
    let pairs = find_independence_pairs(decision, &truth_table);

    let is_achievable = (0..decision.num_conditions)
        .all(|i| pairs.get(&i).is_some_and(|p| !p.is_empty()));

    let minimal_vectors = select::minimal_vectors(decision.num_conditions, &truth_table, &pairs);

    AnalysisResult {
        decision: decision.clone(),
        truth_table,
        pairs,
        minimal_vectors,
        min_required: decision.num_conditions + 1,
        is_achievable,
        warnings,
    }
}

/// Analyze a list of decisions, one result per decision
pub fn analyze_all(decisions: &[Decision]) -> Vec<AnalysisResult> {
    decisions.iter().map(analyze).collect()
}

/// Generate all `2^N` truth table rows for a decision.
pub fn build_truth_table(decision: &Decision, formula: Option<&formula::Formula>) -> Vec<TruthRow> {
    let n = decision.num_conditions;
    let total = 1u64 << n;
    let mut rows = Vec::with_capacity(total as usize);

    for row_id in 0..total {
        let assignments: BTreeMap<u32, bool> =
            (0..n).map(|i| (i, condition_bit(row_id, i, n))).collect();
        let outcome = evaluate(decision, formula, &assignments);
        let row_id = row_id as u32;
        rows.push(TruthRow {
            row_id,
            assignments,
            outcome,
            label: decision.row_label(row_id),
        });
    }
    rows
}

// Condition 0 lives in the most significant bit so it varies slowest.
fn condition_bit(row_id: u64, index: u32, n: u32) -> bool {
    (row_id >> (n - 1 - index)) & 1 == 1
}

fn evaluate(
    decision: &Decision,
    formula: Option<&formula::Formula>,
    assignments: &BTreeMap<u32, bool>,
) -> bool {
    match decision.operator {
        Operator::And => assignments.values().all(|v| *v),
        Operator::Or => assignments.values().any(|v| *v),
        Operator::Mixed => match formula {
            Some(f) => f.eval(assignments),
            // Documented fallback when the structure was not reconstructible.
            None => assignments.values().all(|v| *v),
        },
    }
}

/// Collect the independence pairs for every condition.
///
/// Walks each row where the condition is false and flips exactly that
/// condition's bit; a differing outcome yields a pair. Every unordered row
/// pair differing in exactly one position is visited exactly once, already
/// canonicalized with `row_false` on the false side.
pub fn find_independence_pairs(
    decision: &Decision,
    truth_table: &[TruthRow],
) -> BTreeMap<u32, Vec<IndependencePair>> {
    let n = decision.num_conditions;
    let mut pairs: BTreeMap<u32, Vec<IndependencePair>> =
        (0..n).map(|i| (i, Vec::new())).collect();

    for cond_idx in 0..n {
        let bit = 1u64 << (n - 1 - cond_idx);
        for row in truth_table {
            let row_id = row.row_id as u64;
            if row_id & bit != 0 {
                continue; // only start from the false side
            }
            let partner = &truth_table[(row_id | bit) as usize];
            if row.outcome == partner.outcome {
                continue;
            }
            pairs
                .entry(cond_idx)
                .or_default()
                .push(IndependencePair {
                    condition_index: cond_idx,
                    condition_text: decision.conditions[cond_idx as usize].text.clone(),
                    row_false: row.row_id,
                    row_true: partner.row_id,
                });
        }
    }
    pairs
}
