//! Greedy minimal test vector selection
//!
//! Picks the smallest practical set of truth-table rows such that every
//! achievable condition has at least one independence pair with BOTH rows in
//! the selection. Covering one row of a pair proves nothing; independence is
//! demonstrated only by the pair together.
//!
//! Scoring per candidate pair, best first:
//! 1. fewest rows not already selected (reuse beats growth)
//! 2. most still-uncovered conditions that would become fully covered
//!
//! The loop is bounded at `2N + 4` iterations; a pathological pair structure
//! returns the partial selection instead of spinning. Callers must check
//! coverage completeness rather than assume success.
//!
//! For pure AND/OR decisions this degenerates to exactly N+1 rows: one
//! anchor (all-true for AND, all-false for OR) plus one single-flip row per
//! condition.

use crate::engine::{IndependencePair, TruthRow};
use std::collections::{BTreeMap, BTreeSet};

/// Select a greedy-minimal covering row set, returned in ascending row order.
pub fn minimal_vectors(
    num_conditions: u32,
    truth_table: &[TruthRow],
    pairs: &BTreeMap<u32, Vec<IndependencePair>>,
) -> Vec<TruthRow> {
    let mut uncovered: BTreeSet<u32> = (0..num_conditions).collect();
    let mut selected: Vec<u32> = Vec::new();

    // (condition, row_false, row_true), condition order then pair order
    let all_pairs: Vec<(u32, u32, u32)> = pairs
        .iter()
        .flat_map(|(ci, list)| list.iter().map(|p| (*ci, p.row_false, p.row_true)))
        .collect();

    let max_iterations = 2 * num_conditions + 4;
    let mut iteration = 0;

    while !uncovered.is_empty() && iteration < max_iterations {
        iteration += 1;

        // Best candidate so far: lower score wins, first candidate wins ties.
        let mut best: Option<((usize, usize), (u32, u32))> = None;
        for &(ci, ra, rb) in &all_pairs {
            if !uncovered.contains(&ci) {
                continue;
            }
            let new_rows = [ra, rb]
                .into_iter()
                .filter(|r| !selected.contains(r))
                .count();
            let newly_covered = uncovered
                .iter()
                .filter(|&&uc| {
                    all_pairs.iter().any(|&(aci, ara, arb)| {
                        aci == uc
                            && (selected.contains(&ara) || ara == ra || ara == rb)
                            && (selected.contains(&arb) || arb == ra || arb == rb)
                    })
                })
                .count();
            // Reuse already-selected rows first, then prefer the pair that
            // completes the most conditions.
            let score = (new_rows, num_conditions as usize - newly_covered);
            if best.as_ref().is_none_or(|(s, _)| score < *s) {
                best = Some((score, (ra, rb)));
            }
        }

        let Some((_, (ra, rb))) = best else {
            // Remaining conditions have no pairs at all: unachievable.
            break;
        };

        for rid in [ra, rb] {
            if !selected.contains(&rid) {
                selected.push(rid);
            }
        }

        uncovered.retain(|&uc| {
            !all_pairs.iter().any(|&(aci, ara, arb)| {
                aci == uc && selected.contains(&ara) && selected.contains(&arb)
            })
        });
    }

    let mut ids = selected;
    ids.sort_unstable();
    ids.iter()
        .map(|rid| truth_table[*rid as usize].clone())
        .collect()
}
