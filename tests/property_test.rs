//! Property-based tests for the MC/DC engine
//!
//! Uses proptest to generate decisions and verify the documented invariants.

use mcdc::{analyze, Condition, Decision, Operator};
use proptest::prelude::*;

fn pure_decision(n: u32, operator: Operator) -> Decision {
    let connective = if operator == Operator::And { " && " } else { " || " };
    let texts: Vec<String> = (0..n).map(|i| format!("cond_{}", i)).collect();
    Decision {
        id: "CBE-PT-001".into(),
        file: "src/prop_target.c".into(),
        line: 1,
        function: "prop_target".into(),
        text: texts.join(connective),
        conditions: texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Condition {
                text,
                index: i as u32,
            })
            .collect(),
        operator,
        num_conditions: n,
    }
}

fn any_pure_decision() -> impl Strategy<Value = Decision> {
    (2u32..=6, prop_oneof![Just(Operator::And), Just(Operator::Or)])
        .prop_map(|(n, op)| pure_decision(n, op))
}

proptest! {
    #[test]
    fn truth_table_has_two_to_the_n_rows(decision in any_pure_decision()) {
        let result = analyze(&decision);
        prop_assert_eq!(result.truth_table.len(), 1usize << decision.num_conditions);
    }

    #[test]
    fn outcomes_recompute_independently(decision in any_pure_decision()) {
        let result = analyze(&decision);
        for row in &result.truth_table {
            let expected = match decision.operator {
                Operator::And => row.assignments.values().all(|v| *v),
                Operator::Or => row.assignments.values().any(|v| *v),
                Operator::Mixed => unreachable!("strategy yields pure decisions"),
            };
            prop_assert_eq!(row.outcome, expected);
        }
    }

    #[test]
    fn pairs_differ_in_exactly_one_position(decision in any_pure_decision()) {
        let result = analyze(&decision);
        for (cond_idx, pairs) in &result.pairs {
            for pair in pairs {
                let rf = &result.truth_table[pair.row_false as usize];
                let rt = &result.truth_table[pair.row_true as usize];
                prop_assert_ne!(rf.outcome, rt.outcome);
                prop_assert!(!rf.assignments[cond_idx]);
                prop_assert!(rt.assignments[cond_idx]);
                let differing = rf
                    .assignments
                    .iter()
                    .filter(|(k, v)| rt.assignments[k] != **v)
                    .count();
                prop_assert_eq!(differing, 1);
            }
        }
    }

    #[test]
    fn pure_decisions_need_exactly_n_plus_one_vectors(decision in any_pure_decision()) {
        let result = analyze(&decision);
        let n = decision.num_conditions as usize;
        prop_assert!(result.is_achievable);
        prop_assert_eq!(result.minimal_vectors.len(), n + 1);
        prop_assert_eq!(result.min_required as usize, n + 1);
    }

    #[test]
    fn selection_covers_every_achievable_condition(decision in any_pure_decision()) {
        let result = analyze(&decision);
        let selected: Vec<u32> = result.minimal_vectors.iter().map(|r| r.row_id).collect();
        for pairs in result.pairs.values() {
            let covered = pairs.iter().any(|p| {
                selected.contains(&p.row_false) && selected.contains(&p.row_true)
            });
            prop_assert!(covered);
        }
    }

    #[test]
    fn achievability_matches_pair_emptiness(decision in any_pure_decision()) {
        let result = analyze(&decision);
        let has_empty = result.pairs.values().any(|p| p.is_empty());
        prop_assert_eq!(result.is_achievable, !has_empty);
    }
}
