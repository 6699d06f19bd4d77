//! Coverage mapping tests: dataset + executed results -> report

use mcdc::{
    analyze_all, compute_coverage, extract, Error, TestResults, VectorDataset,
};
use std::path::PathBuf;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Build a dataset from one AND-3 decision, via the real extraction path.
fn and3_dataset(dir: &tempfile::TempDir) -> VectorDataset {
    let source = write_file(
        dir,
        "safety_monitor.c",
        r#"
bool sm_interlock(void)
{
    if (speed_zero && door_closed && power_ok) {
        return true;
    }
    return false;
}
"#,
    );
    let decisions = extract(&[source], &[]);
    assert_eq!(decisions.len(), 1);
    let results = analyze_all(&decisions);
    VectorDataset::from_results(&results, "train_door_control", 3)
}

#[test]
fn round_trip_through_disk_and_full_coverage() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = and3_dataset(&dir);
    let vectors_path = dir.path().join("reports/MC-DC-Vectors.json");
    dataset.save(&vectors_path).unwrap();

    let loaded = VectorDataset::load(&vectors_path).unwrap();
    assert_eq!(loaded.total_decisions, 1);

    // Cover all four minimal vectors using the structured schema.
    let cases: Vec<String> = loaded.decisions[0]
        .minimal_vectors
        .iter()
        .map(|v| format!("{{\"id\": \"{}\", \"status\": \"PASS\"}}", v.label))
        .collect();
    let results_json = format!(
        "{{\"project\": \"train_door_control\", \"test_cases\": [{}]}}",
        cases.join(", ")
    );
    let results = TestResults::from_json(&results_json).unwrap();

    let report = compute_coverage(&loaded, &results);
    assert!(report.meets_requirement);
    assert_eq!(report.overall_coverage_pct, 100.0);
    assert!(report.decisions[0].is_fully_covered);
    assert!(report.gap_summary.is_empty());
}

#[test]
fn three_of_four_passing_labels_yield_one_missing_pair() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = and3_dataset(&dir);

    let labels: Vec<String> = dataset.decisions[0]
        .minimal_vectors
        .iter()
        .map(|v| v.label.clone())
        .collect();
    assert_eq!(labels.len(), 4);

    // Mark only 3 of the 4 required labels as PASS. The first minimal
    // vector is the row with only the first condition false; dropping it
    // breaks exactly that condition's independence pair.
    let mut cases: Vec<String> = labels[1..]
        .iter()
        .map(|l| format!("{{\"id\": \"{}\", \"status\": \"PASS\"}}", l))
        .collect();
    cases.push(format!(
        "{{\"id\": \"{}\", \"status\": \"FAIL\"}}",
        labels[0]
    ));
    let results = TestResults::from_json(&format!(
        "{{\"test_cases\": [{}]}}",
        cases.join(", ")
    ))
    .unwrap();

    let report = compute_coverage(&dataset, &results);
    let d = &report.decisions[0];

    assert!(!d.is_fully_covered);
    assert!(!report.meets_requirement);
    assert_eq!(report.gap_summary.len(), 1);
    assert!(report.gap_summary[0].contains("2/3 conditions covered"));
    assert!(report.gap_summary[0].contains("1 independence pair(s) missing"));
}

#[test]
fn simplified_schema_matches_labels_embedded_in_test_names() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = and3_dataset(&dir);
    let labels: Vec<String> = dataset.decisions[0]
        .minimal_vectors
        .iter()
        .map(|v| v.label.clone())
        .collect();

    // Unity-style bare ids with the vector label embedded in the test name.
    let cases: Vec<String> = labels
        .iter()
        .map(|l| format!("{{\"id\": \"test_sm_interlock_{}\", \"status\": \"PASS\"}}", l))
        .collect();
    let results = TestResults::from_json(&format!(
        "{{\"test_cases\": [{}]}}",
        cases.join(", ")
    ))
    .unwrap();

    let report = compute_coverage(&dataset, &results);
    assert!(report.meets_requirement);
    assert_eq!(report.decisions[0].covered_vectors, 4);
}

#[test]
fn explicit_row_index_matching_takes_priority() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = and3_dataset(&dir);
    let decision_id = dataset.decisions[0].id.clone();

    let cases: Vec<String> = dataset.decisions[0]
        .minimal_vectors
        .iter()
        .map(|v| {
            format!(
                "{{\"id\": \"case_{}\", \"status\": \"ok\", \"decision_id\": \"{}\", \"row_id\": {}}}",
                v.row_id, decision_id, v.row_id
            )
        })
        .collect();
    let results = TestResults::from_json(&format!(
        "{{\"test_cases\": [{}]}}",
        cases.join(", ")
    ))
    .unwrap();

    let report = compute_coverage(&dataset, &results);
    assert!(report.meets_requirement);
}

#[test]
fn malformed_inputs_are_fatal_for_coverage() {
    let dir = tempfile::tempdir().unwrap();

    let bad_dataset = write_file(&dir, "vectors.json", "{\"schema_version\": \"1.0\"}");
    assert!(matches!(
        VectorDataset::load(&bad_dataset).unwrap_err(),
        Error::Dataset(_)
    ));

    let missing = dir.path().join("missing.json");
    assert!(matches!(
        VectorDataset::load(&missing).unwrap_err(),
        Error::Dataset(_)
    ));

    let bad_results = write_file(&dir, "results.json", "{\"cases\": []}");
    assert!(matches!(
        TestResults::load(&bad_results).unwrap_err(),
        Error::Results(_)
    ));
}

#[test]
fn repeated_runs_produce_identical_percentages_and_gaps() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = and3_dataset(&dir);
    let label = dataset.decisions[0].minimal_vectors[0].label.clone();
    let results = TestResults::from_json(&format!(
        "{{\"test_cases\": [{{\"id\": \"{}\", \"status\": \"PASS\"}}]}}",
        label
    ))
    .unwrap();

    let first = compute_coverage(&dataset, &results);
    let second = compute_coverage(&dataset, &results);

    assert_eq!(first.overall_coverage_pct, second.overall_coverage_pct);
    assert_eq!(
        first.overall_vector_coverage_pct,
        second.overall_vector_coverage_pct
    );
    assert_eq!(first.gap_summary, second.gap_summary);
    assert_eq!(first.decisions[0].covered_vectors, 1);
}
