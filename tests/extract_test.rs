//! Extraction tests over real files on disk

use mcdc::{extract, ExtractionSession, Extractor, Operator};
use std::path::PathBuf;

fn write_source(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

const SAFETY_MONITOR: &str = r#"
#include "safety_monitor.h"

static bool primary_ok = false;

bool sm_speed_interlock(int speed, bool door_closed)
{
    if ((speed == 0) && door_closed && !fault_latched()) {
        return true;
    }
    return false;
}

bool sm_release_allowed(void)
{
    return primary_ok || secondary_ok() || maintenance_mode();
}
"#;

const DOOR_CONTROL: &str = r#"
void dc_step(dc_state_t *state)
{
    bool can_open = (state->speed == 0) && state->commanded;
    while (can_open && !timeout_expired(state)) {
        dc_drive(state);
    }
}
"#;

#[test]
fn extracts_across_multiple_files_with_per_file_tags() {
    let dir = tempfile::tempdir().unwrap();
    let sm = write_source(&dir, "safety_monitor.c", SAFETY_MONITOR);
    let dc = write_source(&dir, "door_control.c", DOOR_CONTROL);

    let decisions = extract(&[sm, dc], &[]);

    assert_eq!(decisions.len(), 4);
    assert_eq!(decisions[0].id, "CBE-SM-001");
    assert_eq!(decisions[0].operator, Operator::And);
    assert_eq!(decisions[0].num_conditions, 3);
    assert_eq!(decisions[0].function, "sm_speed_interlock");

    assert_eq!(decisions[1].id, "CBE-SM-002");
    assert_eq!(decisions[1].operator, Operator::Or);

    assert_eq!(decisions[2].id, "CBE-DC-001");
    assert_eq!(decisions[2].operator, Operator::And);
    assert_eq!(decisions[3].id, "CBE-DC-002");
    assert_eq!(decisions[3].function, "dc_step");
}

#[test]
fn missing_file_is_skipped_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_source(&dir, "safety_monitor.c", SAFETY_MONITOR);
    let missing = dir.path().join("not_there.c");

    let mut session = ExtractionSession::new();
    let decisions = Extractor::new().extract(&mut session, &[missing, good]);

    assert_eq!(session.files_skipped, 1);
    assert_eq!(session.files_scanned, 1);
    assert!(session.any_usable_input());
    assert_eq!(decisions.len(), 2);
    // The skipped file consumed no counter values.
    assert_eq!(decisions[0].id, "CBE-SM-001");
}

#[test]
fn ids_continue_when_one_session_sees_same_tag_twice() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_source(
        &dir,
        "safety_monitor.c",
        "bool f(void) { return a && b; }\n",
    );
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    let b_path = sub.join("safety_monitor.c");
    std::fs::write(&b_path, "bool g(void) { return c && d; }\n").unwrap();

    let mut session = ExtractionSession::new();
    let decisions = Extractor::new().extract(&mut session, &[a, b_path]);

    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0].id, "CBE-SM-001");
    assert_eq!(decisions[1].id, "CBE-SM-002");
}

#[test]
fn conditions_keep_first_seen_order_and_indices() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(
        &dir,
        "fault_detection.c",
        "void fd(void) { if (sensor_a_ok && sensor_b_ok && sensor_a_ok) { act(); } }\n",
    );

    let decisions = extract(&[path], &[]);

    assert_eq!(decisions.len(), 1);
    let conds = &decisions[0].conditions;
    assert_eq!(conds.len(), 2);
    assert_eq!(conds[0].text, "sensor_a_ok");
    assert_eq!(conds[0].index, 0);
    assert_eq!(conds[1].text, "sensor_b_ok");
    assert_eq!(conds[1].index, 1);
}

#[test]
fn mixed_decision_flattens_parenthesized_groups() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(
        &dir,
        "command_processor.c",
        "void cp(void) { if ((cmd_valid && crc_ok) || force_mode) { run(); } }\n",
    );

    let decisions = extract(&[path], &[]);

    assert_eq!(decisions.len(), 1);
    assert_eq!(decisions[0].operator, Operator::Mixed);
    let texts: Vec<&str> = decisions[0]
        .conditions
        .iter()
        .map(|c| c.text.as_str())
        .collect();
    assert_eq!(texts, vec!["cmd_valid", "crc_ok", "force_mode"]);
}

#[test]
fn commented_out_decisions_are_not_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_source(
        &dir,
        "status_reporter.c",
        r#"
void sr(void)
{
    /* if (old_check && legacy_mode) { removed(); } */
    // while (a && b) { }
    const char *msg = "a && b";
    report(msg);
}
"#,
    );

    let decisions = extract(&[path], &[]);
    assert!(decisions.is_empty());
}
