//! Multiversion Timestamp Ordering Tests
//!
//! Version selection, the forbidden-write rule and cascading rollback.

use crate::*;

fn write_stamps(report: &StatusReport, resource: &str) -> Vec<u64> {
    match &report.data {
        DataSnapshot::Versions(chains) => chains
            .iter()
            .find(|c| c.resource == resource)
            .map(|c| c.versions.iter().map(|v| v.write_ts.as_u64()).collect())
            .unwrap_or_default(),
        other => panic!("expected version data, got {:?}", other),
    }
}

// =============================================================================
// READ RULE
// =============================================================================

#[test]
fn test_later_reader_sees_earlier_write() {
    let report = run(Algorithm::Multiversion, "R T1 X\nW T1 X=5\nR T2 X\nC T1\n");

    assert_statuses(
        &report,
        &[("T1", TransactionStatus::Committed), ("T2", TransactionStatus::Active)],
    );
    assert_eq!(write_stamps(&report, "X"), vec![0, 1]);
    assert_eq!(report.value_of("X"), Some(5));
}

#[test]
fn test_uncommitted_version_is_not_the_final_value() {
    let report = run(Algorithm::Multiversion, "W T1 X=3\nC T1\nW T2 X=4\n");
    assert_eq!(write_stamps(&report, "X"), vec![0, 1, 2]);
    assert_eq!(report.value_of("X"), Some(3));
}

// =============================================================================
// FORBIDDEN WRITES AND CASCADES
// =============================================================================

#[test]
fn test_forbidden_write_restarts_writer_only() {
    let report = run(
        Algorithm::Multiversion,
        "R T1 Y\nR T2 X\nW T1 X=1\nC T1\nC T2\n",
    );

    assert!(report.all_finished());
    assert_eq!(txn(&report, "T1").restarts, 1);
    assert_eq!(txn(&report, "T2").restarts, 0);
    // T1 restarted at timestamp 3, after T2's read at 2
    assert_eq!(txn(&report, "T1").timestamp.as_u64(), 3);
    assert_eq!(write_stamps(&report, "X"), vec![0, 3]);
    assert_eq!(report.value_of("X"), Some(1));
}

#[test]
fn test_rollback_cascades_to_dirty_readers() {
    let report = run(
        Algorithm::Multiversion,
        "W T1 X=1\nR T2 X\nR T3 Y\nW T1 Y=2\nC T1\nC T2\nC T3\n",
    );

    assert!(report.all_finished());
    assert_eq!(txn(&report, "T1").restarts, 1);
    assert_eq!(txn(&report, "T2").restarts, 1);
    assert_eq!(txn(&report, "T3").restarts, 0);

    // nothing written at T1's first timestamp survives
    let t1_ts = txn(&report, "T1").timestamp.as_u64();
    assert_eq!(write_stamps(&report, "X"), vec![0, t1_ts]);
    assert_eq!(write_stamps(&report, "Y"), vec![0, t1_ts]);
    assert_eq!(report.value_of("Y"), Some(2));
}

#[test]
fn test_committed_reader_survives_rollback_of_writer() {
    let report = run(
        Algorithm::Multiversion,
        "W T1 X=1\nR T2 X\nC T2\nR T3 Y\nW T1 Y=2\nC T1\nC T3\n",
    );

    assert!(report.all_finished());
    assert_eq!(txn(&report, "T2").restarts, 0);
    assert_eq!(txn(&report, "T1").restarts, 1);
}
