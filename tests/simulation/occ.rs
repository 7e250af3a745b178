//! Optimistic Concurrency Control Tests
//!
//! Backward validation, snapshot reads and replay of failed committers.

use crate::*;

// =============================================================================
// VALIDATION
// =============================================================================

#[test]
fn test_write_write_overlap_aborts_later_committer() {
    let report = run(Algorithm::Optimistic, "W T1 X=1\nW T2 X=2\nC T1\nC T2\n");

    assert!(report.all_finished());
    assert_eq!(txn(&report, "T1").restarts, 0);
    assert_eq!(txn(&report, "T2").restarts, 1);
    assert_eq!(report.value_of("X"), Some(2));
}

#[test]
fn test_stale_reader_fails_validation() {
    let report = run(Algorithm::Optimistic, "R T1 X\nW T2 X=4\nC T2\nC T1\n");

    assert!(report.all_finished());
    assert_eq!(txn(&report, "T1").restarts, 1);
    assert_eq!(txn(&report, "T2").restarts, 0);
}

#[test]
fn test_disjoint_transactions_both_commit_first_time() {
    let report = run(Algorithm::Optimistic, "R T1 A\nW T2 B=1\nC T2\nC T1\n");

    assert!(report.all_finished());
    assert_eq!(txn(&report, "T1").restarts, 0);
    assert_eq!(report.value_of("B"), Some(1));
}

#[test]
fn test_serial_transactions_never_conflict() {
    let report = run(
        Algorithm::Optimistic,
        "W T1 X=1\nC T1\nR T2 X\nW T2 X=2\nC T2\n",
    );
    assert_eq!(txn(&report, "T2").restarts, 0);
    assert_eq!(report.value_of("X"), Some(2));
}

// =============================================================================
// SNAPSHOTS AND TIMESTAMPS
// =============================================================================

#[test]
fn test_uncommitted_writes_never_reach_the_store() {
    let report = run(Algorithm::Optimistic, "W T1 X=1\nR T2 X\nC T2\n");

    assert_statuses(
        &report,
        &[("T1", TransactionStatus::Active), ("T2", TransactionStatus::Committed)],
    );
    assert_eq!(report.value_of("X"), Some(0));
}

#[test]
fn test_report_shows_validation_and_finish_timestamps() {
    let report = run(Algorithm::Optimistic, "R T1 X\nC T1\nR T2 X\n");

    let t1 = txn(&report, "T1");
    let validated = t1.validated_at.expect("validation timestamp");
    let finished = t1.finished_at.expect("finish timestamp");
    assert!(t1.timestamp < validated && validated < finished);

    let t2 = txn(&report, "T2");
    assert!(t2.validated_at.is_none());
    let text = report.to_string();
    assert!(text.contains("Validation-Timestamp: -"));
    assert!(text.contains("still going"));
}
