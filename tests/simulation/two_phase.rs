//! Two-Phase Locking Tests
//!
//! Wound-wait resolution, wait-queue draining and before-image restore,
//! observed through the final report.

use crate::*;

// =============================================================================
// WOUND-WAIT
// =============================================================================

#[test]
fn test_older_writer_wounds_younger_reader() {
    let report = run(
        Algorithm::TwoPhaseLocking,
        "R T1 X\nR T2 X\nW T1 X=1\nC T1\n",
    );

    assert_statuses(
        &report,
        &[("T1", TransactionStatus::Committed), ("T2", TransactionStatus::Active)],
    );
    assert_eq!(txn(&report, "T2").restarts, 1);
    assert_eq!(report.value_of("X"), Some(1));
}

#[test]
fn test_younger_writer_waits_for_older_reader() {
    let report = run(
        Algorithm::TwoPhaseLocking,
        "R T2 X\nR T1 X\nW T1 X=1\nC T2\nC T1\n",
    );

    assert!(report.all_finished());
    assert_eq!(txn(&report, "T1").restarts, 0);
    assert_eq!(txn(&report, "T2").restarts, 0);
    assert_eq!(report.value_of("X"), Some(1));
}

#[test]
fn test_wounded_writer_is_undone_then_replayed() {
    let report = run(
        Algorithm::TwoPhaseLocking,
        "R T1 Y\nW T2 X=5\nR T1 X\nC T1\nC T2\n",
    );

    assert!(report.all_finished());
    assert_eq!(txn(&report, "T2").restarts, 1);
    assert_eq!(report.value_of("X"), Some(5));
}

// =============================================================================
// WAIT-QUEUE
// =============================================================================

#[test]
fn test_waiters_are_served_in_order() {
    let report = run(
        Algorithm::TwoPhaseLocking,
        "W T1 X=1\nW T2 X=2\nW T3 X=3\nC T1\nC T2\nC T3\n",
    );

    assert!(report.all_finished());
    assert_eq!(report.value_of("X"), Some(3));
    for id in ["T1", "T2", "T3"] {
        assert_eq!(txn(&report, id).restarts, 0, "{} should never restart", id);
    }
}

#[test]
fn test_waiting_transaction_keeps_its_own_order() {
    let report = run(
        Algorithm::TwoPhaseLocking,
        "W T1 X=1\nW T2 X=2\nW T2 X=7\nW T2 Y=4\nC T1\nC T2\n",
    );

    assert!(report.all_finished());
    assert_eq!(report.value_of("X"), Some(7));
    assert_eq!(report.value_of("Y"), Some(4));
}

#[test]
fn test_uncommitted_holder_leaves_waiter_still_going() {
    let report = run(Algorithm::TwoPhaseLocking, "W T1 X=1\nW T2 X=2\nC T2\n");

    assert_statuses(
        &report,
        &[("T1", TransactionStatus::Active), ("T2", TransactionStatus::Waiting)],
    );
    assert!(report.to_string().contains("still going"));
    assert_eq!(report.value_of("X"), Some(1));
}

// =============================================================================
// EDGE CASES
// =============================================================================

#[test]
fn test_instruction_after_commit_is_dropped() {
    let report = run(Algorithm::TwoPhaseLocking, "W T1 X=1\nC T1\nW T1 X=9\n");
    assert_statuses(&report, &[("T1", TransactionStatus::Committed)]);
    assert_eq!(report.value_of("X"), Some(1));
}

#[test]
fn test_unknown_resource_reads_zero() {
    let report = run(Algorithm::TwoPhaseLocking, "R T1 Q\nC T1\n");
    assert_eq!(report.value_of("Q"), Some(0));
}
