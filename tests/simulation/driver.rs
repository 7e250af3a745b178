//! Driver and Entry-Point Tests
//!
//! File-backed runs, parse failures, the replay guard and report output.

use crate::*;
use ccsim::ccsim_core::LineError;

const SERIAL: &str = "W T1 X=1\nC T1\nR T2 X\nW T2 Y=2\nC T2\n";

#[test]
fn test_serial_trace_agrees_across_algorithms() {
    for algorithm in Algorithm::ALL {
        let report = run(algorithm, SERIAL);
        assert_eq!(report.algorithm, algorithm);
        assert!(report.all_finished(), "{} left work unfinished", algorithm);
        assert_eq!(report.value_of("X"), Some(1), "{}", algorithm);
        assert_eq!(report.value_of("Y"), Some(2), "{}", algorithm);
    }
}

#[test]
fn test_run_path_with_txt_fallback() {
    let (dir, _) = trace_file("serial.txt", SERIAL);
    let report = Simulation::with_algorithm(Algorithm::Optimistic)
        .run_path(dir.path().join("serial"))
        .unwrap();
    assert_eq!(report.value_of("Y"), Some(2));
}

#[test]
fn test_comments_and_blank_lines_are_skipped() {
    let report = run(
        Algorithm::TwoPhaseLocking,
        "# setup\n\nw t1 X=3\n   \nc t1\n",
    );
    assert_statuses(&report, &[("t1", TransactionStatus::Committed)]);
    assert_eq!(report.value_of("X"), Some(3));
}

#[test]
fn test_malformed_line_stops_the_run() {
    let err = Simulation::default()
        .run_text("R T1 X\n\nR T1 X=1\n")
        .unwrap_err();
    match err {
        Error::InvalidInstructionLine { line, reason } => {
            assert_eq!(line, 3);
            assert_eq!(reason, LineError::ForbiddenEquals);
        }
        other => panic!("expected invalid line, got {:?}", other),
    }
}

#[test]
fn test_replay_guard_trips() {
    let options = SimulationOptions::new()
        .algorithm(Algorithm::Optimistic)
        .max_replays(Some(0));
    let err = Simulation::new(options)
        .run_text("W T1 X=1\nW T2 X=2\nC T1\nC T2\n")
        .unwrap_err();
    assert!(err.is_serious());
}

#[test]
fn test_long_run_of_resolvable_conflicts_completes() {
    const GROUPS: usize = 3_000;

    let mut occ = String::new();
    let mut mvto = String::new();
    for i in 0..GROUPS {
        occ.push_str(&format!("W A{i} X=1\nW B{i} X=2\nC A{i}\nC B{i}\n"));
        mvto.push_str(&format!(
            "R A{i} Y\nR B{i} X\nW A{i} X={i}\nC B{i}\nC A{i}\n"
        ));
    }

    let report = run(Algorithm::Optimistic, &occ);
    assert!(report.all_finished());
    assert_eq!(report.transactions.len(), 2 * GROUPS);
    assert_eq!(report.value_of("X"), Some(2));

    let report = run(Algorithm::Multiversion, &mvto);
    assert!(report.all_finished());
    assert_eq!(report.value_of("X"), Some(GROUPS as i64 - 1));
}

#[test]
fn test_replay_bound_is_opt_in() {
    assert_eq!(SimulationOptions::default().max_replays, None);
    let options = SimulationOptions::new()
        .algorithm(Algorithm::Optimistic)
        .max_replays(Some(1));
    let report = Simulation::new(options)
        .run_text("W T1 X=1\nW T2 X=2\nC T1\nC T2\n")
        .unwrap();
    assert!(report.all_finished());
}

#[test]
fn test_exhausted_clock_is_an_error() {
    for algorithm in Algorithm::ALL {
        let options = SimulationOptions::new()
            .algorithm(algorithm)
            .clock_start(u64::MAX);
        let err = Simulation::new(options)
            .run_text("W T1 X=1\nC T1\n")
            .unwrap_err();
        assert!(err.is_serious(), "{}", algorithm);
    }
}

#[test]
fn test_empty_trace() {
    for algorithm in Algorithm::ALL {
        let report = run(algorithm, "");
        assert!(report.transactions.is_empty());
        assert!(report.to_string().contains("No resource data"));
    }
}

#[test]
fn test_report_serializes_to_json() {
    let report = run(Algorithm::Multiversion, SERIAL);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["algorithm"], "multiversion");
    assert_eq!(json["data"]["kind"], "versions");
    let back: StatusReport = serde_json::from_value(json).unwrap();
    assert_eq!(back, report);
}

// =============================================================================
// SERIAL EQUIVALENCE
// Transactions that never overlap commit first time under every algorithm
// =============================================================================

mod serial {
    use crate::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn ops() -> impl Strategy<Value = Vec<Vec<(bool, u8, i16)>>> {
        prop::collection::vec(
            prop::collection::vec((any::<bool>(), 0u8..4, any::<i16>()), 0..6),
            1..6,
        )
    }

    proptest! {
        #[test]
        fn prop_serial_traces_agree(txns in ops()) {
            let mut trace = String::new();
            let mut expected = BTreeMap::new();
            for (i, body) in txns.iter().enumerate() {
                let id = format!("T{}", i + 1);
                for &(write, res, value) in body {
                    let resource = format!("R{}", res);
                    if write {
                        trace.push_str(&format!("W {} {}={}\n", id, resource, value));
                        expected.insert(resource, value as i64);
                    } else {
                        trace.push_str(&format!("R {} {}\n", id, resource));
                        expected.entry(resource).or_insert(0);
                    }
                }
                trace.push_str(&format!("C {}\n", id));
            }

            for algorithm in Algorithm::ALL {
                let report = run(algorithm, &trace);
                prop_assert!(report.all_finished());
                prop_assert!(report.transactions.iter().all(|t| t.restarts == 0));
                for (resource, value) in &expected {
                    prop_assert_eq!(report.value_of(resource), Some(*value));
                }
            }
        }
    }
}
