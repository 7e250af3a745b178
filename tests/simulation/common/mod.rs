//! Shared helpers for the simulation suites.

use ccsim::prelude::*;
use ccsim::TransactionReport;

/// Run `trace` under `algorithm` with default options
pub fn run(algorithm: Algorithm, trace: &str) -> StatusReport {
    Simulation::with_algorithm(algorithm)
        .run_text(trace)
        .expect("simulation should succeed")
}

/// Report entry for `id`
pub fn txn<'a>(report: &'a StatusReport, id: &str) -> &'a TransactionReport {
    report
        .transaction(id)
        .unwrap_or_else(|| panic!("transaction {} missing from report", id))
}

/// Assert the final status of every listed transaction
pub fn assert_statuses(report: &StatusReport, expected: &[(&str, TransactionStatus)]) {
    for (id, status) in expected {
        assert_eq!(txn(report, id).status, *status, "status of {}", id);
    }
}

/// Write `trace` to a file named `name` inside a fresh temp dir
pub fn trace_file(name: &str, trace: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, trace).expect("write trace");
    (dir, path)
}
