//! Backward validation for optimistic transactions
//!
//! Validation and write phase are serial: a committer is checked against
//! every transaction that finished its write phase after the committer
//! started. The committer fails if one of those wrote anything the
//! committer read or wrote. Checking the committer's own writes makes blind
//! write-write overlaps first-committer-wins.

use ccsim_core::{Timestamp, TxnId};

use crate::engine::Conflict;
use crate::snapshot::{FinishedWindow, Workspace};

/// Validate `txn`, whose current attempt started at `start`
///
/// A transaction with no workspace, or an empty one, is trivially valid.
pub fn validate(
    txn: &TxnId,
    start: Timestamp,
    workspace: Option<&Workspace>,
    finished: &[FinishedWindow],
) -> Result<(), Conflict> {
    let Some(workspace) = workspace.filter(|ws| !ws.is_empty()) else {
        return Ok(());
    };
    let accessed = workspace.access_set();

    for window in finished {
        if &window.txn == txn || window.finish <= start {
            continue;
        }
        let mut overlap: Vec<_> = window
            .write_set
            .iter()
            .filter(|key| accessed.contains(key.as_str()))
            .cloned()
            .collect();
        if !overlap.is_empty() {
            overlap.sort();
            return Err(Conflict::FailedValidation {
                against: window.txn.clone(),
                resources: overlap,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotStore;
    use ccsim_core::ResourceStore;

    fn window(id: &str, start: u64, finish: u64, writes: &[&str]) -> FinishedWindow {
        FinishedWindow {
            txn: TxnId::new(id),
            start: Timestamp::new(start),
            finish: Timestamp::new(finish),
            write_set: writes.iter().map(|w| w.to_string()).collect(),
        }
    }

    #[test]
    fn test_empty_workspace_is_valid() {
        let finished = vec![window("T1", 1, 9, &["X"])];
        let t2 = TxnId::new("T2");
        assert!(validate(&t2, Timestamp::new(2), None, &finished).is_ok());

        let snapshots = SnapshotStore::new();
        assert!(validate(&t2, Timestamp::new(2), snapshots.workspace(&t2), &finished).is_ok());
    }

    #[test]
    fn test_read_of_concurrently_written_resource_fails() {
        let mut base = ResourceStore::new();
        let mut snapshots = SnapshotStore::new();
        let t2 = TxnId::new("T2");
        snapshots.read(&t2, "X", &mut base);
        snapshots.read(&t2, "Y", &mut base);

        let finished = vec![window("T1", 1, 5, &["Y", "Z"])];
        let err = validate(&t2, Timestamp::new(2), snapshots.workspace(&t2), &finished).unwrap_err();
        assert_eq!(
            err,
            Conflict::FailedValidation {
                against: TxnId::new("T1"),
                resources: vec!["Y".to_string()],
            }
        );
    }

    #[test]
    fn test_blind_write_overlap_fails() {
        let mut snapshots = SnapshotStore::new();
        let t2 = TxnId::new("T2");
        snapshots.write(&t2, "X", 2);

        let finished = vec![window("T1", 1, 4, &["X"])];
        assert!(validate(&t2, Timestamp::new(2), snapshots.workspace(&t2), &finished).is_err());
    }

    #[test]
    fn test_windows_finished_before_start_are_ignored() {
        let mut base = ResourceStore::new();
        let mut snapshots = SnapshotStore::new();
        let t2 = TxnId::new("T2");
        snapshots.read(&t2, "X", &mut base);

        let finished = vec![window("T1", 1, 4, &["X"])];
        assert!(validate(&t2, Timestamp::new(6), snapshots.workspace(&t2), &finished).is_ok());
    }

    #[test]
    fn test_disjoint_sets_pass() {
        let mut base = ResourceStore::new();
        let mut snapshots = SnapshotStore::new();
        let t2 = TxnId::new("T2");
        snapshots.read(&t2, "A", &mut base);
        snapshots.write(&t2, "B", 1);

        let finished = vec![window("T1", 1, 9, &["C"])];
        assert!(validate(&t2, Timestamp::new(2), snapshots.workspace(&t2), &finished).is_ok());
    }
}
