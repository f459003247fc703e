// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{is_row_visible, MvccData, TransactionManager};
use crate::storage::{StorageResult, TracedStorageError};
use crate::types::{
    ChunkOffset, CommitId, RollbackReason, TransactionId, INVALID_TRANSACTION_ID, MAX_COMMIT_ID,
};

/// Lifecycle of a [`TransactionContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionPhase {
    /// Accepting read-write operations.
    Active,
    /// A read-write operation failed; the only way out is rollback.
    Conflicted,
    /// Commit requested, rows being stamped.
    Committing,
    Committed,
    RolledBackByUser,
    RolledBackAfterConflict,
}

enum WriteRecordKind {
    Insert,
    Delete,
}

/// One row mark taken by this transaction, kept in program order so commit
/// stamps forward and rollback unwinds in reverse.
struct WriteRecord {
    mvcc: Arc<MvccData>,
    row: ChunkOffset,
    kind: WriteRecordKind,
}

/// Everything one transaction needs: its id, the snapshot commit id taken
/// at start, and the row marks it must stamp or unwind at the end.
///
/// Contexts are handed out by
/// [`TransactionManager::new_transaction_context`] and must end in exactly
/// one `commit` or `rollback`; a context dropped while still active rolls
/// itself back.
pub struct TransactionContext {
    transaction_id: TransactionId,
    snapshot_commit_id: CommitId,
    is_auto_commit: bool,
    phase: Mutex<TransactionPhase>,
    write_set: Mutex<Vec<WriteRecord>>,
    manager: Arc<TransactionManager>,
}

impl TransactionContext {
    pub(crate) fn new(
        transaction_id: TransactionId,
        snapshot_commit_id: CommitId,
        is_auto_commit: bool,
        manager: Arc<TransactionManager>,
    ) -> Self {
        Self {
            transaction_id,
            snapshot_commit_id,
            is_auto_commit,
            phase: Mutex::new(TransactionPhase::Active),
            write_set: Mutex::new(vec![]),
            manager,
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// The commit id this transaction observed when it began; bounds its
    /// visibility.
    pub fn snapshot_commit_id(&self) -> CommitId {
        self.snapshot_commit_id
    }

    /// Whether the transaction was opened implicitly (per statement) rather
    /// than through an explicit BEGIN. The pipeline uses this to commit on
    /// statement completion.
    pub fn is_auto_commit(&self) -> bool {
        self.is_auto_commit
    }

    pub fn phase(&self) -> TransactionPhase {
        *self.phase.lock()
    }

    /// Whether `row` of a chunk is visible to this transaction.
    pub fn is_row_visible(&self, mvcc: &MvccData, row: ChunkOffset) -> bool {
        is_row_visible(
            self.transaction_id,
            self.snapshot_commit_id,
            mvcc.tid(row),
            mvcc.begin_cid(row),
            mvcc.end_cid(row),
        )
    }

    /// Claim a freshly reserved row for an insert. The row becomes visible
    /// to this transaction immediately and to others once committed.
    pub fn insert_row(&self, mvcc: &Arc<MvccData>, row: ChunkOffset) -> StorageResult<()> {
        debug_assert_eq!(self.phase(), TransactionPhase::Active);
        match mvcc.compare_exchange_tid(row, INVALID_TRANSACTION_ID, self.transaction_id) {
            Ok(()) => {
                self.write_set.lock().push(WriteRecord {
                    mvcc: mvcc.clone(),
                    row,
                    kind: WriteRecordKind::Insert,
                });
                Ok(())
            }
            Err(holder) => Err(self.conflict(holder)),
        }
    }

    /// Mark `row` for deletion. Fails with a write-write conflict when the
    /// row is already deleted or locked by another transaction; rows this
    /// transaction inserted itself may be deleted.
    pub fn delete_row(&self, mvcc: &Arc<MvccData>, row: ChunkOffset) -> StorageResult<()> {
        debug_assert_eq!(self.phase(), TransactionPhase::Active);
        if mvcc.end_cid(row) != MAX_COMMIT_ID {
            return Err(self.conflict(mvcc.tid(row)));
        }
        match mvcc.compare_exchange_tid(row, INVALID_TRANSACTION_ID, self.transaction_id) {
            Ok(()) => {}
            // Already ours: deleting a row we inserted in this transaction.
            Err(holder) if holder == self.transaction_id => {}
            Err(holder) => return Err(self.conflict(holder)),
        }
        self.write_set.lock().push(WriteRecord {
            mvcc: mvcc.clone(),
            row,
            kind: WriteRecordKind::Delete,
        });
        Ok(())
    }

    /// Stamp all row marks with a fresh commit id and hand the id to the
    /// commit pipeline. The id becomes globally visible once every earlier
    /// commit context has finished, regardless of who finished writing
    /// first.
    ///
    /// Panics when called on a conflicted or finished transaction; a
    /// conflicted transaction must roll back.
    pub fn commit(&self) -> StorageResult<CommitId> {
        {
            let mut phase = self.phase.lock();
            assert_eq!(
                *phase,
                TransactionPhase::Active,
                "commit on a {:?} transaction",
                *phase
            );
            *phase = TransactionPhase::Committing;
        }

        let commit_context = self.manager.new_commit_context();
        let commit_id = commit_context.commit_id();

        let write_set = std::mem::take(&mut *self.write_set.lock());
        for record in &write_set {
            match record.kind {
                WriteRecordKind::Insert => {
                    record.mvcc.set_begin_cid(record.row, commit_id);
                    record.mvcc.set_tid(record.row, INVALID_TRANSACTION_ID);
                }
                WriteRecordKind::Delete => {
                    record.mvcc.set_end_cid(record.row, commit_id);
                }
            }
        }

        commit_context.make_pending();
        self.manager.try_increment_last_commit_id(&commit_context);
        self.manager.deregister_transaction(self.snapshot_commit_id);
        *self.phase.lock() = TransactionPhase::Committed;
        Ok(commit_id)
    }

    /// Unwind all row marks in reverse program order and end the
    /// transaction without a commit id.
    pub fn rollback(&self, reason: RollbackReason) {
        {
            let mut phase = self.phase.lock();
            assert!(
                matches!(
                    *phase,
                    TransactionPhase::Active | TransactionPhase::Conflicted
                ),
                "rollback on a {:?} transaction",
                *phase
            );
            *phase = match reason {
                RollbackReason::Conflict => TransactionPhase::RolledBackAfterConflict,
                _ => TransactionPhase::RolledBackByUser,
            };
        }

        let write_set = std::mem::take(&mut *self.write_set.lock());
        for record in write_set.iter().rev() {
            match record.kind {
                WriteRecordKind::Insert => {
                    // The row keeps its unstamped begin cid, so it stays
                    // invisible to everyone once the lock is released.
                    record.mvcc.set_tid(record.row, INVALID_TRANSACTION_ID);
                }
                WriteRecordKind::Delete => {
                    record.mvcc.set_tid(record.row, INVALID_TRANSACTION_ID);
                }
            }
        }

        self.manager.deregister_transaction(self.snapshot_commit_id);
        debug!(
            transaction_id = self.transaction_id,
            ?reason,
            "transaction rolled back"
        );
    }

    fn conflict(&self, holder: TransactionId) -> TracedStorageError {
        *self.phase.lock() = TransactionPhase::Conflicted;
        TracedStorageError::write_conflict(holder)
    }
}

impl Drop for TransactionContext {
    fn drop(&mut self) {
        let phase = self.phase();
        match phase {
            TransactionPhase::Active => self.rollback(RollbackReason::User),
            TransactionPhase::Conflicted => self.rollback(RollbackReason::Conflict),
            _ => {}
        }
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("transaction_id", &self.transaction_id)
            .field("snapshot_commit_id", &self.snapshot_commit_id)
            .field("phase", &self.phase())
            .finish()
    }
}
