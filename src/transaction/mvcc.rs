// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::{
    ChunkOffset, CommitId, TransactionId, INVALID_TRANSACTION_ID, MAX_COMMIT_ID,
};

/// Per-row MVCC metadata of one chunk.
///
/// Rows loaded as initial data are created with
/// [`UNSET_COMMIT_ID`](crate::types::UNSET_COMMIT_ID), visible to every
/// snapshot. Rows reserved for inserts are created with [`MAX_COMMIT_ID`]
/// and become visible once their transaction commits and stamps the real
/// begin cid.
pub struct MvccData {
    begin_cids: Vec<AtomicU32>,
    end_cids: Vec<AtomicU32>,
    tids: Vec<AtomicU32>,
}

impl MvccData {
    pub fn new(size: usize, begin_cid: CommitId) -> Self {
        Self {
            begin_cids: (0..size).map(|_| AtomicU32::new(begin_cid)).collect(),
            end_cids: (0..size).map(|_| AtomicU32::new(MAX_COMMIT_ID)).collect(),
            tids: (0..size)
                .map(|_| AtomicU32::new(INVALID_TRANSACTION_ID))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.begin_cids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.begin_cids.is_empty()
    }

    pub fn begin_cid(&self, row: ChunkOffset) -> CommitId {
        self.begin_cids[row as usize].load(Ordering::Acquire)
    }

    pub fn end_cid(&self, row: ChunkOffset) -> CommitId {
        self.end_cids[row as usize].load(Ordering::Acquire)
    }

    pub fn tid(&self, row: ChunkOffset) -> TransactionId {
        self.tids[row as usize].load(Ordering::Acquire)
    }

    pub(crate) fn set_begin_cid(&self, row: ChunkOffset, commit_id: CommitId) {
        self.begin_cids[row as usize].store(commit_id, Ordering::Release);
    }

    pub(crate) fn set_end_cid(&self, row: ChunkOffset, commit_id: CommitId) {
        self.end_cids[row as usize].store(commit_id, Ordering::Release);
    }

    pub(crate) fn set_tid(&self, row: ChunkOffset, tid: TransactionId) {
        self.tids[row as usize].store(tid, Ordering::Release);
    }

    /// The row lock: atomically claim the row for `tid` if `expected`
    /// currently holds it. On failure returns the actual holder.
    pub(crate) fn compare_exchange_tid(
        &self,
        row: ChunkOffset,
        expected: TransactionId,
        tid: TransactionId,
    ) -> Result<(), TransactionId> {
        self.tids[row as usize]
            .compare_exchange(expected, tid, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }
}

impl std::fmt::Debug for MvccData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MvccData").field("len", &self.len()).finish()
    }
}

/// The snapshot-isolation visibility predicate.
///
/// A row is visible to a reader either as its own in-flight insert (begin
/// and end cid both still unstamped) or as a past insert committed at or
/// before the snapshot and not deleted at or before it. A row the reader
/// has locked for deletion carries the reader's tid with a stamped begin
/// cid, so it falls out of both arms and disappears for the reader
/// immediately.
pub fn is_row_visible(
    our_tid: TransactionId,
    snapshot_commit_id: CommitId,
    row_tid: TransactionId,
    begin_cid: CommitId,
    end_cid: CommitId,
) -> bool {
    let own_insert =
        row_tid == our_tid && begin_cid > snapshot_commit_id && end_cid > snapshot_commit_id;
    let past_insert =
        row_tid != our_tid && begin_cid <= snapshot_commit_id && end_cid > snapshot_commit_id;
    own_insert || past_insert
}
