// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

//! Identifier types and sentinels shared across the storage and transaction
//! layers.

/// Position of a row within a chunk.
pub type ChunkOffset = u32;

/// Index into a dictionary segment's offset table. The number of unique
/// values `U` doubles as the null value id of a segment, so a `ValueId`
/// ranges over `[0, U]`.
pub type ValueId = u32;

/// Position of a column within a chunk.
pub type ColumnId = u32;

/// Commit ids order transactions globally. A row is stamped with the commit
/// id of the transaction that inserted (`begin_cid`) or deleted (`end_cid`)
/// it.
pub type CommitId = u32;

/// Transaction ids are handed out monotonically and never reused.
pub type TransactionId = u32;

/// Returned by `lower_bound`/`upper_bound` when no stored value qualifies.
/// Never appears as a stored id: segments reject dictionaries of
/// `u32::MAX` or more entries at construction.
pub const INVALID_VALUE_ID: ValueId = ValueId::MAX;

/// Commit id of rows loaded as initial data, "there from the beginning of
/// time". Also the snapshot of a transaction started before any commit.
pub const UNSET_COMMIT_ID: CommitId = 0;

/// The first commit id handed to a transaction.
pub const INITIAL_COMMIT_ID: CommitId = 1;

/// Begin/end commit id of rows whose inserting or deleting transaction has
/// not committed yet. The top value is left unused so `MAX_COMMIT_ID` can
/// never be assigned by the commit pipeline.
pub const MAX_COMMIT_ID: CommitId = CommitId::MAX - 1;

/// Transaction id meaning "no transaction holds this row".
pub const INVALID_TRANSACTION_ID: TransactionId = 0;

/// The first transaction id handed out by the manager.
pub const INITIAL_TRANSACTION_ID: TransactionId = 1;

/// Why a transaction was rolled back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollbackReason {
    /// Explicit ROLLBACK issued by the user.
    User,
    /// A read-write operation observed a conflicting row mark.
    Conflict,
    /// The client went away mid-transaction.
    ClientDisconnect,
}
