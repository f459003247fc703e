// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

//! MVCC transaction management.
//!
//! Every chunk carries per-row [`MvccData`]: the commit id that created the
//! row (`begin_cid`), the commit id that deleted it (`end_cid`) and the id
//! of the transaction currently holding it (`tid`). Read-write operations
//! mark rows through a [`TransactionContext`]; scans filter rows through
//! the visibility predicate against the context's snapshot commit id.
//!
//! The [`TransactionManager`] hands out monotonically increasing
//! transaction and commit ids and chains [`CommitContext`]s so commits
//! become globally visible in the order their commit ids were assigned,
//! not the order they finished writing.

mod commit_context;
mod context;
mod manager;
mod mvcc;

pub use commit_context::*;
pub use context::*;
pub use manager::*;
pub use mvcc::*;
