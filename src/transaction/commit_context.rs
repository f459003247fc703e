// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::types::CommitId;

/// One node in the commit-ordering chain, owning a future commit id for one
/// transaction.
///
/// Contexts are allocated in commit-request order and linked forward; each
/// holds the id one above its predecessor. The `pending` flag flips once
/// the owning transaction has finished stamping its rows, which is what
/// allows the manager to publish the id, strictly in chain order.
pub struct CommitContext {
    commit_id: CommitId,
    pending: AtomicBool,
    next: OnceLock<Arc<CommitContext>>,
}

impl CommitContext {
    pub(crate) fn new(commit_id: CommitId) -> Self {
        Self {
            commit_id,
            pending: AtomicBool::new(false),
            next: OnceLock::new(),
        }
    }

    pub fn commit_id(&self) -> CommitId {
        self.commit_id
    }

    /// Whether the owning transaction has finished writing and awaits
    /// publication.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn make_pending(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// The successor context, created on first demand. Concurrent callers
    /// get the same node, keeping commit ids gapless.
    pub(crate) fn get_or_create_next(&self) -> Arc<CommitContext> {
        self.next
            .get_or_init(|| Arc::new(CommitContext::new(self.commit_id + 1)))
            .clone()
    }

    pub(crate) fn next(&self) -> Option<Arc<CommitContext>> {
        self.next.get().cloned()
    }
}

impl std::fmt::Debug for CommitContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitContext")
            .field("commit_id", &self.commit_id)
            .field("pending", &self.is_pending())
            .finish()
    }
}
