// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use super::{CommitContext, TransactionContext};
use crate::types::{CommitId, INITIAL_COMMIT_ID, INITIAL_TRANSACTION_ID};

/// Hands out transaction and commit ids and tracks global visibility.
///
/// `last_commit_id` is the commit id of the latest transaction whose
/// changes are globally visible. A new transaction snapshots it and
/// registers the snapshot in the active multiset, which gates garbage
/// collection of obsoleted row versions.
///
/// The manager is an explicitly constructed service: create one per
/// process (or per test) and share it behind an [`Arc`]; its lifetime
/// brackets all transactions.
pub struct TransactionManager {
    next_transaction_id: AtomicU32,
    last_commit_id: AtomicU32,
    /// Tail of the commit-context chain; the next commit request links
    /// behind it.
    last_commit_context: Mutex<Option<Arc<CommitContext>>>,
    /// Multiset of snapshot commit ids held by unfinished transactions.
    active_snapshot_commit_ids: Mutex<BTreeMap<CommitId, usize>>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_transaction_id: AtomicU32::new(INITIAL_TRANSACTION_ID),
            last_commit_id: AtomicU32::new(INITIAL_COMMIT_ID - 1),
            last_commit_context: Mutex::new(None),
            active_snapshot_commit_ids: Mutex::new(BTreeMap::new()),
        }
    }

    /// Start a transaction: a fresh transaction id plus a snapshot of the
    /// current last commit id.
    pub fn new_transaction_context(
        self: &Arc<Self>,
        is_auto_commit: bool,
    ) -> TransactionContext {
        let transaction_id = self.next_transaction_id.fetch_add(1, Ordering::Relaxed);
        let snapshot_commit_id = self.last_commit_id();
        self.register_transaction(snapshot_commit_id);
        TransactionContext::new(
            transaction_id,
            snapshot_commit_id,
            is_auto_commit,
            self.clone(),
        )
    }

    /// The commit id of the last globally visible commit.
    pub fn last_commit_id(&self) -> CommitId {
        self.last_commit_id.load(Ordering::Acquire)
    }

    /// The minimum snapshot commit id still held by an active transaction,
    /// or `None` when no transaction is running. Row versions obsoleted at
    /// or before this id are observable by nobody and may be cleaned up.
    pub fn lowest_active_snapshot_commit_id(&self) -> Option<CommitId> {
        self.active_snapshot_commit_ids
            .lock()
            .keys()
            .next()
            .copied()
    }

    /// Issue the next commit context, chained behind the previous one so
    /// commit ids stay gapless and ordered.
    pub(crate) fn new_commit_context(&self) -> Arc<CommitContext> {
        let mut last = self.last_commit_context.lock();
        let context = match last.as_ref() {
            Some(context) => context.get_or_create_next(),
            None => Arc::new(CommitContext::new(self.last_commit_id() + 1)),
        };
        *last = Some(context.clone());
        context
    }

    /// Advance `last_commit_id` over every leading pending context of the
    /// chain. Each step only succeeds from the direct predecessor's id, so
    /// a context whose predecessor is still writing stays unpublished until
    /// the predecessor's own walk picks it up.
    pub(crate) fn try_increment_last_commit_id(&self, context: &Arc<CommitContext>) {
        let mut context = context.clone();
        while context.is_pending() {
            let expected = context.commit_id() - 1;
            if self
                .last_commit_id
                .compare_exchange(
                    expected,
                    context.commit_id(),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
            {
                return;
            }
            trace!(commit_id = context.commit_id(), "commit published");
            match context.next() {
                Some(next) => context = next,
                None => return,
            }
        }
    }

    pub(crate) fn register_transaction(&self, snapshot_commit_id: CommitId) {
        *self
            .active_snapshot_commit_ids
            .lock()
            .entry(snapshot_commit_id)
            .or_insert(0) += 1;
    }

    pub(crate) fn deregister_transaction(&self, snapshot_commit_id: CommitId) {
        let mut active = self.active_snapshot_commit_ids.lock();
        match active.get_mut(&snapshot_commit_id) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                active.remove(&snapshot_commit_id);
            }
            None => debug_assert!(false, "snapshot commit id not registered"),
        }
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
