// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

//! End-to-end scenarios across the encoder, chunk assembly and the MVCC
//! visibility gate.

use std::sync::Arc;

use itertools::Itertools;

use super::{encode_segment, Chunk, ValueSegment};
use crate::transaction::{MvccData, TransactionManager};
use crate::types::{RollbackReason, MAX_COMMIT_ID, UNSET_COMMIT_ID};

fn encoded(values: &[&str]) -> Arc<super::StringDictionarySegment> {
    let mut segment = ValueSegment::new(false);
    for value in values {
        segment.append(Some(value));
    }
    Arc::new(encode_segment(&segment).unwrap())
}

#[test]
fn test_scan_through_visibility_gate() {
    let segment = encoded(&["Bill", "Steve", "Alexander", "Steve", "Hasso", "Bill"]);

    // Rows 0..4 are initial data; rows 4 and 5 are reserved for inserts
    // and carry data that is not yet visible.
    let mvcc = Arc::new(MvccData::new(6, UNSET_COMMIT_ID));
    mvcc.set_begin_cid(4, MAX_COMMIT_ID);
    mvcc.set_begin_cid(5, MAX_COMMIT_ID);
    let chunk = Chunk::new(vec![segment], mvcc.clone());

    let manager = Arc::new(TransactionManager::new());
    let scanner = manager.new_transaction_context(false);
    assert_eq!(chunk.visible_row_offsets(&scanner), [0, 1, 2, 3]);
    let values = chunk
        .visible_row_offsets(&scanner)
        .into_iter()
        .map(|row| chunk.segment(0).get(row).unwrap())
        .collect_vec();
    assert_eq!(values, ["Bill", "Steve", "Alexander", "Steve"]);
    scanner.commit().unwrap();
}

#[test]
fn test_insert_conflict_and_commit() {
    let segment = encoded(&["Bill", "Steve", "Hasso"]);
    let mvcc = Arc::new(MvccData::new(3, UNSET_COMMIT_ID));
    // Row 2 is a reserved slot a transaction will fill.
    mvcc.set_begin_cid(2, MAX_COMMIT_ID);
    let chunk = Chunk::new(vec![segment], mvcc.clone());

    let manager = Arc::new(TransactionManager::new());

    let writer = manager.new_transaction_context(false);
    writer.insert_row(&mvcc, 2).unwrap();
    assert_eq!(chunk.visible_row_offsets(&writer), [0, 1, 2]);

    // A concurrent transaction neither sees the row nor may touch it.
    let rival = manager.new_transaction_context(false);
    assert_eq!(chunk.visible_row_offsets(&rival), [0, 1]);
    assert!(rival.delete_row(&mvcc, 2).is_err());
    rival.rollback(RollbackReason::Conflict);

    let commit_id = writer.commit().unwrap();

    // Transactions with a snapshot at or past the commit see the row.
    let late = manager.new_transaction_context(false);
    assert!(late.snapshot_commit_id() >= commit_id);
    assert_eq!(chunk.visible_row_offsets(&late), [0, 1, 2]);
    assert_eq!(chunk.segment(0).get(2), Some("Hasso"));
}

#[test]
fn test_delete_shrinks_later_scans() {
    let segment = encoded(&["Bill", "Steve", "Hasso"]);
    let mvcc = Arc::new(MvccData::new(3, UNSET_COMMIT_ID));
    let chunk = Chunk::new(vec![segment], mvcc.clone());

    let manager = Arc::new(TransactionManager::new());

    let deleter = manager.new_transaction_context(false);
    let holdout = manager.new_transaction_context(false);
    deleter.delete_row(&mvcc, 1).unwrap();
    assert_eq!(chunk.visible_row_offsets(&deleter), [0, 2]);
    deleter.commit().unwrap();

    // The older snapshot keeps the full view until it ends.
    assert_eq!(chunk.visible_row_offsets(&holdout), [0, 1, 2]);
    assert_eq!(
        manager.lowest_active_snapshot_commit_id(),
        Some(holdout.snapshot_commit_id())
    );
    holdout.commit().unwrap();

    let late = manager.new_transaction_context(false);
    assert_eq!(chunk.visible_row_offsets(&late), [0, 2]);
    // With the holdout gone, cleanup may reclaim versions up to the new
    // lowest snapshot.
    assert_eq!(
        manager.lowest_active_snapshot_commit_id(),
        Some(late.snapshot_commit_id())
    );
}

#[test]
fn test_multi_column_chunk() {
    let names = encoded(&["Bill", "Steve"]);
    let cities = encoded(&["Seattle", "Palo Alto"]);
    let mvcc = Arc::new(MvccData::new(2, UNSET_COMMIT_ID));
    let chunk = Chunk::new(vec![names, cities], mvcc);

    assert_eq!(chunk.column_count(), 2);
    assert_eq!(chunk.segment(1).get(1), Some("Palo Alto"));

    let manager = Arc::new(TransactionManager::new());
    let scanner = manager.new_transaction_context(true);
    assert_eq!(chunk.visible_row_offsets(&scanner), [0, 1]);
}
