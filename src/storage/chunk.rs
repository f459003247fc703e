// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use std::sync::Arc;

use super::StringDictionarySegment;
use crate::transaction::{MvccData, TransactionContext};
use crate::types::{ChunkOffset, ColumnId};

/// A horizontal partition of a table: one immutable segment per column
/// plus the MVCC metadata shared by all of them.
///
/// The chunk itself carries no visibility logic beyond
/// [`Chunk::visible_row_offsets`]; scan operators apply that gate first and
/// then read segment values positionally.
pub struct Chunk {
    segments: Vec<Arc<StringDictionarySegment>>,
    mvcc_data: Arc<MvccData>,
}

impl Chunk {
    /// Assemble a chunk. All segments and the MVCC metadata must agree on
    /// the row count.
    pub fn new(segments: Vec<Arc<StringDictionarySegment>>, mvcc_data: Arc<MvccData>) -> Self {
        for segment in &segments {
            assert_eq!(
                segment.size() as usize,
                mvcc_data.len(),
                "segment and MVCC row counts differ"
            );
        }
        Self {
            segments,
            mvcc_data,
        }
    }

    /// Number of rows.
    pub fn size(&self) -> ChunkOffset {
        self.mvcc_data.len() as ChunkOffset
    }

    pub fn column_count(&self) -> ColumnId {
        self.segments.len() as ColumnId
    }

    pub fn segment(&self, column_id: ColumnId) -> &Arc<StringDictionarySegment> {
        &self.segments[column_id as usize]
    }

    pub fn mvcc_data(&self) -> &Arc<MvccData> {
        &self.mvcc_data
    }

    /// The visibility gate: the offsets of all rows the transaction may
    /// see, in position order.
    pub fn visible_row_offsets(&self, context: &TransactionContext) -> Vec<ChunkOffset> {
        (0..self.size())
            .filter(|&row| context.is_row_visible(&self.mvcc_data, row))
            .collect()
    }
}
