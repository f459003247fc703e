// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use bitvec::prelude::BitVec;

/// A mutable, append-only string column: the raw form rows take before the
/// encoder freezes them into a dictionary segment.
///
/// Nulls are modeled by a parallel validity bitmap; the value slot of a
/// null row is an empty string and never read back.
pub struct ValueSegment {
    values: Vec<String>,
    valid: BitVec,
    nullable: bool,
}

impl ValueSegment {
    pub fn new(nullable: bool) -> Self {
        Self {
            values: vec![],
            valid: BitVec::new(),
            nullable,
        }
    }

    /// Append one row. Panics when a null is appended to a non-nullable
    /// segment.
    pub fn append(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.values.push(value.to_string());
                self.valid.push(true);
            }
            None => {
                assert!(
                    self.nullable,
                    "null value appended to non-nullable segment"
                );
                self.values.push(String::new());
                self.valid.push(false);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn get(&self, row: usize) -> Option<&str> {
        if self.valid[row] {
            Some(&self.values[row])
        } else {
            None
        }
    }

    pub fn is_null(&self, row: usize) -> bool {
        !self.valid[row]
    }

    /// Iterate all rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        (0..self.len()).map(move |row| self.get(row))
    }
}
