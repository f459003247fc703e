// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use std::collections::{BTreeSet, HashMap};

use super::StringDictionarySegment;
use crate::storage::{CompressedVector, StorageResult, TracedStorageError, ValueSegment};

/// Freeze a mutable value segment into an immutable dictionary segment.
///
/// The distinct non-null values are sorted lexically and concatenated
/// NUL-terminated into the blob; the offset table records where each one
/// starts, so it is strictly increasing in the byte-wise order of the
/// strings it names. Each row then stores its value's blob offset, or the
/// blob length for nulls, compressed against the blob length so the null
/// sentinel always fits.
pub fn encode_segment(segment: &ValueSegment) -> StorageResult<StringDictionarySegment> {
    let distinct: BTreeSet<&str> = segment.iter().flatten().collect();
    if distinct.len() >= u32::MAX as usize {
        return Err(TracedStorageError::invalid_argument(
            "too many distinct values for one segment",
        ));
    }

    let blob_size: usize = distinct.iter().map(|value| value.len() + 1).sum();
    if blob_size > u32::MAX as usize {
        return Err(TracedStorageError::invalid_argument(
            "dictionary blob exceeds 4 GiB",
        ));
    }

    let mut dictionary = Vec::with_capacity(blob_size);
    let mut offset_vector = Vec::with_capacity(distinct.len());
    let mut value_offsets = HashMap::with_capacity(distinct.len());
    for value in &distinct {
        let offset = dictionary.len() as u32;
        offset_vector.push(offset);
        value_offsets.insert(*value, offset);
        dictionary.extend_from_slice(value.as_bytes());
        dictionary.push(b'\0');
    }

    let null_offset = dictionary.len() as u32;
    let row_offsets = segment
        .iter()
        .map(|row| match row {
            Some(value) => value_offsets[value],
            None => null_offset,
        })
        .collect::<Vec<_>>();
    let attribute_vector = CompressedVector::compress(&row_offsets, Some(null_offset));

    StringDictionarySegment::new(dictionary, attribute_vector, offset_vector)
}
