// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::{Buf, BufMut};

use super::VariableStringVector;
use crate::storage::{
    CompressedVector, CompressedVectorType, StorageResult, TracedStorageError,
};
use crate::types::{ChunkOffset, ValueId, INVALID_VALUE_ID};

/// An immutable string column with variable-width dictionary encoding.
///
/// Three artifacts make up a segment:
///
/// * the *dictionary blob*: every distinct string, NUL-terminated, laid out
///   back to back in lexical order;
/// * the *offset table*: one blob offset per distinct string, sorted by the
///   string it names;
/// * the *attribute vector*: one blob offset per row, bit-packed as a
///   [`CompressedVector`]. Null rows store the blob length, which can never
///   collide with a real offset.
///
/// A second, value-id flavored attribute vector (null = number of distinct
/// values) is materialized lazily on first request and cached.
#[derive(Clone, Debug)]
pub struct StringDictionarySegment {
    dictionary: Vec<u8>,
    attribute_vector: CompressedVector,
    offset_vector: Vec<u32>,
    value_id_vector: OnceLock<CompressedVector>,
}

impl StringDictionarySegment {
    /// Assemble a segment from its three artifacts. The attribute vector is
    /// in offset form, as produced by [`super::encode_segment`].
    pub fn new(
        dictionary: Vec<u8>,
        attribute_vector: CompressedVector,
        offset_vector: Vec<u32>,
    ) -> StorageResult<Self> {
        // NULL is represented by the offset table size, and u32::MAX is
        // reserved for INVALID_VALUE_ID ("not found"). Both must stay
        // distinguishable from stored ids.
        if offset_vector.len() >= INVALID_VALUE_ID as usize {
            return Err(TracedStorageError::invalid_argument("input segment too big"));
        }
        Ok(Self {
            dictionary,
            attribute_vector,
            offset_vector,
            value_id_vector: OnceLock::new(),
        })
    }

    /// Number of rows.
    pub fn size(&self) -> ChunkOffset {
        self.attribute_vector.len() as ChunkOffset
    }

    /// Value of one row; `None` is NULL.
    pub fn get(&self, chunk_offset: ChunkOffset) -> Option<&str> {
        debug_assert!(chunk_offset < self.size(), "chunk offset out of bounds");
        let offset = self.attribute_vector.get(chunk_offset as usize);
        if offset == self.null_offset() {
            None
        } else {
            Some(self.string_at(offset))
        }
    }

    /// The dictionary string a non-null value id names. Panics on the null
    /// value id; use [`Self::value_of_value_id`] for a null-aware lookup.
    pub fn typed_value_of_value_id(&self, value_id: ValueId) -> &str {
        debug_assert!(value_id < self.unique_values_count(), "value id out of bounds");
        self.string_at(self.offset_vector[value_id as usize])
    }

    pub fn value_of_value_id(&self, value_id: ValueId) -> Option<&str> {
        if value_id == self.null_value_id() {
            None
        } else {
            Some(self.typed_value_of_value_id(value_id))
        }
    }

    /// The value id standing in for NULL, one past the largest real id.
    pub fn null_value_id(&self) -> ValueId {
        self.offset_vector.len() as ValueId
    }

    pub fn unique_values_count(&self) -> u32 {
        self.offset_vector.len() as u32
    }

    /// Least value id whose string is `>= value`, or [`INVALID_VALUE_ID`]
    /// when every stored string compares less.
    pub fn lower_bound(&self, value: &str) -> ValueId {
        let index = self
            .offset_vector
            .partition_point(|&offset| self.string_at(offset) < value);
        if index == self.offset_vector.len() {
            INVALID_VALUE_ID
        } else {
            index as ValueId
        }
    }

    /// Least value id whose string is `> value`, or [`INVALID_VALUE_ID`].
    pub fn upper_bound(&self, value: &str) -> ValueId {
        let index = self
            .offset_vector
            .partition_point(|&offset| self.string_at(offset) <= value);
        if index == self.offset_vector.len() {
            INVALID_VALUE_ID
        } else {
            index as ValueId
        }
    }

    /// The attribute vector in offset form, as built by the encoder.
    pub fn attribute_vector_offsets(&self) -> &CompressedVector {
        &self.attribute_vector
    }

    /// The attribute vector in value-id form, materialized on first call
    /// and cached. Concurrent callers observe the same vector.
    pub fn attribute_vector(&self) -> &CompressedVector {
        self.value_id_vector
            .get_or_init(|| self.materialize_value_ids())
    }

    /// The raw dictionary blob.
    pub fn dictionary(&self) -> &[u8] {
        &self.dictionary
    }

    pub fn offset_vector(&self) -> &[u32] {
        &self.offset_vector
    }

    /// Iterable view over the distinct values in dictionary order.
    pub fn variable_string_dictionary(&self) -> VariableStringVector<'_> {
        VariableStringVector::new(&self.dictionary, self.offset_vector.len())
    }

    pub fn compressed_vector_type(&self) -> CompressedVectorType {
        self.attribute_vector.vector_type()
    }

    /// Bytes held by this segment: both attribute vectors (the value-id one
    /// only once materialized), the blob and the offset table.
    pub fn memory_usage(&self) -> usize {
        let value_id_vector_size = self
            .value_id_vector
            .get()
            .map_or(0, |vector| vector.data_size());
        self.attribute_vector.data_size()
            + self.dictionary.capacity()
            + self.offset_vector.capacity() * std::mem::size_of::<u32>()
            + value_id_vector_size
    }

    /// Serialize as
    /// `| rows (u32) | unique (u32) | blob_len (u32) | blob | offsets | attribute vector |`,
    /// all integers little-endian. The value-id vector is derived and never
    /// serialized.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(self.size());
        buf.put_u32_le(self.unique_values_count());
        buf.put_u32_le(self.dictionary.len() as u32);
        buf.put_slice(&self.dictionary);
        for &offset in &self.offset_vector {
            buf.put_u32_le(offset);
        }
        self.attribute_vector.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf) -> StorageResult<Self> {
        if buf.remaining() < 12 {
            return Err(TracedStorageError::decode("expected segment header"));
        }
        let row_count = buf.get_u32_le() as usize;
        let unique_values_count = buf.get_u32_le() as usize;
        let blob_length = buf.get_u32_le() as usize;
        if buf.remaining() < blob_length + unique_values_count * std::mem::size_of::<u32>() {
            return Err(TracedStorageError::decode("segment payload truncated"));
        }
        let mut dictionary = vec![0; blob_length];
        buf.copy_to_slice(&mut dictionary);
        let offset_vector = (0..unique_values_count)
            .map(|_| buf.get_u32_le())
            .collect::<Vec<_>>();
        let attribute_vector = CompressedVector::decode(buf)?;
        if attribute_vector.len() != row_count {
            return Err(TracedStorageError::decode(format!(
                "expected {} rows in attribute vector, got {}",
                row_count,
                attribute_vector.len()
            )));
        }
        Self::new(dictionary, attribute_vector, offset_vector)
    }

    /// The null sentinel of the offset-form attribute vector. The largest
    /// valid offset is strictly less than the blob length, so the two never
    /// collide; an empty dictionary makes the sentinel 0 and every row null.
    fn null_offset(&self) -> u32 {
        self.dictionary.len() as u32
    }

    fn string_at(&self, offset: u32) -> &str {
        let begin = offset as usize;
        let length = self.dictionary[begin..]
            .iter()
            .position(|&byte| byte == 0)
            .expect("dictionary blob string is not NUL-terminated");
        std::str::from_utf8(&self.dictionary[begin..begin + length])
            .expect("dictionary blob is not valid UTF-8")
    }

    /// Rebuild the attribute vector with value ids instead of blob offsets.
    /// Rows of the offset form translate through a reverse offset map; null
    /// maps to the null value id. Compressed against the null value id, the
    /// largest id the vector can hold.
    fn materialize_value_ids(&self) -> CompressedVector {
        let mut reverse_offsets =
            HashMap::<u32, ValueId>::with_capacity(self.offset_vector.len());
        for (value_id, &offset) in self.offset_vector.iter().enumerate() {
            reverse_offsets.insert(offset, value_id as ValueId);
        }

        let null_value_id = self.null_value_id();
        let null_offset = self.null_offset();
        let decompressor = self.attribute_vector.decompressor();

        let mut value_ids = Vec::with_capacity(self.attribute_vector.len());
        for row in 0..self.attribute_vector.len() {
            let offset = decompressor.get(row);
            if offset == null_offset {
                value_ids.push(null_value_id);
            } else {
                // A stored offset must name the first byte of a dictionary
                // string, i.e. byte 0 or the byte after a NUL.
                debug_assert!(
                    offset == 0 || self.dictionary[offset as usize - 1] == 0,
                    "attribute offset points into the middle of a string"
                );
                value_ids.push(reverse_offsets[&offset]);
            }
        }

        CompressedVector::compress(&value_ids, Some(null_value_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::{encode_segment, ValueSegment};

    fn segment_of(values: &[Option<&str>]) -> StringDictionarySegment {
        let mut value_segment = ValueSegment::new(true);
        for value in values {
            value_segment.append(*value);
        }
        encode_segment(&value_segment).unwrap()
    }

    /// Hand-built segment with a zero-length string at the end of the blob,
    /// just to be annoying. The offset table is only used for id lookups
    /// here, not binary search.
    fn lookup_segment() -> StringDictionarySegment {
        let dictionary = b"Hello\0World\0Alexander\0String\0\0".to_vec();
        let offsets = vec![0, 6, 12, 22, 29];
        let attribute_vector =
            CompressedVector::compress(&[0, 0, 6, 22, 12, 29, 12], Some(dictionary.len() as u32));
        StringDictionarySegment::new(dictionary, attribute_vector, offsets).unwrap()
    }

    #[test]
    fn test_lookup() {
        let segment = lookup_segment();
        assert_eq!(segment.get(0), Some("Hello"));
        assert_eq!(segment.get(1), Some("Hello"));
        assert_eq!(segment.get(2), Some("World"));
        assert_eq!(segment.get(3), Some("String"));
        assert_eq!(segment.get(4), Some("Alexander"));
        // Row 5 references the trailing empty string: a value, not a null.
        assert_eq!(segment.get(5), Some(""));
        assert_eq!(segment.get(6), Some("Alexander"));
    }

    #[test]
    fn test_lower_upper_bound() {
        let segment = segment_of(&[
            Some("A"),
            Some("C"),
            Some("E"),
            Some("G"),
            Some("I"),
            Some("K"),
        ]);

        assert_eq!(segment.lower_bound("E"), 2);
        assert_eq!(segment.upper_bound("E"), 3);

        assert_eq!(segment.lower_bound("F"), 3);
        assert_eq!(segment.upper_bound("F"), 3);

        assert_eq!(segment.lower_bound("Z"), INVALID_VALUE_ID);
        assert_eq!(segment.upper_bound("Z"), INVALID_VALUE_ID);
    }

    #[test]
    fn test_bounds_hit_every_stored_value() {
        let values = ["Alexander", "Bill", "Hasso", "Steve"];
        let segment = segment_of(&values.map(Some));
        for (index, value) in values.iter().enumerate() {
            assert_eq!(segment.lower_bound(value), index as ValueId);
            let expected_upper = if index + 1 == values.len() {
                INVALID_VALUE_ID
            } else {
                index as ValueId + 1
            };
            assert_eq!(segment.upper_bound(value), expected_upper);
        }
    }

    #[test]
    fn test_bounds_on_all_null_segment() {
        let segment = segment_of(&[None, None]);
        assert_eq!(segment.unique_values_count(), 0);
        assert_eq!(segment.lower_bound("anything"), INVALID_VALUE_ID);
        assert_eq!(segment.upper_bound("anything"), INVALID_VALUE_ID);
        assert_eq!(segment.get(0), None);
    }

    #[test]
    fn test_value_id_lookups() {
        let segment = segment_of(&[Some("A"), None, Some("E")]);
        assert_eq!(segment.null_value_id(), 2);
        assert_eq!(segment.typed_value_of_value_id(0), "A");
        assert_eq!(segment.value_of_value_id(1), Some("E"));
        assert_eq!(segment.value_of_value_id(2), None);
    }

    #[test]
    fn test_medium_size_compression() {
        // Two long strings force offsets past one byte while value ids
        // still fit one byte: the two attribute vector flavors pick
        // different widths.
        let a = "a".repeat(512);
        let b = "b".repeat(512);
        let segment = segment_of(&[Some(&a), Some(&b)]);

        assert_eq!(
            segment.compressed_vector_type(),
            CompressedVectorType::FixedWidth2Byte
        );
        assert_eq!(
            segment.attribute_vector().vector_type(),
            CompressedVectorType::FixedWidth1Byte
        );
        assert_eq!(segment.get(0), Some(a.as_str()));
        assert_eq!(segment.get(1), Some(b.as_str()));
    }

    #[test]
    fn test_value_id_consistency() {
        let rows = [Some("Bill"), Some("Steve"), None, Some("Bill"), None];
        let segment = segment_of(&rows);
        let value_ids = segment.attribute_vector();
        let offsets = segment.attribute_vector_offsets();
        assert_eq!(value_ids.len(), offsets.len());

        for (row, value) in rows.iter().enumerate() {
            let value_id = value_ids.get(row);
            match value {
                Some(value) => {
                    assert_eq!(
                        segment.offset_vector()[value_id as usize],
                        offsets.get(row)
                    );
                    assert_eq!(segment.typed_value_of_value_id(value_id), *value);
                }
                None => {
                    assert_eq!(value_id, segment.null_value_id());
                    assert_eq!(offsets.get(row), segment.dictionary().len() as u32);
                }
            }
        }
    }

    #[test]
    fn test_materialization_is_idempotent() {
        let segment = Arc::new(segment_of(&[Some("x"), None, Some("y")]));

        let handles = (0..4)
            .map(|_| {
                let segment = segment.clone();
                std::thread::spawn(move || segment.attribute_vector().clone())
            })
            .collect::<Vec<_>>();
        for handle in handles {
            assert_eq!(&handle.join().unwrap(), segment.attribute_vector());
        }

        // All callers observe the one cached vector.
        assert!(std::ptr::eq(
            segment.attribute_vector(),
            segment.attribute_vector()
        ));
    }

    #[test]
    fn test_memory_usage_counts_materialization_once() {
        let segment = segment_of(&[Some("A"), Some("B"), Some("C")]);
        let before = segment.memory_usage();

        segment.attribute_vector();
        let after = segment.memory_usage();
        assert_eq!(after, before + segment.attribute_vector().data_size());

        // A second request must not grow the footprint again.
        segment.attribute_vector();
        assert_eq!(segment.memory_usage(), after);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let rows = [Some("Bill"), None, Some(""), Some("Steve"), Some("Bill")];
        let segment = segment_of(&rows);
        // Materialized value ids must not leak into the serialized form.
        segment.attribute_vector();

        let mut encoded = vec![];
        segment.encode(&mut encoded);
        let decoded = StringDictionarySegment::decode(&mut &encoded[..]).unwrap();

        assert_eq!(decoded.size(), segment.size());
        assert_eq!(decoded.unique_values_count(), segment.unique_values_count());
        assert_eq!(decoded.dictionary(), segment.dictionary());
        for row in 0..rows.len() {
            assert_eq!(decoded.get(row as ChunkOffset), rows[row]);
        }
    }

    #[test]
    fn test_decode_rejects_truncation() {
        let segment = segment_of(&[Some("Bill")]);
        let mut encoded = vec![];
        segment.encode(&mut encoded);
        for cut in [1, 8, encoded.len() - 1] {
            assert!(StringDictionarySegment::decode(&mut &encoded[..cut]).is_err());
        }
    }

    #[test]
    fn test_dictionary_iteration() {
        let segment = segment_of(&[Some("Bill"), Some(""), Some("Steve"), None, Some("Bill")]);
        let dictionary = segment.variable_string_dictionary();
        assert_eq!(dictionary.size(), 3);
        assert_eq!(dictionary.iter().collect::<Vec<_>>(), ["", "Bill", "Steve"]);
    }
}
