// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

//! Fixed-width compressed integer vectors.
//!
//! A [`CompressedVector`] is an immutable sequence of `u32` values stored at
//! the narrowest byte width that fits the largest value it must represent.
//! Attribute vectors of dictionary segments are stored this way.

mod fixed_width;

pub use fixed_width::*;

use bytes::{Buf, BufMut};

use super::{StorageResult, TracedStorageError};

/// The backing width of a [`CompressedVector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressedVectorType {
    FixedWidth1Byte,
    FixedWidth2Byte,
    FixedWidth4Byte,
}

impl CompressedVectorType {
    /// Width of one element in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::FixedWidth1Byte => 1,
            Self::FixedWidth2Byte => 2,
            Self::FixedWidth4Byte => 4,
        }
    }
}

/// An immutable bit-packed sequence of `u32` values. The width is chosen
/// once at build time; all reads widen back to `u32`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompressedVector {
    FixedWidth1(FixedWidthVector<u8>),
    FixedWidth2(FixedWidthVector<u16>),
    FixedWidth4(FixedWidthVector<u32>),
}

impl CompressedVector {
    /// Compress `values` at the narrowest width that fits `max_value`.
    /// Without an explicit `max_value` the maximum of `values` is used.
    ///
    /// Values above `max_value` would be silently truncated; debug builds
    /// assert against that.
    pub fn compress(values: &[u32], max_value: Option<u32>) -> Self {
        let max_value =
            max_value.unwrap_or_else(|| values.iter().copied().max().unwrap_or_default());
        debug_assert!(
            values.iter().all(|&value| value <= max_value),
            "value exceeds declared maximum"
        );
        if max_value <= u8::MAX as u32 {
            Self::FixedWidth1(FixedWidthVector::from_values(values))
        } else if max_value <= u16::MAX as u32 {
            Self::FixedWidth2(FixedWidthVector::from_values(values))
        } else {
            Self::FixedWidth4(FixedWidthVector::from_values(values))
        }
    }

    /// Random read of element `i`. Panics if `i >= len`.
    pub fn get(&self, i: usize) -> u32 {
        match self {
            Self::FixedWidth1(vector) => vector.get(i),
            Self::FixedWidth2(vector) => vector.get(i),
            Self::FixedWidth4(vector) => vector.get(i),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::FixedWidth1(vector) => vector.len(),
            Self::FixedWidth2(vector) => vector.len(),
            Self::FixedWidth4(vector) => vector.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated footprint of the packed data in bytes.
    pub fn data_size(&self) -> usize {
        match self {
            Self::FixedWidth1(vector) => vector.data_size(),
            Self::FixedWidth2(vector) => vector.data_size(),
            Self::FixedWidth4(vector) => vector.data_size(),
        }
    }

    pub fn vector_type(&self) -> CompressedVectorType {
        match self {
            Self::FixedWidth1(_) => CompressedVectorType::FixedWidth1Byte,
            Self::FixedWidth2(_) => CompressedVectorType::FixedWidth2Byte,
            Self::FixedWidth4(_) => CompressedVectorType::FixedWidth4Byte,
        }
    }

    /// A random-access reader that hides the backing width from callers.
    pub fn decompressor(&self) -> Decompressor<'_> {
        match self {
            Self::FixedWidth1(vector) => Decompressor::FixedWidth1(vector.as_slice()),
            Self::FixedWidth2(vector) => Decompressor::FixedWidth2(vector.as_slice()),
            Self::FixedWidth4(vector) => Decompressor::FixedWidth4(vector.as_slice()),
        }
    }

    /// Sequential decode of the whole vector.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Serialize as `| width (u8) | length (u32) | length * width bytes |`,
    /// all integers little-endian.
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.vector_type().width() as u8);
        buf.put_u32_le(self.len() as u32);
        match self {
            Self::FixedWidth1(vector) => vector.encode(buf),
            Self::FixedWidth2(vector) => vector.encode(buf),
            Self::FixedWidth4(vector) => vector.encode(buf),
        }
    }

    pub fn decode(buf: &mut impl Buf) -> StorageResult<Self> {
        if buf.remaining() < 5 {
            return Err(TracedStorageError::decode("expected vector header"));
        }
        let width = buf.get_u8();
        let length = buf.get_u32_le() as usize;
        if buf.remaining() < length * width as usize {
            return Err(TracedStorageError::decode("vector payload truncated"));
        }
        match width {
            1 => Ok(Self::FixedWidth1(FixedWidthVector::decode(buf, length))),
            2 => Ok(Self::FixedWidth2(FixedWidthVector::decode(buf, length))),
            4 => Ok(Self::FixedWidth4(FixedWidthVector::decode(buf, length))),
            _ => Err(TracedStorageError::decode(format!(
                "expected width 1, 2 or 4, got {}",
                width
            ))),
        }
    }
}

/// Stateful random-access reader over a [`CompressedVector`], so inner
/// loops need not re-dispatch on the enum for every element.
pub enum Decompressor<'a> {
    FixedWidth1(&'a [u8]),
    FixedWidth2(&'a [u16]),
    FixedWidth4(&'a [u32]),
}

impl Decompressor<'_> {
    pub fn get(&self, i: usize) -> u32 {
        match self {
            Self::FixedWidth1(data) => data[i] as u32,
            Self::FixedWidth2(data) => data[i] as u32,
            Self::FixedWidth4(data) => data[i],
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Self::FixedWidth1(data) => data.len(),
            Self::FixedWidth2(data) => data.len(),
            Self::FixedWidth4(data) => data.len(),
        }
    }
}
