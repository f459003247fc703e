// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

use bytes::{Buf, BufMut};

/// An unsigned integer type usable as the backing width of a
/// [`super::CompressedVector`].
pub trait FixedWidthInteger: Copy + Clone + 'static + Send + Sync {
    /// Width of each element in bytes.
    const WIDTH: usize;

    fn from_u32(value: u32) -> Self;

    fn to_u32(self) -> u32;

    /// Encode this value to the end of a buffer, little-endian.
    fn encode(&self, buffer: &mut impl BufMut);

    /// Decode one value from a bytes array.
    fn decode(buffer: &mut impl Buf) -> Self;
}

impl FixedWidthInteger for u8 {
    const WIDTH: usize = std::mem::size_of::<u8>();

    fn from_u32(value: u32) -> Self {
        value as u8
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn encode(&self, buffer: &mut impl BufMut) {
        buffer.put_u8(*self);
    }

    fn decode(buffer: &mut impl Buf) -> Self {
        buffer.get_u8()
    }
}

impl FixedWidthInteger for u16 {
    const WIDTH: usize = std::mem::size_of::<u16>();

    fn from_u32(value: u32) -> Self {
        value as u16
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn encode(&self, buffer: &mut impl BufMut) {
        buffer.put_u16_le(*self);
    }

    fn decode(buffer: &mut impl Buf) -> Self {
        buffer.get_u16_le()
    }
}

impl FixedWidthInteger for u32 {
    const WIDTH: usize = std::mem::size_of::<u32>();

    fn from_u32(value: u32) -> Self {
        value
    }

    fn to_u32(self) -> u32 {
        self
    }

    fn encode(&self, buffer: &mut impl BufMut) {
        buffer.put_u32_le(*self);
    }

    fn decode(buffer: &mut impl Buf) -> Self {
        buffer.get_u32_le()
    }
}

/// The narrowed data of one width. No mutation after build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedWidthVector<T: FixedWidthInteger> {
    data: Vec<T>,
}

impl<T: FixedWidthInteger> FixedWidthVector<T> {
    /// Narrow `values` into this width. Callers have checked that every
    /// value fits.
    pub fn from_values(values: &[u32]) -> Self {
        let data = values.iter().map(|&value| T::from_u32(value)).collect();
        Self { data }
    }

    pub fn get(&self, i: usize) -> u32 {
        self.data[i].to_u32()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data_size(&self) -> usize {
        self.data.len() * T::WIDTH
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn encode(&self, buffer: &mut impl BufMut) {
        for value in &self.data {
            value.encode(buffer);
        }
    }

    /// Decode `length` elements. The caller has verified the buffer holds
    /// at least `length * WIDTH` bytes.
    pub fn decode(buffer: &mut impl Buf, length: usize) -> Self {
        let data = (0..length).map(|_| T::decode(buffer)).collect();
        Self { data }
    }
}
