// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

//! Immutable dictionary-compressed string segments and their encoder.

mod dictionary;
mod encoder;
mod string_dictionary_segment;

pub use dictionary::*;
pub use encoder::*;
pub use string_dictionary_segment::*;
