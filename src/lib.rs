// Copyright 2025 Mica Project Authors. Licensed under Apache-2.0.

//! Mica is an in-memory columnar storage core. It stores string columns as
//! immutable dictionary-compressed segments (a shared character blob, a
//! sorted offset table and a bit-packed per-row attribute vector) and gates
//! row visibility through MVCC snapshot isolation.
//!
//! The crate is embedded, not a wire endpoint: a SQL pipeline hands mutable
//! [`storage::ValueSegment`]s to the encoder, scans the resulting
//! [`storage::StringDictionarySegment`]s, and brackets its work in
//! transactions handed out by [`transaction::TransactionManager`].

#![deny(unused_must_use)]

pub mod storage;
pub mod transaction;
pub mod types;
