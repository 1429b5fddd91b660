//! Ordered range scans over an embedded LMDB key-value store.
//!
//! ## Notes on implementation
//!
//! This crate wraps the raw `lmdb-sys` binding with a small safe surface:
//! an [`Environment`] holds the memory-mapped store, a [`Database`] is a
//! named key space inside it, and [`Transaction`]s provide snapshot reads
//! and atomic writes.
//!
//! The interesting part is the range-scan core. A [`Query`] describes a
//! bounded, optionally-reversed walk over one database; [`KeyRange`] and
//! [`EntryRange`] are restartable factories holding only the query, and each
//! `iter()` call opens a fresh read transaction and [`Cursor`] of its own.
//! LMDB's cursor only understands first/last/next/prev/seek, so all bound
//! inclusivity and direction handling is synthesized by a single post-fetch
//! comparison against the end bound.
//!
//! Iteration never raises: a scan that hits an engine error mid-walk simply
//! stops producing elements, and a scan whose transaction or cursor could
//! not be opened is empty from the start. Callers that need to observe
//! setup or positioning errors should use the [`Cursor`] and [`Transaction`]
//! APIs directly.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

mod cursor;
pub use cursor::{Cursor, CursorOp, CursorState, compare};

mod db;
pub use db::{Database, DatabaseFlags, WriteFlags};

mod env;
pub use env::{Environment, EnvironmentArguments, EnvironmentFlags};

mod error;
pub use error::DbError;

mod query;
pub use query::{Bounds, Query};

mod range;
pub use range::{EntryIter, EntryRange, KeyIter, KeyRange};

mod slice;
pub use slice::Slice;

mod tx;
pub use tx::{Ro, Rw, Transaction, TransactionKind};

mod util;

/// 1 KiB in bytes.
pub const KILOBYTE: usize = 1024;
/// 1 MiB in bytes.
pub const MEGABYTE: usize = KILOBYTE * 1024;
/// 1 GiB in bytes.
pub const GIGABYTE: usize = MEGABYTE * 1024;

/// A decoded key together with its value, if the entry carries one.
///
/// An entry stored with an empty value reads back as `None`; this layer does
/// not distinguish "no value" from "zero-length value".
pub type Entry = (Vec<u8>, Option<Vec<u8>>);

/// Crate-level result alias.
pub type Result<T, E = DbError> = std::result::Result<T, E>;
