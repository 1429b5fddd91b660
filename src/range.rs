//! Lazy, restartable range scans.
//!
//! A range value ([`KeyRange`], [`EntryRange`]) holds only its [`Query`] and
//! is a restartable factory: every call to `iter()` opens a fresh read
//! transaction and [`Cursor`], so the same range can be walked repeatedly
//! and concurrently, each walk seeing its own snapshot.
//!
//! Per the crate's error policy, iteration itself never fails. A scan whose
//! transaction or cursor cannot be opened is empty from the first call, and
//! a scan that hits an engine error mid-walk stops early; both cases are
//! logged at debug level.

use crate::{Cursor, CursorOp, Entry, Query, Result, compare};
use std::{cmp::Ordering, iter::FusedIterator};

/// The shared walk state machine behind both iterator flavours.
///
/// Implements the termination logic: every advance issues one positioning
/// call, then checks the returned key against the end bound — in the walk
/// direction — before the entry is emitted.
#[derive(Debug)]
struct RawScan {
    /// Owns the native cursor and its read transaction.
    cursor: Cursor,
    query: Query,
    /// Operation to issue on the next advance. Starts as the initial
    /// operation and becomes the step operation after the first yield.
    op: CursorOp,
    /// Whether the next advance is the first positioning of this walk.
    first_fetch: bool,
    /// Terminal flag; once set the scan yields nothing, forever.
    done: bool,
}

impl RawScan {
    fn open(query: Query) -> Result<Self> {
        let txn = query.database().environment().begin_ro()?;
        let cursor = Cursor::open(txn, &query)?;
        let op = cursor.initial_op();
        Ok(Self { cursor, query, op, first_fetch: true, done: false })
    }

    fn advance(&mut self) -> Option<Entry> {
        if self.done || !self.cursor.is_valid() {
            return None;
        }

        let Some(mut entry) = Self::fetch(&mut self.cursor, self.query.start(), self.op) else {
            self.done = true;
            return None;
        };

        // An exclusive start bound excludes the key equal to it. The seek
        // lands on the bound only when that key exists; skip it then, and
        // only then.
        if std::mem::take(&mut self.first_fetch)
            && !self.query.start_inclusive()
            && self
                .query
                .start()
                .is_some_and(|start| compare(&entry.0, start) == Ordering::Equal)
        {
            let step = self.cursor.step_op();
            let Some(stepped) = Self::fetch(&mut self.cursor, None, step) else {
                self.done = true;
                return None;
            };
            entry = stepped;
        }

        if let Some(end) = self.query.end() {
            // The outcome meaning "the key has crossed past the end bound
            // in the walk direction".
            let past_end = if self.query.reversed() { Ordering::Less } else { Ordering::Greater };

            match compare(&entry.0, end) {
                Ordering::Equal if self.query.end_inclusive() => {
                    // The end key itself is the last element. The step
                    // operation still has to be installed: if the walk
                    // started on this key the current operation is the
                    // seek, which would find it again forever.
                    self.op = self.cursor.step_op();
                    return Some(entry);
                }
                Ordering::Equal => {
                    self.done = true;
                    return None;
                }
                cmp if cmp == past_end => {
                    self.done = true;
                    return None;
                }
                _ => {}
            }
        }

        self.op = self.cursor.step_op();
        Some(entry)
    }

    /// One positioning call with the crate's swallow-into-termination
    /// policy applied: engine errors end the walk and are logged, not
    /// raised. The error also stays observable on the cursor's sticky
    /// state.
    fn fetch(cursor: &mut Cursor, key: Option<&[u8]>, op: CursorOp) -> Option<Entry> {
        match cursor.get(key, op) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(target: "rangedb::scan", %err, "scan stopped by engine error");
                None
            }
        }
    }
}

/// Single-pass iterator over the keys of a [`KeyRange`].
#[derive(Debug)]
pub struct KeyIter {
    scan: Option<RawScan>,
}

impl Iterator for KeyIter {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan.as_mut()?.advance().map(|(key, _)| key)
    }
}

impl FusedIterator for KeyIter {}

/// Single-pass iterator over the entries of an [`EntryRange`].
#[derive(Debug)]
pub struct EntryIter {
    scan: Option<RawScan>,
}

impl Iterator for EntryIter {
    type Item = Entry;

    fn next(&mut self) -> Option<Self::Item> {
        self.scan.as_mut()?.advance()
    }
}

impl FusedIterator for EntryIter {}

/// A restartable key-only scan.
#[derive(Clone, Debug)]
pub struct KeyRange {
    query: Query,
}

impl KeyRange {
    /// Creates a key-only scan for `query`.
    pub const fn new(query: Query) -> Self {
        Self { query }
    }

    /// The query this range walks.
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Opens a fresh transaction and cursor and starts a new walk.
    ///
    /// By contract a failed setup yields an iterator that is immediately
    /// and permanently empty; use the [`Cursor`] and transaction APIs
    /// directly when setup errors must be observed.
    pub fn iter(&self) -> KeyIter {
        KeyIter { scan: open_scan(&self.query) }
    }
}

impl IntoIterator for &KeyRange {
    type Item = Vec<u8>;
    type IntoIter = KeyIter;

    fn into_iter(self) -> KeyIter {
        self.iter()
    }
}

impl IntoIterator for KeyRange {
    type Item = Vec<u8>;
    type IntoIter = KeyIter;

    fn into_iter(self) -> KeyIter {
        self.iter()
    }
}

/// A restartable key/value scan.
#[derive(Clone, Debug)]
pub struct EntryRange {
    query: Query,
}

impl EntryRange {
    /// Creates a key/value scan for `query`.
    pub const fn new(query: Query) -> Self {
        Self { query }
    }

    /// The query this range walks.
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Opens a fresh transaction and cursor and starts a new walk.
    ///
    /// By contract a failed setup yields an iterator that is immediately
    /// and permanently empty; use the [`Cursor`] and transaction APIs
    /// directly when setup errors must be observed.
    pub fn iter(&self) -> EntryIter {
        EntryIter { scan: open_scan(&self.query) }
    }
}

impl IntoIterator for &EntryRange {
    type Item = Entry;
    type IntoIter = EntryIter;

    fn into_iter(self) -> EntryIter {
        self.iter()
    }
}

impl IntoIterator for EntryRange {
    type Item = Entry;
    type IntoIter = EntryIter;

    fn into_iter(self) -> EntryIter {
        self.iter()
    }
}

fn open_scan(query: &Query) -> Option<RawScan> {
    match RawScan::open(query.clone()) {
        Ok(scan) => Some(scan),
        Err(err) => {
            tracing::debug!(
                target: "rangedb::scan",
                %err,
                "failed to open scan; yielding an empty iterator"
            );
            None
        }
    }
}
