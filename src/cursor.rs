//! Cursor wrapper over the engine's positioning primitives.

use crate::{
    DbError, Entry, Query, Result, Ro, Transaction,
    error::check,
    util::{empty_val, slice_to_val, val_to_vec},
};
use std::cmp::Ordering;

/// Positioning operations a [`Cursor`] understands.
///
/// The engine's own operation set is wider (duplicate handling, exact-key
/// probes); this is the subset the range walk is synthesized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOp {
    /// Position at the first key.
    First,
    /// Position at the last key.
    Last,
    /// Position at the next key.
    Next,
    /// Position at the previous key.
    Prev,
    /// Position at the nearest key in the walk direction from the given
    /// key: the first key `>=` it when walking forward, the last key `<=`
    /// it when walking reversed.
    Seek,
}

impl CursorOp {
    /// The raw engine operation, for ops that map one-to-one.
    ///
    /// `Seek` is synthesized from several raw operations and has no single
    /// mapping; see [`Cursor::get`].
    const fn raw(self) -> Option<lmdb_sys::MDB_cursor_op> {
        match self {
            Self::First => Some(lmdb_sys::MDB_FIRST),
            Self::Last => Some(lmdb_sys::MDB_LAST),
            Self::Next => Some(lmdb_sys::MDB_NEXT),
            Self::Prev => Some(lmdb_sys::MDB_PREV),
            Self::Seek => None,
        }
    }
}

/// Validity state of a [`Cursor`].
///
/// Errors are sticky: once `Broken`, every subsequent call returns the
/// stored error without touching the engine. "Not found" is not an error
/// and leaves the cursor `Valid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No positioning call has been attempted yet.
    Untouched,
    /// Every positioning call so far succeeded or returned "not found".
    Valid,
    /// A positioning call failed; the cursor is permanently invalid.
    Broken(DbError),
}

/// A positionable handle into one database's sorted key space.
///
/// The cursor exclusively owns both its native handle and the read
/// transaction it was opened in; dropping it closes the handle first and
/// then aborts the transaction, on every exit path.
pub struct Cursor {
    /// Raw cursor handle.
    ptr: *mut lmdb_sys::MDB_cursor,
    /// Sticky validity state.
    state: CursorState,
    /// Walk direction of the query this cursor was opened for.
    reversed: bool,
    /// Whether the query supplied a start bound.
    has_start: bool,
    /// The transaction the handle lives in. Declared last; it must outlive
    /// the handle, which `Drop` closes explicitly before fields drop.
    txn: Transaction<Ro>,
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("state", &self.state)
            .field("reversed", &self.reversed)
            .finish_non_exhaustive()
    }
}

impl Cursor {
    /// Opens a cursor in `txn` for `query`'s database and positions it at
    /// the query's initial operation.
    ///
    /// Failure to open the native handle is a setup error and is returned;
    /// a failure while positioning is stored sticky instead, leaving the
    /// cursor broken but constructed.
    pub fn open(txn: Transaction<Ro>, query: &Query) -> Result<Self> {
        let mut ptr = std::ptr::null_mut();
        unsafe {
            check(lmdb_sys::mdb_cursor_open(txn.ptr(), query.database().dbi(), &mut ptr))?;
        }

        let mut cursor = Self {
            ptr,
            state: CursorState::Untouched,
            reversed: query.reversed(),
            has_start: query.start().is_some(),
            txn,
        };

        // Initial positioning; an error here is observable via `state`.
        let _ = cursor.get(query.start(), cursor.initial_op());

        Ok(cursor)
    }

    /// The operation that positions this cursor at the beginning of its
    /// walk: a seek when the query has a start bound, otherwise the first
    /// (or, reversed, the last) key.
    pub const fn initial_op(&self) -> CursorOp {
        if self.has_start {
            CursorOp::Seek
        } else if self.reversed {
            CursorOp::Last
        } else {
            CursorOp::First
        }
    }

    /// The operation that advances this cursor by one step in the walk
    /// direction.
    pub const fn step_op(&self) -> CursorOp {
        if self.reversed { CursorOp::Prev } else { CursorOp::Next }
    }

    /// Whether no positioning call has failed so far.
    pub const fn is_valid(&self) -> bool {
        !matches!(self.state, CursorState::Broken(_))
    }

    /// The sticky validity state.
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// The error that broke this cursor, if any.
    pub const fn last_error(&self) -> Option<DbError> {
        match self.state {
            CursorState::Broken(err) => Some(err),
            _ => None,
        }
    }

    /// Issues a positioning operation and returns the entry at the new
    /// position.
    ///
    /// `key` is only consulted by [`CursorOp::Seek`]. Returns `Ok(None)`
    /// when the engine reports "not found" — walking off either end of the
    /// key space is not an error. Any other failure is returned and stored
    /// sticky; every later call fails with the same error.
    pub fn get(&mut self, key: Option<&[u8]>, op: CursorOp) -> Result<Option<Entry>> {
        if let CursorState::Broken(err) = self.state {
            return Err(err);
        }

        match self.position(key, op) {
            Ok(entry) => {
                self.state = CursorState::Valid;
                Ok(entry)
            }
            Err(err) => {
                self.state = CursorState::Broken(err);
                Err(err)
            }
        }
    }

    fn position(&mut self, key: Option<&[u8]>, op: CursorOp) -> Result<Option<Entry>> {
        if let Some(raw) = op.raw() {
            return self.raw_get(None, raw);
        }

        // Seek. The engine's nearest-match primitive (`SET_RANGE`) lands on
        // the first key >= the target, which is nearest-match only for a
        // forward walk. Reversed, a miss means every key is below the
        // target (so the last key is nearest), and an overshoot is
        // corrected with one step back.
        let key = key.ok_or(DbError::InvalidParameter)?;
        match self.raw_get(Some(key), lmdb_sys::MDB_SET_RANGE)? {
            Some(entry) => {
                if self.reversed && compare(&entry.0, key) == Ordering::Greater {
                    self.raw_get(None, lmdb_sys::MDB_PREV)
                } else {
                    Ok(Some(entry))
                }
            }
            None if self.reversed => self.raw_get(None, lmdb_sys::MDB_LAST),
            None => Ok(None),
        }
    }

    /// Single raw `mdb_cursor_get` call, decoding the result.
    fn raw_get(
        &mut self,
        key: Option<&[u8]>,
        op: lmdb_sys::MDB_cursor_op,
    ) -> Result<Option<Entry>> {
        let mut key_val = key.map_or_else(empty_val, slice_to_val);
        let mut data_val = empty_val();

        let rc = unsafe { lmdb_sys::mdb_cursor_get(self.ptr, &mut key_val, &mut data_val, op) };
        if rc == lmdb_sys::MDB_NOTFOUND {
            return Ok(None);
        }
        check(rc)?;

        let key = unsafe { val_to_vec(&key_val) };
        if key.is_empty() {
            // A successful call that yields no decodable key is "no result".
            return Ok(None);
        }

        let value = unsafe { val_to_vec(&data_val) };
        Ok(Some((key, (!value.is_empty()).then_some(value))))
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        // Close the handle before the transaction field aborts.
        unsafe { lmdb_sys::mdb_cursor_close(self.ptr) };
    }
}

/// Compares two keys the way the engine sorts them: unsigned bytewise up to
/// the shorter length; if all compared bytes are equal, the shorter key
/// orders first.
pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
    let common = a.len().min(b.len());
    match a[..common].cmp(&b[..common]) {
        Ordering::Equal => a.len().cmp(&b.len()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, Environment, EnvironmentArguments};

    fn test_db() -> (tempfile::TempDir, Environment, Database) {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvironmentArguments::new()).unwrap();
        let db = Database::create(&env, "cursor_tests").unwrap();
        (dir, env, db)
    }

    #[test]
    fn errors_are_sticky_and_keep_their_cause() {
        let (_dir, env, db) = test_db();
        db.put("A", Some("0")).unwrap();

        let query = Query::span(&db, None::<&str>, None, false);
        let txn = env.begin_ro().unwrap();
        let mut cursor = Cursor::open(txn, &query).unwrap();
        assert_eq!(cursor.state(), CursorState::Valid);
        assert_eq!(cursor.last_error(), None);

        // A seek without a key is rejected and breaks the cursor.
        assert_eq!(cursor.get(None, CursorOp::Seek), Err(DbError::InvalidParameter));
        assert!(!cursor.is_valid());
        assert_eq!(cursor.state(), CursorState::Broken(DbError::InvalidParameter));
        assert_eq!(cursor.last_error(), Some(DbError::InvalidParameter));

        // Well-formed operations no longer reach the engine; every one
        // reports the stored cause, and the state never clears.
        assert_eq!(cursor.get(None, CursorOp::First), Err(DbError::InvalidParameter));
        assert_eq!(
            cursor.get(Some(b"A".as_slice()), CursorOp::Seek),
            Err(DbError::InvalidParameter)
        );
        assert_eq!(cursor.state(), CursorState::Broken(DbError::InvalidParameter));
    }

    #[test]
    fn walking_off_the_end_is_not_an_error() {
        let (_dir, env, db) = test_db();
        db.put("A", Some("0")).unwrap();

        let query = Query::span(&db, None::<&str>, None, false);
        let txn = env.begin_ro().unwrap();
        let mut cursor = Cursor::open(txn, &query).unwrap();

        assert_eq!(
            cursor.get(None, CursorOp::Next).unwrap(),
            None,
            "one entry, so the second position is off the end"
        );
        assert_eq!(cursor.state(), CursorState::Valid);
    }

    #[test]
    fn compare_is_bytewise_unsigned() {
        assert_eq!(compare(b"a", b"b"), Ordering::Less);
        assert_eq!(compare(b"b", b"a"), Ordering::Greater);
        assert_eq!(compare(b"abc", b"abc"), Ordering::Equal);
        // 0xff sorts above any ASCII byte.
        assert_eq!(compare(&[0x00], &[0xff]), Ordering::Less);
    }

    #[test]
    fn shorter_key_orders_first_on_common_prefix() {
        assert_eq!(compare(b"ab", b"abc"), Ordering::Less);
        assert_eq!(compare(b"abc", b"ab"), Ordering::Greater);
        assert_eq!(compare(b"", b"a"), Ordering::Less);
    }
}
