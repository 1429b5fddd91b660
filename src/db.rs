//! Database handles and single-operation get/put/delete.

use crate::{
    Bounds, DbError, EntryRange, Environment, KeyRange, Query, Result, Rw, Slice, Transaction,
    error::check,
    util::{empty_val, slice_to_val, val_to_vec},
};
use bitflags::bitflags;
use std::ffi::CString;

bitflags! {
    /// Flags applied when opening or creating a [`Database`].
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct DatabaseFlags: libc::c_uint {
        /// Use reverse string keys.
        const REVERSE_KEY = lmdb_sys::MDB_REVERSEKEY;
        /// Use sorted duplicates.
        const DUP_SORT = lmdb_sys::MDB_DUPSORT;
        /// Numeric keys in native byte order.
        const INTEGER_KEY = lmdb_sys::MDB_INTEGERKEY;
        /// With `DUP_SORT`, sorted duplicate items have a fixed size.
        const DUP_FIXED = lmdb_sys::MDB_DUPFIXED;
        /// With `DUP_SORT`, duplicates are integer-style keys.
        const INTEGER_DUP = lmdb_sys::MDB_INTEGERDUP;
        /// With `DUP_SORT`, use reverse string duplicates.
        const REVERSE_DUP = lmdb_sys::MDB_REVERSEDUP;
        /// Create the database if it does not exist.
        const CREATE = lmdb_sys::MDB_CREATE;
    }
}

bitflags! {
    /// Flags controlling [`Database::put_with_flags`] behaviour.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct WriteFlags: libc::c_uint {
        /// Don't write if the key already exists.
        const NO_OVERWRITE = lmdb_sys::MDB_NOOVERWRITE;
        /// Don't write if the key/value pair already exists (`DUP_SORT`).
        const NO_DUP_DATA = lmdb_sys::MDB_NODUPDATA;
        /// Keys are appended in order; don't split full pages.
        const APPEND = lmdb_sys::MDB_APPEND;
        /// Duplicate data is appended in order; don't split full pages.
        const APPEND_DUP = lmdb_sys::MDB_APPENDDUP;
    }
}

/// A named key space inside an [`Environment`].
///
/// Cheap to clone; clones share the environment handle and the same `dbi`.
/// The handle stays open for the life of the environment — LMDB database
/// handles are not meant to be opened and closed dynamically at runtime, so
/// open each database once at startup and share it.
#[derive(Clone, Debug)]
pub struct Database {
    env: Environment,
    dbi: lmdb_sys::MDB_dbi,
}

impl Database {
    /// Opens the database named `name` (or the unnamed default database) in
    /// `env`.
    ///
    /// Pass [`DatabaseFlags::CREATE`] (or use [`Database::create`]) to
    /// create it when missing.
    pub fn open(env: &Environment, name: Option<&str>, flags: DatabaseFlags) -> Result<Self> {
        let c_name = match name {
            Some(name) => Some(CString::new(name).map_err(|_| DbError::InvalidParameter)?),
            None => None,
        };

        let txn = env.begin_rw()?;
        let mut dbi = 0;
        unsafe {
            check(lmdb_sys::mdb_dbi_open(
                txn.ptr(),
                c_name.as_ref().map_or(std::ptr::null(), |n| n.as_ptr()),
                flags.bits(),
                &mut dbi,
            ))?;
        }
        txn.commit()?;

        Ok(Self { env: env.clone(), dbi })
    }

    /// Opens the database named `name`, creating it if necessary.
    pub fn create(env: &Environment, name: &str) -> Result<Self> {
        Self::open(env, Some(name), DatabaseFlags::CREATE)
    }

    /// The environment this database lives in.
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    pub(crate) const fn dbi(&self) -> lmdb_sys::MDB_dbi {
        self.dbi
    }

    /// Runs `f` inside a read-write transaction, committing on success and
    /// aborting on error.
    fn with_rw<T>(&self, f: impl FnOnce(&Transaction<Rw>) -> Result<T>) -> Result<T> {
        let txn = self.env.begin_rw()?;
        let out = f(&txn)?;
        txn.commit()?;
        Ok(out)
    }

    /// Returns the value stored under `key`, or `None` if the key is absent
    /// or its value is empty.
    ///
    /// An empty key is rejected with [`DbError::InvalidParameter`].
    pub fn get(&self, key: &(impl Slice + ?Sized)) -> Result<Option<Vec<u8>>> {
        key.with_bytes(|key| {
            if key.is_empty() {
                return Err(DbError::InvalidParameter);
            }

            let txn = self.env.begin_ro()?;
            let mut key_val = slice_to_val(key);
            let mut data_val = empty_val();

            let rc = unsafe {
                lmdb_sys::mdb_get(txn.ptr(), self.dbi, &mut key_val, &mut data_val)
            };
            if rc == lmdb_sys::MDB_NOTFOUND {
                return Ok(None);
            }
            check(rc)?;

            if data_val.mv_size == 0 {
                return Ok(None);
            }
            Ok(Some(unsafe { val_to_vec(&data_val) }))
        })
    }

    /// Stores `value` under `key`, replacing any existing value.
    ///
    /// A `None` value stores an empty value, which reads back as `None`.
    /// An empty key is rejected with [`DbError::InvalidParameter`].
    pub fn put(
        &self,
        key: &(impl Slice + ?Sized),
        value: Option<&(impl Slice + ?Sized)>,
    ) -> Result<()> {
        self.put_with_flags(key, value, WriteFlags::empty())
    }

    /// Stores `value` under `key` with explicit [`WriteFlags`].
    pub fn put_with_flags(
        &self,
        key: &(impl Slice + ?Sized),
        value: Option<&(impl Slice + ?Sized)>,
        flags: WriteFlags,
    ) -> Result<()> {
        key.with_bytes(|key| {
            if key.is_empty() {
                return Err(DbError::InvalidParameter);
            }

            let value = value.map_or_else(Vec::new, |v| v.to_bytes());
            self.with_rw(|txn| {
                let mut key_val = slice_to_val(key);
                let mut data_val = slice_to_val(&value);
                unsafe {
                    check(lmdb_sys::mdb_put(
                        txn.ptr(),
                        self.dbi,
                        &mut key_val,
                        &mut data_val,
                        flags.bits(),
                    ))
                }
            })
        })
    }

    /// Deletes the entry stored under `key`.
    ///
    /// Deleting a key that does not exist is a no-op success.
    pub fn delete(&self, key: &(impl Slice + ?Sized)) -> Result<()> {
        key.with_bytes(|key| {
            if key.is_empty() {
                return Err(DbError::InvalidParameter);
            }

            self.with_rw(|txn| {
                let mut key_val = slice_to_val(key);
                let rc = unsafe {
                    lmdb_sys::mdb_del(txn.ptr(), self.dbi, &mut key_val, std::ptr::null_mut())
                };
                if rc == lmdb_sys::MDB_NOTFOUND {
                    return Ok(());
                }
                check(rc)
            })
        })
    }

    /// Removes every entry, keeping the database itself.
    pub fn clear(&self) -> Result<()> {
        self.with_rw(|txn| unsafe { check(lmdb_sys::mdb_drop(txn.ptr(), self.dbi, 0)) })
    }

    /// Deletes the database and its handle from the environment.
    pub fn drop_database(self) -> Result<()> {
        self.with_rw(|txn| unsafe { check(lmdb_sys::mdb_drop(txn.ptr(), self.dbi, 1)) })
    }

    /// Flushes buffered writes in the environment to disk.
    pub fn sync(&self) -> Result<()> {
        self.env.sync()
    }

    /// A restartable key-only scan from `start` to `end`, both inclusive.
    ///
    /// `None` bounds walk from the first (or, reversed, the last) key.
    pub fn key_range<S: Slice + ?Sized>(
        &self,
        start: Option<&S>,
        end: Option<&S>,
        reversed: bool,
    ) -> KeyRange {
        KeyRange::new(Query::span(self, start, end, reversed))
    }

    /// A restartable key/value scan from `start` to `end`, both inclusive.
    pub fn entry_range<S: Slice + ?Sized>(
        &self,
        start: Option<&S>,
        end: Option<&S>,
        reversed: bool,
    ) -> EntryRange {
        EntryRange::new(Query::span(self, start, end, reversed))
    }

    /// A restartable key/value scan over precise [`Bounds`].
    ///
    /// Each side may be given inclusively (`gte`/`lte`) or exclusively
    /// (`gt`/`lt`); when both forms of one side are supplied the inclusive
    /// form wins.
    pub fn range(&self, bounds: &Bounds, reversed: bool) -> EntryRange {
        EntryRange::new(Query::bounded(self, bounds, reversed))
    }
}
