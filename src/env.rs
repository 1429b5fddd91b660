//! LMDB environment lifecycle and configuration.

use crate::{
    DbError, MEGABYTE, Result,
    error::check,
    tx::{Ro, Rw, Transaction},
};
use bitflags::bitflags;
use std::{
    ffi::CString,
    path::Path,
    ptr,
    sync::Arc,
};

bitflags! {
    /// Flags applied when opening an [`Environment`].
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct EnvironmentFlags: libc::c_uint {
        /// Mmap at a fixed address (experimental).
        const FIXED_MAP = lmdb_sys::MDB_FIXEDMAP;
        /// Treat the path as a file name rather than a directory.
        const NO_SUB_DIR = lmdb_sys::MDB_NOSUBDIR;
        /// Don't fsync after commit.
        const NO_SYNC = lmdb_sys::MDB_NOSYNC;
        /// Open the environment read-only.
        const READ_ONLY = lmdb_sys::MDB_RDONLY;
        /// Don't fsync the meta page after commit.
        const NO_META_SYNC = lmdb_sys::MDB_NOMETASYNC;
        /// Use a writable memory map.
        const WRITE_MAP = lmdb_sys::MDB_WRITEMAP;
        /// Use asynchronous msync when `WRITE_MAP` is set.
        const MAP_ASYNC = lmdb_sys::MDB_MAPASYNC;
        /// Tie reader locktable slots to transactions instead of threads.
        const NO_TLS = lmdb_sys::MDB_NOTLS;
        /// Don't do any locking; the caller manages concurrency.
        const NO_LOCK = lmdb_sys::MDB_NOLOCK;
        /// Don't do readahead.
        const NO_READAHEAD = lmdb_sys::MDB_NORDAHEAD;
        /// Don't initialize malloc'd memory before writing to the datafile.
        const NO_MEM_INIT = lmdb_sys::MDB_NOMEMINIT;
    }
}

/// Arguments for environment initialization.
///
/// Defaults: 10 MiB map, 32 named databases, 126 reader slots, no extra
/// flags.
#[derive(Clone, Copy, Debug)]
pub struct EnvironmentArguments {
    /// Size of the memory map. Should be a multiple of the OS page size.
    map_size: usize,
    /// Maximum number of named databases in the environment.
    max_dbs: u32,
    /// Maximum number of reader slots.
    max_readers: u32,
    /// Environment flags.
    flags: EnvironmentFlags,
}

impl Default for EnvironmentArguments {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentArguments {
    /// Creates arguments with the default geometry.
    pub const fn new() -> Self {
        Self {
            map_size: 10 * MEGABYTE,
            max_dbs: 32,
            max_readers: 126,
            flags: EnvironmentFlags::empty(),
        }
    }

    /// Sets the size of the memory map, the maximum database size in bytes.
    pub const fn with_map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }

    /// Sets the maximum number of named databases.
    pub const fn with_max_dbs(mut self, max_dbs: u32) -> Self {
        self.max_dbs = max_dbs;
        self
    }

    /// Sets the maximum number of reader slots.
    pub const fn with_max_readers(mut self, max_readers: u32) -> Self {
        self.max_readers = max_readers;
        self
    }

    /// Sets the environment flags.
    pub const fn with_flags(mut self, flags: EnvironmentFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Opens the environment at `path` with these arguments.
    pub fn open(self, path: &Path) -> Result<Environment> {
        Environment::open(path, self)
    }
}

/// Owns the raw environment handle. Closed exactly once, on last drop.
struct EnvInner {
    ptr: *mut lmdb_sys::MDB_env,
}

// The environment handle itself is safe to use from any thread; per-thread
// constraints apply to transactions, which are !Send by construction.
unsafe impl Send for EnvInner {}
unsafe impl Sync for EnvInner {}

impl Drop for EnvInner {
    fn drop(&mut self) {
        unsafe { lmdb_sys::mdb_env_close(self.ptr) };
    }
}

/// An LMDB environment: one memory-mapped file holding up to `max_dbs`
/// named databases.
///
/// Cheap to clone; all clones share one underlying handle. Databases,
/// queries, and scans keep the environment alive through that shared
/// handle, so it is released only after the last user is gone.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvInner>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}

impl Environment {
    /// Opens the environment at `path` with the given arguments.
    ///
    /// The path must name an existing, writable directory (or file, with
    /// [`EnvironmentFlags::NO_SUB_DIR`]). `NO_TLS` is always added so that
    /// multiple read transactions can coexist on a single thread; without it
    /// a second concurrent scan on the same thread would fail to start.
    pub fn open(path: &Path, args: EnvironmentArguments) -> Result<Self> {
        let c_path = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or(DbError::InvalidParameter)?;

        let mut ptr = ptr::null_mut();
        unsafe {
            check(lmdb_sys::mdb_env_create(&mut ptr))?;
        }

        // The handle must be torn down by hand until it is owned below.
        let result = (|| {
            let flags = args.flags | EnvironmentFlags::NO_TLS;
            unsafe {
                check(lmdb_sys::mdb_env_set_maxdbs(ptr, args.max_dbs))?;
                check(lmdb_sys::mdb_env_set_maxreaders(ptr, args.max_readers))?;
                check(lmdb_sys::mdb_env_set_mapsize(ptr, args.map_size))?;
                check(lmdb_sys::mdb_env_open(
                    ptr,
                    c_path.as_ptr(),
                    flags.bits(),
                    0o755,
                ))
            }
        })();

        if let Err(err) = result {
            unsafe { lmdb_sys::mdb_env_close(ptr) };
            return Err(err);
        }

        tracing::debug!(
            target: "rangedb::env",
            path = %path.display(),
            map_size = args.map_size,
            max_dbs = args.max_dbs,
            max_readers = args.max_readers,
            "opened environment"
        );

        Ok(Self { inner: Arc::new(EnvInner { ptr }) })
    }

    /// Begins a read-only transaction.
    pub fn begin_ro(&self) -> Result<Transaction<Ro>> {
        Transaction::begin(self)
    }

    /// Begins a read-write transaction.
    pub fn begin_rw(&self) -> Result<Transaction<Rw>> {
        Transaction::begin(self)
    }

    /// Flushes buffered data to disk, forcing a synchronous flush.
    pub fn sync(&self) -> Result<()> {
        unsafe { check(lmdb_sys::mdb_env_sync(self.ptr(), 1)) }
    }

    pub(crate) fn ptr(&self) -> *mut lmdb_sys::MDB_env {
        self.inner.ptr
    }
}
