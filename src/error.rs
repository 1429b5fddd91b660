//! Error type for LMDB-backed storage.

use libc::{EACCES, EINVAL, EIO, ENOMEM, ENOSPC, c_int};

/// Error produced by environment, transaction, database, or cursor calls.
///
/// Every variant maps a status code returned by the engine; the original
/// code is preserved and recoverable through [`DbError::code`]. `NOTFOUND`
/// is not represented here on read paths — absent keys and end-of-range are
/// reported as `Ok(None)` / end of iteration, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DbError {
    /// Key/data pair already exists.
    #[error("key/data pair already exists")]
    KeyExists,
    /// Key/data pair not found. Only surfaced by write paths that require
    /// the key to exist.
    #[error("key/data pair not found")]
    NotFound,
    /// Requested page not found. Usually indicates corruption.
    #[error("requested page not found")]
    PageNotFound,
    /// Located page was of the wrong type.
    #[error("located page was of the wrong type")]
    Corrupted,
    /// Update of meta page failed or the environment had a fatal error.
    #[error("engine panic: meta page update failed or fatal environment error")]
    Panic,
    /// Environment version mismatch.
    #[error("environment version mismatch")]
    VersionMismatch,
    /// File is not a valid LMDB file.
    #[error("file is not a valid database file")]
    Invalid,
    /// Environment map size reached.
    #[error("environment map size limit reached")]
    MapFull,
    /// Environment max-databases limit reached.
    #[error("environment max-databases limit reached")]
    DbsFull,
    /// Environment max-readers limit reached.
    #[error("environment max-readers limit reached")]
    ReadersFull,
    /// Too many TLS keys in use.
    #[error("too many TLS keys in use")]
    TlsFull,
    /// Transaction has too many dirty pages.
    #[error("transaction has too many dirty pages")]
    TxnFull,
    /// Cursor stack too deep.
    #[error("cursor stack too deep")]
    CursorFull,
    /// Page has not enough space.
    #[error("page has not enough space")]
    PageFull,
    /// Database contents grew beyond the environment map size.
    #[error("database contents grew beyond the environment map size")]
    MapResized,
    /// Operation and database are incompatible, or the database type changed.
    #[error("operation and database are incompatible")]
    Incompatible,
    /// Invalid reuse of a reader locktable slot.
    #[error("invalid reuse of reader locktable slot")]
    BadReaderSlot,
    /// Transaction must abort, has a child, or is invalid.
    #[error("transaction must abort, has a child, or is invalid")]
    BadTransaction,
    /// Unsupported size of key, database name, or data.
    #[error("unsupported size of key, database name, or data")]
    BadValueSize,
    /// The specified database handle was changed unexpectedly.
    #[error("database handle was changed unexpectedly")]
    BadDbi,
    /// A key or path parameter was empty or otherwise invalid.
    #[error("invalid parameter")]
    InvalidParameter,
    /// Disk has no free space left.
    #[error("no free disk space")]
    OutOfDiskSpace,
    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,
    /// Read/write error.
    #[error("i/o error")]
    Io,
    /// File permissions error.
    #[error("access violation")]
    AccessViolation,
    /// Any other status code.
    #[error("engine status code {0}")]
    Other(c_int),
}

impl DbError {
    /// Maps a raw engine status code to a [`DbError`].
    ///
    /// The caller is expected to have handled `MDB_SUCCESS` and, on read
    /// paths, `MDB_NOTFOUND` before calling this.
    pub const fn from_code(code: c_int) -> Self {
        match code {
            lmdb_sys::MDB_KEYEXIST => Self::KeyExists,
            lmdb_sys::MDB_NOTFOUND => Self::NotFound,
            lmdb_sys::MDB_PAGE_NOTFOUND => Self::PageNotFound,
            lmdb_sys::MDB_CORRUPTED => Self::Corrupted,
            lmdb_sys::MDB_PANIC => Self::Panic,
            lmdb_sys::MDB_VERSION_MISMATCH => Self::VersionMismatch,
            lmdb_sys::MDB_INVALID => Self::Invalid,
            lmdb_sys::MDB_MAP_FULL => Self::MapFull,
            lmdb_sys::MDB_DBS_FULL => Self::DbsFull,
            lmdb_sys::MDB_READERS_FULL => Self::ReadersFull,
            lmdb_sys::MDB_TLS_FULL => Self::TlsFull,
            lmdb_sys::MDB_TXN_FULL => Self::TxnFull,
            lmdb_sys::MDB_CURSOR_FULL => Self::CursorFull,
            lmdb_sys::MDB_PAGE_FULL => Self::PageFull,
            lmdb_sys::MDB_MAP_RESIZED => Self::MapResized,
            lmdb_sys::MDB_INCOMPATIBLE => Self::Incompatible,
            lmdb_sys::MDB_BAD_RSLOT => Self::BadReaderSlot,
            lmdb_sys::MDB_BAD_TXN => Self::BadTransaction,
            lmdb_sys::MDB_BAD_VALSIZE => Self::BadValueSize,
            lmdb_sys::MDB_BAD_DBI => Self::BadDbi,
            EINVAL => Self::InvalidParameter,
            ENOSPC => Self::OutOfDiskSpace,
            ENOMEM => Self::OutOfMemory,
            EIO => Self::Io,
            EACCES => Self::AccessViolation,
            other => Self::Other(other),
        }
    }

    /// Returns the raw engine status code this error was built from.
    pub const fn code(&self) -> c_int {
        match self {
            Self::KeyExists => lmdb_sys::MDB_KEYEXIST,
            Self::NotFound => lmdb_sys::MDB_NOTFOUND,
            Self::PageNotFound => lmdb_sys::MDB_PAGE_NOTFOUND,
            Self::Corrupted => lmdb_sys::MDB_CORRUPTED,
            Self::Panic => lmdb_sys::MDB_PANIC,
            Self::VersionMismatch => lmdb_sys::MDB_VERSION_MISMATCH,
            Self::Invalid => lmdb_sys::MDB_INVALID,
            Self::MapFull => lmdb_sys::MDB_MAP_FULL,
            Self::DbsFull => lmdb_sys::MDB_DBS_FULL,
            Self::ReadersFull => lmdb_sys::MDB_READERS_FULL,
            Self::TlsFull => lmdb_sys::MDB_TLS_FULL,
            Self::TxnFull => lmdb_sys::MDB_TXN_FULL,
            Self::CursorFull => lmdb_sys::MDB_CURSOR_FULL,
            Self::PageFull => lmdb_sys::MDB_PAGE_FULL,
            Self::MapResized => lmdb_sys::MDB_MAP_RESIZED,
            Self::Incompatible => lmdb_sys::MDB_INCOMPATIBLE,
            Self::BadReaderSlot => lmdb_sys::MDB_BAD_RSLOT,
            Self::BadTransaction => lmdb_sys::MDB_BAD_TXN,
            Self::BadValueSize => lmdb_sys::MDB_BAD_VALSIZE,
            Self::BadDbi => lmdb_sys::MDB_BAD_DBI,
            Self::InvalidParameter => EINVAL,
            Self::OutOfDiskSpace => ENOSPC,
            Self::OutOfMemory => ENOMEM,
            Self::Io => EIO,
            Self::AccessViolation => EACCES,
            Self::Other(code) => *code,
        }
    }
}

/// Converts a status code into `Ok(())` or the mapped error.
pub(crate) fn check(code: c_int) -> crate::Result<()> {
    if code == 0 { Ok(()) } else { Err(DbError::from_code(code)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_engine_codes() {
        for code in [
            lmdb_sys::MDB_KEYEXIST,
            lmdb_sys::MDB_NOTFOUND,
            lmdb_sys::MDB_MAP_FULL,
            lmdb_sys::MDB_BAD_DBI,
            EINVAL,
            ENOSPC,
            -1,
        ] {
            assert_eq!(DbError::from_code(code).code(), code);
        }
    }

    #[test]
    fn unknown_codes_are_preserved() {
        assert_eq!(DbError::from_code(-12345), DbError::Other(-12345));
    }
}
