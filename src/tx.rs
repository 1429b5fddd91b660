//! Transaction wrapper for lmdb-sys.

use crate::{Environment, Result, error::check};
use std::{marker::PhantomData, ptr};

mod private {
    pub trait Sealed {}
    impl Sealed for super::Ro {}
    impl Sealed for super::Rw {}
}

/// Marker trait distinguishing read-only from read-write transactions.
///
/// Sealed; the only implementors are [`Ro`] and [`Rw`].
pub trait TransactionKind: private::Sealed + Send + Sync + 'static {
    /// Whether transactions of this kind are read-only.
    const ONLY_READS: bool;
}

/// Read-only transaction marker.
#[derive(Debug, Clone, Copy)]
pub struct Ro;

/// Read-write transaction marker.
#[derive(Debug, Clone, Copy)]
pub struct Rw;

impl TransactionKind for Ro {
    const ONLY_READS: bool = true;
}

impl TransactionKind for Rw {
    const ONLY_READS: bool = false;
}

/// A transaction over one [`Environment`].
///
/// Read-only transactions see a consistent snapshot taken at begin and never
/// block writers. A transaction that is neither committed nor explicitly
/// aborted is aborted on drop, so every exit path releases its reader slot
/// or write lock exactly once.
pub struct Transaction<K: TransactionKind> {
    /// Raw transaction handle. Null once committed or aborted.
    ptr: *mut lmdb_sys::MDB_txn,
    /// Keeps the environment alive for the duration of the transaction.
    env: Environment,
    _kind: PhantomData<K>,
}

impl<K: TransactionKind> std::fmt::Debug for Transaction<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("read_only", &K::ONLY_READS)
            .finish_non_exhaustive()
    }
}

impl<K: TransactionKind> Transaction<K> {
    /// Begins a new transaction in `env`.
    pub fn begin(env: &Environment) -> Result<Self> {
        let flags = if K::ONLY_READS { lmdb_sys::MDB_RDONLY } else { 0 };
        let mut ptr = ptr::null_mut();

        unsafe {
            check(lmdb_sys::mdb_txn_begin(env.ptr(), ptr::null_mut(), flags, &mut ptr))?;
        }

        Ok(Self { ptr, env: env.clone(), _kind: PhantomData })
    }

    /// Commits the transaction, making any writes durable.
    ///
    /// The underlying handle is freed whether or not the commit succeeds.
    pub fn commit(mut self) -> Result<()> {
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        unsafe { check(lmdb_sys::mdb_txn_commit(ptr)) }
    }

    /// Aborts the transaction, discarding any writes.
    pub fn abort(self) {
        // Drop does the work.
    }

    /// The environment this transaction runs in.
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn ptr(&self) -> *mut lmdb_sys::MDB_txn {
        self.ptr
    }
}

impl Transaction<Ro> {
    /// Releases this read-only transaction's snapshot while retaining the
    /// handle for [`renew`](Self::renew).
    pub fn reset(&self) {
        unsafe { lmdb_sys::mdb_txn_reset(self.ptr) };
    }

    /// Acquires a fresh snapshot on a previously [`reset`](Self::reset)
    /// transaction.
    pub fn renew(&self) -> Result<()> {
        unsafe { check(lmdb_sys::mdb_txn_renew(self.ptr)) }
    }
}

impl<K: TransactionKind> Drop for Transaction<K> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { lmdb_sys::mdb_txn_abort(self.ptr) };
        }
    }
}
