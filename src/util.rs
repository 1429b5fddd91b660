//! Conversions between byte slices and the engine's value struct.

use std::ptr;

/// Wraps a byte slice in an `MDB_val` without copying.
///
/// The engine never writes through the pointer on get/put paths; the mutable
/// pointer is an artifact of the C signature.
pub(crate) fn slice_to_val(slice: &[u8]) -> lmdb_sys::MDB_val {
    lmdb_sys::MDB_val {
        mv_size: slice.len(),
        mv_data: slice.as_ptr() as *mut libc::c_void,
    }
}

/// An `MDB_val` pointing at nothing, for out-parameters.
pub(crate) fn empty_val() -> lmdb_sys::MDB_val {
    lmdb_sys::MDB_val { mv_size: 0, mv_data: ptr::null_mut() }
}

/// Copies the bytes an `MDB_val` points at into an owned vector.
///
/// # Safety
///
/// `val` must point at `mv_size` readable bytes, which holds for any value
/// the engine returned from a successful call within the current
/// transaction.
pub(crate) unsafe fn val_to_vec(val: &lmdb_sys::MDB_val) -> Vec<u8> {
    if val.mv_size == 0 || val.mv_data.is_null() {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(val.mv_data as *const u8, val.mv_size) }.to_vec()
}
