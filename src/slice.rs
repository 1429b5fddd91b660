//! Byte-source capability used for keys and values.

/// Anything that can expose itself as a byte buffer.
///
/// Keys and values are opaque byte sequences; this trait lets callers pass
/// raw bytes or UTF-8 text interchangeably. [`Slice::with_bytes`] lends a
/// borrowed view for the duration of a callback, [`Slice::to_bytes`]
/// materializes an owned copy.
pub trait Slice {
    /// Calls `f` with a borrowed view of this value's bytes.
    fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T;

    /// Returns an owned copy of this value's bytes.
    fn to_bytes(&self) -> Vec<u8> {
        self.with_bytes(<[u8]>::to_vec)
    }
}

impl Slice for [u8] {
    fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        f(self)
    }
}

impl<const N: usize> Slice for [u8; N] {
    fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        f(self)
    }
}

impl Slice for Vec<u8> {
    fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        f(self)
    }
}

// Text delegates to the raw-byte impl after UTF-8 encoding. `str` is always
// valid UTF-8 so no copy is involved.
impl Slice for str {
    fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        self.as_bytes().with_bytes(f)
    }
}

impl Slice for String {
    fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        self.as_str().with_bytes(f)
    }
}

impl<S: Slice + ?Sized> Slice for &S {
    fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        (**self).with_bytes(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_and_bytes_agree() {
        assert_eq!("abc".to_bytes(), b"abc".to_bytes());
        assert_eq!(String::from("abc").to_bytes(), vec![0x61, 0x62, 0x63]);
    }

    #[test]
    fn borrowed_view_matches_owned() {
        let v = vec![1u8, 2, 3];
        v.with_bytes(|b| assert_eq!(b, v.as_slice()));
        assert_eq!((&v).to_bytes(), v);
    }
}
