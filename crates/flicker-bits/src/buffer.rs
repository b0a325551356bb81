//! Immutable reference-counted byte ranges

use std::fmt;
use std::sync::Arc;

/// Identity of a buffer view: backing allocation plus the view's range.
///
/// Two views over the same bytes of the same allocation compare equal even
/// if they were created independently. Used as the key of the decoder's
/// script cache so bytecode shared across tags is only parsed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId {
    /// Address of the backing allocation, kept as an opaque token.
    storage: usize,
    offset: usize,
    len: usize,
}

/// An immutable, cheaply-cloneable view into shared byte storage.
///
/// Cloning a `Buffer` or taking a [`Buffer::subbuffer`] never copies the
/// underlying bytes; the storage is freed when the last view is dropped.
#[derive(Clone)]
pub struct Buffer {
    data: Arc<[u8]>,
    offset: usize,
    len: usize,
}

impl Buffer {
    /// Create a buffer owning a copy of `data`.
    pub fn new(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Create a buffer taking ownership of `data` without copying.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let data: Arc<[u8]> = data.into();
        let len = data.len();
        Self {
            data,
            offset: 0,
            len,
        }
    }

    /// The empty buffer.
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Length of this view in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this view is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The bytes of this view.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.len]
    }

    /// Zero-copy sub-view of `len` bytes starting at `offset`.
    ///
    /// Returns `None` when the requested range does not fit in this view.
    pub fn subbuffer(&self, offset: usize, len: usize) -> Option<Self> {
        if offset.checked_add(len)? > self.len {
            return None;
        }
        Some(Self {
            data: Arc::clone(&self.data),
            offset: self.offset + offset,
            len,
        })
    }

    /// Identity of this view (allocation address + range).
    pub fn id(&self) -> BufferId {
        BufferId {
            storage: self.data.as_ptr() as usize,
            offset: self.offset,
            len: self.len,
        }
    }

    /// Whether `other` is a view over the same bytes of the same storage.
    pub fn same_region(&self, other: &Buffer) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({} bytes @ {})", self.len, self.offset)
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subbuffer_shares_storage() {
        let buf = Buffer::new(&[1, 2, 3, 4, 5]);
        let sub = buf.subbuffer(1, 3).unwrap();
        assert_eq!(sub.as_slice(), &[2, 3, 4]);
        let subsub = sub.subbuffer(1, 1).unwrap();
        assert_eq!(subsub.as_slice(), &[3]);
    }

    #[test]
    fn test_subbuffer_out_of_range() {
        let buf = Buffer::new(&[1, 2, 3]);
        assert!(buf.subbuffer(2, 2).is_none());
        assert!(buf.subbuffer(4, 0).is_none());
        assert!(buf.subbuffer(0, 3).is_some());
    }

    #[test]
    fn test_identity() {
        let buf = Buffer::new(&[1, 2, 3, 4]);
        let a = buf.subbuffer(1, 2).unwrap();
        let b = buf.subbuffer(1, 2).unwrap();
        let c = buf.subbuffer(1, 3).unwrap();
        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        // A distinct allocation with identical contents is a distinct identity.
        let other = Buffer::new(&[1, 2, 3, 4]);
        assert_ne!(buf.id(), other.id());
    }
}
