use std::{fmt, ops::Deref, sync::Arc};

/// SharedBytes is a reference-counted, sliceable byte buffer.
///
/// It holds an `Arc<[u8]>` plus a (start, len) view. A chunk payload always
/// carries its own length; views never reach past the bytes they were cut from.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedBytes {
    data: Arc<[u8]>,
    start: usize,
    len: usize,
}

impl SharedBytes {
    /// Creates a new SharedBytes from a Vec by taking ownership.
    pub fn from_vec(vec: Vec<u8>) -> Self {
        let arc: Arc<[u8]> = Arc::from(vec.into_boxed_slice());
        let len = arc.len();
        Self { data: arc, start: 0, len }
    }

    /// Copies a borrowed slice into a new buffer.
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self::from_arc(Arc::from(bytes))
    }

    /// Creates a new SharedBytes from an Arc<[u8]> covering the full slice.
    pub fn from_arc(data: Arc<[u8]>) -> Self {
        let len = data.len();
        Self { data, start: 0, len }
    }

    /// Creates a sub-slice view without copying, or None if the range is out of bounds.
    pub fn slice(&self, start: usize, len: usize) -> Option<Self> {
        let end = start.checked_add(len)?;
        if end > self.len {
            return None;
        }
        Some(Self { data: self.data.clone(), start: self.start + start, len })
    }

    /// Splits the view into consecutive pieces of at most `max_len` bytes.
    ///
    /// An empty buffer yields no pieces. `max_len` of zero is treated as one.
    pub fn pieces(&self, max_len: usize) -> impl Iterator<Item = SharedBytes> + '_ {
        let step = max_len.max(1);
        (0..self.len).step_by(step).map(move |offset| Self {
            data: self.data.clone(),
            start: self.start + offset,
            len: step.min(self.len - offset),
        })
    }

    /// Returns the current view as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..self.start + self.len]
    }

    /// Returns the length of the current view.
    pub fn len(&self) -> usize { self.len }

    /// Returns true if the view is empty.
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Copies the view into an owned vector.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }
}

impl Default for SharedBytes {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl Deref for SharedBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for SharedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBytes")
            .field("len", &self.len)
            .field("ref_count", &Arc::strong_count(&self.data))
            .finish()
    }
}

impl From<Vec<u8>> for SharedBytes {
    fn from(v: Vec<u8>) -> Self { Self::from_vec(v) }
}

impl From<&[u8]> for SharedBytes {
    fn from(s: &[u8]) -> Self { Self::copy_from_slice(s) }
}

impl From<Arc<[u8]>> for SharedBytes {
    fn from(a: Arc<[u8]>) -> Self { Self::from_arc(a) }
}

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] { self.as_slice() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_bounds() {
        let bytes = SharedBytes::from_vec(vec![1, 2, 3, 4, 5]);
        assert_eq!(bytes.slice(1, 3).unwrap().as_slice(), &[2, 3, 4]);
        assert_eq!(bytes.slice(5, 0).unwrap().len(), 0);
        assert!(bytes.slice(4, 2).is_none());
        assert!(bytes.slice(usize::MAX, 2).is_none());
    }

    #[test]
    fn test_nested_slice_is_relative() {
        let bytes = SharedBytes::from_vec((0..10).collect());
        let outer = bytes.slice(2, 6).unwrap();
        let inner = outer.slice(1, 2).unwrap();
        assert_eq!(inner.as_slice(), &[3, 4]);
    }

    #[test]
    fn test_pieces() {
        let bytes = SharedBytes::from_vec((0..7).collect());
        let pieces: Vec<Vec<u8>> = bytes.pieces(3).map(|p| p.to_vec()).collect();
        assert_eq!(pieces, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);

        assert_eq!(SharedBytes::default().pieces(3).count(), 0);
        assert_eq!(bytes.pieces(0).count(), 7);
    }

    #[test]
    fn test_pieces_share_storage() {
        let bytes = SharedBytes::from_vec(vec![9; 8]);
        let pieces: Vec<SharedBytes> = bytes.pieces(4).collect();
        assert_eq!(Arc::strong_count(&bytes.data), 3);
        assert!(pieces.iter().all(|p| p.len() == 4));
    }
}
