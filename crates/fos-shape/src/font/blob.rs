//! Immutable font bytes

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Shared, immutable byte buffer holding font data.
///
/// Cloning is cheap; sub-blobs share the parent's storage.
#[derive(Clone)]
pub struct Blob {
    data: Arc<[u8]>,
    range: Range<usize>,
}

impl Blob {
    /// Wrap owned bytes
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let range = 0..data.len();
        Self { data, range }
    }

    /// Copy a static byte slice
    pub fn from_static(data: &'static [u8]) -> Self {
        Self::new(data)
    }

    /// Empty blob
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// View of `len` bytes starting at `offset`, clamped to this blob
    pub fn sub_blob(&self, offset: usize, len: usize) -> Blob {
        let start = (self.range.start + offset).min(self.range.end);
        let end = start.saturating_add(len).min(self.range.end);
        Self {
            data: Arc::clone(&self.data),
            range: start..end,
        }
    }

    /// The bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_blob_shares_and_clamps() {
        let blob = Blob::new(vec![1, 2, 3, 4, 5]);
        let sub = blob.sub_blob(1, 3);
        assert_eq!(sub.as_bytes(), &[2, 3, 4]);

        let nested = sub.sub_blob(2, 10);
        assert_eq!(nested.as_bytes(), &[4]);

        let past_end = blob.sub_blob(9, 1);
        assert!(past_end.is_empty());
    }

    #[test]
    fn test_empty_blob() {
        assert_eq!(Blob::empty().len(), 0);
    }
}
