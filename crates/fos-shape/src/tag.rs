//! OpenType tags
//!
//! Four ASCII bytes packed big-endian into a `u32`, as stored in the font.

use std::fmt;
use std::str::FromStr;

/// 4-byte OpenType tag (table, script, language or feature)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tag(pub u32);

impl Tag {
    /// Create a tag from 4 bytes
    pub const fn new(bytes: &[u8; 4]) -> Self {
        Tag(((bytes[0] as u32) << 24)
            | ((bytes[1] as u32) << 16)
            | ((bytes[2] as u32) << 8)
            | (bytes[3] as u32))
    }

    /// Create a tag from up to 4 bytes, padding with spaces
    pub fn from_bytes_padded(bytes: &[u8]) -> Self {
        let mut padded = [b' '; 4];
        for (dst, src) in padded.iter_mut().zip(bytes) {
            *dst = *src;
        }
        Self::new(&padded)
    }

    /// Get the raw bytes
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Lowercase copy, used for case-insensitive script matching
    pub fn to_lowercase(self) -> Self {
        let mut bytes = self.to_bytes();
        bytes.make_ascii_lowercase();
        Self::new(&bytes)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.to_bytes() {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self)
    }
}

/// Error for strings that are not a valid tag
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid tag {0:?}: expected 1 to 4 printable ASCII characters")]
pub struct InvalidTag(pub String);

impl FromStr for Tag {
    type Err = InvalidTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 || !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(InvalidTag(s.to_string()));
        }
        Ok(Self::from_bytes_padded(bytes))
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Self::new(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip_bytes() {
        let tag = Tag::new(b"kern");
        assert_eq!(tag.to_bytes(), *b"kern");
        assert_eq!(tag.to_string(), "kern");
    }

    #[test]
    fn test_tag_padding() {
        let tag: Tag = "cv1".parse().unwrap();
        assert_eq!(tag, Tag::new(b"cv1 "));
    }

    #[test]
    fn test_tag_rejects_long() {
        assert!("toolong".parse::<Tag>().is_err());
        assert!("".parse::<Tag>().is_err());
    }

    #[test]
    fn test_tag_ordering_matches_bytes() {
        assert!(Tag::new(b"GDEF") < Tag::new(b"GPOS"));
        assert!(Tag::new(b"cmap") > Tag::new(b"OS/2"));
    }
}
