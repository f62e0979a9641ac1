//! Binary reader for font data

use super::ParseError;
use crate::tag::Tag;

/// Big-endian reader with bounds checking
#[derive(Debug, Clone)]
pub struct FontReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FontReader<'a> {
    /// Create a new reader
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a reader positioned at `offset`
    pub fn at(data: &'a [u8], offset: usize) -> Result<Self, ParseError> {
        if offset > data.len() {
            return Err(ParseError::UnexpectedEof);
        }
        Ok(Self { data, pos: offset })
    }

    /// Get current position
    pub fn pos(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        let end = self.pos.checked_add(n).ok_or(ParseError::UnexpectedEof)?;
        let bytes = self.data.get(self.pos..end).ok_or(ParseError::UnexpectedEof)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Skip bytes
    pub fn skip(&mut self, n: usize) -> Result<(), ParseError> {
        self.take(n).map(|_| ())
    }

    /// Read big-endian u16
    pub fn read_u16(&mut self) -> Result<u16, ParseError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read big-endian i16
    pub fn read_i16(&mut self) -> Result<i16, ParseError> {
        Ok(self.read_u16()? as i16)
    }

    /// Read big-endian u32
    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read 4-byte tag
    pub fn read_tag(&mut self) -> Result<Tag, ParseError> {
        Ok(Tag(self.read_u32()?))
    }

    /// Read `count` big-endian u16 values
    pub fn read_u16_array(&mut self, count: usize) -> Result<Vec<u16>, ParseError> {
        let bytes = self.take(count.checked_mul(2).ok_or(ParseError::UnexpectedEof)?)?;
        Ok(bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect())
    }

    /// Read a u16 at an absolute offset without moving
    pub fn read_u16_at(&self, offset: usize) -> Result<u16, ParseError> {
        let end = offset.checked_add(2).ok_or(ParseError::UnexpectedEof)?;
        let b = self.data.get(offset..end).ok_or(ParseError::UnexpectedEof)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Remaining bytes
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }
}
