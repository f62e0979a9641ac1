//! Synthetic font binaries for fos-shape tests
//!
//! Everything here is built in memory: [`BeBuffer`] writes big-endian
//! scalars, [`Subtable`] links child tables by offset, [`FontBuilder`]
//! wraps tables in an sfnt directory. The [`fonts`] module assembles the
//! small fonts the shaping tests run against.

use std::collections::BTreeMap;

pub mod fonts;
pub mod layout;
pub mod tables;

/// Glyph ids shared by every font in [`fonts`]
pub mod glyphs {
    pub const NOTDEF: u16 = 0;
    pub const SPACE: u16 = 1;
    pub const A: u16 = 2;
    pub const V: u16 = 3;
    pub const F: u16 = 4;
    pub const I: u16 = 5;
    pub const F_I: u16 = 6;
    pub const F_F_I: u16 = 7;
    pub const A_LOWER: u16 = 8;
    pub const ACUTE: u16 = 9;
    pub const GRAVE: u16 = 10;
    pub const BEH: u16 = 11;
    pub const BEH_INIT: u16 = 12;
    pub const BEH_MEDI: u16 = 13;
    pub const BEH_FINA: u16 = 14;
    pub const ALEF: u16 = 15;
    pub const ALEF_FINA: u16 = 16;
    pub const KA: u16 = 17;
    pub const I_MATRA: u16 = 18;
    pub const X: u16 = 19;

    pub const COUNT: u16 = 20;
}

/// A value with a fixed big-endian encoding
pub trait Scalar: Copy {
    fn write(self, out: &mut Vec<u8>);
}

macro_rules! be_scalar {
    ($($ty:ty),*) => {
        $(impl Scalar for $ty {
            fn write(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_be_bytes());
            }
        })*
    };
}

be_scalar!(u8, i8, u16, i16, u32, i32);

impl Scalar for [u8; 4] {
    fn write(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self);
    }
}

/// A buffer of big-endian bytes
#[derive(Debug, Clone, Default)]
pub struct BeBuffer(Vec<u8>);

impl BeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write any scalar to this buffer
    pub fn push(mut self, item: impl Scalar) -> Self {
        item.write(&mut self.0);
        self
    }

    /// Write multiple scalars into the buffer
    pub fn extend<T: Scalar>(mut self, iter: impl IntoIterator<Item = T>) -> Self {
        for item in iter {
            item.write(&mut self.0);
        }
        self
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl std::ops::Deref for BeBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<BeBuffer> for Vec<u8> {
    fn from(buffer: BeBuffer) -> Self {
        buffer.0
    }
}

#[derive(Debug, Clone, Copy)]
enum OffsetWidth {
    Short,
    Long,
}

/// A table whose header points at child tables. Children are appended
/// after the header, in the order their offsets were written; offsets
/// are relative to the start of this table.
#[derive(Debug, Clone, Default)]
pub struct Subtable {
    header: BeBuffer,
    children: Vec<(usize, OffsetWidth, Vec<u8>)>,
}

impl Subtable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, item: impl Scalar) -> Self {
        self.header = self.header.push(item);
        self
    }

    pub fn extend<T: Scalar>(mut self, iter: impl IntoIterator<Item = T>) -> Self {
        self.header = self.header.extend(iter);
        self
    }

    /// 16-bit offset to `child`
    pub fn offset16(mut self, child: impl Into<Vec<u8>>) -> Self {
        self.children.push((self.header.len(), OffsetWidth::Short, child.into()));
        self.header = self.header.push(0u16);
        self
    }

    /// 32-bit offset to `child`
    pub fn offset32(mut self, child: impl Into<Vec<u8>>) -> Self {
        self.children.push((self.header.len(), OffsetWidth::Long, child.into()));
        self.header = self.header.push(0u32);
        self
    }

    /// 16-bit offsets to each child, in order
    pub fn offsets16(self, children: impl IntoIterator<Item = Vec<u8>>) -> Self {
        children.into_iter().fold(self, Subtable::offset16)
    }

    /// A zero offset, meaning "absent"
    pub fn null_offset(self) -> Self {
        self.push(0u16)
    }

    /// Optional child behind a nullable 16-bit offset
    pub fn nullable16(self, child: Option<Vec<u8>>) -> Self {
        match child {
            Some(child) => self.offset16(child),
            None => self.null_offset(),
        }
    }

    pub fn build(self) -> Vec<u8> {
        let mut data = self.header.into_vec();
        for (slot, width, child) in self.children {
            let offset = data.len();
            match width {
                OffsetWidth::Short => {
                    let offset = u16::try_from(offset).expect("16-bit offset overflow");
                    data[slot..slot + 2].copy_from_slice(&offset.to_be_bytes());
                }
                OffsetWidth::Long => {
                    let offset = u32::try_from(offset).expect("32-bit offset overflow");
                    data[slot..slot + 4].copy_from_slice(&offset.to_be_bytes());
                }
            }
            data.extend(child);
        }
        data
    }
}

impl From<Subtable> for Vec<u8> {
    fn from(table: Subtable) -> Self {
        table.build()
    }
}

/// OpenType checksum: wrapping sum of big-endian words, zero padded
pub fn checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}

/// Builds a single-face sfnt. Tables are written in tag order, each
/// padded to four bytes.
#[derive(Debug, Clone, Default)]
pub struct FontBuilder {
    tables: BTreeMap<[u8; 4], Vec<u8>>,
}

impl FontBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table
    pub fn table(mut self, tag: &[u8; 4], data: impl Into<Vec<u8>>) -> Self {
        self.tables.insert(*tag, data.into());
        self
    }

    /// Remove a table
    pub fn without(mut self, tag: &[u8; 4]) -> Self {
        self.tables.remove(tag);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        self.build_at(0)
    }

    /// Serialize with table offsets relative to `base`, the position of
    /// this face inside a larger file
    fn build_at(&self, base: usize) -> Vec<u8> {
        let num_tables = self.tables.len() as u16;
        let (search_range, entry_selector, range_shift) = search_params(num_tables);
        let mut header = BeBuffer::new()
            .push(0x0001_0000u32)
            .push(num_tables)
            .push(search_range)
            .push(entry_selector)
            .push(range_shift);

        let mut offset = base + 12 + 16 * self.tables.len();
        let mut body = Vec::new();
        for (tag, data) in &self.tables {
            header = header
                .push(*tag)
                .push(checksum(data))
                .push(offset as u32)
                .push(data.len() as u32);
            body.extend_from_slice(data);
            let padded = data.len().next_multiple_of(4);
            body.resize(body.len() + padded - data.len(), 0);
            offset += padded;
        }

        let mut out = header.into_vec();
        out.extend(body);
        out
    }
}

fn search_params(num_tables: u16) -> (u16, u16, u16) {
    if num_tables == 0 {
        return (0, 0, 0);
    }
    let entry_selector = 15 - num_tables.leading_zeros() as u16;
    let search_range = (1u16 << entry_selector) * 16;
    (search_range, entry_selector, num_tables * 16 - search_range)
}

/// Pack faces into a TrueType Collection
pub fn build_collection(faces: &[FontBuilder]) -> Vec<u8> {
    let header_len = 12 + 4 * faces.len();
    let mut header = BeBuffer::new()
        .push(*b"ttcf")
        .push(0x0001_0000u32)
        .push(faces.len() as u32);
    let mut body = Vec::new();
    for face in faces {
        let start = header_len + body.len();
        header = header.push(start as u32);
        body.extend(face.build_at(start));
    }
    let mut out = header.into_vec();
    out.extend(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_point_at_children() {
        let data = Subtable::new()
            .push(7u16)
            .offset16(vec![0xAA, 0xBB])
            .offset32(vec![0xCC])
            .build();
        assert_eq!(data, vec![0, 7, 0, 8, 0, 0, 0, 10, 0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn directory_is_sorted_and_padded() {
        let data = FontBuilder::new()
            .table(b"zzzz", vec![1])
            .table(b"aaaa", vec![2, 3])
            .build();
        assert_eq!(&data[12..16], b"aaaa");
        assert_eq!(&data[28..32], b"zzzz");
        assert_eq!(data.len(), 12 + 32 + 8);
    }

    #[test]
    fn collection_offsets_are_absolute() {
        let face = FontBuilder::new().table(b"abcd", vec![9, 9, 9, 9]);
        let ttc = build_collection(&[face.clone(), face]);
        let second = u32::from_be_bytes(ttc[16..20].try_into().unwrap()) as usize;
        let table_offset = u32::from_be_bytes(ttc[second + 20..second + 24].try_into().unwrap()) as usize;
        assert_eq!(&ttc[table_offset..table_offset + 4], &[9, 9, 9, 9]);
    }

    #[test]
    fn search_params_follow_powers_of_two() {
        assert_eq!(search_params(1), (16, 0, 0));
        assert_eq!(search_params(5), (64, 2, 16));
        assert_eq!(search_params(8), (128, 3, 0));
    }
}
