//! Font Parser
//!
//! From-scratch sfnt / TrueType Collection parser. The table directory is
//! validated eagerly (every table must lie inside the blob); checksums are
//! only computed on request.

pub mod reader;
pub mod cmap;
pub mod glyf;
mod tables;

pub use reader::FontReader;
pub use cmap::CmapSubtable;
pub use glyf::BoundingBox;
pub use tables::{HeadTable, HheaTable, MaxpTable};

use crate::tag::Tag;

/// Well-known table tags
pub mod tags {
    use crate::tag::Tag;

    pub const HEAD: Tag = Tag::new(b"head");
    pub const HHEA: Tag = Tag::new(b"hhea");
    pub const HMTX: Tag = Tag::new(b"hmtx");
    pub const VHEA: Tag = Tag::new(b"vhea");
    pub const VMTX: Tag = Tag::new(b"vmtx");
    pub const MAXP: Tag = Tag::new(b"maxp");
    pub const CMAP: Tag = Tag::new(b"cmap");
    pub const GLYF: Tag = Tag::new(b"glyf");
    pub const LOCA: Tag = Tag::new(b"loca");
    pub const GDEF: Tag = Tag::new(b"GDEF");
    pub const GSUB: Tag = Tag::new(b"GSUB");
    pub const GPOS: Tag = Tag::new(b"GPOS");
}

/// Glyph identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GlyphId(pub u16);

impl GlyphId {
    /// The `.notdef` glyph, used for unmapped characters
    pub const NOTDEF: GlyphId = GlyphId(0);
}

/// Font parsing error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("malformed sfnt header or table directory")]
    MalformedDirectory,

    #[error("table '{tag}' extends past the end of the font data")]
    TableOutOfBounds { tag: Tag },

    #[error("face index {index} out of range (font has {count} faces)")]
    FaceIndexOutOfRange { index: u32, count: u32 },

    #[error("malformed '{tag}' table")]
    MalformedTable { tag: Tag },

    #[error("checksum mismatch in '{tag}' table")]
    ChecksumMismatch { tag: Tag },

    #[error("unexpected end of data")]
    UnexpectedEof,
}

const TTC_MAGIC: u32 = 0x7474_6366; // 'ttcf'
const SFNT_TRUETYPE: u32 = 0x0001_0000;
const SFNT_OPENTYPE: u32 = 0x4F54_544F; // 'OTTO'
const SFNT_APPLE: u32 = 0x7472_7565; // 'true'

/// Table directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    pub tag: Tag,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

impl TableRecord {
    /// Byte range of the table inside the blob
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.length as usize
    }
}

/// Tag-indexed table directory of one face
#[derive(Debug, Clone, Default)]
pub struct TableDirectory {
    /// Sorted by tag
    records: Vec<TableRecord>,
}

impl TableDirectory {
    /// Parse the directory of face `index`
    pub fn parse(data: &[u8], index: u32) -> Result<Self, ParseError> {
        let mut reader = FontReader::new(data);
        let magic = reader.read_u32().map_err(|_| ParseError::MalformedDirectory)?;

        let offset = if magic == TTC_MAGIC {
            let (count, offset) = collection_offset(data, index)?;
            tracing::trace!(index, count, offset, "reading collection member");
            offset
        } else {
            if index != 0 {
                return Err(ParseError::FaceIndexOutOfRange { index, count: 1 });
            }
            0
        };

        Self::parse_offset_table(data, offset)
    }

    fn parse_offset_table(data: &[u8], offset: usize) -> Result<Self, ParseError> {
        let malformed = |_| ParseError::MalformedDirectory;
        let mut reader = FontReader::at(data, offset).map_err(malformed)?;

        match reader.read_u32().map_err(malformed)? {
            SFNT_TRUETYPE | SFNT_OPENTYPE | SFNT_APPLE => {}
            _ => return Err(ParseError::MalformedDirectory),
        }

        let num_tables = reader.read_u16().map_err(malformed)?;
        reader.skip(6).map_err(malformed)?; // search range, entry selector, range shift

        let mut records = Vec::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            let tag = reader.read_tag().map_err(malformed)?;
            let checksum = reader.read_u32().map_err(malformed)?;
            let table_offset = reader.read_u32().map_err(malformed)?;
            let length = reader.read_u32().map_err(malformed)?;

            if table_offset as u64 + length as u64 > data.len() as u64 {
                return Err(ParseError::TableOutOfBounds { tag });
            }

            records.push(TableRecord {
                tag,
                checksum,
                offset: table_offset,
                length,
            });
        }

        // First record wins for duplicate tags
        records.sort_by_key(|r| r.tag);
        records.dedup_by_key(|r| r.tag);

        Ok(Self { records })
    }

    /// Look up a table record
    pub fn get(&self, tag: Tag) -> Option<&TableRecord> {
        self.records
            .binary_search_by_key(&tag, |r| r.tag)
            .ok()
            .map(|i| &self.records[i])
    }

    /// Tags of all tables, sorted
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.records.iter().map(|r| r.tag)
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the directory has no tables
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read the collection header; returns (face count, offset of face `index`)
fn collection_offset(data: &[u8], index: u32) -> Result<(u32, usize), ParseError> {
    let malformed = |_| ParseError::MalformedDirectory;
    let mut reader = FontReader::at(data, 4).map_err(malformed)?;
    let _version = reader.read_u32().map_err(malformed)?;
    let count = reader.read_u32().map_err(malformed)?;
    if index >= count {
        return Err(ParseError::FaceIndexOutOfRange { index, count });
    }
    reader.skip(index as usize * 4).map_err(malformed)?;
    let offset = reader.read_u32().map_err(malformed)?;
    Ok((count, offset as usize))
}

/// Number of faces in a blob: N for a collection, 1 for a plain sfnt,
/// 0 for anything unrecognized.
pub fn face_count(data: &[u8]) -> u32 {
    let mut reader = FontReader::new(data);
    match reader.read_u32() {
        Ok(TTC_MAGIC) => {
            let _version = reader.read_u32();
            reader.read_u32().unwrap_or(0)
        }
        Ok(SFNT_TRUETYPE | SFNT_OPENTYPE | SFNT_APPLE) => 1,
        _ => 0,
    }
}

/// OpenType table checksum: wrapping sum of big-endian u32 words,
/// zero-padded to a multiple of four bytes.
pub fn table_checksum(data: &[u8]) -> u32 {
    data.chunks(4).fold(0u32, |sum, chunk| {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum.wrapping_add(u32::from_be_bytes(word))
    })
}
