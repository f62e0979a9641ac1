//! Font faces
//!
//! A [`Face`] is one font of a blob: its table directory, the header
//! metrics every shaping call needs, and lazily parsed layout tables.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use super::blob::Blob;
use super::parser::{
    self, tags, BoundingBox, CmapSubtable, GlyphId, HeadTable, HheaTable, MaxpTable, ParseError,
    TableDirectory,
};
use crate::layout::{Gdef, GposTable, GsubTable, LayoutTable};
use crate::tag::Tag;
use crate::ShapeError;

static NEXT_FACE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique face identity, used in shape plan keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FaceId(u64);

/// One face of a font blob. Cloning shares the parsed data.
#[derive(Clone)]
pub struct Face {
    inner: Arc<FaceInner>,
}

struct FaceInner {
    id: FaceId,
    index: u32,
    blob: Blob,
    directory: TableDirectory,
    units_per_em: u16,
    glyph_count: u16,
    loca_long: bool,
    hhea: Option<HheaTable>,
    vhea: Option<HheaTable>,
    cmap: Option<CmapSubtable>,
    gdef: OnceLock<Option<Gdef>>,
    gsub: OnceLock<Result<Option<GsubTable>, ShapeError>>,
    gpos: OnceLock<Result<Option<GposTable>, ShapeError>>,
}

impl Face {
    /// Load face `index` from a blob
    pub fn from_blob(blob: Blob, index: u32) -> Result<Self, ParseError> {
        let data = blob.as_bytes();
        let directory = TableDirectory::parse(data, index)?;

        let table = |tag: Tag| directory.get(tag).map(|r| &data[r.range()]);
        let malformed = |tag: Tag| move |_: ParseError| ParseError::MalformedTable { tag };

        let head = table(tags::HEAD)
            .map(|d| HeadTable::parse(d).map_err(malformed(tags::HEAD)))
            .transpose()?;
        let maxp = table(tags::MAXP)
            .map(|d| MaxpTable::parse(d).map_err(malformed(tags::MAXP)))
            .transpose()?;
        let hhea = table(tags::HHEA)
            .map(|d| HheaTable::parse(d).map_err(malformed(tags::HHEA)))
            .transpose()?;
        let vhea = table(tags::VHEA)
            .map(|d| HheaTable::parse(d).map_err(malformed(tags::VHEA)))
            .transpose()?;
        let cmap = table(tags::CMAP).and_then(CmapSubtable::select);

        let units_per_em = head
            .as_ref()
            .map_or(HeadTable::DEFAULT_UNITS_PER_EM, |h| h.units_per_em);
        let loca_long = head.as_ref().is_some_and(|h| h.index_to_loc_format != 0);
        let glyph_count = maxp.map_or(0, |m| m.num_glyphs);

        let id = FaceId(NEXT_FACE_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(
            face = id.0,
            index,
            tables = directory.len(),
            units_per_em,
            glyph_count,
            has_cmap = cmap.is_some(),
            "loaded face"
        );

        Ok(Self {
            inner: Arc::new(FaceInner {
                id,
                index,
                blob,
                directory,
                units_per_em,
                glyph_count,
                loca_long,
                hhea,
                vhea,
                cmap,
                gdef: OnceLock::new(),
                gsub: OnceLock::new(),
                gpos: OnceLock::new(),
            }),
        })
    }

    /// Load face `index` from owned bytes
    pub fn from_bytes(data: impl Into<Arc<[u8]>>, index: u32) -> Result<Self, ParseError> {
        Self::from_blob(Blob::new(data), index)
    }

    /// Identity of this face, stable for its lifetime
    pub fn id(&self) -> FaceId {
        self.inner.id
    }

    /// Index inside a collection
    pub fn index(&self) -> u32 {
        self.inner.index
    }

    /// The blob this face was loaded from
    pub fn blob(&self) -> &Blob {
        &self.inner.blob
    }

    /// Raw table bytes; absence is not an error
    pub fn table(&self, tag: Tag) -> Option<&[u8]> {
        let record = self.inner.directory.get(tag)?;
        self.inner.blob.as_bytes().get(record.range())
    }

    /// True if the face has `tag`
    pub fn has_table(&self, tag: Tag) -> bool {
        self.inner.directory.get(tag).is_some()
    }

    /// Tags of all tables in the face
    pub fn table_tags(&self) -> Vec<Tag> {
        self.inner.directory.tags().collect()
    }

    /// Verify a table against its directory checksum. Absent tables verify trivially.
    pub fn verify_checksum(&self, tag: Tag) -> Result<(), ParseError> {
        let Some(record) = self.inner.directory.get(tag) else {
            return Ok(());
        };
        let data = self.inner.blob.as_bytes();
        let bytes = data.get(record.range()).ok_or(ParseError::TableOutOfBounds { tag })?;

        let computed = if tag == tags::HEAD && bytes.len() >= 12 {
            // checkSumAdjustment is excluded from the head checksum
            let mut copy = bytes.to_vec();
            copy[8..12].fill(0);
            parser::table_checksum(&copy)
        } else {
            parser::table_checksum(bytes)
        };

        if computed != record.checksum {
            tracing::debug!(%tag, expected = record.checksum, computed, "checksum mismatch");
            return Err(ParseError::ChecksumMismatch { tag });
        }
        Ok(())
    }

    pub fn units_per_em(&self) -> u16 {
        self.inner.units_per_em
    }

    pub fn glyph_count(&self) -> u16 {
        self.inner.glyph_count
    }

    /// Nominal glyph for a character
    pub fn glyph_index(&self, c: char) -> Option<GlyphId> {
        let subtable = self.inner.cmap.as_ref()?;
        subtable.map_char(self.table(tags::CMAP)?, c)
    }

    /// Horizontal advance in font units; 0 without hhea / hmtx
    pub fn glyph_hor_advance(&self, glyph: GlyphId) -> u16 {
        self.long_metric(self.inner.hhea.as_ref(), tags::HMTX, glyph).unwrap_or(0)
    }

    /// Vertical advance in font units, if the face has vhea / vmtx
    pub fn glyph_ver_advance(&self, glyph: GlyphId) -> Option<u16> {
        self.long_metric(self.inner.vhea.as_ref(), tags::VMTX, glyph)
    }

    fn long_metric(&self, header: Option<&HheaTable>, tag: Tag, glyph: GlyphId) -> Option<u16> {
        let count = header?.number_of_long_metrics;
        if count == 0 {
            return None;
        }
        let data = self.table(tag)?;
        // Glyphs past the long metrics repeat the last advance
        let index = glyph.0.min(count - 1) as usize;
        parser::FontReader::new(data).read_u16_at(index * 4).ok()
    }

    /// Horizontal ascender in font units (hhea, else the em box)
    pub fn ascender(&self) -> i16 {
        self.inner.hhea.as_ref().map_or_else(
            || (self.units_per_em() as i32 * 4 / 5) as i16,
            |h| h.ascender,
        )
    }

    /// Horizontal descender in font units, usually negative
    pub fn descender(&self) -> i16 {
        self.inner.hhea.as_ref().map_or_else(
            || -((self.units_per_em() as i32 / 5) as i16),
            |h| h.descender,
        )
    }

    pub fn line_gap(&self) -> i16 {
        self.inner.hhea.as_ref().map_or(0, |h| h.line_gap)
    }

    /// Outline bounding box from glyf / loca
    pub fn glyph_bounding_box(&self, glyph: GlyphId) -> Option<BoundingBox> {
        let glyf = self.table(tags::GLYF)?;
        let loca = self.table(tags::LOCA)?;
        parser::glyf::bounding_box(glyf, loca, glyph, self.inner.loca_long)
    }

    /// Glyph definition table. A malformed GDEF is treated as absent.
    pub fn gdef(&self) -> Option<&Gdef> {
        self.inner
            .gdef
            .get_or_init(|| {
                let data = self.table(tags::GDEF)?;
                let gdef = Gdef::parse(data);
                if gdef.is_none() {
                    tracing::debug!(face = self.inner.id.0, "ignoring malformed GDEF");
                }
                gdef
            })
            .as_ref()
    }

    /// Glyph substitution table; `Err` if present but unusable
    pub fn gsub(&self) -> Result<Option<&GsubTable>, ShapeError> {
        self.inner
            .gsub
            .get_or_init(|| self.table(tags::GSUB).map(LayoutTable::parse).transpose())
            .as_ref()
            .map(Option::as_ref)
            .map_err(Clone::clone)
    }

    /// Glyph positioning table; `Err` if present but unusable
    pub fn gpos(&self) -> Result<Option<&GposTable>, ShapeError> {
        self.inner
            .gpos
            .get_or_init(|| self.table(tags::GPOS).map(LayoutTable::parse).transpose())
            .as_ref()
            .map(Option::as_ref)
            .map_err(Clone::clone)
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Face")
            .field("id", &self.inner.id)
            .field("index", &self.inner.index)
            .field("tables", &self.inner.directory.len())
            .finish()
    }
}

/// Number of faces in a blob (0 if it is not a font)
pub fn face_count(blob: &Blob) -> u32 {
    parser::face_count(blob.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_shape_test_data::{fonts, FontBuilder};

    #[test]
    fn test_face_ids_unique() {
        let data = fonts::simple();
        let a = Face::from_bytes(data.clone(), 0).unwrap();
        let b = Face::from_bytes(data, 0).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn test_missing_header_tables_default() {
        let face = Face::from_bytes(FontBuilder::new().table(b"abcd", vec![0; 4]).build(), 0).unwrap();
        assert_eq!(face.units_per_em(), 1000);
        assert_eq!(face.glyph_count(), 0);
        assert_eq!(face.glyph_hor_advance(GlyphId(3)), 0);
        assert!(face.glyph_index('A').is_none());
    }

    #[test]
    fn test_truncated_head_is_malformed() {
        let data = FontBuilder::new().table(b"head", vec![0; 10]).build();
        assert_eq!(
            Face::from_bytes(data, 0).unwrap_err(),
            ParseError::MalformedTable { tag: tags::HEAD }
        );
    }

    #[test]
    fn test_advance_repeats_last_metric() {
        let face = Face::from_bytes(fonts::simple(), 0).unwrap();
        let last = face.glyph_count() - 1;
        let last_advance = face.glyph_hor_advance(GlyphId(last));
        assert_eq!(face.glyph_hor_advance(GlyphId(last + 10)), last_advance);
    }

    #[test]
    fn test_checksums() {
        let data = fonts::simple();
        let face = Face::from_bytes(data.clone(), 0).unwrap();
        for tag in face.table_tags() {
            face.verify_checksum(tag).unwrap();
        }

        // Flip a byte inside hmtx
        let record = TableDirectory::parse(&data, 0).unwrap().get(tags::HMTX).copied().unwrap();
        let mut corrupt = data;
        corrupt[record.offset as usize] ^= 0xFF;
        let face = Face::from_bytes(corrupt, 0).unwrap();
        assert_eq!(
            face.verify_checksum(tags::HMTX).unwrap_err(),
            ParseError::ChecksumMismatch { tag: tags::HMTX }
        );
    }

    #[test]
    fn test_face_count() {
        assert_eq!(face_count(&Blob::new(fonts::simple())), 1);
        assert_eq!(face_count(&Blob::new(vec![1, 2, 3])), 0);
    }
}
