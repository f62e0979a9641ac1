//! GDEF (Glyph Definition) table
//!
//! Glyph classes, mark attachment classes and mark glyph sets, the inputs
//! to lookup flag filtering.

use crate::font::parser::FontReader;
use crate::font::GlyphId;

use super::common::{at_nullable_offset, ClassDef, Coverage};

/// Parsed GDEF table
#[derive(Debug, Clone, Default)]
pub struct Gdef {
    glyph_classes: Option<ClassDef>,
    mark_attach_classes: Option<ClassDef>,
    mark_glyph_sets: Vec<Coverage>,
}

impl Gdef {
    /// Parse GDEF; `None` if the header or a referenced table is malformed
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        let major = reader.read_u16().ok()?;
        let minor = reader.read_u16().ok()?;
        if major != 1 {
            return None;
        }

        let glyph_class_offset = reader.read_u16().ok()?;
        let _attach_list = reader.read_u16().ok()?;
        let _lig_caret_list = reader.read_u16().ok()?;
        let mark_attach_offset = reader.read_u16().ok()?;
        let mark_sets_offset = if minor >= 2 { reader.read_u16().ok()? } else { 0 };

        let glyph_classes = match at_nullable_offset(data, glyph_class_offset)? {
            Some(d) => Some(ClassDef::parse(d)?),
            None => None,
        };
        let mark_attach_classes = match at_nullable_offset(data, mark_attach_offset)? {
            Some(d) => Some(ClassDef::parse(d)?),
            None => None,
        };
        let mark_glyph_sets = match at_nullable_offset(data, mark_sets_offset)? {
            Some(d) => Self::parse_mark_glyph_sets(d)?,
            None => Vec::new(),
        };

        Some(Self { glyph_classes, mark_attach_classes, mark_glyph_sets })
    }

    fn parse_mark_glyph_sets(data: &[u8]) -> Option<Vec<Coverage>> {
        let mut reader = FontReader::new(data);
        if reader.read_u16().ok()? != 1 {
            return None;
        }
        let count = reader.read_u16().ok()?;
        (0..count)
            .map(|_| {
                let offset = reader.read_u32().ok()? as usize;
                Coverage::parse(data.get(offset..)?)
            })
            .collect()
    }

    /// Whether the font classifies its glyphs
    pub fn has_glyph_classes(&self) -> bool {
        self.glyph_classes.is_some()
    }

    /// Glyph class: 1 base, 2 ligature, 3 mark, 4 component, 0 unclassified
    pub fn glyph_class(&self, glyph: GlyphId) -> u8 {
        self.glyph_classes.as_ref().map_or(0, |c| c.get(glyph) as u8)
    }

    pub fn mark_attach_class(&self, glyph: GlyphId) -> u8 {
        self.mark_attach_classes.as_ref().map_or(0, |c| c.get(glyph) as u8)
    }

    /// Whether a glyph belongs to mark glyph set `set`
    pub fn is_mark_glyph(&self, glyph: GlyphId, set: u16) -> bool {
        self.mark_glyph_sets
            .get(set as usize)
            .is_some_and(|coverage| coverage.contains(glyph))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v1_2_with_mark_sets() {
        let mut data = vec![
            0, 1, 0, 2, // version 1.2
            0, 14, // glyph class def
            0, 0, 0, 0, // attach list, lig caret list
            0, 0, // mark attach class def
            0, 24, // mark glyph sets
        ];
        // ClassDef format 1: glyphs 5..=6 -> base, mark
        data.extend_from_slice(&[0, 1, 0, 5, 0, 2, 0, 1, 0, 3]);
        // MarkGlyphSets: one set at offset 8
        data.extend_from_slice(&[0, 1, 0, 1, 0, 0, 0, 8]);
        // Coverage format 1: glyph 6
        data.extend_from_slice(&[0, 1, 0, 1, 0, 6]);

        let gdef = Gdef::parse(&data).unwrap();
        assert!(gdef.has_glyph_classes());
        assert_eq!(gdef.glyph_class(GlyphId(5)), 1);
        assert_eq!(gdef.glyph_class(GlyphId(6)), 3);
        assert_eq!(gdef.mark_attach_class(GlyphId(6)), 0);
        assert!(gdef.is_mark_glyph(GlyphId(6), 0));
        assert!(!gdef.is_mark_glyph(GlyphId(6), 1));
    }

    #[test]
    fn test_rejects_bad_version() {
        assert!(Gdef::parse(&[0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]).is_none());
        assert!(Gdef::parse(&[0, 1]).is_none());
    }
}
