//! Character to glyph mapping (cmap table)
//!
//! The best Unicode subtable is picked once when the face is loaded;
//! lookups then go straight to that subtable.

use super::reader::FontReader;
use super::GlyphId;

/// The cmap subtable selected for a face
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmapSubtable {
    pub platform_id: u16,
    pub encoding_id: u16,
    pub format: u16,
    /// Offset from the start of the cmap table
    offset: usize,
}

impl CmapSubtable {
    /// Pick the preferred Unicode subtable among those we can read
    pub fn select(cmap_data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(cmap_data);

        let _version = reader.read_u16().ok()?;
        let num_tables = reader.read_u16().ok()?;

        let mut best: Option<(u8, Self)> = None;

        for _ in 0..num_tables {
            let platform_id = reader.read_u16().ok()?;
            let encoding_id = reader.read_u16().ok()?;
            let offset = reader.read_u32().ok()? as usize;

            let priority = match (platform_id, encoding_id) {
                (0, 4) => 6, // Unicode full repertoire
                (3, 10) => 5, // Windows Unicode full
                (0, 3) => 4, // Unicode BMP
                (3, 1) => 3,  // Windows Unicode BMP
                (0, 5) => 0,  // Variation sequences, not a mapping
                (0, _) => 2,  // Any Unicode
                (3, 0) => 1,  // Windows symbol
                _ => 0,
            };
            if priority == 0 {
                continue;
            }

            let Ok(format) = FontReader::new(cmap_data).read_u16_at(offset) else {
                continue;
            };
            if !matches!(format, 0 | 4 | 6 | 12 | 13) {
                continue;
            }

            if best.is_none_or(|(p, _)| priority > p) {
                best = Some((priority, Self { platform_id, encoding_id, format, offset }));
            }
        }

        best.map(|(_, subtable)| subtable)
    }

    /// Map a codepoint through this subtable. `None` when unmapped.
    pub fn map(&self, cmap_data: &[u8], codepoint: u32) -> Option<GlyphId> {
        let data = cmap_data.get(self.offset..)?;
        let glyph = match self.format {
            0 => lookup_format0(data, codepoint),
            4 => lookup_format4(data, codepoint),
            6 => lookup_format6(data, codepoint),
            12 => lookup_segmented(data, codepoint, false),
            13 => lookup_segmented(data, codepoint, true),
            _ => None,
        }?;

        if glyph.0 == 0 {
            return None;
        }
        Some(glyph)
    }

    /// Map a character. Symbol subtables (3, 0) store Latin-1 at U+F0xx,
    /// so those are retried there.
    pub fn map_char(&self, cmap_data: &[u8], c: char) -> Option<GlyphId> {
        let cp = c as u32;
        self.map(cmap_data, cp).or_else(|| {
            if self.platform_id == 3 && self.encoding_id == 0 && cp <= 0xFF {
                self.map(cmap_data, 0xF000 + cp)
            } else {
                None
            }
        })
    }
}

/// Format 0: Byte encoding table
fn lookup_format0(data: &[u8], codepoint: u32) -> Option<GlyphId> {
    if codepoint > 0xFF {
        return None;
    }
    let glyph = *data.get(6 + codepoint as usize)?;
    Some(GlyphId(glyph as u16))
}

/// Format 4: Segment mapping to delta values (BMP only)
fn lookup_format4(data: &[u8], codepoint: u32) -> Option<GlyphId> {
    if codepoint > 0xFFFF {
        return None;
    }

    let code = codepoint as u16;
    let reader = FontReader::new(data);

    let seg_count = (reader.read_u16_at(6).ok()? / 2) as usize;
    let end_codes = 14;
    let start_codes = end_codes + seg_count * 2 + 2; // +2 for reserved pad
    let deltas = start_codes + seg_count * 2;
    let range_offsets = deltas + seg_count * 2;

    // First segment whose end code is >= code
    let mut lo = 0usize;
    let mut hi = seg_count;
    while lo < hi {
        let mid = (lo + hi) / 2;
        let end_code = reader.read_u16_at(end_codes + mid * 2).ok()?;
        if end_code < code {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    if lo >= seg_count {
        return None;
    }

    let seg = lo;
    let start_code = reader.read_u16_at(start_codes + seg * 2).ok()?;
    if code < start_code {
        return None;
    }

    let id_delta = reader.read_u16_at(deltas + seg * 2).ok()?;
    let range_offset_pos = range_offsets + seg * 2;
    let id_range_offset = reader.read_u16_at(range_offset_pos).ok()?;

    let glyph_id = if id_range_offset == 0 {
        code.wrapping_add(id_delta)
    } else {
        let glyph_pos = range_offset_pos + id_range_offset as usize + (code - start_code) as usize * 2;
        let glyph = reader.read_u16_at(glyph_pos).ok()?;
        if glyph == 0 {
            0
        } else {
            glyph.wrapping_add(id_delta)
        }
    };

    Some(GlyphId(glyph_id))
}

/// Format 6: Trimmed table mapping
fn lookup_format6(data: &[u8], codepoint: u32) -> Option<GlyphId> {
    let reader = FontReader::new(data);
    let first_code = reader.read_u16_at(6).ok()? as u32;
    let entry_count = reader.read_u16_at(8).ok()? as u32;

    let index = codepoint.checked_sub(first_code)?;
    if index >= entry_count {
        return None;
    }
    Some(GlyphId(reader.read_u16_at(10 + index as usize * 2).ok()?))
}

/// Formats 12 and 13: Segmented coverage / many-to-one range mappings
fn lookup_segmented(data: &[u8], codepoint: u32, many_to_one: bool) -> Option<GlyphId> {
    let mut reader = FontReader::new(data);

    let _format = reader.read_u16().ok()?;
    let _reserved = reader.read_u16().ok()?;
    let _length = reader.read_u32().ok()?;
    let _language = reader.read_u32().ok()?;
    let num_groups = reader.read_u32().ok()?;

    let groups_start = reader.pos();
    let mut lo = 0u32;
    let mut hi = num_groups;

    while lo < hi {
        let mid = (lo + hi) / 2;
        let mut r = FontReader::at(data, groups_start + mid as usize * 12).ok()?;
        let start_char = r.read_u32().ok()?;
        let end_char = r.read_u32().ok()?;

        if codepoint < start_char {
            hi = mid;
        } else if codepoint > end_char {
            lo = mid + 1;
        } else {
            let start_glyph = r.read_u32().ok()?;
            let glyph_id = if many_to_one {
                start_glyph
            } else {
                start_glyph.checked_add(codepoint - start_char)?
            };
            return u16::try_from(glyph_id).ok().map(GlyphId);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_shape_test_data::tables;

    #[test]
    fn test_format4_lookup() {
        let cmap = tables::cmap4(&[('A', 2), ('B', 3), ('z', 9)]);
        let subtable = CmapSubtable::select(&cmap).unwrap();
        assert_eq!(subtable.format, 4);
        assert_eq!(subtable.map(&cmap, 'A' as u32), Some(GlyphId(2)));
        assert_eq!(subtable.map(&cmap, 'z' as u32), Some(GlyphId(9)));
        assert_eq!(subtable.map(&cmap, 'C' as u32), None);
        assert_eq!(subtable.map(&cmap, 0x1F600), None);
    }

    #[test]
    fn test_format12_preferred() {
        let cmap = tables::cmap_with_format12(&[('A', 2)], &[(0x1F600, 0x1F602, 40)]);
        let subtable = CmapSubtable::select(&cmap).unwrap();
        assert_eq!(subtable.format, 12);
        assert_eq!(subtable.map(&cmap, 0x1F601), Some(GlyphId(41)));
        assert_eq!(subtable.map(&cmap, 0x1F603), None);
    }

    #[test]
    fn test_format6_lookup() {
        let cmap = tables::cmap6(0x30, &[5, 6, 0, 8]);
        let subtable = CmapSubtable::select(&cmap).unwrap();
        assert_eq!(subtable.map(&cmap, 0x31), Some(GlyphId(6)));
        assert_eq!(subtable.map(&cmap, 0x32), None);
        assert_eq!(subtable.map(&cmap, 0x2F), None);
        assert_eq!(subtable.map(&cmap, 0x34), None);
    }

    #[test]
    fn test_no_unicode_subtable() {
        // Only a Macintosh Roman subtable
        let cmap = [0, 0, 0, 1, 0, 1, 0, 0, 0, 0, 0, 12, 0, 0];
        assert!(CmapSubtable::select(&cmap).is_none());
    }
}
