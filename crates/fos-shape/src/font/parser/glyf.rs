//! Glyph bounding boxes from glyf / loca

use super::reader::FontReader;
use super::GlyphId;

/// Bounding box in font units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

/// Offset of a glyph inside glyf
pub fn glyph_offset(loca_data: &[u8], glyph_index: u16, long_format: bool) -> Option<u32> {
    let reader = FontReader::new(loca_data);
    if long_format {
        let pos = glyph_index as usize * 4;
        let hi = reader.read_u16_at(pos).ok()? as u32;
        let lo = reader.read_u16_at(pos + 2).ok()? as u32;
        Some((hi << 16) | lo)
    } else {
        // Short format stores offset / 2
        Some(reader.read_u16_at(glyph_index as usize * 2).ok()? as u32 * 2)
    }
}

/// Bounding box of a glyph; `None` for empty glyphs (space, etc.)
pub fn bounding_box(glyf_data: &[u8], loca_data: &[u8], glyph: GlyphId, long_format: bool) -> Option<BoundingBox> {
    let offset = glyph_offset(loca_data, glyph.0, long_format)?;
    let next_offset = glyph_offset(loca_data, glyph.0.checked_add(1)?, long_format)?;

    if offset >= next_offset {
        return None;
    }

    let mut reader = FontReader::at(glyf_data, offset as usize).ok()?;
    let _num_contours = reader.read_i16().ok()?;
    let x_min = reader.read_i16().ok()?;
    let y_min = reader.read_i16().ok()?;
    let x_max = reader.read_i16().ok()?;
    let y_max = reader.read_i16().ok()?;

    Some(BoundingBox { x_min, y_min, x_max, y_max })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_loca() {
        let loca = [0x00, 0x00, 0x00, 0x05, 0x00, 0x05];
        assert_eq!(glyph_offset(&loca, 0, false), Some(0));
        assert_eq!(glyph_offset(&loca, 1, false), Some(10));
        assert_eq!(glyph_offset(&loca, 3, false), None);
    }

    #[test]
    fn test_bounding_box() {
        let loca = [0x00, 0x00, 0x00, 0x05, 0x00, 0x05];
        let glyf = [
            0x00, 0x01, // one contour
            0xFF, 0xF6, // x_min -10
            0x00, 0x00, // y_min 0
            0x01, 0xF4, // x_max 500
            0x02, 0xBC, // y_max 700
        ];
        let bbox = bounding_box(&glyf, &loca, GlyphId(0), false).unwrap();
        assert_eq!(bbox, BoundingBox { x_min: -10, y_min: 0, x_max: 500, y_max: 700 });
        // Glyph 1 is empty
        assert!(bounding_box(&glyf, &loca, GlyphId(1), false).is_none());
    }
}
