//! Glyph property provider
//!
//! [`Font`] pairs a face with a scale, optional ppem and variation
//! coordinates, and answers the per-glyph questions shaping asks:
//! nominal glyph, advance, origin and extents.

use super::face::Face;
use super::parser::GlyphId;
use crate::unicode::Direction;

/// Glyph ink extents, y-up: `y_bearing` is the top, `height` is negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphExtents {
    pub x_bearing: i32,
    pub y_bearing: i32,
    pub width: i32,
    pub height: i32,
}

/// Line metrics for one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontExtents {
    pub ascender: i32,
    pub descender: i32,
    pub line_gap: i32,
}

/// A sized instance of a face
#[derive(Debug, Clone)]
pub struct Font {
    face: Face,
    x_scale: i32,
    y_scale: i32,
    ppem: Option<(u16, u16)>,
    coords: Vec<i32>,
}

impl Font {
    /// Create a font whose scale equals units-per-em, so every
    /// position comes out in font units
    pub fn new(face: Face) -> Self {
        let upem = face.units_per_em() as i32;
        Self {
            face,
            x_scale: upem,
            y_scale: upem,
            ppem: None,
            coords: Vec::new(),
        }
    }

    pub fn face(&self) -> &Face {
        &self.face
    }

    pub fn scale(&self) -> (i32, i32) {
        (self.x_scale, self.y_scale)
    }

    pub fn set_scale(&mut self, x_scale: i32, y_scale: i32) {
        self.x_scale = x_scale;
        self.y_scale = y_scale;
    }

    pub fn ppem(&self) -> Option<(u16, u16)> {
        self.ppem
    }

    pub fn set_ppem(&mut self, x_ppem: u16, y_ppem: u16) {
        self.ppem = Some((x_ppem, y_ppem));
    }

    /// Normalized variation coordinates (2.14 fixed point)
    pub fn variation_coords(&self) -> &[i32] {
        &self.coords
    }

    pub fn set_variation_coords(&mut self, coords: &[i32]) {
        self.coords = coords.to_vec();
    }

    /// Scale a horizontal font-unit value
    pub fn em_scale_x(&self, v: i32) -> i32 {
        em_mult(v, self.x_scale, self.face.units_per_em())
    }

    /// Scale a vertical font-unit value
    pub fn em_scale_y(&self, v: i32) -> i32 {
        em_mult(v, self.y_scale, self.face.units_per_em())
    }

    /// Nominal glyph for a character
    pub fn nominal_glyph(&self, c: char) -> Option<GlyphId> {
        self.face.glyph_index(c)
    }

    /// Nominal glyph, or `.notdef` when unmapped
    pub fn glyph_or_notdef(&self, c: char) -> GlyphId {
        self.nominal_glyph(c).unwrap_or(GlyphId::NOTDEF)
    }

    pub fn glyph_h_advance(&self, glyph: GlyphId) -> i32 {
        self.em_scale_x(self.face.glyph_hor_advance(glyph) as i32)
    }

    /// Vertical advance; negative since y grows upwards
    pub fn glyph_v_advance(&self, glyph: GlyphId) -> i32 {
        let advance = match self.face.glyph_ver_advance(glyph) {
            Some(advance) => advance as i32,
            None => self.face.ascender() as i32 - self.face.descender() as i32,
        };
        -self.em_scale_y(advance)
    }

    /// Advance along `direction` as (dx, dy)
    pub fn glyph_advance(&self, glyph: GlyphId, direction: Direction) -> (i32, i32) {
        if direction.is_vertical() {
            (0, self.glyph_v_advance(glyph))
        } else {
            (self.glyph_h_advance(glyph), 0)
        }
    }

    /// Origin of the glyph relative to the horizontal origin
    pub fn glyph_origin(&self, glyph: GlyphId, direction: Direction) -> (i32, i32) {
        if direction.is_vertical() {
            let x = self.glyph_h_advance(glyph) / 2;
            let y = self.em_scale_y(self.face.ascender() as i32);
            (x, y)
        } else {
            (0, 0)
        }
    }

    /// Ink extents from the outline bounding box
    pub fn glyph_extents(&self, glyph: GlyphId) -> Option<GlyphExtents> {
        let bbox = self.face.glyph_bounding_box(glyph)?;
        let x_bearing = self.em_scale_x(bbox.x_min as i32);
        let y_bearing = self.em_scale_y(bbox.y_max as i32);
        Some(GlyphExtents {
            x_bearing,
            y_bearing,
            width: self.em_scale_x(bbox.x_max as i32) - x_bearing,
            height: self.em_scale_y(bbox.y_min as i32) - y_bearing,
        })
    }

    /// Horizontal line metrics
    pub fn h_extents(&self) -> FontExtents {
        FontExtents {
            ascender: self.em_scale_y(self.face.ascender() as i32),
            descender: self.em_scale_y(self.face.descender() as i32),
            line_gap: self.em_scale_y(self.face.line_gap() as i32),
        }
    }
}

/// `v * scale / upem`, rounded half away from zero
fn em_mult(v: i32, scale: i32, upem: u16) -> i32 {
    let upem = upem.max(1) as i64;
    let n = v as i64 * scale as i64;
    let rounded = if n >= 0 { (n + upem / 2) / upem } else { (n - upem / 2) / upem };
    rounded.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_shape_test_data::{fonts, glyphs};

    fn font() -> Font {
        Font::new(Face::from_bytes(fonts::simple(), 0).unwrap())
    }

    #[test]
    fn test_em_mult_rounding() {
        assert_eq!(em_mult(600, 1000, 1000), 600);
        assert_eq!(em_mult(600, 16, 1000), 10);
        assert_eq!(em_mult(-600, 16, 1000), -10);
        assert_eq!(em_mult(1, 500, 1000), 1);
    }

    #[test]
    fn test_nominal_glyph_and_notdef() {
        let font = font();
        assert_eq!(font.nominal_glyph('A'), Some(GlyphId(glyphs::A)));
        assert_eq!(font.glyph_or_notdef('\u{4E00}'), GlyphId::NOTDEF);
    }

    #[test]
    fn test_advances_scale() {
        let mut font = font();
        let a = GlyphId(glyphs::A);
        assert_eq!(font.glyph_advance(a, Direction::LeftToRight), (600, 0));

        font.set_scale(2000, 2000);
        assert_eq!(font.glyph_h_advance(a), 1200);
    }

    #[test]
    fn test_vertical_fallback_advance_and_origin() {
        let font = font();
        let a = GlyphId(glyphs::A);
        // No vmtx: ascender - descender = 800 - (-200)
        assert_eq!(font.glyph_advance(a, Direction::TopToBottom), (0, -1000));
        assert_eq!(font.glyph_origin(a, Direction::TopToBottom), (300, 800));
        assert_eq!(font.glyph_origin(a, Direction::RightToLeft), (0, 0));
    }

    #[test]
    fn test_glyph_extents() {
        let mut font = Font::new(Face::from_bytes(fonts::outlines(), 0).unwrap());
        let a = GlyphId(glyphs::A);
        let expected = GlyphExtents { x_bearing: -10, y_bearing: 700, width: 600, height: -700 };
        assert_eq!(font.glyph_extents(a), Some(expected));

        // Empty glyph, and a font without outlines
        assert_eq!(font.glyph_extents(GlyphId(glyphs::SPACE)), None);
        assert_eq!(self::font().glyph_extents(a), None);

        font.set_scale(2000, 2000);
        let scaled = GlyphExtents { x_bearing: -20, y_bearing: 1400, width: 1200, height: -1400 };
        assert_eq!(font.glyph_extents(a), Some(scaled));
    }

    #[test]
    fn test_variation_coords_stored() {
        let mut font = font();
        font.set_variation_coords(&[8192, -16384]);
        assert_eq!(font.variation_coords(), &[8192, -16384]);
    }
}
