//! OpenType GPOS (Glyph Positioning) subtables
//!
//! Single and pair adjustment, cursive attachment, the three mark
//! attachment types and contextual positioning.

use crate::font::parser::FontReader;
use crate::font::GlyphId;

use super::common::{at_nullable_offset, at_offset, ChainedSequenceContext, ClassDef, Coverage, SequenceContext};
use super::LookupError;

/// Value record for positioning adjustments; device tables are skipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueRecord {
    /// Horizontal adjustment for placement
    pub x_placement: i16,
    /// Vertical adjustment for placement
    pub y_placement: i16,
    /// Horizontal adjustment for advance
    pub x_advance: i16,
    /// Vertical adjustment for advance
    pub y_advance: i16,
}

impl ValueRecord {
    /// Parse value record based on format flags
    pub fn parse(reader: &mut FontReader<'_>, format: u16) -> Option<Self> {
        let mut record = ValueRecord::default();
        if format & 0x0001 != 0 {
            record.x_placement = reader.read_i16().ok()?;
        }
        if format & 0x0002 != 0 {
            record.y_placement = reader.read_i16().ok()?;
        }
        if format & 0x0004 != 0 {
            record.x_advance = reader.read_i16().ok()?;
        }
        if format & 0x0008 != 0 {
            record.y_advance = reader.read_i16().ok()?;
        }
        // Device / variation offsets
        reader.skip(((format & 0x00F0).count_ones() * 2) as usize).ok()?;
        Some(record)
    }

    /// Size in bytes for a given format
    pub fn size(format: u16) -> usize {
        ((format & 0x00FF).count_ones() * 2) as usize
    }

    /// Check if record has any positioning
    pub fn is_empty(&self) -> bool {
        *self == ValueRecord::default()
    }
}

/// Anchor point for attachment, in font units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub x: i16,
    pub y: i16,
}

impl Anchor {
    /// Parse anchor table (formats 1-3; contour points and device tables
    /// are ignored)
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        let format = reader.read_u16().ok()?;
        if !(1..=3).contains(&format) {
            return None;
        }
        let x = reader.read_i16().ok()?;
        let y = reader.read_i16().ok()?;
        Some(Self { x, y })
    }

    fn parse_nullable(data: &[u8], offset: u16) -> Option<Option<Self>> {
        match at_nullable_offset(data, offset)? {
            Some(d) => Self::parse(d).map(Some),
            None => Some(None),
        }
    }
}

/// Format 1 pair record
#[derive(Debug, Clone, Copy)]
pub struct PairValue {
    pub second: u16,
    pub first_value: ValueRecord,
    pub second_value: ValueRecord,
}

/// Cursive entry / exit anchors of one glyph
#[derive(Debug, Clone, Copy)]
pub struct EntryExit {
    pub entry: Option<Anchor>,
    pub exit: Option<Anchor>,
}

/// Mark class and anchor
#[derive(Debug, Clone, Copy)]
pub struct MarkRecord {
    pub class: u16,
    pub anchor: Anchor,
}

/// Anchors per mark class; `None` where the font has no anchor
pub type AnchorRow = Vec<Option<Anchor>>;

/// GPOS subtable (parsed)
#[derive(Debug, Clone)]
pub enum PosSubtable {
    /// Type 1 format 1: one value for every covered glyph
    SingleShared { coverage: Coverage, value: ValueRecord },
    /// Type 1 format 2: a value per coverage index
    SingleList { coverage: Coverage, values: Vec<ValueRecord> },
    /// Type 2 format 1: pair sets sorted by second glyph
    PairGlyphs {
        coverage: Coverage,
        second_format: u16,
        pair_sets: Vec<Vec<PairValue>>,
    },
    /// Type 2 format 2: class pairs
    PairClasses {
        coverage: Coverage,
        second_format: u16,
        first_classes: ClassDef,
        second_classes: ClassDef,
        class2_count: u16,
        /// `class1_count * class2_count` value pairs
        values: Vec<(ValueRecord, ValueRecord)>,
    },
    /// Type 3
    Cursive { coverage: Coverage, records: Vec<EntryExit> },
    /// Type 4
    MarkToBase { mark_coverage: Coverage, base_coverage: Coverage, marks: Vec<MarkRecord>, bases: Vec<AnchorRow> },
    /// Type 5: anchors per ligature component
    MarkToLigature {
        mark_coverage: Coverage,
        ligature_coverage: Coverage,
        marks: Vec<MarkRecord>,
        ligatures: Vec<Vec<AnchorRow>>,
    },
    /// Type 6
    MarkToMark { mark_coverage: Coverage, mark2_coverage: Coverage, marks: Vec<MarkRecord>, mark2s: Vec<AnchorRow> },
    /// Type 7
    Context(SequenceContext),
    /// Type 8
    ChainedContext(ChainedSequenceContext),
}

impl PosSubtable {
    /// Format 2 class pair values for two glyphs
    pub(crate) fn class_pair(
        values: &[(ValueRecord, ValueRecord)],
        first_classes: &ClassDef,
        second_classes: &ClassDef,
        class2_count: u16,
        first: GlyphId,
        second: GlyphId,
    ) -> Option<(ValueRecord, ValueRecord)> {
        let class1 = first_classes.get(first) as usize;
        let class2 = second_classes.get(second) as usize;
        if class2 >= class2_count as usize {
            return None;
        }
        values.get(class1 * class2_count as usize + class2).copied()
    }
}

pub(super) fn parse_subtable(kind: u16, data: &[u8]) -> Result<PosSubtable, LookupError> {
    let parsed = match kind {
        1 => parse_single(data),
        2 => parse_pair(data),
        3 => parse_cursive(data),
        4 => parse_mark_to_base(data, false),
        5 => parse_mark_to_ligature(data),
        6 => parse_mark_to_base(data, true),
        7 => SequenceContext::parse(data).map(PosSubtable::Context),
        8 => ChainedSequenceContext::parse(data).map(PosSubtable::ChainedContext),
        _ => return Err(LookupError::UnsupportedType(kind)),
    };
    parsed.ok_or(LookupError::Malformed { kind })
}

fn parse_coverage(data: &[u8], reader: &mut FontReader<'_>) -> Option<Coverage> {
    Coverage::parse(at_offset(data, reader.read_u16().ok()?)?)
}

fn parse_single(data: &[u8]) -> Option<PosSubtable> {
    let mut reader = FontReader::new(data);
    let format = reader.read_u16().ok()?;
    let coverage = parse_coverage(data, &mut reader)?;
    let value_format = reader.read_u16().ok()?;
    match format {
        1 => {
            let value = ValueRecord::parse(&mut reader, value_format)?;
            Some(PosSubtable::SingleShared { coverage, value })
        }
        2 => {
            let count = reader.read_u16().ok()?;
            let values = (0..count)
                .map(|_| ValueRecord::parse(&mut reader, value_format))
                .collect::<Option<Vec<_>>>()?;
            Some(PosSubtable::SingleList { coverage, values })
        }
        _ => None,
    }
}

fn parse_pair(data: &[u8]) -> Option<PosSubtable> {
    let mut reader = FontReader::new(data);
    let format = reader.read_u16().ok()?;
    let coverage = parse_coverage(data, &mut reader)?;
    let first_format = reader.read_u16().ok()?;
    let second_format = reader.read_u16().ok()?;

    match format {
        1 => {
            let set_count = reader.read_u16().ok()?;
            let mut pair_sets = Vec::with_capacity(set_count as usize);
            for offset in reader.read_u16_array(set_count as usize).ok()? {
                let mut set_reader = FontReader::new(at_offset(data, offset)?);
                let count = set_reader.read_u16().ok()?;
                let mut pairs = (0..count)
                    .map(|_| {
                        let second = set_reader.read_u16().ok()?;
                        let first_value = ValueRecord::parse(&mut set_reader, first_format)?;
                        let second_value = ValueRecord::parse(&mut set_reader, second_format)?;
                        Some(PairValue { second, first_value, second_value })
                    })
                    .collect::<Option<Vec<_>>>()?;
                pairs.sort_by_key(|p| p.second);
                pair_sets.push(pairs);
            }
            Some(PosSubtable::PairGlyphs { coverage, second_format, pair_sets })
        }
        2 => {
            let first_classes = ClassDef::parse_nullable(data, reader.read_u16().ok()?)?;
            let second_classes = ClassDef::parse_nullable(data, reader.read_u16().ok()?)?;
            let class1_count = reader.read_u16().ok()?;
            let class2_count = reader.read_u16().ok()?;
            let total = class1_count as usize * class2_count as usize;
            let record_size = ValueRecord::size(first_format) + ValueRecord::size(second_format);
            if reader.remaining() < total * record_size {
                return None;
            }
            let values = (0..total)
                .map(|_| {
                    Some((
                        ValueRecord::parse(&mut reader, first_format)?,
                        ValueRecord::parse(&mut reader, second_format)?,
                    ))
                })
                .collect::<Option<Vec<_>>>()?;
            Some(PosSubtable::PairClasses {
                coverage,
                second_format,
                first_classes,
                second_classes,
                class2_count,
                values,
            })
        }
        _ => None,
    }
}

fn parse_cursive(data: &[u8]) -> Option<PosSubtable> {
    let mut reader = FontReader::new(data);
    if reader.read_u16().ok()? != 1 {
        return None;
    }
    let coverage = parse_coverage(data, &mut reader)?;
    let count = reader.read_u16().ok()?;
    let records = (0..count)
        .map(|_| {
            let entry = Anchor::parse_nullable(data, reader.read_u16().ok()?)?;
            let exit = Anchor::parse_nullable(data, reader.read_u16().ok()?)?;
            Some(EntryExit { entry, exit })
        })
        .collect::<Option<Vec<_>>>()?;
    Some(PosSubtable::Cursive { coverage, records })
}

fn parse_mark_array(data: &[u8]) -> Option<Vec<MarkRecord>> {
    let mut reader = FontReader::new(data);
    let count = reader.read_u16().ok()?;
    (0..count)
        .map(|_| {
            let class = reader.read_u16().ok()?;
            let anchor = Anchor::parse(at_offset(data, reader.read_u16().ok()?)?)?;
            Some(MarkRecord { class, anchor })
        })
        .collect()
}

/// Rows of `class_count` anchor offsets, relative to `data`
fn parse_anchor_matrix(data: &[u8], class_count: u16) -> Option<Vec<AnchorRow>> {
    let mut reader = FontReader::new(data);
    let rows = reader.read_u16().ok()?;
    (0..rows)
        .map(|_| {
            (0..class_count)
                .map(|_| Anchor::parse_nullable(data, reader.read_u16().ok()?))
                .collect()
        })
        .collect()
}

/// Mark-to-base and mark-to-mark share one layout
fn parse_mark_to_base(data: &[u8], mark_to_mark: bool) -> Option<PosSubtable> {
    let mut reader = FontReader::new(data);
    if reader.read_u16().ok()? != 1 {
        return None;
    }
    let mark_coverage = parse_coverage(data, &mut reader)?;
    let base_coverage = parse_coverage(data, &mut reader)?;
    let class_count = reader.read_u16().ok()?;
    let marks = parse_mark_array(at_offset(data, reader.read_u16().ok()?)?)?;
    let bases = parse_anchor_matrix(at_offset(data, reader.read_u16().ok()?)?, class_count)?;

    Some(if mark_to_mark {
        PosSubtable::MarkToMark { mark_coverage, mark2_coverage: base_coverage, marks, mark2s: bases }
    } else {
        PosSubtable::MarkToBase { mark_coverage, base_coverage, marks, bases }
    })
}

fn parse_mark_to_ligature(data: &[u8]) -> Option<PosSubtable> {
    let mut reader = FontReader::new(data);
    if reader.read_u16().ok()? != 1 {
        return None;
    }
    let mark_coverage = parse_coverage(data, &mut reader)?;
    let ligature_coverage = parse_coverage(data, &mut reader)?;
    let class_count = reader.read_u16().ok()?;
    let marks = parse_mark_array(at_offset(data, reader.read_u16().ok()?)?)?;

    let array_data = at_offset(data, reader.read_u16().ok()?)?;
    let mut array_reader = FontReader::new(array_data);
    let count = array_reader.read_u16().ok()?;
    let ligatures = (0..count)
        .map(|_| parse_anchor_matrix(at_offset(array_data, array_reader.read_u16().ok()?)?, class_count))
        .collect::<Option<Vec<_>>>()?;

    Some(PosSubtable::MarkToLigature { mark_coverage, ligature_coverage, marks, ligatures })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_record_size() {
        assert_eq!(ValueRecord::size(0x0000), 0);
        assert_eq!(ValueRecord::size(0x0001), 2);
        assert_eq!(ValueRecord::size(0x000F), 8);
        assert_eq!(ValueRecord::size(0x00FF), 16);
    }

    #[test]
    fn test_value_record_skips_devices() {
        // x_advance, x_placement device
        let data = [0xFF, 0xB0, 0, 0, 0, 7];
        let mut reader = FontReader::new(&data);
        let record = ValueRecord::parse(&mut reader, 0x0014).unwrap();
        assert_eq!(record.x_advance, -80);
        assert_eq!(reader.read_u16().unwrap(), 7);
        assert!(!record.is_empty());
        assert!(ValueRecord::default().is_empty());
    }

    #[test]
    fn test_pair_format1() {
        let data = [
            0, 1, 0, 12, 0, 4, 0, 0, 0, 1, 0, 18, // header: coverage 12, xAdvance / none, one set at 18
            0, 1, 0, 1, 0, 2, // coverage: glyph 2
            0, 1, 0, 3, 0xFF, 0xB0, // set: (3, -80)
        ];
        let PosSubtable::PairGlyphs { pair_sets, second_format, .. } = parse_subtable(2, &data).unwrap() else {
            panic!("expected pair format 1");
        };
        assert_eq!(second_format, 0);
        assert_eq!(pair_sets[0][0].second, 3);
        assert_eq!(pair_sets[0][0].first_value.x_advance, -80);
    }

    #[test]
    fn test_pair_format2_lookup() {
        let values = vec![
            (ValueRecord::default(), ValueRecord::default()),
            (ValueRecord { x_advance: -40, ..Default::default() }, ValueRecord::default()),
        ];
        let first = ClassDef::default();
        let second = ClassDef::Array { start: 3, classes: vec![1] };
        let pair = PosSubtable::class_pair(&values, &first, &second, 2, GlyphId(2), GlyphId(3));
        assert_eq!(pair.map(|p| p.0.x_advance), Some(-40));
        let none = PosSubtable::class_pair(&values, &first, &second, 2, GlyphId(2), GlyphId(9));
        assert_eq!(none.map(|p| p.0.x_advance), Some(0));
    }

    #[test]
    fn test_anchor_formats() {
        assert_eq!(Anchor::parse(&[0, 1, 0, 10, 0xFF, 0xF6]), Some(Anchor { x: 10, y: -10 }));
        assert_eq!(Anchor::parse(&[0, 2, 0, 1, 0, 2, 0, 5]), Some(Anchor { x: 1, y: 2 }));
        assert_eq!(Anchor::parse(&[0, 4, 0, 1, 0, 2]), None);
    }
}
