//! Common OpenType layout structures
//!
//! Coverage, class definitions, lookup flags, script / feature lists and
//! the sequence context formats shared by GSUB and GPOS.

use std::cmp::Ordering;

use bitflags::bitflags;

use crate::font::parser::FontReader;
use crate::font::GlyphId;
use crate::tag::Tag;

/// Subtable at a 16-bit offset; `None` if the offset leaves the data
pub(crate) fn at_offset(data: &[u8], offset: u16) -> Option<&[u8]> {
    data.get(offset as usize..)
}

/// Subtable at a 16-bit offset where 0 means "absent"
pub(crate) fn at_nullable_offset(data: &[u8], offset: u16) -> Option<Option<&[u8]>> {
    if offset == 0 {
        Some(None)
    } else {
        at_offset(data, offset).map(Some)
    }
}

fn read_offsets(reader: &mut FontReader<'_>) -> Option<Vec<u16>> {
    let count = reader.read_u16().ok()?;
    reader.read_u16_array(count as usize).ok()
}

/// Glyph range with its start coverage index or class
#[derive(Debug, Clone, Copy)]
pub struct RangeRecord {
    start: u16,
    end: u16,
    value: u16,
}

impl RangeRecord {
    fn read(reader: &mut FontReader<'_>) -> Option<Self> {
        let start = reader.read_u16().ok()?;
        let end = reader.read_u16().ok()?;
        let value = reader.read_u16().ok()?;
        Some(Self { start, end, value })
    }

    fn cmp_glyph(&self, glyph: u16) -> Ordering {
        if self.end < glyph {
            Ordering::Less
        } else if self.start > glyph {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

fn read_ranges(reader: &mut FontReader<'_>) -> Option<Vec<RangeRecord>> {
    let count = reader.read_u16().ok()?;
    (0..count).map(|_| RangeRecord::read(reader)).collect()
}

/// Coverage table (maps glyph IDs to coverage indices)
#[derive(Debug, Clone)]
pub enum Coverage {
    /// Format 1: sorted glyph array
    Glyphs(Vec<u16>),
    /// Format 2: sorted glyph ranges
    Ranges(Vec<RangeRecord>),
}

impl Coverage {
    /// Parse coverage table from data
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        match reader.read_u16().ok()? {
            1 => {
                let count = reader.read_u16().ok()?;
                Some(Coverage::Glyphs(reader.read_u16_array(count as usize).ok()?))
            }
            2 => Some(Coverage::Ranges(read_ranges(&mut reader)?)),
            _ => None,
        }
    }

    /// Coverage index of a glyph
    pub fn get(&self, glyph: GlyphId) -> Option<u16> {
        match self {
            Coverage::Glyphs(glyphs) => glyphs.binary_search(&glyph.0).ok().map(|i| i as u16),
            Coverage::Ranges(ranges) => {
                let i = ranges.binary_search_by(|r| r.cmp_glyph(glyph.0)).ok()?;
                let range = ranges[i];
                Some(range.value.wrapping_add(glyph.0 - range.start))
            }
        }
    }

    pub fn contains(&self, glyph: GlyphId) -> bool {
        self.get(glyph).is_some()
    }
}

/// Class definition table; unlisted glyphs are class 0
#[derive(Debug, Clone)]
pub enum ClassDef {
    /// Format 1: class array starting at a glyph
    Array { start: u16, classes: Vec<u16> },
    /// Format 2: class ranges
    Ranges(Vec<RangeRecord>),
}

impl Default for ClassDef {
    fn default() -> Self {
        ClassDef::Ranges(Vec::new())
    }
}

impl ClassDef {
    /// Parse class definition table
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        match reader.read_u16().ok()? {
            1 => {
                let start = reader.read_u16().ok()?;
                let count = reader.read_u16().ok()?;
                let classes = reader.read_u16_array(count as usize).ok()?;
                Some(ClassDef::Array { start, classes })
            }
            2 => Some(ClassDef::Ranges(read_ranges(&mut reader)?)),
            _ => None,
        }
    }

    /// Parse the class definition at `offset`, where 0 means "all class 0"
    pub(crate) fn parse_nullable(data: &[u8], offset: u16) -> Option<Self> {
        match at_nullable_offset(data, offset)? {
            Some(d) => Self::parse(d),
            None => Some(Self::default()),
        }
    }

    /// Class of a glyph
    pub fn get(&self, glyph: GlyphId) -> u16 {
        match self {
            ClassDef::Array { start, classes } => glyph
                .0
                .checked_sub(*start)
                .and_then(|i| classes.get(i as usize).copied())
                .unwrap_or(0),
            ClassDef::Ranges(ranges) => ranges
                .binary_search_by(|r| r.cmp_glyph(glyph.0))
                .map_or(0, |i| ranges[i].value),
        }
    }
}

bitflags! {
    /// Lookup flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LookupFlags: u16 {
        const RIGHT_TO_LEFT = 0x0001;
        const IGNORE_BASE_GLYPHS = 0x0002;
        const IGNORE_LIGATURES = 0x0004;
        const IGNORE_MARKS = 0x0008;
        const USE_MARK_FILTERING_SET = 0x0010;
        const MARK_ATTACHMENT_TYPE = 0xFF00;

        const IGNORE_FLAGS = Self::IGNORE_BASE_GLYPHS.bits()
            | Self::IGNORE_LIGATURES.bits()
            | Self::IGNORE_MARKS.bits();
    }
}

impl LookupFlags {
    /// Mark attachment class filter, 0 if unset
    pub fn mark_attachment_type(self) -> u8 {
        (self.bits() >> 8) as u8
    }
}

/// Language system: the features enabled for one script / language pair
#[derive(Debug, Clone, Default)]
pub struct LangSys {
    pub required_feature: Option<u16>,
    pub feature_indices: Vec<u16>,
}

impl LangSys {
    fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        let _lookup_order = reader.read_u16().ok()?;
        let required = reader.read_u16().ok()?;
        let feature_indices = read_offsets(&mut reader)?;
        Some(Self {
            required_feature: (required != 0xFFFF).then_some(required),
            feature_indices,
        })
    }
}

/// Script table
#[derive(Debug, Clone)]
pub struct ScriptRecord {
    pub tag: Tag,
    pub default_lang_sys: Option<LangSys>,
    pub lang_systems: Vec<(Tag, LangSys)>,
}

impl ScriptRecord {
    /// Language system for a language tag, or the default one
    pub fn lang_sys(&self, language: Option<Tag>) -> Option<&LangSys> {
        language
            .and_then(|tag| self.lang_systems.iter().find(|(t, _)| *t == tag))
            .map(|(_, ls)| ls)
            .or(self.default_lang_sys.as_ref())
    }
}

/// Script list
#[derive(Debug, Clone, Default)]
pub struct ScriptList(pub Vec<ScriptRecord>);

impl ScriptList {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        let count = reader.read_u16().ok()?;
        let mut scripts = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let tag = reader.read_tag().ok()?;
            let offset = reader.read_u16().ok()?;
            let script_data = at_offset(data, offset)?;

            let mut script_reader = FontReader::new(script_data);
            let default_offset = script_reader.read_u16().ok()?;
            let default_lang_sys = match at_nullable_offset(script_data, default_offset)? {
                Some(d) => Some(LangSys::parse(d)?),
                None => None,
            };

            let lang_count = script_reader.read_u16().ok()?;
            let mut lang_systems = Vec::with_capacity(lang_count as usize);
            for _ in 0..lang_count {
                let lang_tag = script_reader.read_tag().ok()?;
                let lang_offset = script_reader.read_u16().ok()?;
                lang_systems.push((lang_tag, LangSys::parse(at_offset(script_data, lang_offset)?)?));
            }

            scripts.push(ScriptRecord { tag, default_lang_sys, lang_systems });
        }
        Some(Self(scripts))
    }

    pub fn find(&self, tag: Tag) -> Option<&ScriptRecord> {
        self.0.iter().find(|s| s.tag == tag)
    }
}

/// Feature record with its lookup indices
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub tag: Tag,
    pub lookup_indices: Vec<u16>,
}

/// Feature list
#[derive(Debug, Clone, Default)]
pub struct FeatureList(pub Vec<FeatureRecord>);

impl FeatureList {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        let count = reader.read_u16().ok()?;
        let mut features = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let tag = reader.read_tag().ok()?;
            let offset = reader.read_u16().ok()?;
            let mut feature_reader = FontReader::new(at_offset(data, offset)?);
            let _params = feature_reader.read_u16().ok()?;
            let lookup_indices = read_offsets(&mut feature_reader)?;
            features.push(FeatureRecord { tag, lookup_indices });
        }
        Some(Self(features))
    }

    pub fn get(&self, index: u16) -> Option<&FeatureRecord> {
        self.0.get(index as usize)
    }
}

/// Nested lookup to apply at a position of a matched sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceLookupRecord {
    pub sequence_index: u16,
    pub lookup_index: u16,
}

fn read_lookup_records(reader: &mut FontReader<'_>, count: u16) -> Option<Vec<SequenceLookupRecord>> {
    (0..count)
        .map(|_| {
            let sequence_index = reader.read_u16().ok()?;
            let lookup_index = reader.read_u16().ok()?;
            Some(SequenceLookupRecord { sequence_index, lookup_index })
        })
        .collect()
}

/// Input sequence rule; `input` excludes the first glyph
#[derive(Debug, Clone)]
pub struct SequenceRule {
    pub input: Vec<u16>,
    pub records: Vec<SequenceLookupRecord>,
}

impl SequenceRule {
    fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        let glyph_count = reader.read_u16().ok()?;
        let record_count = reader.read_u16().ok()?;
        let input = reader.read_u16_array(glyph_count.checked_sub(1)? as usize).ok()?;
        let records = read_lookup_records(&mut reader, record_count)?;
        Some(Self { input, records })
    }
}

/// Chained rule; `backtrack` is stored closest-first
#[derive(Debug, Clone)]
pub struct ChainedSequenceRule {
    pub backtrack: Vec<u16>,
    pub input: Vec<u16>,
    pub lookahead: Vec<u16>,
    pub records: Vec<SequenceLookupRecord>,
}

impl ChainedSequenceRule {
    fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        let backtrack = read_offsets(&mut reader)?;
        let input_count = reader.read_u16().ok()?;
        let input = reader.read_u16_array(input_count.checked_sub(1)? as usize).ok()?;
        let lookahead = read_offsets(&mut reader)?;
        let record_count = reader.read_u16().ok()?;
        let records = read_lookup_records(&mut reader, record_count)?;
        Some(Self { backtrack, input, lookahead, records })
    }
}

/// Rule sets behind an offset array; null offsets give empty sets
fn parse_rule_sets<R>(
    data: &[u8],
    offsets: &[u16],
    parse_rule: fn(&[u8]) -> Option<R>,
) -> Option<Vec<Vec<R>>> {
    offsets
        .iter()
        .map(|&offset| {
            let Some(set_data) = at_nullable_offset(data, offset)? else {
                return Some(Vec::new());
            };
            let mut reader = FontReader::new(set_data);
            read_offsets(&mut reader)?
                .into_iter()
                .map(|rule_offset| parse_rule(at_offset(set_data, rule_offset)?))
                .collect()
        })
        .collect()
}

fn parse_coverages(data: &[u8], offsets: &[u16]) -> Option<Vec<Coverage>> {
    offsets
        .iter()
        .map(|&offset| Coverage::parse(at_offset(data, offset)?))
        .collect()
}

/// Contextual lookup (GSUB 5 / GPOS 7)
#[derive(Debug, Clone)]
pub enum SequenceContext {
    /// Format 1: rules over glyph ids, indexed by coverage
    Glyphs { coverage: Coverage, rule_sets: Vec<Vec<SequenceRule>> },
    /// Format 2: rules over classes, indexed by the first glyph's class
    Classes { coverage: Coverage, class_def: ClassDef, rule_sets: Vec<Vec<SequenceRule>> },
    /// Format 3: one coverage per input position
    Coverages { coverages: Vec<Coverage>, records: Vec<SequenceLookupRecord> },
}

impl SequenceContext {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        match reader.read_u16().ok()? {
            1 => {
                let coverage = Coverage::parse(at_offset(data, reader.read_u16().ok()?)?)?;
                let offsets = read_offsets(&mut reader)?;
                let rule_sets = parse_rule_sets(data, &offsets, SequenceRule::parse)?;
                Some(SequenceContext::Glyphs { coverage, rule_sets })
            }
            2 => {
                let coverage = Coverage::parse(at_offset(data, reader.read_u16().ok()?)?)?;
                let class_def = ClassDef::parse_nullable(data, reader.read_u16().ok()?)?;
                let offsets = read_offsets(&mut reader)?;
                let rule_sets = parse_rule_sets(data, &offsets, SequenceRule::parse)?;
                Some(SequenceContext::Classes { coverage, class_def, rule_sets })
            }
            3 => {
                let glyph_count = reader.read_u16().ok()?;
                let record_count = reader.read_u16().ok()?;
                let offsets = reader.read_u16_array(glyph_count as usize).ok()?;
                let records = read_lookup_records(&mut reader, record_count)?;
                let coverages = parse_coverages(data, &offsets)?;
                if coverages.is_empty() {
                    return None;
                }
                Some(SequenceContext::Coverages { coverages, records })
            }
            _ => None,
        }
    }
}

/// Chained contextual lookup (GSUB 6 / GPOS 8)
#[derive(Debug, Clone)]
pub enum ChainedSequenceContext {
    /// Format 1: rules over glyph ids
    Glyphs { coverage: Coverage, rule_sets: Vec<Vec<ChainedSequenceRule>> },
    /// Format 2: rules over classes
    Classes {
        coverage: Coverage,
        backtrack_classes: ClassDef,
        input_classes: ClassDef,
        lookahead_classes: ClassDef,
        rule_sets: Vec<Vec<ChainedSequenceRule>>,
    },
    /// Format 3: coverages; `backtrack` closest-first, `input` includes the first glyph
    Coverages {
        backtrack: Vec<Coverage>,
        input: Vec<Coverage>,
        lookahead: Vec<Coverage>,
        records: Vec<SequenceLookupRecord>,
    },
}

impl ChainedSequenceContext {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut reader = FontReader::new(data);
        match reader.read_u16().ok()? {
            1 => {
                let coverage = Coverage::parse(at_offset(data, reader.read_u16().ok()?)?)?;
                let offsets = read_offsets(&mut reader)?;
                let rule_sets = parse_rule_sets(data, &offsets, ChainedSequenceRule::parse)?;
                Some(ChainedSequenceContext::Glyphs { coverage, rule_sets })
            }
            2 => {
                let coverage = Coverage::parse(at_offset(data, reader.read_u16().ok()?)?)?;
                let backtrack_classes = ClassDef::parse_nullable(data, reader.read_u16().ok()?)?;
                let input_classes = ClassDef::parse_nullable(data, reader.read_u16().ok()?)?;
                let lookahead_classes = ClassDef::parse_nullable(data, reader.read_u16().ok()?)?;
                let offsets = read_offsets(&mut reader)?;
                let rule_sets = parse_rule_sets(data, &offsets, ChainedSequenceRule::parse)?;
                Some(ChainedSequenceContext::Classes {
                    coverage,
                    backtrack_classes,
                    input_classes,
                    lookahead_classes,
                    rule_sets,
                })
            }
            3 => {
                let backtrack = parse_coverages(data, &read_offsets(&mut reader)?)?;
                let input = parse_coverages(data, &read_offsets(&mut reader)?)?;
                let lookahead = parse_coverages(data, &read_offsets(&mut reader)?)?;
                let record_count = reader.read_u16().ok()?;
                let records = read_lookup_records(&mut reader, record_count)?;
                if input.is_empty() {
                    return None;
                }
                Some(ChainedSequenceContext::Coverages { backtrack, input, lookahead, records })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_format1() {
        let data = [0, 1, 0, 3, 0, 5, 0, 9, 0, 20];
        let coverage = Coverage::parse(&data).unwrap();
        assert_eq!(coverage.get(GlyphId(5)), Some(0));
        assert_eq!(coverage.get(GlyphId(20)), Some(2));
        assert_eq!(coverage.get(GlyphId(6)), None);
    }

    #[test]
    fn test_coverage_format2() {
        // [10..=12] -> 0.., [40..=41] -> 3..
        let data = [0, 2, 0, 2, 0, 10, 0, 12, 0, 0, 0, 40, 0, 41, 0, 3];
        let coverage = Coverage::parse(&data).unwrap();
        assert_eq!(coverage.get(GlyphId(11)), Some(1));
        assert_eq!(coverage.get(GlyphId(41)), Some(4));
        assert!(!coverage.contains(GlyphId(13)));
        assert!(!coverage.contains(GlyphId(9)));
    }

    #[test]
    fn test_class_def() {
        let array = [0, 1, 0, 4, 0, 2, 0, 1, 0, 2];
        let classes = ClassDef::parse(&array).unwrap();
        assert_eq!(classes.get(GlyphId(3)), 0);
        assert_eq!(classes.get(GlyphId(4)), 1);
        assert_eq!(classes.get(GlyphId(5)), 2);
        assert_eq!(classes.get(GlyphId(6)), 0);

        let ranges = [0, 2, 0, 1, 0, 7, 0, 9, 0, 3];
        let classes = ClassDef::parse(&ranges).unwrap();
        assert_eq!(classes.get(GlyphId(8)), 3);
        assert_eq!(classes.get(GlyphId(10)), 0);

        assert_eq!(ClassDef::default().get(GlyphId(1)), 0);
        assert!(ClassDef::parse(&[0, 3]).is_none());
    }

    #[test]
    fn test_lookup_flags() {
        let flags = LookupFlags::from_bits_retain(0x0308);
        assert!(flags.contains(LookupFlags::IGNORE_MARKS));
        assert_eq!(flags.mark_attachment_type(), 3);
    }

    #[test]
    fn test_sequence_rule_rejects_empty_input() {
        // glyphCount 0 is malformed
        assert!(SequenceRule::parse(&[0, 0, 0, 0]).is_none());
        let rule = SequenceRule::parse(&[0, 2, 0, 1, 0, 7, 0, 1, 0, 4]).unwrap();
        assert_eq!(rule.input, vec![7]);
        assert_eq!(rule.records, vec![SequenceLookupRecord { sequence_index: 1, lookup_index: 4 }]);
    }
}
