//! OpenType GSUB (Glyph Substitution) subtables
//!
//! All eight substitution lookup types; extension subtables are resolved
//! by the lookup parser before they get here.

use crate::font::parser::FontReader;

use super::common::{at_offset, ChainedSequenceContext, Coverage, SequenceContext};
use super::LookupError;

/// One ligature of a ligature set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ligature {
    /// Resulting ligature glyph
    pub glyph: u16,
    /// Component glyphs after the first (the first comes from coverage)
    pub components: Vec<u16>,
}

/// GSUB subtable (parsed)
#[derive(Debug, Clone)]
pub enum SubstSubtable {
    /// Type 1 format 1: add a delta to the glyph id
    SingleDelta { coverage: Coverage, delta: i16 },
    /// Type 1 format 2: substitute by coverage index
    SingleList { coverage: Coverage, substitutes: Vec<u16> },
    /// Type 2: one glyph to a sequence; an empty sequence deletes
    Multiple { coverage: Coverage, sequences: Vec<Vec<u16>> },
    /// Type 3: one glyph to one of several alternates
    Alternate { coverage: Coverage, alternate_sets: Vec<Vec<u16>> },
    /// Type 4: sets sorted longest-first
    Ligature { coverage: Coverage, ligature_sets: Vec<Vec<Ligature>> },
    /// Type 5
    Context(SequenceContext),
    /// Type 6
    ChainedContext(ChainedSequenceContext),
    /// Type 8: applied from the end of the buffer backwards
    ReverseChainSingle {
        coverage: Coverage,
        backtrack: Vec<Coverage>,
        lookahead: Vec<Coverage>,
        substitutes: Vec<u16>,
    },
}

pub(super) fn parse_subtable(kind: u16, data: &[u8]) -> Result<SubstSubtable, LookupError> {
    let parsed = match kind {
        1 => parse_single(data),
        2 => parse_sequences(data).map(|(coverage, sequences)| SubstSubtable::Multiple { coverage, sequences }),
        3 => parse_sequences(data)
            .map(|(coverage, alternate_sets)| SubstSubtable::Alternate { coverage, alternate_sets }),
        4 => parse_ligature(data),
        5 => SequenceContext::parse(data).map(SubstSubtable::Context),
        6 => ChainedSequenceContext::parse(data).map(SubstSubtable::ChainedContext),
        8 => parse_reverse_chain(data),
        _ => return Err(LookupError::UnsupportedType(kind)),
    };
    parsed.ok_or(LookupError::Malformed { kind })
}

fn parse_coverage(data: &[u8], reader: &mut FontReader<'_>) -> Option<Coverage> {
    Coverage::parse(at_offset(data, reader.read_u16().ok()?)?)
}

fn parse_single(data: &[u8]) -> Option<SubstSubtable> {
    let mut reader = FontReader::new(data);
    let format = reader.read_u16().ok()?;
    let coverage = parse_coverage(data, &mut reader)?;
    match format {
        1 => {
            let delta = reader.read_i16().ok()?;
            Some(SubstSubtable::SingleDelta { coverage, delta })
        }
        2 => {
            let count = reader.read_u16().ok()?;
            let substitutes = reader.read_u16_array(count as usize).ok()?;
            Some(SubstSubtable::SingleList { coverage, substitutes })
        }
        _ => None,
    }
}

/// Coverage plus an array of glyph sequences (multiple and alternate)
fn parse_sequences(data: &[u8]) -> Option<(Coverage, Vec<Vec<u16>>)> {
    let mut reader = FontReader::new(data);
    if reader.read_u16().ok()? != 1 {
        return None;
    }
    let coverage = parse_coverage(data, &mut reader)?;
    let count = reader.read_u16().ok()?;
    let sequences = reader
        .read_u16_array(count as usize)
        .ok()?
        .into_iter()
        .map(|offset| {
            let mut seq_reader = FontReader::new(at_offset(data, offset)?);
            let glyph_count = seq_reader.read_u16().ok()?;
            seq_reader.read_u16_array(glyph_count as usize).ok()
        })
        .collect::<Option<Vec<_>>>()?;
    Some((coverage, sequences))
}

fn parse_ligature(data: &[u8]) -> Option<SubstSubtable> {
    let mut reader = FontReader::new(data);
    if reader.read_u16().ok()? != 1 {
        return None;
    }
    let coverage = parse_coverage(data, &mut reader)?;
    let set_count = reader.read_u16().ok()?;

    let mut ligature_sets = Vec::with_capacity(set_count as usize);
    for set_offset in reader.read_u16_array(set_count as usize).ok()? {
        let set_data = at_offset(data, set_offset)?;
        let mut set_reader = FontReader::new(set_data);
        let lig_count = set_reader.read_u16().ok()?;

        let mut ligatures = Vec::with_capacity(lig_count as usize);
        for lig_offset in set_reader.read_u16_array(lig_count as usize).ok()? {
            let mut lig_reader = FontReader::new(at_offset(set_data, lig_offset)?);
            let glyph = lig_reader.read_u16().ok()?;
            let component_count = lig_reader.read_u16().ok()?;
            // component_count includes the first glyph (from coverage)
            let components = lig_reader
                .read_u16_array(component_count.checked_sub(1)? as usize)
                .ok()?;
            ligatures.push(Ligature { glyph, components });
        }
        // Longest first; stable so font order breaks ties
        ligatures.sort_by(|a, b| b.components.len().cmp(&a.components.len()));
        ligature_sets.push(ligatures);
    }

    Some(SubstSubtable::Ligature { coverage, ligature_sets })
}

fn parse_reverse_chain(data: &[u8]) -> Option<SubstSubtable> {
    let mut reader = FontReader::new(data);
    if reader.read_u16().ok()? != 1 {
        return None;
    }
    let coverage = parse_coverage(data, &mut reader)?;
    let mut coverages = || -> Option<Vec<Coverage>> {
        let count = reader.read_u16().ok()?;
        reader
            .read_u16_array(count as usize)
            .ok()?
            .into_iter()
            .map(|offset| Coverage::parse(at_offset(data, offset)?))
            .collect()
    };
    let backtrack = coverages()?;
    let lookahead = coverages()?;
    let count = reader.read_u16().ok()?;
    let substitutes = reader.read_u16_array(count as usize).ok()?;
    Some(SubstSubtable::ReverseChainSingle { coverage, backtrack, lookahead, substitutes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::GlyphId;

    #[test]
    fn test_single_delta() {
        let data = [0, 1, 0, 6, 0, 3, 0, 1, 0, 1, 0, 4];
        let SubstSubtable::SingleDelta { coverage, delta } = parse_subtable(1, &data).unwrap() else {
            panic!("expected single delta");
        };
        assert_eq!(delta, 3);
        assert!(coverage.contains(GlyphId(4)));
    }

    #[test]
    fn test_multiple_with_empty_sequence() {
        let data = [
            0, 1, 0, 10, 0, 2, 0, 20, 0, 26, // header: coverage at 10, two sequences
            0, 1, 0, 2, 0, 4, 0, 5, // coverage: 4, 5
            0, 0, // padding
            0, 2, 0, 7, 0, 8, // sequence 0: [7, 8]
            0, 0, // sequence 1: []
        ];
        let SubstSubtable::Multiple { sequences, .. } = parse_subtable(2, &data).unwrap() else {
            panic!("expected multiple");
        };
        assert_eq!(sequences, vec![vec![7, 8], vec![]]);
    }

    #[test]
    fn test_ligature_sets_sorted_longest_first() {
        let data = [
            0, 1, 0, 8, 0, 1, 0, 14, // header: coverage at 8, one set at 14
            0, 1, 0, 1, 0, 4, // coverage: glyph 4
            0, 2, 0, 6, 0, 12, // set: two ligatures
            0, 6, 0, 2, 0, 5, // fi: f + i
            0, 7, 0, 3, 0, 4, 0, 5, // ffi: f + f + i
        ];
        let SubstSubtable::Ligature { ligature_sets, .. } = parse_subtable(4, &data).unwrap() else {
            panic!("expected ligature");
        };
        let glyphs: Vec<u16> = ligature_sets[0].iter().map(|l| l.glyph).collect();
        assert_eq!(glyphs, vec![7, 6]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_subtable(9, &[]).unwrap_err(), LookupError::UnsupportedType(9));
        assert_eq!(parse_subtable(1, &[0, 1, 0xFF, 0]).unwrap_err(), LookupError::Malformed { kind: 1 });
    }
}
