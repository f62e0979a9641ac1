//! Layout Engine
//!
//! GDEF / GSUB / GPOS parsing and lookup interpretation. Tables are parsed
//! once per face; a lookup whose subtables are malformed is dropped while
//! the rest of the table stays usable.

mod apply;
mod common;
mod gdef;
mod gpos;
mod gsub;

pub use common::{
    ChainedSequenceContext, ChainedSequenceRule, ClassDef, Coverage, FeatureList, FeatureRecord,
    LangSys, LookupFlags, ScriptList, ScriptRecord, SequenceContext, SequenceLookupRecord,
    SequenceRule,
};
pub use gdef::Gdef;
pub use gpos::{Anchor, PosSubtable, ValueRecord};
pub use gsub::{Ligature, SubstSubtable};

pub(crate) use apply::{position_finish, set_glyph_props, ApplyContext, LookupPass};

use crate::font::parser::{tags, FontReader, ParseError};
use crate::tag::Tag;
use crate::ShapeError;

use common::{at_nullable_offset, at_offset};

/// GSUB table
pub type GsubTable = LayoutTable<SubstSubtable>;
/// GPOS table
pub type GposTable = LayoutTable<PosSubtable>;

/// Lookup subtable error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("unsupported lookup type {0}")]
    UnsupportedType(u16),

    #[error("malformed subtable in lookup of type {kind}")]
    Malformed { kind: u16 },
}

/// Subtable family of a layout table
pub trait LookupSubtable: Sized {
    /// Table tag, for error reports
    const TABLE: Tag;
    /// Lookup type of extension subtables
    const EXTENSION: u16;
    /// Highest lookup type defined for this table
    const MAX_KIND: u16;

    /// Whether lookups of type `kind` exist in this table
    fn is_supported(kind: u16) -> bool {
        (1..=Self::MAX_KIND).contains(&kind)
    }

    /// Parse one subtable of lookup type `kind`
    fn parse(kind: u16, data: &[u8]) -> Result<Self, LookupError>;
}

/// A lookup: typed subtables plus matching flags
#[derive(Debug, Clone)]
pub struct Lookup<T> {
    /// Lookup type, with extensions resolved
    pub kind: u16,
    pub flags: LookupFlags,
    pub mark_filtering_set: Option<u16>,
    pub subtables: Vec<T>,
}

impl<T: LookupSubtable> Lookup<T> {
    fn parse(data: &[u8]) -> Result<Self, LookupError> {
        let mut reader = FontReader::new(data);
        let malformed = |kind: u16| move |_: ParseError| LookupError::Malformed { kind };

        let mut kind = reader.read_u16().map_err(malformed(0))?;
        if !T::is_supported(kind) {
            return Err(LookupError::UnsupportedType(kind));
        }
        let flags = LookupFlags::from_bits_retain(reader.read_u16().map_err(malformed(kind))?);
        let count = reader.read_u16().map_err(malformed(kind))?;
        let offsets = reader.read_u16_array(count as usize).map_err(malformed(kind))?;
        let mark_filtering_set = if flags.contains(LookupFlags::USE_MARK_FILTERING_SET) {
            Some(reader.read_u16().map_err(malformed(kind))?)
        } else {
            None
        };

        let is_extension = kind == T::EXTENSION;
        let mut subtables = Vec::with_capacity(offsets.len());
        for offset in offsets {
            let mut sub_data = at_offset(data, offset).ok_or(LookupError::Malformed { kind })?;
            let mut sub_kind = kind;
            if is_extension {
                let (ext_kind, ext_data) = Self::resolve_extension(sub_data).ok_or(LookupError::Malformed { kind })?;
                sub_kind = ext_kind;
                sub_data = ext_data;
            }
            subtables.push(T::parse(sub_kind, sub_data)?);
            // Every extension subtable must share one lookup type
            if is_extension {
                if kind != T::EXTENSION && kind != sub_kind {
                    return Err(LookupError::Malformed { kind: sub_kind });
                }
                kind = sub_kind;
            }
        }

        Ok(Self { kind, flags, mark_filtering_set, subtables })
    }

    fn resolve_extension(data: &[u8]) -> Option<(u16, &[u8])> {
        let mut reader = FontReader::new(data);
        if reader.read_u16().ok()? != 1 {
            return None;
        }
        let kind = reader.read_u16().ok()?;
        let offset = reader.read_u32().ok()? as usize;
        Some((kind, data.get(offset..)?))
    }
}

/// Parsed GSUB or GPOS table
#[derive(Debug, Clone)]
pub struct LayoutTable<T> {
    pub scripts: ScriptList,
    pub features: FeatureList,
    lookups: Vec<Option<Lookup<T>>>,
}

impl<T: LookupSubtable> LayoutTable<T> {
    /// Parse the table header, script / feature / lookup lists and every
    /// lookup. Unusable lists fail the table; unusable lookups are dropped.
    pub fn parse(data: &[u8]) -> Result<Self, ShapeError> {
        let invalid = |reason: &str| ShapeError::InvalidLayoutTable {
            tag: T::TABLE,
            reason: reason.to_string(),
        };

        let mut reader = FontReader::new(data);
        let major = reader.read_u16().map_err(|_| invalid("truncated header"))?;
        let minor = reader.read_u16().map_err(|_| invalid("truncated header"))?;
        if major != 1 || minor > 1 {
            return Err(invalid(&format!("unsupported version {major}.{minor}")));
        }
        let script_offset = reader.read_u16().map_err(|_| invalid("truncated header"))?;
        let feature_offset = reader.read_u16().map_err(|_| invalid("truncated header"))?;
        let lookup_offset = reader.read_u16().map_err(|_| invalid("truncated header"))?;

        let scripts = match at_nullable_offset(data, script_offset).ok_or_else(|| invalid("script list out of bounds"))? {
            Some(d) => ScriptList::parse(d).ok_or_else(|| invalid("malformed script list"))?,
            None => ScriptList::default(),
        };
        let features = match at_nullable_offset(data, feature_offset).ok_or_else(|| invalid("feature list out of bounds"))? {
            Some(d) => FeatureList::parse(d).ok_or_else(|| invalid("malformed feature list"))?,
            None => FeatureList::default(),
        };
        let lookups = match at_nullable_offset(data, lookup_offset).ok_or_else(|| invalid("lookup list out of bounds"))? {
            Some(d) => Self::parse_lookups(d).ok_or_else(|| invalid("malformed lookup list"))?,
            None => Vec::new(),
        };

        tracing::debug!(
            table = %T::TABLE,
            scripts = scripts.0.len(),
            features = features.0.len(),
            lookups = lookups.len(),
            "parsed layout table"
        );
        Ok(Self { scripts, features, lookups })
    }

    fn parse_lookups(data: &[u8]) -> Option<Vec<Option<Lookup<T>>>> {
        let mut reader = FontReader::new(data);
        let count = reader.read_u16().ok()?;
        let offsets = reader.read_u16_array(count as usize).ok()?;
        Some(
            offsets
                .into_iter()
                .enumerate()
                .map(|(index, offset)| {
                    let parsed = at_offset(data, offset)
                        .ok_or(LookupError::Malformed { kind: 0 })
                        .and_then(Lookup::parse);
                    match parsed {
                        Ok(lookup) => Some(lookup),
                        Err(err) => {
                            tracing::debug!(table = %T::TABLE, index, %err, "dropping lookup");
                            None
                        }
                    }
                })
                .collect(),
        )
    }
}

impl<T> LayoutTable<T> {
    /// Lookup by index; `None` if out of range or dropped
    pub fn lookup(&self, index: u16) -> Option<&Lookup<T>> {
        self.lookups.get(index as usize)?.as_ref()
    }

    /// Number of lookups, dropped ones included
    pub fn lookup_count(&self) -> usize {
        self.lookups.len()
    }

    /// First script found among `candidates`
    pub fn find_script(&self, candidates: &[Tag]) -> Option<&ScriptRecord> {
        candidates.iter().find_map(|&tag| self.scripts.find(tag))
    }

    /// Lookup indices of every feature named `tag` in a language system
    pub fn feature_lookups(&self, lang_sys: &LangSys, tag: Tag) -> Option<Vec<u16>> {
        let mut found = false;
        let mut lookups = Vec::new();
        for &index in &lang_sys.feature_indices {
            if let Some(feature) = self.features.get(index).filter(|f| f.tag == tag) {
                found = true;
                lookups.extend_from_slice(&feature.lookup_indices);
            }
        }
        found.then_some(lookups)
    }
}

impl LookupSubtable for SubstSubtable {
    const TABLE: Tag = tags::GSUB;
    const EXTENSION: u16 = 7;
    const MAX_KIND: u16 = 8;

    fn parse(kind: u16, data: &[u8]) -> Result<Self, LookupError> {
        gsub::parse_subtable(kind, data)
    }
}

impl LookupSubtable for PosSubtable {
    const TABLE: Tag = tags::GPOS;
    const EXTENSION: u16 = 9;
    const MAX_KIND: u16 = 9;

    fn parse(kind: u16, data: &[u8]) -> Result<Self, LookupError> {
        gpos::parse_subtable(kind, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(lookup_list: &[u8]) -> Vec<u8> {
        // header, empty script list, empty feature list, lookup list
        let mut data = vec![0, 1, 0, 0, 0, 10, 0, 12, 0, 14, 0, 0, 0, 0];
        data.extend_from_slice(lookup_list);
        data
    }

    #[test]
    fn test_parse_empty_lists() {
        let gsub = GsubTable::parse(&table(&[0, 0])).unwrap();
        assert_eq!(gsub.lookup_count(), 0);
        assert!(gsub.scripts.0.is_empty());
    }

    #[test]
    fn test_bad_header_is_invalid_table() {
        let err = GsubTable::parse(&[0, 2, 0, 0, 0, 10, 0, 12, 0, 14]).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidLayoutTable { tag, .. } if tag == tags::GSUB));

        let err = GposTable::parse(&[0, 1, 0, 0, 0xFF, 0xF0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidLayoutTable { tag, .. } if tag == tags::GPOS));
    }

    #[test]
    fn test_malformed_lookup_is_dropped() {
        // two lookups: a valid single substitution, then an unsupported type
        let lookup_list = [
            0, 2, 0, 6, 0, 26, // count, offsets
            // lookup 0: type 1, flag 0, one subtable at 8
            0, 1, 0, 0, 0, 1, 0, 8,
            // SingleSubst format 1: coverage at 6, delta 1
            0, 1, 0, 6, 0, 1,
            // Coverage format 1: glyph 4
            0, 1, 0, 1, 0, 4,
            // lookup 1: type 9 (invalid in GSUB)
            0, 9, 0, 0, 0, 0,
        ];
        let gsub = GsubTable::parse(&table(&lookup_list)).unwrap();
        assert_eq!(gsub.lookup_count(), 2);
        assert_eq!(gsub.lookup(0).map(|l| l.kind), Some(1));
        assert!(gsub.lookup(1).is_none());
        assert!(gsub.lookup(2).is_none());
    }

    #[test]
    fn test_supported_lookup_kinds() {
        assert!(SubstSubtable::is_supported(8));
        assert!(!SubstSubtable::is_supported(9));
        assert!(!SubstSubtable::is_supported(0));
        assert!(PosSubtable::is_supported(9));
        assert!(!PosSubtable::is_supported(10));
    }
}
