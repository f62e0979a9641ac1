//! GDEF, GSUB and GPOS building blocks
//!
//! Subtable helpers take glyph ids and sort them as the format requires,
//! so tests can list pairs in reading order.

use crate::{BeBuffer, Subtable};

/// Format 1 coverage
pub fn coverage(glyphs: &[u16]) -> Vec<u8> {
    let mut glyphs = glyphs.to_vec();
    glyphs.sort_unstable();
    glyphs.dedup();
    BeBuffer::new().push(1u16).push(glyphs.len() as u16).extend(glyphs).into_vec()
}

/// Format 2 coverage over inclusive glyph ranges
pub fn coverage_ranges(ranges: &[(u16, u16)]) -> Vec<u8> {
    let mut ranges = ranges.to_vec();
    ranges.sort_unstable();
    let mut index = 0u16;
    let mut buf = BeBuffer::new().push(2u16).push(ranges.len() as u16);
    for (start, end) in ranges {
        buf = buf.push(start).push(end).push(index);
        index += end - start + 1;
    }
    buf.into_vec()
}

/// Format 2 class definition with one range per `(glyph, class)`
pub fn class_def(classes: &[(u16, u16)]) -> Vec<u8> {
    let mut classes = classes.to_vec();
    classes.sort_unstable();
    classes.dedup_by_key(|c| c.0);
    classes
        .iter()
        .fold(BeBuffer::new().push(2u16).push(classes.len() as u16), |buf, &(glyph, class)| {
            buf.push(glyph).push(glyph).push(class)
        })
        .into_vec()
}

pub fn anchor(x: i16, y: i16) -> Vec<u8> {
    BeBuffer::new().push(1u16).push(x).push(y).into_vec()
}

/// GDEF glyph classes
pub const BASE: u16 = 1;
pub const LIGATURE: u16 = 2;
pub const MARK: u16 = 3;

/// GDEF table. Version 1.2 is written when mark glyph sets are given.
pub fn gdef(classes: &[(u16, u16)], mark_attach: &[(u16, u16)], mark_sets: &[&[u16]]) -> Vec<u8> {
    let minor = if mark_sets.is_empty() { 0u16 } else { 2 };
    let mut table = Subtable::new()
        .push(1u16)
        .push(minor)
        .nullable16((!classes.is_empty()).then(|| class_def(classes)))
        .null_offset() // attach list
        .null_offset() // ligature caret list
        .nullable16((!mark_attach.is_empty()).then(|| class_def(mark_attach)));
    if !mark_sets.is_empty() {
        let sets = mark_sets
            .iter()
            .fold(Subtable::new().push(1u16).push(mark_sets.len() as u16), |sets, glyphs| {
                sets.offset32(coverage(glyphs))
            });
        table = table.offset16(sets);
    }
    table.build()
}

/// Lookup flag bits
pub mod flags {
    pub const RIGHT_TO_LEFT: u16 = 0x0001;
    pub const IGNORE_BASE_GLYPHS: u16 = 0x0002;
    pub const IGNORE_LIGATURES: u16 = 0x0004;
    pub const IGNORE_MARKS: u16 = 0x0008;
    pub const USE_MARK_FILTERING_SET: u16 = 0x0010;
}

pub fn lookup(kind: u16, flags: u16, subtables: Vec<Vec<u8>>) -> Vec<u8> {
    Subtable::new()
        .push(kind)
        .push(flags)
        .push(subtables.len() as u16)
        .offsets16(subtables)
        .build()
}

/// Lookup restricted to mark glyph set `set`
pub fn lookup_with_mark_set(kind: u16, flags: u16, set: u16, subtables: Vec<Vec<u8>>) -> Vec<u8> {
    let flags = flags | flags::USE_MARK_FILTERING_SET;
    let count = subtables.len() as u16;
    // The filtering set follows the subtable offsets in the header
    let mut table = Subtable::new().push(kind).push(flags).push(count);
    for subtable in subtables {
        table = table.offset16(subtable);
    }
    table.push(set).build()
}

/// Extension subtable wrapping a subtable of lookup type `kind`
pub fn extension(kind: u16, subtable: Vec<u8>) -> Vec<u8> {
    Subtable::new().push(1u16).push(kind).offset32(subtable).build()
}

/// Builds a GSUB or GPOS table. Every script gets a default language
/// system enabling all features; extra language systems enable a subset.
#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    scripts: Vec<[u8; 4]>,
    default_features: Option<Vec<u16>>,
    languages: Vec<([u8; 4], Vec<u16>)>,
    required_feature: Option<u16>,
    features: Vec<([u8; 4], Vec<u16>)>,
    lookups: Vec<Vec<u8>>,
}

impl LayoutBuilder {
    pub fn new(scripts: &[&[u8; 4]]) -> Self {
        let mut scripts: Vec<[u8; 4]> = scripts.iter().map(|s| **s).collect();
        scripts.sort_unstable();
        Self { scripts, ..Self::default() }
    }

    /// Feature `tag` running the lookups at `lookups`
    pub fn feature(mut self, tag: &[u8; 4], lookups: &[u16]) -> Self {
        self.features.push((*tag, lookups.to_vec()));
        self
    }

    /// Restrict the default language system to the features at `features`
    pub fn default_features(mut self, features: &[u16]) -> Self {
        self.default_features = Some(features.to_vec());
        self
    }

    /// Language system `tag` enabling the features at `features`
    pub fn language(mut self, tag: &[u8; 4], features: &[u16]) -> Self {
        self.languages.push((*tag, features.to_vec()));
        self
    }

    /// Make the feature at `index` required in every language system
    pub fn required_feature(mut self, index: u16) -> Self {
        self.required_feature = Some(index);
        self
    }

    pub fn lookup(mut self, lookup: Vec<u8>) -> Self {
        self.lookups.push(lookup);
        self
    }

    fn lang_sys(&self, features: &[u16]) -> Vec<u8> {
        let features: Vec<u16> = features
            .iter()
            .copied()
            .filter(|&f| Some(f) != self.required_feature)
            .collect();
        BeBuffer::new()
            .push(0u16) // lookup order
            .push(self.required_feature.unwrap_or(0xFFFF))
            .push(features.len() as u16)
            .extend(features)
            .into_vec()
    }

    fn script(&self) -> Vec<u8> {
        let defaults = match &self.default_features {
            Some(features) => features.clone(),
            None => (0..self.features.len() as u16).collect(),
        };
        let mut script = Subtable::new()
            .offset16(self.lang_sys(&defaults))
            .push(self.languages.len() as u16);
        for (tag, features) in &self.languages {
            script = script.push(*tag).offset16(self.lang_sys(features));
        }
        script.build()
    }

    pub fn build(self) -> Vec<u8> {
        let scripts = self
            .scripts
            .iter()
            .fold(Subtable::new().push(self.scripts.len() as u16), |list, tag| {
                list.push(*tag).offset16(self.script())
            });
        let features = self
            .features
            .iter()
            .fold(Subtable::new().push(self.features.len() as u16), |list, (tag, lookups)| {
                let feature = BeBuffer::new()
                    .push(0u16) // feature params
                    .push(lookups.len() as u16)
                    .extend(lookups.iter().copied());
                list.push(*tag).offset16(feature)
            });
        let lookups = Subtable::new()
            .push(self.lookups.len() as u16)
            .offsets16(self.lookups);

        Subtable::new()
            .push(1u16)
            .push(0u16)
            .offset16(scripts)
            .offset16(features)
            .offset16(lookups)
            .build()
    }
}

/// Lookup types
pub mod gsub {
    use super::{coverage, BeBuffer, Subtable};

    pub const SINGLE: u16 = 1;
    pub const MULTIPLE: u16 = 2;
    pub const ALTERNATE: u16 = 3;
    pub const LIGATURE: u16 = 4;
    pub const CONTEXT: u16 = 5;
    pub const CHAINED_CONTEXT: u16 = 6;
    pub const EXTENSION: u16 = 7;
    pub const REVERSE_CHAIN: u16 = 8;

    fn sorted<T: Clone>(entries: &[(u16, T)]) -> Vec<(u16, T)> {
        let mut entries = entries.to_vec();
        entries.sort_by_key(|e| e.0);
        entries
    }

    /// Format 1: add `delta` to every covered glyph
    pub fn single_delta(glyphs: &[u16], delta: i16) -> Vec<u8> {
        Subtable::new().push(1u16).offset16(coverage(glyphs)).push(delta).build()
    }

    /// Format 2: `(from, to)` pairs
    pub fn single(pairs: &[(u16, u16)]) -> Vec<u8> {
        let pairs = sorted(pairs);
        Subtable::new()
            .push(2u16)
            .offset16(coverage(&pairs.iter().map(|p| p.0).collect::<Vec<_>>()))
            .push(pairs.len() as u16)
            .extend(pairs.iter().map(|p| p.1))
            .build()
    }

    fn sequences(entries: &[(u16, &[u16])]) -> Vec<u8> {
        let entries = sorted(entries);
        let covered: Vec<u16> = entries.iter().map(|e| e.0).collect();
        entries
            .iter()
            .fold(
                Subtable::new().push(1u16).offset16(coverage(&covered)).push(entries.len() as u16),
                |table, (_, glyphs)| {
                    let sequence = BeBuffer::new().push(glyphs.len() as u16).extend(glyphs.iter().copied());
                    table.offset16(sequence)
                },
            )
            .build()
    }

    /// One glyph to a sequence; an empty sequence deletes the glyph
    pub fn multiple(entries: &[(u16, &[u16])]) -> Vec<u8> {
        sequences(entries)
    }

    pub fn alternate(entries: &[(u16, &[u16])]) -> Vec<u8> {
        sequences(entries)
    }

    /// `(components, ligature glyph)`; components include the first glyph
    pub fn ligature(ligatures: &[(&[u16], u16)]) -> Vec<u8> {
        let mut firsts: Vec<u16> = ligatures.iter().filter_map(|(c, _)| c.first().copied()).collect();
        firsts.sort_unstable();
        firsts.dedup();

        let mut table = Subtable::new()
            .push(1u16)
            .offset16(coverage(&firsts))
            .push(firsts.len() as u16);
        for first in &firsts {
            let set = ligatures
                .iter()
                .filter(|(components, _)| components.first() == Some(first))
                .collect::<Vec<_>>();
            let set = set.iter().fold(
                Subtable::new().push(set.len() as u16),
                |set, (components, glyph)| {
                    let lig = BeBuffer::new()
                        .push(*glyph)
                        .push(components.len() as u16)
                        .extend(components[1..].iter().copied());
                    set.offset16(lig)
                },
            );
            table = table.offset16(set);
        }
        table.build()
    }

    /// Format 3 contextual substitution
    pub fn context(input: &[&[u16]], records: &[(u16, u16)]) -> Vec<u8> {
        super::context(input, records)
    }

    /// Format 3 chained contextual substitution; `backtrack` is closest first
    pub fn chained_context(
        backtrack: &[&[u16]],
        input: &[&[u16]],
        lookahead: &[&[u16]],
        records: &[(u16, u16)],
    ) -> Vec<u8> {
        super::chained_context(backtrack, input, lookahead, records)
    }

    /// Reverse chaining single substitution; `backtrack` is closest first
    pub fn reverse_chain(backtrack: &[&[u16]], lookahead: &[&[u16]], pairs: &[(u16, u16)]) -> Vec<u8> {
        let pairs = sorted(pairs);
        let covered: Vec<u16> = pairs.iter().map(|p| p.0).collect();
        let mut table = Subtable::new().push(1u16).offset16(coverage(&covered));
        table = table.push(backtrack.len() as u16).offsets16(backtrack.iter().map(|g| coverage(g)));
        table = table.push(lookahead.len() as u16).offsets16(lookahead.iter().map(|g| coverage(g)));
        table
            .push(pairs.len() as u16)
            .extend(pairs.iter().map(|p| p.1))
            .build()
    }
}

/// Format 3 sequence context, shared by GSUB 5 and GPOS 7
fn context(input: &[&[u16]], records: &[(u16, u16)]) -> Vec<u8> {
    let mut table = Subtable::new()
        .push(3u16)
        .push(input.len() as u16)
        .push(records.len() as u16);
    table = table.offsets16(input.iter().map(|g| coverage(g)));
    table
        .extend(records.iter().flat_map(|&(index, lookup)| [index, lookup]))
        .build()
}

/// Format 3 chained sequence context, shared by GSUB 6 and GPOS 8
fn chained_context(
    backtrack: &[&[u16]],
    input: &[&[u16]],
    lookahead: &[&[u16]],
    records: &[(u16, u16)],
) -> Vec<u8> {
    let mut table = Subtable::new().push(3u16);
    for sequence in [backtrack, input, lookahead] {
        table = table
            .push(sequence.len() as u16)
            .offsets16(sequence.iter().map(|g| coverage(g)));
    }
    table
        .push(records.len() as u16)
        .extend(records.iter().flat_map(|&(index, lookup)| [index, lookup]))
        .build()
}

pub mod gpos {
    use super::{anchor, class_def, coverage, BeBuffer, Subtable};

    pub const SINGLE: u16 = 1;
    pub const PAIR: u16 = 2;
    pub const CURSIVE: u16 = 3;
    pub const MARK_TO_BASE: u16 = 4;
    pub const MARK_TO_LIGATURE: u16 = 5;
    pub const MARK_TO_MARK: u16 = 6;
    pub const CONTEXT: u16 = 7;
    pub const CHAINED_CONTEXT: u16 = 8;
    pub const EXTENSION: u16 = 9;

    /// Value format with all four placement / advance fields
    const FULL_VALUE: u16 = 0x000F;
    const X_ADVANCE: u16 = 0x0004;

    /// Format 1: `[x_placement, y_placement, x_advance, y_advance]` for
    /// every covered glyph
    pub fn single(glyphs: &[u16], value: [i16; 4]) -> Vec<u8> {
        Subtable::new()
            .push(1u16)
            .offset16(coverage(glyphs))
            .push(FULL_VALUE)
            .extend(value)
            .build()
    }

    /// Format 1 pairs `(first, second, x_advance of first)`
    pub fn pair(pairs: &[(u16, u16, i16)]) -> Vec<u8> {
        let mut pairs = pairs.to_vec();
        pairs.sort_unstable();
        let mut firsts: Vec<u16> = pairs.iter().map(|p| p.0).collect();
        firsts.dedup();

        let mut table = Subtable::new()
            .push(1u16)
            .offset16(coverage(&firsts))
            .push(X_ADVANCE)
            .push(0u16)
            .push(firsts.len() as u16);
        for first in firsts {
            let set: Vec<_> = pairs.iter().filter(|p| p.0 == first).collect();
            let set = set
                .iter()
                .fold(BeBuffer::new().push(set.len() as u16), |buf, p| buf.push(p.1).push(p.2));
            table = table.offset16(set);
        }
        table.build()
    }

    /// Format 2: every glyph of `first` followed by any of `second` gets
    /// `x_advance`
    pub fn pair_classes(first: &[u16], second: &[u16], x_advance: i16) -> Vec<u8> {
        let class1: Vec<(u16, u16)> = first.iter().map(|&g| (g, 1)).collect();
        let class2: Vec<(u16, u16)> = second.iter().map(|&g| (g, 1)).collect();
        Subtable::new()
            .push(2u16)
            .offset16(coverage(first))
            .push(X_ADVANCE)
            .push(0u16)
            .offset16(class_def(&class1))
            .offset16(class_def(&class2))
            .push(2u16)
            .push(2u16)
            .extend([0i16, 0, 0, x_advance])
            .build()
    }

    pub type Point = (i16, i16);

    /// Entry and exit anchors per glyph
    pub fn cursive(entries: &[(u16, Option<Point>, Option<Point>)]) -> Vec<u8> {
        let mut entries = entries.to_vec();
        entries.sort_by_key(|e| e.0);
        let glyphs: Vec<u16> = entries.iter().map(|e| e.0).collect();
        entries
            .iter()
            .fold(
                Subtable::new().push(1u16).offset16(coverage(&glyphs)).push(entries.len() as u16),
                |table, (_, entry, exit)| {
                    table
                        .nullable16(entry.map(|(x, y)| anchor(x, y)))
                        .nullable16(exit.map(|(x, y)| anchor(x, y)))
                },
            )
            .build()
    }

    fn mark_array(marks: &[(u16, u16, Point)]) -> Vec<u8> {
        marks
            .iter()
            .fold(Subtable::new().push(marks.len() as u16), |array, &(_, class, (x, y))| {
                array.push(class).offset16(anchor(x, y))
            })
            .build()
    }

    fn anchor_matrix(rows: &[&[Option<Point>]]) -> Vec<u8> {
        let mut matrix = Subtable::new().push(rows.len() as u16);
        for row in rows {
            for cell in row.iter() {
                matrix = matrix.nullable16(cell.map(|(x, y)| anchor(x, y)));
            }
        }
        matrix.build()
    }

    fn attachment(marks: &[(u16, u16, Point)], bases: &[(u16, &[Option<Point>])]) -> Vec<u8> {
        let mut marks = marks.to_vec();
        marks.sort_by_key(|m| m.0);
        let mut bases = bases.to_vec();
        bases.sort_by_key(|b| b.0);
        let class_count = marks.iter().map(|m| m.1 + 1).max().unwrap_or(0);

        let mark_glyphs: Vec<u16> = marks.iter().map(|m| m.0).collect();
        let base_glyphs: Vec<u16> = bases.iter().map(|b| b.0).collect();
        let rows: Vec<&[Option<Point>]> = bases.iter().map(|b| b.1).collect();
        Subtable::new()
            .push(1u16)
            .offset16(coverage(&mark_glyphs))
            .offset16(coverage(&base_glyphs))
            .push(class_count)
            .offset16(mark_array(&marks))
            .offset16(anchor_matrix(&rows))
            .build()
    }

    /// `(mark, class, anchor)` marks onto `(base, anchor per class)` bases
    pub fn mark_to_base(marks: &[(u16, u16, Point)], bases: &[(u16, &[Option<Point>])]) -> Vec<u8> {
        attachment(marks, bases)
    }

    pub fn mark_to_mark(marks: &[(u16, u16, Point)], mark2s: &[(u16, &[Option<Point>])]) -> Vec<u8> {
        attachment(marks, mark2s)
    }

    /// Marks onto ligatures: each ligature lists one anchor row per
    /// component
    pub fn mark_to_ligature(marks: &[(u16, u16, Point)], ligatures: &[(u16, &[&[Option<Point>]])]) -> Vec<u8> {
        let mut marks = marks.to_vec();
        marks.sort_by_key(|m| m.0);
        let mut ligatures = ligatures.to_vec();
        ligatures.sort_by_key(|l| l.0);
        let class_count = marks.iter().map(|m| m.1 + 1).max().unwrap_or(0);

        let mark_glyphs: Vec<u16> = marks.iter().map(|m| m.0).collect();
        let lig_glyphs: Vec<u16> = ligatures.iter().map(|l| l.0).collect();
        let array = ligatures
            .iter()
            .fold(Subtable::new().push(ligatures.len() as u16), |array, (_, components)| {
                array.offset16(anchor_matrix(components))
            });
        Subtable::new()
            .push(1u16)
            .offset16(coverage(&mark_glyphs))
            .offset16(coverage(&lig_glyphs))
            .push(class_count)
            .offset16(mark_array(&marks))
            .offset16(array)
            .build()
    }

    pub fn context(input: &[&[u16]], records: &[(u16, u16)]) -> Vec<u8> {
        super::context(input, records)
    }

    pub fn chained_context(
        backtrack: &[&[u16]],
        input: &[&[u16]],
        lookahead: &[&[u16]],
        records: &[(u16, u16)],
    ) -> Vec<u8> {
        super::chained_context(backtrack, input, lookahead, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_is_sorted() {
        assert_eq!(coverage(&[9, 3, 3]), vec![0, 1, 0, 2, 0, 3, 0, 9]);
    }

    #[test]
    fn coverage_ranges_count_indices() {
        let data = coverage_ranges(&[(40, 41), (10, 12)]);
        assert_eq!(data, vec![0, 2, 0, 2, 0, 10, 0, 12, 0, 0, 0, 40, 0, 41, 0, 3]);
    }

    #[test]
    fn layout_header_offsets() {
        let table = LayoutBuilder::new(&[b"latn"])
            .feature(b"liga", &[0])
            .lookup(lookup(gsub::SINGLE, 0, vec![gsub::single(&[(1, 2)])]))
            .build();
        // version 1.0, script list right after the header
        assert_eq!(&table[..6], &[0, 1, 0, 0, 0, 10]);
        assert_eq!(&table[12..16], b"latn");
    }

    #[test]
    fn mark_set_follows_offsets() {
        let data = lookup_with_mark_set(gsub::SINGLE, 0, 3, vec![vec![0xAB]]);
        assert_eq!(&data[..6], &[0, 1, 0, 0x10, 0, 1]);
        assert_eq!(&data[8..10], &[0, 3]);
        assert_eq!(data[10], 0xAB);
    }
}
