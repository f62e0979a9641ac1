//! Glyph buffer
//!
//! Holds the text to shape and, after shaping, the glyphs with their
//! clusters, flags and positions.

use std::ops::Range;

use bitflags::bitflags;

use crate::font::GlyphId;
use crate::unicode::{self, Direction, Language, PositionalForm, Script};

bitflags! {
    /// Per-glyph flags exposed to callers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GlyphFlags: u32 {
        /// Breaking the line before this glyph requires reshaping
        const UNSAFE_TO_BREAK = 0x1;
        /// Concatenating shaped text at this glyph requires reshaping
        const UNSAFE_TO_CONCAT = 0x2;
    }
}

bitflags! {
    /// Buffer-wide shaping switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferFlags: u32 {
        /// Keep default ignorables as visible glyphs
        const PRESERVE_DEFAULT_IGNORABLES = 0x4;
        /// Drop default ignorables from the output
        const REMOVE_DEFAULT_IGNORABLES = 0x8;
    }
}

bitflags! {
    /// Internal glyph properties tracked during shaping
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub(crate) struct GlyphProps: u16 {
        const DEFAULT_IGNORABLE = 0x01;
        const ZWJ = 0x02;
        const ZWNJ = 0x04;
        const SUBSTITUTED = 0x10;
        const LIGATED = 0x20;
        const MULTIPLIED = 0x40;
        /// Mapped from a combining mark scalar
        const UNICODE_MARK = 0x80;
    }
}

/// What the buffer currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    /// Empty, never filled
    #[default]
    Invalid,
    /// Characters, before shaping
    Unicode,
    /// Glyph ids, after shaping
    Glyphs,
}

/// How characters are grouped into clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClusterLevel {
    /// Marks join the cluster of their base; clusters stay monotone
    #[default]
    MonotoneGraphemes,
    /// One cluster per character; clusters stay monotone
    MonotoneCharacters,
    /// One cluster per character, reordering may break monotonicity
    Characters,
}

impl ClusterLevel {
    pub fn is_monotone(self) -> bool {
        !matches!(self, ClusterLevel::Characters)
    }
}

/// Character before shaping, glyph after
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphContent {
    Unicode(char),
    Glyph(GlyphId),
}

/// GDEF glyph classes
pub(crate) mod glyph_class {
    pub const UNCLASSIFIED: u8 = 0;
    pub const BASE: u8 = 1;
    pub const LIGATURE: u8 = 2;
    pub const MARK: u8 = 3;
}

/// One character or glyph of the buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphInfo {
    pub content: GlyphContent,
    pub cluster: u32,
    pub flags: GlyphFlags,
    pub(crate) mask: u32,
    /// The scalar this record started from; kept after glyph mapping
    pub(crate) codepoint: char,
    pub(crate) props: GlyphProps,
    pub(crate) glyph_class: u8,
    pub(crate) mark_attach_class: u8,
    pub(crate) lig_id: u8,
    pub(crate) lig_comp: u8,
    pub(crate) form: Option<PositionalForm>,
}

impl GlyphInfo {
    fn new(c: char, cluster: u32) -> Self {
        Self {
            content: GlyphContent::Unicode(c),
            cluster,
            flags: GlyphFlags::empty(),
            mask: 0,
            codepoint: c,
            props: GlyphProps::empty(),
            glyph_class: glyph_class::UNCLASSIFIED,
            mark_attach_class: 0,
            lig_id: 0,
            lig_comp: 0,
            form: None,
        }
    }

    /// Glyph id, once shaped
    pub fn glyph(&self) -> Option<GlyphId> {
        match self.content {
            GlyphContent::Glyph(g) => Some(g),
            GlyphContent::Unicode(_) => None,
        }
    }

    /// Glyph id, or `.notdef` before shaping
    pub fn glyph_id(&self) -> GlyphId {
        self.glyph().unwrap_or(GlyphId::NOTDEF)
    }

    /// Character, before shaping
    pub fn unicode(&self) -> Option<char> {
        match self.content {
            GlyphContent::Unicode(c) => Some(c),
            GlyphContent::Glyph(_) => None,
        }
    }

    pub fn is_unsafe_to_break(&self) -> bool {
        self.flags.contains(GlyphFlags::UNSAFE_TO_BREAK)
    }

    pub(crate) fn set_glyph(&mut self, glyph: GlyphId) {
        self.content = GlyphContent::Glyph(glyph);
    }

    pub(crate) fn is_mark(&self) -> bool {
        self.glyph_class == glyph_class::MARK
    }

    pub(crate) fn is_ligature(&self) -> bool {
        self.glyph_class == glyph_class::LIGATURE
    }

    pub(crate) fn is_default_ignorable(&self) -> bool {
        self.props.contains(GlyphProps::DEFAULT_IGNORABLE)
    }
}

/// Attachment kinds recorded during positioning
pub(crate) mod attach_kind {
    pub const NONE: u8 = 0;
    pub const MARK: u8 = 1;
    pub const CURSIVE: u8 = 2;
}

/// Advance and offset of one glyph, y-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphPosition {
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Relative index of the glyph this one attaches to
    pub(crate) attach_chain: i16,
    pub(crate) attach_kind: u8,
}

/// Direction, script and language of a run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SegmentProperties {
    pub direction: Direction,
    pub script: Option<Script>,
    pub language: Option<Language>,
}

impl SegmentProperties {
    pub fn new(direction: Direction, script: Option<Script>, language: Option<Language>) -> Self {
        Self { direction, script, language }
    }

    /// Fill unset fields from `other`
    pub fn overlay(&mut self, other: &SegmentProperties) {
        if !self.direction.is_valid() {
            self.direction = other.direction;
        }
        if self.script.is_none() {
            self.script = other.script;
        }
        if self.language.is_none() {
            self.language = other.language.clone();
        }
    }
}

/// Text in, glyphs out
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub(crate) infos: Vec<GlyphInfo>,
    pub(crate) positions: Vec<GlyphPosition>,
    pub(crate) content_type: ContentType,
    props: SegmentProperties,
    cluster_level: ClusterLevel,
    flags: BufferFlags,
    replacement: Option<char>,
    invisible_glyph: GlyphId,
    not_found_glyph: GlyphId,
    next_lig_id: u8,
    /// Byte length of the text appended so far by `push_str`
    text_len: u32,
}

impl Buffer {
    /// The character substituted for invalid scalar values
    pub const DEFAULT_REPLACEMENT: char = '\u{FFFD}';

    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a character with its cluster (usually a byte offset)
    pub fn push(&mut self, c: char, cluster: u32) {
        if self.content_type == ContentType::Invalid {
            self.content_type = ContentType::Unicode;
        }
        self.infos.push(GlyphInfo::new(c, cluster));
    }

    /// Append a raw scalar value; invalid values become the replacement character
    pub fn push_u32(&mut self, codepoint: u32, cluster: u32) {
        let c = char::from_u32(codepoint).unwrap_or(self.replacement_char());
        self.push(c, cluster);
    }

    /// Append already decoded text, using byte offsets as clusters.
    /// Offsets continue from the text of earlier `push_str` calls, or
    /// from past the last cluster if characters were pushed directly.
    pub fn push_str(&mut self, text: &str) {
        let after_last = self.infos.last().map_or(0, |i| i.cluster + 1);
        let base = self.text_len.max(after_last);
        for (offset, c) in text.char_indices() {
            self.push(c, base + offset as u32);
        }
        self.text_len = base + text.len() as u32;
    }

    /// Append `(char, cluster)` pairs
    pub fn extend(&mut self, chars: impl IntoIterator<Item = (char, u32)>) {
        for (c, cluster) in chars {
            self.push(c, cluster);
        }
    }

    /// Append a range of another buffer's records
    pub fn append(&mut self, other: &Buffer, range: Range<usize>) {
        let range = range.start.min(other.len())..range.end.min(other.len());
        if self.content_type == ContentType::Invalid {
            self.content_type = other.content_type;
        }
        self.infos.extend_from_slice(&other.infos[range.clone()]);
        if other.positions.len() == other.infos.len() {
            self.positions.extend_from_slice(&other.positions[range]);
        }
        if self.positions.len() != self.infos.len() {
            self.positions.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Drop the contents, keeping the settings
    pub fn clear_contents(&mut self) {
        self.infos.clear();
        self.positions.clear();
        self.content_type = ContentType::Invalid;
        self.props = SegmentProperties::default();
        self.next_lig_id = 0;
        self.text_len = 0;
    }

    /// Back to a freshly created buffer
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn set_content_type(&mut self, content_type: ContentType) {
        self.content_type = content_type;
    }

    pub fn direction(&self) -> Direction {
        self.props.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.props.direction = direction;
    }

    pub fn script(&self) -> Option<Script> {
        self.props.script
    }

    pub fn set_script(&mut self, script: Script) {
        self.props.script = Some(script);
    }

    pub fn language(&self) -> Option<&Language> {
        self.props.language.as_ref()
    }

    pub fn set_language(&mut self, language: Language) {
        self.props.language = Some(language);
    }

    pub fn segment_properties(&self) -> &SegmentProperties {
        &self.props
    }

    pub fn set_segment_properties(&mut self, props: SegmentProperties) {
        self.props = props;
    }

    pub fn cluster_level(&self) -> ClusterLevel {
        self.cluster_level
    }

    pub fn set_cluster_level(&mut self, level: ClusterLevel) {
        self.cluster_level = level;
    }

    pub fn flags(&self) -> BufferFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: BufferFlags) {
        self.flags = flags;
    }

    pub fn replacement_char(&self) -> char {
        self.replacement.unwrap_or(Self::DEFAULT_REPLACEMENT)
    }

    pub fn set_replacement_char(&mut self, c: char) {
        self.replacement = Some(c);
    }

    /// Glyph used for hidden default ignorables; 0 means "use space"
    pub fn invisible_glyph(&self) -> GlyphId {
        self.invisible_glyph
    }

    pub fn set_invisible_glyph(&mut self, glyph: GlyphId) {
        self.invisible_glyph = glyph;
    }

    /// Glyph used for unmapped characters
    pub fn not_found_glyph(&self) -> GlyphId {
        self.not_found_glyph
    }

    pub fn set_not_found_glyph(&mut self, glyph: GlyphId) {
        self.not_found_glyph = glyph;
    }

    pub fn glyph_infos(&self) -> &[GlyphInfo] {
        &self.infos
    }

    /// Positions; empty until the buffer has been shaped
    pub fn glyph_positions(&self) -> &[GlyphPosition] {
        &self.positions
    }

    /// Fill unset segment properties from the buffer contents
    pub fn guess_segment_properties(&mut self) {
        let guessed = unicode::guess_properties(self.infos.iter().map(|i| i.codepoint));
        let mut props = self.props.clone();
        if props.script.is_none() {
            props.script = guessed.script;
        }
        if !props.direction.is_valid() {
            props.direction = props.script.map_or(Direction::LeftToRight, Direction::from_script);
        }
        self.props = props;
    }

    /// Reverse the whole buffer
    pub fn reverse(&mut self) {
        let len = self.len();
        self.reverse_range(0..len);
    }

    /// Reverse a range of records
    pub fn reverse_range(&mut self, range: Range<usize>) {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        self.infos[start..end].reverse();
        if self.positions.len() == self.infos.len() {
            self.positions[start..end].reverse();
        }
    }

    /// Reverse the order of clusters, keeping each cluster's glyphs in order
    pub fn reverse_clusters(&mut self) {
        if self.is_empty() {
            return;
        }
        self.reverse();
        let mut start = 0;
        for i in 1..=self.len() {
            if i == self.len() || self.infos[i].cluster != self.infos[start].cluster {
                self.reverse_range(start..i);
                start = i;
            }
        }
    }

    /// Text form of the buffer: `[gid=cluster@x,y+adv|...]` for glyphs,
    /// `<U+0041=0|...>` for characters
    pub fn serialize(&self) -> String {
        match self.content_type {
            ContentType::Glyphs => {
                let glyphs: Vec<String> = self
                    .infos
                    .iter()
                    .enumerate()
                    .map(|(i, info)| {
                        let mut item = format!("{}={}", info.glyph_id().0, info.cluster);
                        if let Some(pos) = self.positions.get(i) {
                            if pos.x_offset != 0 || pos.y_offset != 0 {
                                item.push_str(&format!("@{},{}", pos.x_offset, pos.y_offset));
                            }
                            item.push_str(&format!("+{}", pos.x_advance));
                            if pos.y_advance != 0 {
                                item.push_str(&format!(",{}", pos.y_advance));
                            }
                        }
                        item
                    })
                    .collect();
                format!("[{}]", glyphs.join("|"))
            }
            ContentType::Unicode | ContentType::Invalid => {
                let chars: Vec<String> = self
                    .infos
                    .iter()
                    .map(|info| format!("U+{:04X}={}", info.codepoint as u32, info.cluster))
                    .collect();
                format!("<{}>", chars.join("|"))
            }
        }
    }

    /// Mark glyphs in `range` that break a cluster as unsafe to break
    /// and unsafe to concat
    pub(crate) fn unsafe_to_break(&mut self, range: Range<usize>) {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        if end - start < 2 {
            return;
        }
        let Some(min) = self.infos[start..end].iter().map(|i| i.cluster).min() else {
            return;
        };
        for info in &mut self.infos[start..end] {
            if info.cluster != min {
                info.flags |= GlyphFlags::UNSAFE_TO_BREAK | GlyphFlags::UNSAFE_TO_CONCAT;
            }
        }
    }

    /// Give every record of `range` the minimum cluster of the range,
    /// extending it to whole clusters. No-op for `Characters`.
    pub(crate) fn merge_clusters(&mut self, range: Range<usize>) {
        if !self.cluster_level.is_monotone() {
            return;
        }
        let mut end = range.end.min(self.len());
        let mut start = range.start.min(end);
        if end - start < 2 {
            return;
        }
        let Some(cluster) = self.infos[start..end].iter().map(|i| i.cluster).min() else {
            return;
        };

        // Extend to cluster boundaries
        while end < self.len() && self.infos[end - 1].cluster == self.infos[end].cluster {
            end += 1;
        }
        while start > 0 && self.infos[start - 1].cluster == self.infos[start].cluster {
            start -= 1;
        }

        for info in &mut self.infos[start..end] {
            if info.cluster != cluster {
                info.flags |= GlyphFlags::UNSAFE_TO_BREAK;
            }
            info.cluster = cluster;
        }
    }

    /// Allocate a ligature id; 0 is reserved for "not a ligature"
    pub(crate) fn next_lig_id(&mut self) -> u8 {
        self.next_lig_id = self.next_lig_id.wrapping_add(1);
        if self.next_lig_id == 0 {
            self.next_lig_id = 1;
        }
        self.next_lig_id
    }

    /// Remove one record. Its text goes to a neighbouring cluster: the
    /// previous one if it has a larger cluster value, else the next one
    /// when the record was first.
    pub(crate) fn delete_glyph(&mut self, i: usize) {
        if i >= self.len() {
            return;
        }
        let removed = self.infos.remove(i);
        if self.positions.len() == self.infos.len() + 1 {
            self.positions.remove(i);
        }

        let cluster = removed.cluster;
        let shared = self.infos.get(i).is_some_and(|n| n.cluster == cluster)
            || (i > 0 && self.infos[i - 1].cluster == cluster);
        if shared {
            return;
        }
        if i > 0 {
            let previous = self.infos[i - 1].cluster;
            if cluster < previous {
                for info in self.infos[..i].iter_mut().rev().take_while(|info| info.cluster == previous) {
                    info.cluster = cluster;
                }
            }
            return;
        }
        if let Some(next) = self.infos.first().map(|n| n.cluster) {
            let merged = cluster.min(next);
            for info in self.infos.iter_mut().take_while(|info| info.cluster == next) {
                info.cluster = merged;
            }
        }
    }

    /// Move glyph positions in when the infos change length
    pub(crate) fn clear_positions(&mut self) {
        self.positions.clear();
        self.positions.resize(self.infos.len(), GlyphPosition::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters(buffer: &Buffer) -> Vec<u32> {
        buffer.glyph_infos().iter().map(|i| i.cluster).collect()
    }

    #[test]
    fn test_push_sets_unicode_content() {
        let mut buffer = Buffer::new();
        assert_eq!(buffer.content_type(), ContentType::Invalid);
        buffer.push('a', 0);
        assert_eq!(buffer.content_type(), ContentType::Unicode);
        assert_eq!(buffer.glyph_infos()[0].unicode(), Some('a'));
    }

    #[test]
    fn test_push_str_byte_offsets() {
        let mut buffer = Buffer::new();
        buffer.push_str("aé b");
        assert_eq!(clusters(&buffer), vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_push_str_continues_offsets() {
        let mut buffer = Buffer::new();
        buffer.push_str("é");
        buffer.push_str("ab");
        assert_eq!(clusters(&buffer), vec![0, 2, 3]);

        buffer.push('x', 10);
        buffer.push_str("y");
        assert_eq!(clusters(&buffer), vec![0, 2, 3, 10, 11]);

        buffer.clear_contents();
        buffer.push_str("z");
        assert_eq!(clusters(&buffer), vec![0]);
    }

    #[test]
    fn test_append_clamps_range() {
        let mut source = Buffer::new();
        source.extend([('a', 0), ('b', 1), ('c', 2)]);

        let mut buffer = Buffer::new();
        buffer.append(&source, 1..10);
        assert_eq!(buffer.content_type(), ContentType::Unicode);
        assert_eq!(clusters(&buffer), vec![1, 2]);

        buffer.append(&source, 5..8);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_append_into_invalid_takes_content_type() {
        let mut source = Buffer::new();
        source.extend([('A', 0), ('V', 1)]);
        for (info, g) in source.infos.iter_mut().zip([2, 3]) {
            info.set_glyph(GlyphId(g));
        }
        source.content_type = ContentType::Glyphs;
        source.clear_positions();
        source.positions[1].x_advance = 600;

        let mut buffer = Buffer::new();
        assert_eq!(buffer.content_type(), ContentType::Invalid);
        buffer.append(&source, 1..2);
        assert_eq!(buffer.content_type(), ContentType::Glyphs);
        assert_eq!(buffer.serialize(), "[3=1+600]");

        // a Unicode buffer keeps its own type
        let mut text = Buffer::new();
        text.push('x', 0);
        text.append(&source, 0..1);
        assert_eq!(text.content_type(), ContentType::Unicode);
        assert!(text.glyph_positions().is_empty());
    }

    #[test]
    fn test_push_u32_replacement() {
        let mut buffer = Buffer::new();
        buffer.push_u32(0xD800, 0);
        assert_eq!(buffer.glyph_infos()[0].unicode(), Some('\u{FFFD}'));
        buffer.set_replacement_char('?');
        buffer.push_u32(0x110000, 1);
        assert_eq!(buffer.glyph_infos()[1].unicode(), Some('?'));
    }

    #[test]
    fn test_guess_fills_only_unset() {
        let mut buffer = Buffer::new();
        buffer.push_str("שלום");
        buffer.guess_segment_properties();
        assert_eq!(buffer.script(), Some(Script::Hebrew));
        assert_eq!(buffer.direction(), Direction::RightToLeft);

        let mut buffer = Buffer::new();
        buffer.push_str("שלום");
        buffer.set_direction(Direction::LeftToRight);
        buffer.guess_segment_properties();
        assert_eq!(buffer.direction(), Direction::LeftToRight);
    }

    #[test]
    fn test_overlay() {
        let mut props = SegmentProperties::new(Direction::Invalid, Some(Script::Latin), None);
        let other = SegmentProperties::new(
            Direction::RightToLeft,
            Some(Script::Arabic),
            Some(Language::from_bcp47("ar")),
        );
        props.overlay(&other);
        assert_eq!(props.direction, Direction::RightToLeft);
        assert_eq!(props.script, Some(Script::Latin));
        assert_eq!(props.language, Some(Language::from_bcp47("ar")));
    }

    #[test]
    fn test_merge_clusters_extends_to_whole_clusters() {
        let mut buffer = Buffer::new();
        buffer.extend([('a', 0), ('b', 1), ('c', 1), ('d', 3)]);
        buffer.merge_clusters(0..2);
        assert_eq!(clusters(&buffer), vec![0, 0, 0, 3]);

        buffer.set_cluster_level(ClusterLevel::Characters);
        buffer.merge_clusters(2..4);
        assert_eq!(clusters(&buffer), vec![0, 0, 0, 3]);
    }

    #[test]
    fn test_unsafe_to_break_skips_min_cluster() {
        let mut buffer = Buffer::new();
        buffer.extend([('a', 0), ('b', 1), ('c', 2)]);
        buffer.unsafe_to_break(0..2);
        let flags: Vec<bool> = buffer.glyph_infos().iter().map(GlyphInfo::is_unsafe_to_break).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert!(buffer.glyph_infos()[1].flags.contains(GlyphFlags::UNSAFE_TO_CONCAT));
    }

    #[test]
    fn test_reverse_clusters_keeps_cluster_order() {
        let mut buffer = Buffer::new();
        buffer.extend([('a', 0), ('\u{301}', 0), ('b', 2)]);
        buffer.reverse_clusters();
        let chars: Vec<char> = buffer.glyph_infos().iter().filter_map(GlyphInfo::unicode).collect();
        assert_eq!(chars, vec!['b', 'a', '\u{301}']);
    }

    #[test]
    fn test_serialize() {
        let mut buffer = Buffer::new();
        buffer.extend([('A', 0), ('V', 1)]);
        assert_eq!(buffer.serialize(), "<U+0041=0|U+0056=1>");

        for (info, g) in buffer.infos.iter_mut().zip([2, 3]) {
            info.set_glyph(GlyphId(g));
        }
        buffer.content_type = ContentType::Glyphs;
        buffer.clear_positions();
        buffer.positions[0].x_advance = 520;
        buffer.positions[1] = GlyphPosition { x_advance: 600, x_offset: -5, y_offset: 10, ..Default::default() };
        assert_eq!(buffer.serialize(), "[2=0+520|3=1@-5,10+600]");
    }

    #[test]
    fn test_clear_contents_keeps_settings() {
        let mut buffer = Buffer::new();
        buffer.set_cluster_level(ClusterLevel::Characters);
        buffer.push('a', 0);
        buffer.clear_contents();
        assert!(buffer.is_empty());
        assert_eq!(buffer.content_type(), ContentType::Invalid);
        assert_eq!(buffer.cluster_level(), ClusterLevel::Characters);

        buffer.reset();
        assert_eq!(buffer.cluster_level(), ClusterLevel::MonotoneGraphemes);
    }

    #[test]
    fn test_delete_glyph_moves_text_to_neighbour() {
        let mut buffer = Buffer::new();
        buffer.extend([('a', 0), ('b', 1), ('c', 2)]);
        buffer.delete_glyph(0);
        assert_eq!(clusters(&buffer), vec![0, 2]);

        buffer.delete_glyph(1);
        assert_eq!(clusters(&buffer), vec![0]);
    }
}
