//! Unicode Segmenter
//!
//! Script and direction guessing, cluster formation, mark reordering,
//! Arabic joining and Indic pre-base reordering. Everything here runs
//! on the buffer before glyph mapping.

mod arabic;
mod indic;
mod script;

pub use arabic::{joining_type, positional_forms, JoiningType, PositionalForm};
pub use indic::{indic_category, is_pre_base_matra, syllables, IndicCategory};
pub use script::{Direction, Language, Script, UnknownDirection, UnknownScript};

use unicode_normalization::char::{canonical_combining_class, is_combining_mark};
use unicode_segmentation::UnicodeSegmentation;

use crate::buffer::{Buffer, ClusterLevel, GlyphProps, SegmentProperties};

/// A cluster as a range of character indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster {
    pub start: usize,
    pub end: usize,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Group characters into clusters for a cluster level
pub fn segment(chars: &[char], level: ClusterLevel) -> Vec<Cluster> {
    match level {
        ClusterLevel::MonotoneGraphemes => {
            let text: String = chars.iter().collect();
            let mut start = 0;
            text.graphemes(true)
                .map(|g| {
                    let end = start + g.chars().count();
                    let cluster = Cluster { start, end };
                    start = end;
                    cluster
                })
                .collect()
        }
        ClusterLevel::MonotoneCharacters | ClusterLevel::Characters => {
            (0..chars.len()).map(|i| Cluster { start: i, end: i + 1 }).collect()
        }
    }
}

/// Guess segment properties: the most frequent non-neutral script
/// (earliest on ties) and its direction. Language is left unset.
pub fn guess_properties(chars: impl IntoIterator<Item = char>) -> SegmentProperties {
    // (script, count) in order of first appearance
    let mut counts: Vec<(Script, usize)> = Vec::new();
    for c in chars {
        let script = Script::of(c);
        if script.is_neutral() {
            continue;
        }
        match counts.iter_mut().find(|(s, _)| *s == script) {
            Some((_, n)) => *n += 1,
            None => counts.push((script, 1)),
        }
    }

    let mut best: Option<(Script, usize)> = None;
    for (script, n) in counts {
        if best.is_none_or(|(_, m)| n > m) {
            best = Some((script, n));
        }
    }

    let script = best.map(|(s, _)| s);
    SegmentProperties {
        direction: script.map_or(Direction::Invalid, Direction::from_script),
        script,
        language: None,
    }
}

/// Default ignorable code points (DerivedCoreProperties)
pub fn is_default_ignorable(c: char) -> bool {
    matches!(
        c as u32,
        0x00AD
            | 0x034F
            | 0x061C
            | 0x115F..=0x1160
            | 0x17B4..=0x17B5
            | 0x180B..=0x180F
            | 0x200B..=0x200F
            | 0x202A..=0x202E
            | 0x2060..=0x206F
            | 0x3164
            | 0xFE00..=0xFE0F
            | 0xFEFF
            | 0xFFA0
            | 0xFFF0..=0xFFF8
            | 0x1BCA0..=0x1BCA3
            | 0x1D173..=0x1D17A
            | 0xE0000..=0xE0FFF
    )
}

/// Canonical combining class
pub fn combining_class(c: char) -> u8 {
    canonical_combining_class(c)
}

/// Combining mark (general category M*)
pub fn is_mark(c: char) -> bool {
    is_combining_mark(c)
}

/// Run the pre-mapping passes over a Unicode buffer: cluster formation,
/// mark reordering, joining forms, Indic reordering and property marking.
pub fn prepare(buffer: &mut Buffer) {
    if buffer.is_empty() {
        return;
    }
    let level = buffer.cluster_level();
    let script = buffer.script();

    if level == ClusterLevel::MonotoneGraphemes {
        form_grapheme_clusters(buffer);
    }
    reorder_marks(buffer);
    if script.is_some_and(Script::is_joining) {
        assign_joining_forms(buffer);
    }
    if script.is_some_and(Script::is_indic) {
        reorder_indic(buffer);
    }
    mark_properties(buffer);
}

fn codepoints(buffer: &Buffer) -> Vec<char> {
    buffer.infos.iter().map(|i| i.codepoint).collect()
}

fn form_grapheme_clusters(buffer: &mut Buffer) {
    let chars = codepoints(buffer);
    for cluster in segment(&chars, ClusterLevel::MonotoneGraphemes) {
        if cluster.len() > 1 {
            buffer.merge_clusters(cluster.start..cluster.end);
        }
    }
}

/// Stable sort of every run of non-zero combining classes
fn reorder_marks(buffer: &mut Buffer) {
    let len = buffer.len();
    let mut i = 0;
    while i < len {
        if combining_class(buffer.infos[i].codepoint) == 0 {
            i += 1;
            continue;
        }
        let start = i;
        while i < len && combining_class(buffer.infos[i].codepoint) != 0 {
            i += 1;
        }
        if i - start < 2 {
            continue;
        }

        let run = &mut buffer.infos[start..i];
        let sorted = run
            .windows(2)
            .all(|w| combining_class(w[0].codepoint) <= combining_class(w[1].codepoint));
        if !sorted {
            run.sort_by_key(|info| combining_class(info.codepoint));
            buffer.merge_clusters(start..i);
        }
    }
}

fn assign_joining_forms(buffer: &mut Buffer) {
    let chars = codepoints(buffer);
    for (info, form) in buffer.infos.iter_mut().zip(positional_forms(&chars)) {
        info.form = form;
    }
}

fn reorder_indic(buffer: &mut Buffer) {
    let chars = codepoints(buffer);
    for syllable in syllables(&chars) {
        let moves = indic::pre_base_moves(&chars, syllable.clone());
        if moves.is_empty() {
            continue;
        }
        for (from, to) in moves {
            let info = buffer.infos.remove(from);
            buffer.infos.insert(to, info);
        }
        buffer.merge_clusters(syllable);
    }
}

fn mark_properties(buffer: &mut Buffer) {
    for info in &mut buffer.infos {
        let c = info.codepoint;
        if is_default_ignorable(c) {
            info.props |= GlyphProps::DEFAULT_IGNORABLE;
        }
        match c {
            '\u{200C}' => info.props |= GlyphProps::ZWNJ,
            '\u{200D}' => info.props |= GlyphProps::ZWJ,
            _ => {}
        }
        if is_mark(c) {
            info.props |= GlyphProps::UNICODE_MARK;
        }
    }
}
