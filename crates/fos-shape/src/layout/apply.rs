//! Lookup application
//!
//! Walks the buffer for one scheduled lookup, matching glyphs under the
//! lookup flags and applying substitutions in place or accumulating
//! positioning adjustments. Attachments are recorded as relative chains
//! and resolved into offsets by [`position_finish`].

use std::mem;

use crate::buffer::{attach_kind, glyph_class, Buffer, GlyphInfo, GlyphPosition, GlyphProps};
use crate::font::parser::tags;
use crate::font::{Font, GlyphId};
use crate::unicode::Direction;

use super::common::{
    ChainedSequenceContext, ClassDef, Coverage, LookupFlags, SequenceContext, SequenceLookupRecord,
};
use super::gdef::Gdef;
use super::gpos::{Anchor, AnchorRow, EntryExit, MarkRecord, PosSubtable, ValueRecord};
use super::gsub::{Ligature, SubstSubtable};
use super::{LayoutTable, Lookup, LookupSubtable};

/// Depth limit when resolving attachment chains
const MAX_ATTACHMENT_DEPTH: usize = 64;

/// One scheduled lookup and the feature mask it applies under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LookupPass {
    pub index: u16,
    pub mask: u32,
}

/// Subtables that can be applied at the current buffer position
pub(crate) trait Apply: LookupSubtable {
    /// Try to apply at `ctx.idx`. On success the subtable moves `ctx.idx`
    /// past its output and returns true; on failure nothing changes.
    fn apply(&self, ctx: &mut ApplyContext<'_, Self>) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Yes,
    No,
    Maybe,
}

enum Step {
    Match,
    Skip,
    Fail,
}

/// How the glyphs of a rule sequence are compared
#[derive(Clone, Copy)]
enum SeqMatch<'m> {
    Glyphs(&'m [u16]),
    Classes(&'m [u16], &'m ClassDef),
    Coverages(&'m [Coverage]),
}

impl SeqMatch<'_> {
    const EMPTY: SeqMatch<'static> = SeqMatch::Glyphs(&[]);

    fn len(&self) -> usize {
        match self {
            SeqMatch::Glyphs(glyphs) => glyphs.len(),
            SeqMatch::Classes(classes, _) => classes.len(),
            SeqMatch::Coverages(coverages) => coverages.len(),
        }
    }

    fn matches(&self, k: usize, glyph: GlyphId) -> bool {
        match self {
            SeqMatch::Glyphs(glyphs) => glyphs.get(k) == Some(&glyph.0),
            SeqMatch::Classes(classes, class_def) => classes.get(k) == Some(&class_def.get(glyph)),
            SeqMatch::Coverages(coverages) => coverages.get(k).is_some_and(|c| c.contains(glyph)),
        }
    }
}

type Matcher<'m> = Option<&'m dyn Fn(&GlyphInfo) -> bool>;

/// State for applying the lookups of one table to a buffer
pub(crate) struct ApplyContext<'a, T> {
    table: &'a LayoutTable<T>,
    gdef: Option<&'a Gdef>,
    font: &'a Font,
    buffer: &'a mut Buffer,
    direction: Direction,
    lookup_mask: u32,
    lookup_index: u16,
    flags: LookupFlags,
    mark_filtering_set: Option<u16>,
    max_nesting: usize,
    nesting_left: usize,
    is_gpos: bool,
    idx: usize,
}

impl<'a, T: Apply> ApplyContext<'a, T> {
    pub(crate) fn new(
        table: &'a LayoutTable<T>,
        gdef: Option<&'a Gdef>,
        font: &'a Font,
        buffer: &'a mut Buffer,
        max_nesting: usize,
    ) -> Self {
        let direction = buffer.direction();
        Self {
            table,
            gdef,
            font,
            buffer,
            direction,
            lookup_mask: 0,
            lookup_index: 0,
            flags: LookupFlags::empty(),
            mark_filtering_set: None,
            max_nesting,
            nesting_left: max_nesting,
            is_gpos: T::TABLE == tags::GPOS,
            idx: 0,
        }
    }

    pub(crate) fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn set_lookup(&mut self, index: u16, lookup: &Lookup<T>) {
        self.lookup_index = index;
        self.flags = lookup.flags;
        self.mark_filtering_set = lookup.mark_filtering_set;
    }

    /// Run one lookup over the whole buffer
    pub(crate) fn apply_lookup(&mut self, pass: LookupPass) {
        let table = self.table;
        let Some(lookup) = table.lookup(pass.index) else {
            return;
        };
        if pass.mask == 0 {
            return;
        }
        self.lookup_mask = pass.mask;
        self.set_lookup(pass.index, lookup);
        tracing::trace!(table = %T::TABLE, lookup = pass.index, kind = lookup.kind, "applying lookup");

        if T::TABLE == tags::GSUB && lookup.kind == 8 {
            // Reverse chaining substitutions run from the end and never move idx
            let mut i = self.buffer.len();
            while i > 0 {
                i -= 1;
                self.idx = i;
                if !self.may_apply_at(i) {
                    continue;
                }
                for subtable in &lookup.subtables {
                    if subtable.apply(self) {
                        break;
                    }
                }
            }
            return;
        }

        self.idx = 0;
        while self.idx < self.buffer.len() {
            let (start, len) = (self.idx, self.buffer.len());
            let applied = self.may_apply_at(start) && lookup.subtables.iter().any(|s| s.apply(self));
            if !applied || (self.idx <= start && self.buffer.len() >= len) {
                self.idx = start + 1;
            }
        }
    }

    fn may_apply_at(&self, i: usize) -> bool {
        let info = &self.buffer.infos[i];
        info.mask & self.lookup_mask != 0 && self.check_glyph_property(info, self.flags)
    }

    /// Apply a nested lookup at a single position
    fn recurse(&mut self, lookup_index: u16, pos: usize) -> bool {
        if self.nesting_left == 0 || pos >= self.buffer.len() {
            return false;
        }
        let table = self.table;
        let Some(lookup) = table.lookup(lookup_index) else {
            return false;
        };

        let saved = (self.idx, self.lookup_index, self.flags, self.mark_filtering_set);
        self.set_lookup(lookup_index, lookup);
        self.idx = pos;
        self.nesting_left -= 1;

        let applied = self.check_glyph_property(&self.buffer.infos[pos], self.flags)
            && lookup.subtables.iter().any(|s| s.apply(self));

        self.nesting_left += 1;
        (self.idx, self.lookup_index, self.flags, self.mark_filtering_set) = saved;
        applied
    }

    fn glyph(&self, i: usize) -> GlyphId {
        self.buffer.infos[i].glyph_id()
    }

    /// Whether lookup flags allow the lookup to see this glyph
    fn check_glyph_property(&self, info: &GlyphInfo, flags: LookupFlags) -> bool {
        match info.glyph_class {
            glyph_class::MARK => {
                if flags.contains(LookupFlags::IGNORE_MARKS) {
                    return false;
                }
                if flags.contains(LookupFlags::USE_MARK_FILTERING_SET) {
                    return match (self.mark_filtering_set, self.gdef) {
                        (Some(set), Some(gdef)) => gdef.is_mark_glyph(info.glyph_id(), set),
                        _ => false,
                    };
                }
                match flags.mark_attachment_type() {
                    0 => true,
                    class => info.mark_attach_class == class,
                }
            }
            glyph_class::BASE => !flags.contains(LookupFlags::IGNORE_BASE_GLYPHS),
            glyph_class::LIGATURE => !flags.contains(LookupFlags::IGNORE_LIGATURES),
            _ => true,
        }
    }

    fn may_skip(&self, info: &GlyphInfo, flags: LookupFlags, context: bool) -> Skip {
        if !self.check_glyph_property(info, flags) {
            return Skip::Yes;
        }
        // ZWNJ blocks input matching in GSUB; ZWJ never does
        let blocks = !context && !self.is_gpos && info.props.contains(GlyphProps::ZWNJ);
        if info.is_default_ignorable() && !blocks {
            return Skip::Maybe;
        }
        Skip::No
    }

    fn step(&self, i: usize, mask: u32, flags: LookupFlags, context: bool, matcher: Matcher<'_>) -> Step {
        let info = &self.buffer.infos[i];
        let skip = self.may_skip(info, flags, context);
        if skip == Skip::Yes {
            return Step::Skip;
        }
        let matched = if info.mask & mask == 0 { Some(false) } else { matcher.map(|m| m(info)) };
        match (matched, skip) {
            (Some(true), _) | (None, Skip::No) => Step::Match,
            (Some(false), Skip::No) => Step::Fail,
            _ => Step::Skip,
        }
    }

    /// Next glyph after `from` that is not skipped
    fn next(&self, from: usize, mask: u32, flags: LookupFlags, context: bool, matcher: Matcher<'_>) -> Option<usize> {
        (from + 1..self.buffer.len()).find_map(|i| match self.step(i, mask, flags, context, matcher) {
            Step::Match => Some(Some(i)),
            Step::Fail => Some(None),
            Step::Skip => None,
        })?
    }

    /// Previous glyph before `from` that is not skipped
    fn prev(&self, from: usize, mask: u32, flags: LookupFlags, context: bool, matcher: Matcher<'_>) -> Option<usize> {
        (0..from).rev().find_map(|i| match self.step(i, mask, flags, context, matcher) {
            Step::Match => Some(Some(i)),
            Step::Fail => Some(None),
            Step::Skip => None,
        })?
    }

    /// Positions of the current glyph and of each matched input glyph
    fn match_input(&self, input: SeqMatch<'_>) -> Option<Vec<usize>> {
        let mut positions = Vec::with_capacity(input.len() + 1);
        positions.push(self.idx);
        let mut pos = self.idx;
        for k in 0..input.len() {
            let matcher = |info: &GlyphInfo| input.matches(k, info.glyph_id());
            pos = self.next(pos, self.lookup_mask, self.flags, false, Some(&matcher))?;
            positions.push(pos);
        }
        Some(positions)
    }

    /// Start of the matched backtrack, closest glyph first
    fn match_backtrack(&self, backtrack: SeqMatch<'_>) -> Option<usize> {
        let mut pos = self.idx;
        for k in 0..backtrack.len() {
            let matcher = |info: &GlyphInfo| backtrack.matches(k, info.glyph_id());
            pos = self.prev(pos, u32::MAX, self.flags, true, Some(&matcher))?;
        }
        Some(pos)
    }

    /// End (exclusive) of the matched lookahead after `last`
    fn match_lookahead(&self, lookahead: SeqMatch<'_>, last: usize) -> Option<usize> {
        let mut pos = last;
        for k in 0..lookahead.len() {
            let matcher = |info: &GlyphInfo| lookahead.matches(k, info.glyph_id());
            pos = self.next(pos, u32::MAX, self.flags, true, Some(&matcher))?;
        }
        Some(pos + 1)
    }

    fn apply_sequence_context(&mut self, context: &SequenceContext) -> bool {
        let glyph = self.glyph(self.idx);
        let empty = SeqMatch::EMPTY;
        match context {
            SequenceContext::Glyphs { coverage, rule_sets } => {
                let Some(rules) = coverage.get(glyph).and_then(|i| rule_sets.get(i as usize)) else {
                    return false;
                };
                rules
                    .iter()
                    .any(|rule| self.apply_chain(empty, SeqMatch::Glyphs(&rule.input), empty, &rule.records))
            }
            SequenceContext::Classes { coverage, class_def, rule_sets } => {
                if !coverage.contains(glyph) {
                    return false;
                }
                let Some(rules) = rule_sets.get(class_def.get(glyph) as usize) else {
                    return false;
                };
                rules.iter().any(|rule| {
                    self.apply_chain(empty, SeqMatch::Classes(&rule.input, class_def), empty, &rule.records)
                })
            }
            SequenceContext::Coverages { coverages, records } => {
                if !coverages[0].contains(glyph) {
                    return false;
                }
                self.apply_chain(empty, SeqMatch::Coverages(&coverages[1..]), empty, records)
            }
        }
    }

    fn apply_chained_context(&mut self, context: &ChainedSequenceContext) -> bool {
        let glyph = self.glyph(self.idx);
        match context {
            ChainedSequenceContext::Glyphs { coverage, rule_sets } => {
                let Some(rules) = coverage.get(glyph).and_then(|i| rule_sets.get(i as usize)) else {
                    return false;
                };
                rules.iter().any(|rule| {
                    self.apply_chain(
                        SeqMatch::Glyphs(&rule.backtrack),
                        SeqMatch::Glyphs(&rule.input),
                        SeqMatch::Glyphs(&rule.lookahead),
                        &rule.records,
                    )
                })
            }
            ChainedSequenceContext::Classes {
                coverage,
                backtrack_classes,
                input_classes,
                lookahead_classes,
                rule_sets,
            } => {
                if !coverage.contains(glyph) {
                    return false;
                }
                let Some(rules) = rule_sets.get(input_classes.get(glyph) as usize) else {
                    return false;
                };
                rules.iter().any(|rule| {
                    self.apply_chain(
                        SeqMatch::Classes(&rule.backtrack, backtrack_classes),
                        SeqMatch::Classes(&rule.input, input_classes),
                        SeqMatch::Classes(&rule.lookahead, lookahead_classes),
                        &rule.records,
                    )
                })
            }
            ChainedSequenceContext::Coverages { backtrack, input, lookahead, records } => {
                if !input[0].contains(glyph) {
                    return false;
                }
                self.apply_chain(
                    SeqMatch::Coverages(backtrack),
                    SeqMatch::Coverages(&input[1..]),
                    SeqMatch::Coverages(lookahead),
                    records,
                )
            }
        }
    }

    fn apply_chain(
        &mut self,
        backtrack: SeqMatch<'_>,
        input: SeqMatch<'_>,
        lookahead: SeqMatch<'_>,
        records: &[SequenceLookupRecord],
    ) -> bool {
        let Some(positions) = self.match_input(input) else {
            return false;
        };
        let last = positions[positions.len() - 1];
        let Some(start) = self.match_backtrack(backtrack) else {
            return false;
        };
        let Some(end) = self.match_lookahead(lookahead, last) else {
            return false;
        };

        self.buffer.unsafe_to_break(start..end);
        self.apply_records(positions, last + 1, records);
        true
    }

    /// Apply nested lookups to a matched input sequence, tracking how
    /// buffer length changes move the remaining positions
    fn apply_records(&mut self, mut positions: Vec<usize>, mut end: usize, records: &[SequenceLookupRecord]) {
        for record in records {
            let seq = record.sequence_index as usize;
            let Some(&pos) = positions.get(seq) else {
                continue;
            };
            let orig_len = self.buffer.len();
            if !self.recurse(record.lookup_index, pos) {
                continue;
            }

            let mut delta = self.buffer.len() as isize - orig_len as isize;
            if delta == 0 {
                continue;
            }
            let new_end = end as isize + delta;
            if new_end < pos as isize {
                // Everything after pos is gone
                delta += pos as isize - new_end;
                end = pos;
            } else {
                end = new_end as usize;
            }

            let next = seq + 1;
            if delta > 0 {
                let added = delta as usize;
                positions.splice(next..next, (1..=added).map(|k| pos + k));
                for p in &mut positions[next + added..] {
                    *p += added;
                }
            } else if delta < 0 {
                let removed = delta.unsigned_abs();
                let drop = removed.min(positions.len() - next);
                positions.drain(next..next + drop);
                for p in &mut positions[next..] {
                    *p = p.saturating_sub(removed);
                }
            }
        }
        self.idx = end;
    }

    fn substitute(&mut self, i: usize, glyph: GlyphId, class_guess: Option<u8>, props: GlyphProps) {
        let gdef = self.gdef;
        let info = &mut self.buffer.infos[i];
        info.set_glyph(glyph);
        info.props |= GlyphProps::SUBSTITUTED | props;
        match gdef.filter(|g| g.has_glyph_classes()) {
            Some(gdef) => {
                info.glyph_class = gdef.glyph_class(glyph);
                info.mark_attach_class = gdef.mark_attach_class(glyph);
            }
            None => {
                if let Some(class) = class_guess {
                    info.glyph_class = class;
                }
            }
        }
    }

    fn single(&mut self, glyph: GlyphId) -> bool {
        self.substitute(self.idx, glyph, None, GlyphProps::empty());
        self.idx += 1;
        true
    }

    fn multiple(&mut self, sequence: &[u16]) -> bool {
        let idx = self.idx;
        match sequence {
            [] => {
                self.buffer.delete_glyph(idx);
                true
            }
            [glyph] => self.single(GlyphId(*glyph)),
            _ => {
                let template = self.buffer.infos[idx].clone();
                let class_guess = template.is_ligature().then_some(glyph_class::BASE);
                let copies = (0..sequence.len()).map(|k| {
                    let mut info = template.clone();
                    if info.lig_id == 0 {
                        info.lig_comp = k as u8;
                    }
                    info
                });
                self.buffer.infos.splice(idx..idx + 1, copies);
                for (k, &glyph) in sequence.iter().enumerate() {
                    self.substitute(idx + k, GlyphId(glyph), class_guess, GlyphProps::MULTIPLIED);
                }
                self.idx += sequence.len();
                true
            }
        }
    }

    fn alternate(&mut self, alternates: &[u16]) -> bool {
        if self.lookup_mask == 0 {
            return false;
        }
        let shift = self.lookup_mask.trailing_zeros();
        let value = (self.buffer.infos[self.idx].mask & self.lookup_mask) >> shift;
        let Some(&glyph) = (value as usize).checked_sub(1).and_then(|i| alternates.get(i)) else {
            return false;
        };
        self.single(GlyphId(glyph))
    }

    fn ligate(&mut self, ligatures: &[Ligature]) -> bool {
        for ligature in ligatures {
            if let Some(positions) = self.match_input(SeqMatch::Glyphs(&ligature.components)) {
                self.apply_ligature(GlyphId(ligature.glyph), &positions);
                return true;
            }
        }
        false
    }

    fn apply_ligature(&mut self, glyph: GlyphId, positions: &[usize]) {
        let idx = positions[0];
        let last = positions[positions.len() - 1];
        let infos = &self.buffer.infos;

        let is_mark_ligature = positions.iter().all(|&p| infos[p].is_mark());
        let is_base_ligature =
            infos[idx].glyph_class == glyph_class::BASE && positions[1..].iter().all(|&p| infos[p].is_mark());
        let is_ligature = !is_mark_ligature && !is_base_ligature;
        let cluster = infos[idx..=last].iter().map(|i| i.cluster).min().unwrap_or(infos[idx].cluster);

        self.buffer.merge_clusters(idx..last + 1);
        let lig_id = if is_ligature { self.buffer.next_lig_id() } else { 0 };
        let class_guess = is_ligature.then_some(glyph_class::LIGATURE);
        self.substitute(idx, glyph, class_guess, GlyphProps::LIGATED);
        {
            let info = &mut self.buffer.infos[idx];
            info.cluster = cluster;
            info.lig_id = lig_id;
            info.lig_comp = if is_ligature { positions.len().min(15) as u8 } else { 0 };
            info.props.remove(GlyphProps::MULTIPLIED);
        }

        // Skipped marks remember which component they sat on
        if lig_id != 0 {
            for (component, pair) in positions.windows(2).enumerate() {
                for info in &mut self.buffer.infos[pair[0] + 1..pair[1]] {
                    if info.is_mark() {
                        info.lig_id = lig_id;
                        info.lig_comp = (component + 1).min(15) as u8;
                    }
                }
            }
        }

        for &p in positions[1..].iter().rev() {
            self.buffer.infos.remove(p);
        }
        self.idx = last + 2 - positions.len();
    }

    fn reverse_chain_single(
        &mut self,
        coverage: &Coverage,
        backtrack: &[Coverage],
        lookahead: &[Coverage],
        substitutes: &[u16],
    ) -> bool {
        // Only valid as a top-level lookup
        if self.nesting_left != self.max_nesting {
            return false;
        }
        let idx = self.idx;
        let Some(&glyph) = coverage.get(self.glyph(idx)).and_then(|i| substitutes.get(i as usize)) else {
            return false;
        };
        let Some(start) = self.match_backtrack(SeqMatch::Coverages(backtrack)) else {
            return false;
        };
        let Some(end) = self.match_lookahead(SeqMatch::Coverages(lookahead), idx) else {
            return false;
        };
        self.buffer.unsafe_to_break(start..end);
        self.substitute(idx, GlyphId(glyph), None, GlyphProps::empty());
        true
    }

    fn adjust(&mut self, i: usize, value: &ValueRecord) {
        let font = self.font;
        let horizontal = self.direction.is_horizontal();
        let pos = &mut self.buffer.positions[i];
        pos.x_offset += font.em_scale_x(value.x_placement as i32);
        pos.y_offset += font.em_scale_y(value.y_placement as i32);
        if horizontal {
            pos.x_advance += font.em_scale_x(value.x_advance as i32);
        } else {
            // y advances grow downward, font space grows upward
            pos.y_advance -= font.em_scale_y(value.y_advance as i32);
        }
    }

    fn anchor(&self, anchor: &Anchor) -> (i32, i32) {
        (self.font.em_scale_x(anchor.x as i32), self.font.em_scale_y(anchor.y as i32))
    }

    fn apply_pair(&mut self, j: usize, first: &ValueRecord, second: &ValueRecord, second_format: u16) -> bool {
        let i = self.idx;
        self.adjust(i, first);
        self.adjust(j, second);
        self.buffer.unsafe_to_break(i..j + 1);
        self.idx = if second_format != 0 { j + 1 } else { j };
        true
    }

    fn cursive(&mut self, coverage: &Coverage, records: &[EntryExit]) -> bool {
        let j = self.idx;
        let record = |ctx: &Self, i: usize| coverage.get(ctx.glyph(i)).and_then(|k| records.get(k as usize)).copied();
        let Some(entry) = record(self, j).and_then(|r| r.entry) else {
            return false;
        };
        let Some(i) = self.prev(j, self.lookup_mask, self.flags, false, None) else {
            return false;
        };
        let Some(exit) = record(self, i).and_then(|r| r.exit) else {
            return false;
        };

        self.buffer.unsafe_to_break(i..j + 1);
        let (exit_x, exit_y) = self.anchor(&exit);
        let (entry_x, entry_y) = self.anchor(&entry);
        let direction = self.direction;
        let right_to_left = self.flags.contains(LookupFlags::RIGHT_TO_LEFT);
        let pos = &mut self.buffer.positions;

        // Main-direction adjustment
        match direction {
            Direction::LeftToRight => {
                pos[i].x_advance = exit_x + pos[i].x_offset;
                let d = entry_x + pos[j].x_offset;
                pos[j].x_advance -= d;
                pos[j].x_offset -= d;
            }
            Direction::RightToLeft => {
                let d = exit_x + pos[i].x_offset;
                pos[i].x_advance -= d;
                pos[i].x_offset -= d;
                pos[j].x_advance = entry_x + pos[j].x_offset;
            }
            Direction::TopToBottom => {
                pos[i].y_advance = exit_y + pos[i].y_offset;
                let d = entry_y + pos[j].y_offset;
                pos[j].y_advance -= d;
                pos[j].y_offset -= d;
            }
            Direction::BottomToTop => {
                let d = exit_y + pos[i].y_offset;
                pos[i].y_advance -= d;
                pos[i].y_offset -= d;
                pos[j].y_advance = entry_y;
            }
            Direction::Invalid => {}
        }

        // Cross-direction: the child aligns itself against its parent
        let (mut child, mut parent) = (i, j);
        let (mut x_offset, mut y_offset) = (entry_x - exit_x, entry_y - exit_y);
        if !right_to_left {
            mem::swap(&mut child, &mut parent);
            x_offset = -x_offset;
            y_offset = -y_offset;
        }

        reverse_cursive_minor_offset(pos, child, direction, parent);
        pos[child].attach_kind = attach_kind::CURSIVE;
        pos[child].attach_chain = (parent as isize - child as isize) as i16;
        if direction.is_horizontal() {
            pos[child].y_offset = y_offset;
        } else {
            pos[child].x_offset = x_offset;
        }
        // A parent attached to its own child is separated
        if pos[parent].attach_chain == -pos[child].attach_chain {
            pos[parent].attach_chain = 0;
            pos[parent].attach_kind = attach_kind::NONE;
        }

        self.idx += 1;
        true
    }

    /// Place the current mark so its anchor lands on `anchors[class]` of
    /// the glyph at `target`
    fn attach_mark(&mut self, marks: &[MarkRecord], mark_index: u16, anchors: &[Option<Anchor>], target: usize) -> bool {
        let Some(record) = marks.get(mark_index as usize) else {
            return false;
        };
        let Some(Some(target_anchor)) = anchors.get(record.class as usize) else {
            return false;
        };

        let idx = self.idx;
        self.buffer.unsafe_to_break(target..idx + 1);
        let (mark_x, mark_y) = self.anchor(&record.anchor);
        let (target_x, target_y) = self.anchor(target_anchor);

        let pos = &mut self.buffer.positions[idx];
        pos.x_offset = target_x - mark_x;
        pos.y_offset = target_y - mark_y;
        pos.attach_kind = attach_kind::MARK;
        pos.attach_chain = (target as isize - idx as isize) as i16;

        self.idx += 1;
        true
    }

    fn mark_to_base(&mut self, mark_coverage: &Coverage, base_coverage: &Coverage, marks: &[MarkRecord], bases: &[AnchorRow]) -> bool {
        let idx = self.idx;
        let Some(mark_index) = mark_coverage.get(self.glyph(idx)) else {
            return false;
        };
        let Some(base) = self.prev(idx, self.lookup_mask, LookupFlags::IGNORE_MARKS, false, None) else {
            return false;
        };
        let Some(row) = base_coverage.get(self.glyph(base)).and_then(|i| bases.get(i as usize)) else {
            return false;
        };
        self.attach_mark(marks, mark_index, row, base)
    }

    fn mark_to_ligature(
        &mut self,
        mark_coverage: &Coverage,
        ligature_coverage: &Coverage,
        marks: &[MarkRecord],
        ligatures: &[Vec<AnchorRow>],
    ) -> bool {
        let idx = self.idx;
        let Some(mark_index) = mark_coverage.get(self.glyph(idx)) else {
            return false;
        };
        let Some(lig) = self.prev(idx, self.lookup_mask, LookupFlags::IGNORE_MARKS, false, None) else {
            return false;
        };
        let Some(components) = ligature_coverage.get(self.glyph(lig)).and_then(|i| ligatures.get(i as usize)) else {
            return false;
        };
        if components.is_empty() {
            return false;
        }

        let lig_id = self.buffer.infos[lig].lig_id;
        let mark = &self.buffer.infos[idx];
        let mark_comp = mark.lig_comp as usize;
        let component = if lig_id != 0 && lig_id == mark.lig_id && mark_comp > 0 {
            mark_comp.min(components.len()) - 1
        } else {
            components.len() - 1
        };
        self.attach_mark(marks, mark_index, &components[component], lig)
    }

    fn mark_to_mark(&mut self, mark_coverage: &Coverage, mark2_coverage: &Coverage, marks: &[MarkRecord], mark2s: &[AnchorRow]) -> bool {
        let idx = self.idx;
        let Some(mark_index) = mark_coverage.get(self.glyph(idx)) else {
            return false;
        };
        let flags = self.flags.difference(LookupFlags::IGNORE_FLAGS);
        let Some(j) = self.prev(idx, self.lookup_mask, flags, false, None) else {
            return false;
        };

        let (mark1, mark2) = (&self.buffer.infos[idx], &self.buffer.infos[j]);
        if !mark2.is_mark() {
            return false;
        }
        // Both marks must sit on the same ligature component
        let same_component = if mark1.lig_id == mark2.lig_id {
            mark1.lig_id == 0 || mark1.lig_comp == mark2.lig_comp
        } else {
            (mark1.lig_id > 0 && mark1.lig_comp == 0) || (mark2.lig_id > 0 && mark2.lig_comp == 0)
        };
        if !same_component {
            return false;
        }

        let Some(row) = mark2_coverage.get(self.glyph(j)).and_then(|i| mark2s.get(i as usize)) else {
            return false;
        };
        self.attach_mark(marks, mark_index, row, j)
    }
}

impl Apply for SubstSubtable {
    fn apply(&self, ctx: &mut ApplyContext<'_, Self>) -> bool {
        let glyph = ctx.glyph(ctx.idx);
        match self {
            SubstSubtable::SingleDelta { coverage, delta } => {
                coverage.contains(glyph) && ctx.single(GlyphId(glyph.0.wrapping_add(*delta as u16)))
            }
            SubstSubtable::SingleList { coverage, substitutes } => {
                match coverage.get(glyph).and_then(|i| substitutes.get(i as usize)) {
                    Some(&sub) => ctx.single(GlyphId(sub)),
                    None => false,
                }
            }
            SubstSubtable::Multiple { coverage, sequences } => {
                match coverage.get(glyph).and_then(|i| sequences.get(i as usize)) {
                    Some(sequence) => ctx.multiple(sequence),
                    None => false,
                }
            }
            SubstSubtable::Alternate { coverage, alternate_sets } => {
                match coverage.get(glyph).and_then(|i| alternate_sets.get(i as usize)) {
                    Some(alternates) => ctx.alternate(alternates),
                    None => false,
                }
            }
            SubstSubtable::Ligature { coverage, ligature_sets } => {
                match coverage.get(glyph).and_then(|i| ligature_sets.get(i as usize)) {
                    Some(ligatures) => ctx.ligate(ligatures),
                    None => false,
                }
            }
            SubstSubtable::Context(context) => ctx.apply_sequence_context(context),
            SubstSubtable::ChainedContext(context) => ctx.apply_chained_context(context),
            SubstSubtable::ReverseChainSingle { coverage, backtrack, lookahead, substitutes } => {
                ctx.reverse_chain_single(coverage, backtrack, lookahead, substitutes)
            }
        }
    }
}

impl Apply for PosSubtable {
    fn apply(&self, ctx: &mut ApplyContext<'_, Self>) -> bool {
        let idx = ctx.idx;
        let glyph = ctx.glyph(idx);
        match self {
            PosSubtable::SingleShared { coverage, value } => {
                if !coverage.contains(glyph) {
                    return false;
                }
                ctx.adjust(idx, value);
                ctx.idx += 1;
                true
            }
            PosSubtable::SingleList { coverage, values } => {
                let Some(value) = coverage.get(glyph).and_then(|i| values.get(i as usize)) else {
                    return false;
                };
                ctx.adjust(idx, value);
                ctx.idx += 1;
                true
            }
            PosSubtable::PairGlyphs { coverage, second_format, pair_sets } => {
                let Some(set) = coverage.get(glyph).and_then(|i| pair_sets.get(i as usize)) else {
                    return false;
                };
                let Some(j) = ctx.next(idx, ctx.lookup_mask, ctx.flags, false, None) else {
                    return false;
                };
                let second = ctx.glyph(j);
                let Ok(k) = set.binary_search_by_key(&second.0, |p| p.second) else {
                    return false;
                };
                let pair = set[k];
                ctx.apply_pair(j, &pair.first_value, &pair.second_value, *second_format)
            }
            PosSubtable::PairClasses {
                coverage,
                second_format,
                first_classes,
                second_classes,
                class2_count,
                values,
            } => {
                if !coverage.contains(glyph) {
                    return false;
                }
                let Some(j) = ctx.next(idx, ctx.lookup_mask, ctx.flags, false, None) else {
                    return false;
                };
                let second = ctx.glyph(j);
                let Some((first_value, second_value)) =
                    PosSubtable::class_pair(values, first_classes, second_classes, *class2_count, glyph, second)
                else {
                    return false;
                };
                ctx.apply_pair(j, &first_value, &second_value, *second_format)
            }
            PosSubtable::Cursive { coverage, records } => ctx.cursive(coverage, records),
            PosSubtable::MarkToBase { mark_coverage, base_coverage, marks, bases } => {
                ctx.mark_to_base(mark_coverage, base_coverage, marks, bases)
            }
            PosSubtable::MarkToLigature { mark_coverage, ligature_coverage, marks, ligatures } => {
                ctx.mark_to_ligature(mark_coverage, ligature_coverage, marks, ligatures)
            }
            PosSubtable::MarkToMark { mark_coverage, mark2_coverage, marks, mark2s } => {
                ctx.mark_to_mark(mark_coverage, mark2_coverage, marks, mark2s)
            }
            PosSubtable::Context(context) => ctx.apply_sequence_context(context),
            PosSubtable::ChainedContext(context) => ctx.apply_chained_context(context),
        }
    }
}

/// Walk a cursive chain from `i` and reverse its links so the old tree
/// hangs off the new parent
fn reverse_cursive_minor_offset(pos: &mut [GlyphPosition], i: usize, direction: Direction, new_parent: usize) {
    let chain = pos[i].attach_chain;
    let kind = pos[i].attach_kind;
    if chain == 0 || kind != attach_kind::CURSIVE {
        return;
    }
    pos[i].attach_chain = 0;

    let j = (i as isize + chain as isize) as usize;
    if j == new_parent || j >= pos.len() {
        return;
    }
    reverse_cursive_minor_offset(pos, j, direction, new_parent);

    if direction.is_horizontal() {
        pos[j].y_offset = -pos[i].y_offset;
    } else {
        pos[j].x_offset = -pos[i].x_offset;
    }
    pos[j].attach_chain = -chain;
    pos[j].attach_kind = kind;
}

/// Assign GDEF classes, or synthesize them from Unicode marks
pub(crate) fn set_glyph_props(buffer: &mut Buffer, gdef: Option<&Gdef>) {
    let classes = gdef.filter(|g| g.has_glyph_classes());
    for info in &mut buffer.infos {
        let glyph = info.glyph_id();
        info.glyph_class = match classes {
            Some(gdef) => gdef.glyph_class(glyph),
            None if info.props.contains(GlyphProps::UNICODE_MARK) => glyph_class::MARK,
            None => glyph_class::BASE,
        };
        info.mark_attach_class = gdef.map_or(0, |g| g.mark_attach_class(glyph));
    }
}

/// Finish positioning: zero mark advances if asked, then resolve
/// attachment chains into offsets
pub(crate) fn position_finish(buffer: &mut Buffer, zero_width_marks: bool) {
    let direction = buffer.direction();
    if zero_width_marks {
        for (info, pos) in buffer.infos.iter().zip(buffer.positions.iter_mut()) {
            if info.is_mark() {
                pos.x_advance = 0;
                pos.y_advance = 0;
            }
        }
    }
    for i in 0..buffer.positions.len() {
        propagate_attachment_offsets(&mut buffer.positions, i, direction, MAX_ATTACHMENT_DEPTH);
    }
}

fn propagate_attachment_offsets(pos: &mut [GlyphPosition], i: usize, direction: Direction, depth: usize) {
    let chain = pos[i].attach_chain;
    let kind = pos[i].attach_kind;
    if chain == 0 {
        return;
    }
    pos[i].attach_chain = 0;

    let j = i as isize + chain as isize;
    if j < 0 || j as usize >= pos.len() || depth == 0 {
        return;
    }
    let j = j as usize;
    propagate_attachment_offsets(pos, j, direction, depth - 1);

    if kind == attach_kind::CURSIVE {
        if direction.is_horizontal() {
            pos[i].y_offset += pos[j].y_offset;
        } else {
            pos[i].x_offset += pos[j].x_offset;
        }
        return;
    }

    pos[i].x_offset += pos[j].x_offset;
    pos[i].y_offset += pos[j].y_offset;
    if j >= i {
        return;
    }
    // Marks are drawn after the advances between them and their base
    if direction.is_forward() {
        for k in j..i {
            pos[i].x_offset -= pos[k].x_advance;
            pos[i].y_offset -= pos[k].y_advance;
        }
    } else {
        for k in j + 1..=i {
            pos[i].x_offset += pos[k].x_advance;
            pos[i].y_offset += pos[k].y_advance;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x_advance: i32, chain: i16, kind: u8) -> GlyphPosition {
        GlyphPosition { x_advance, attach_chain: chain, attach_kind: kind, ..Default::default() }
    }

    #[test]
    fn test_mark_offsets_forward() {
        // base (600), mark attached to base with a +50 offset
        let mut positions = vec![pos(600, 0, attach_kind::NONE), pos(0, -1, attach_kind::MARK)];
        positions[1].x_offset = 50;
        for i in 0..2 {
            propagate_attachment_offsets(&mut positions, i, Direction::LeftToRight, 8);
        }
        assert_eq!(positions[1].x_offset, 50 - 600);
        assert_eq!(positions[1].attach_chain, 0);
    }

    #[test]
    fn test_mark_offsets_backward() {
        let mut positions = vec![pos(600, 0, attach_kind::NONE), pos(0, -1, attach_kind::MARK)];
        positions[1].x_offset = 50;
        for i in 0..2 {
            propagate_attachment_offsets(&mut positions, i, Direction::RightToLeft, 8);
        }
        // Only the mark's own (zero) advance lies between
        assert_eq!(positions[1].x_offset, 50);
    }

    #[test]
    fn test_cursive_offsets_chain() {
        let mut positions = vec![
            pos(500, 0, attach_kind::NONE),
            pos(500, -1, attach_kind::CURSIVE),
            pos(500, -1, attach_kind::CURSIVE),
        ];
        positions[1].y_offset = 10;
        positions[2].y_offset = 5;
        for i in 0..3 {
            propagate_attachment_offsets(&mut positions, i, Direction::LeftToRight, 8);
        }
        assert_eq!(positions[2].y_offset, 15);
        assert_eq!(positions[2].x_offset, 0);
    }

    #[test]
    fn test_reverse_cursive_chain() {
        let mut positions = vec![pos(0, 0, attach_kind::NONE), pos(0, -1, attach_kind::CURSIVE)];
        positions[1].y_offset = 7;
        reverse_cursive_minor_offset(&mut positions, 1, Direction::LeftToRight, 5);
        assert_eq!(positions[1].attach_chain, 0);
        assert_eq!(positions[0].attach_chain, 1);
        assert_eq!(positions[0].y_offset, -7);
    }

    #[test]
    fn test_seq_match() {
        let classes = ClassDef::Array { start: 10, classes: vec![1, 2] };
        let by_class = SeqMatch::Classes(&[2], &classes);
        assert!(by_class.matches(0, GlyphId(11)));
        assert!(!by_class.matches(0, GlyphId(10)));
        assert!(!by_class.matches(1, GlyphId(11)));
        assert_eq!(SeqMatch::EMPTY.len(), 0);
    }
}
