//! Shape plans
//!
//! A plan is compiled once per face, segment properties, feature list,
//! variation coordinates and shaper list. It assigns mask bits to the
//! features the font implements and lists, in application order, the
//! GSUB and GPOS lookups to run under those masks.

use std::fmt;
use std::str::FromStr;

use crate::buffer::{Buffer, BufferFlags, ContentType, SegmentProperties};
use crate::feature::Feature;
use crate::font::parser::tags;
use crate::font::{Face, FaceId, Font, GlyphId};
use crate::layout::{self, ApplyContext, LangSys, LayoutTable, LookupPass};
use crate::shaper::ShaperConfig;
use crate::tag::Tag;
use crate::unicode::{self, Direction, Script};
use crate::{Result, ShapeError};

/// Mask bit shared by every global on/off feature
const GLOBAL_BIT: u32 = 1;

/// Named shaping strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaperKind {
    /// Full OpenType layout
    Ot,
    /// cmap and advances only
    Fallback,
}

impl ShaperKind {
    /// Every shaper, in default preference order
    pub const ALL: [ShaperKind; 2] = [ShaperKind::Ot, ShaperKind::Fallback];

    pub fn name(self) -> &'static str {
        match self {
            ShaperKind::Ot => "ot",
            ShaperKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ShaperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for unknown shaper names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shaper {0:?}")]
pub struct UnknownShaper(pub String);

impl FromStr for ShaperKind {
    type Err = UnknownShaper;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ShaperKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownShaper(s.to_string()))
    }
}

/// Resolve a caller's shaper list. Unknown names are skipped; a list
/// with no known shaper is `NoShaper`.
pub(crate) fn resolve_shapers(names: Option<&[&str]>) -> Result<Vec<ShaperKind>> {
    let Some(names) = names else {
        return Ok(ShaperKind::ALL.to_vec());
    };
    let mut shapers = Vec::with_capacity(names.len());
    for name in names {
        match name.parse::<ShaperKind>() {
            Ok(kind) if !shapers.contains(&kind) => shapers.push(kind),
            Ok(_) => {}
            Err(err) => tracing::debug!(%err, "skipping shaper"),
        }
    }
    if shapers.is_empty() {
        return Err(ShapeError::NoShaper);
    }
    Ok(shapers)
}

/// Identity of a plan
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    face_id: FaceId,
    props: SegmentProperties,
    features: Vec<Feature>,
    coords: Vec<i32>,
    shapers: Vec<ShaperKind>,
}

impl PlanKey {
    /// Build a key. Features are sorted by `(tag, start, end)`; of several
    /// features with the same tag and range only the last one is kept.
    pub fn new(font: &Font, props: &SegmentProperties, features: &[Feature], shapers: &[ShaperKind]) -> Self {
        let mut sorted = features.to_vec();
        sorted.sort_by_key(|f| (f.tag, f.start, f.end));
        let mut deduped: Vec<Feature> = Vec::with_capacity(sorted.len());
        for feature in sorted {
            match deduped.last_mut() {
                Some(last) if (last.tag, last.start, last.end) == (feature.tag, feature.start, feature.end) => {
                    *last = feature;
                }
                _ => deduped.push(feature),
            }
        }

        Self {
            face_id: font.face().id(),
            props: props.clone(),
            features: deduped,
            coords: font.variation_coords().to_vec(),
            shapers: shapers.to_vec(),
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn segment_properties(&self) -> &SegmentProperties {
        &self.props
    }
}

/// A feature before bit allocation
#[derive(Debug, Clone, Copy)]
struct FeatureRequest {
    tag: Tag,
    global: bool,
    max_value: u32,
    default_value: u32,
}

impl FeatureRequest {
    fn on(tag: Tag, global: bool) -> Self {
        Self { tag, global, max_value: 1, default_value: u32::from(global) }
    }
}

impl From<&Feature> for FeatureRequest {
    fn from(feature: &Feature) -> Self {
        let global = feature.is_global();
        Self {
            tag: feature.tag,
            global,
            max_value: feature.value,
            default_value: if global { feature.value } else { 0 },
        }
    }
}

/// Merge requests for the same tag, keeping first-request order. A later
/// global request sets the default value; a ranged one makes the feature
/// ranged, which is permanent.
fn merge_requests(requests: impl IntoIterator<Item = FeatureRequest>) -> Vec<FeatureRequest> {
    let mut merged: Vec<FeatureRequest> = Vec::new();
    for request in requests {
        match merged.iter_mut().find(|r| r.tag == request.tag) {
            Some(existing) if request.global => {
                existing.max_value = if existing.global {
                    request.max_value
                } else {
                    existing.max_value.max(request.max_value)
                };
                existing.default_value = request.default_value;
            }
            Some(existing) => {
                existing.global = false;
                existing.max_value = existing.max_value.max(request.max_value);
            }
            None => merged.push(request),
        }
    }
    merged
}

/// Features a script turns on by default, in application order
fn default_requests(props: &SegmentProperties) -> Vec<FeatureRequest> {
    fn global(tags: &[&[u8; 4]]) -> Vec<FeatureRequest> {
        tags.iter().map(|t| FeatureRequest::on(Tag::new(t), true)).collect()
    }

    let mut requests = match props.direction {
        Direction::LeftToRight => global(&[b"ltra", b"ltrm"]),
        Direction::RightToLeft => global(&[b"rtla", b"rtlm"]),
        _ => Vec::new(),
    };
    requests.extend(global(&[b"ccmp", b"locl"]));

    let script = props.script;
    if script.is_some_and(Script::is_joining) {
        // Positional forms are set per glyph from joining analysis
        requests.extend(
            unicode::PositionalForm::ALL
                .iter()
                .map(|form| FeatureRequest::on(form.feature_tag(), false)),
        );
        requests.extend(global(&[b"rlig", b"calt"]));
    }
    if script.is_some_and(Script::is_indic) {
        requests.extend(global(&[
            b"nukt", b"akhn", b"rphf", b"rkrf", b"pref", b"blwf", b"abvf", b"half", b"pstf", b"vatu", b"cjct",
            b"pres", b"abvs", b"blws", b"psts", b"haln",
        ]));
    }

    if props.direction.is_vertical() {
        requests.extend(global(&[b"vert"]));
    } else {
        requests.extend(global(&[b"rlig", b"calt", b"clig", b"liga", b"rclt"]));
    }
    requests.extend(global(&[b"curs", b"dist"]));
    requests.extend(global(if props.direction.is_vertical() { &[b"vkrn"] } else { &[b"kern"] }));
    requests.extend(global(&[b"mark", b"mkmk", b"abvm", b"blwm"]));
    requests
}

/// OpenType script tags to try for a script
fn script_candidates(script: Option<Script>) -> Vec<Tag> {
    let mut candidates = script.map(|s| s.ot_tags().to_vec()).unwrap_or_default();
    candidates.extend([Tag::new(b"DFLT"), Tag::new(b"dflt"), Tag::new(b"latn")]);
    candidates
}

fn select_lang_sys<'t, T>(table: &'t LayoutTable<T>, scripts: &[Tag], language: Option<Tag>) -> Option<&'t LangSys> {
    table.find_script(scripts)?.lang_sys(language)
}

fn required_lookups<T>(table: &LayoutTable<T>, lang_sys: &LangSys) -> Option<Vec<u16>> {
    let feature = table.features.get(lang_sys.required_feature?)?;
    Some(feature.lookup_indices.clone())
}

/// Append a feature's lookups in index order; a lookup already
/// scheduled by an earlier feature gains this feature's mask instead
fn schedule(passes: &mut Vec<LookupPass>, lookups: Option<Vec<u16>>, mask: u32) {
    let Some(mut lookups) = lookups else {
        return;
    };
    lookups.sort_unstable();
    lookups.dedup();
    for index in lookups {
        match passes.iter_mut().find(|p| p.index == index) {
            Some(pass) => pass.mask |= mask,
            None => passes.push(LookupPass { index, mask }),
        }
    }
}

/// Mask bits of one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FeatureMask {
    tag: Tag,
    mask: u32,
    shift: u32,
}

/// Compiled, immutable shaping plan
#[derive(Debug)]
pub struct ShapePlan {
    key: PlanKey,
    shaper: ShaperKind,
    global_mask: u32,
    /// Sorted by tag
    feature_masks: Vec<FeatureMask>,
    gsub_lookups: Vec<LookupPass>,
    gpos_lookups: Vec<LookupPass>,
}

impl ShapePlan {
    /// Compile a plan without going through a cache. `shapers` lists
    /// shaper names to try in order; `None` tries all.
    pub fn new(
        font: &Font,
        props: &SegmentProperties,
        features: &[Feature],
        shapers: Option<&[&str]>,
    ) -> Result<Self> {
        let shapers = resolve_shapers(shapers)?;
        Self::compile(font.face(), PlanKey::new(font, props, features, &shapers))
    }

    /// Try each shaper of the key in order
    pub(crate) fn compile(face: &Face, key: PlanKey) -> Result<Self> {
        let mut last_error = None;
        for &shaper in &key.shapers {
            match shaper {
                ShaperKind::Ot => match Self::compile_ot(face, &key) {
                    Ok((global_mask, feature_masks, gsub_lookups, gpos_lookups)) => {
                        tracing::debug!(
                            face = ?key.face_id,
                            script = ?key.props.script,
                            direction = ?key.props.direction,
                            features = feature_masks.len(),
                            gsub_lookups = gsub_lookups.len(),
                            gpos_lookups = gpos_lookups.len(),
                            "compiled shape plan"
                        );
                        return Ok(Self { key, shaper, global_mask, feature_masks, gsub_lookups, gpos_lookups });
                    }
                    Err(err) => {
                        tracing::warn!(face = ?key.face_id, %err, "ot shaper unusable, trying next shaper");
                        last_error = Some(err);
                    }
                },
                ShaperKind::Fallback => {
                    tracing::debug!(face = ?key.face_id, "compiled fallback shape plan");
                    return Ok(Self {
                        key,
                        shaper,
                        global_mask: GLOBAL_BIT,
                        feature_masks: Vec::new(),
                        gsub_lookups: Vec::new(),
                        gpos_lookups: Vec::new(),
                    });
                }
            }
        }
        Err(last_error.unwrap_or(ShapeError::NoShaper))
    }

    #[allow(clippy::type_complexity)]
    fn compile_ot(face: &Face, key: &PlanKey) -> Result<(u32, Vec<FeatureMask>, Vec<LookupPass>, Vec<LookupPass>)> {
        let gsub = face.gsub()?;
        let gpos = face.gpos()?;

        let scripts = script_candidates(key.props.script);
        let language = key.props.language.as_ref().and_then(|l| l.ot_tag());
        let gsub = gsub.and_then(|t| Some((t, select_lang_sys(t, &scripts, language)?)));
        let gpos = gpos.and_then(|t| Some((t, select_lang_sys(t, &scripts, language)?)));

        let mut gsub_lookups = Vec::new();
        let mut gpos_lookups = Vec::new();
        if let Some((table, lang_sys)) = gsub {
            schedule(&mut gsub_lookups, required_lookups(table, lang_sys), GLOBAL_BIT);
        }
        if let Some((table, lang_sys)) = gpos {
            schedule(&mut gpos_lookups, required_lookups(table, lang_sys), GLOBAL_BIT);
        }

        let requests = default_requests(&key.props)
            .into_iter()
            .chain(key.features.iter().map(FeatureRequest::from));

        let mut global_mask = GLOBAL_BIT;
        let mut next_bit = 1;
        let mut feature_masks = Vec::new();
        for request in merge_requests(requests) {
            if request.max_value == 0 {
                continue;
            }
            let gsub_ids = gsub.and_then(|(t, ls)| t.feature_lookups(ls, request.tag));
            let gpos_ids = gpos.and_then(|(t, ls)| t.feature_lookups(ls, request.tag));
            if gsub_ids.is_none() && gpos_ids.is_none() {
                continue;
            }

            let (mask, shift) = if request.global && request.max_value == 1 {
                (GLOBAL_BIT, 0)
            } else {
                let bits = u32::BITS - request.max_value.leading_zeros();
                if next_bit + bits > u32::BITS {
                    tracing::debug!(feature = %request.tag, "out of mask bits, skipping feature");
                    continue;
                }
                let shift = next_bit;
                next_bit += bits;
                (((1u32 << bits) - 1) << shift, shift)
            };
            global_mask |= (request.default_value << shift) & mask;

            feature_masks.push(FeatureMask { tag: request.tag, mask, shift });
            schedule(&mut gsub_lookups, gsub_ids, mask);
            schedule(&mut gpos_lookups, gpos_ids, mask);
        }
        feature_masks.sort_by_key(|f| f.tag);

        Ok((global_mask, feature_masks, gsub_lookups, gpos_lookups))
    }

    /// Shaper this plan was compiled for
    pub fn shaper(&self) -> ShaperKind {
        self.shaper
    }

    pub fn key(&self) -> &PlanKey {
        &self.key
    }

    /// Mask bits assigned to a feature, if the font implements it
    pub fn feature_mask(&self, tag: Tag) -> Option<u32> {
        self.find_mask(tag).map(|f| f.mask)
    }

    /// Scheduled lookup indices of `GSUB` or `GPOS`, in application order
    pub fn lookup_indices(&self, table: Tag) -> Vec<u16> {
        let passes = match table {
            tags::GSUB => &self.gsub_lookups,
            tags::GPOS => &self.gpos_lookups,
            _ => return Vec::new(),
        };
        passes.iter().map(|p| p.index).collect()
    }

    fn find_mask(&self, tag: Tag) -> Option<&FeatureMask> {
        let index = self.feature_masks.binary_search_by_key(&tag, |f| f.tag).ok()?;
        self.feature_masks.get(index)
    }

    /// Shape `buffer` with this plan, without caching. The buffer is
    /// restored if shaping fails.
    pub fn execute(&self, font: &Font, buffer: &mut Buffer, features: &[Feature]) -> Result<()> {
        crate::shaper::execute_plan(self, font, buffer, features, &ShaperConfig::default())
    }

    /// Write feature masks: the global mask everywhere, positional forms
    /// per glyph, then ranged features in caller order
    pub(crate) fn setup_masks(&self, buffer: &mut Buffer, features: &[Feature]) {
        let form_masks: Vec<_> = unicode::PositionalForm::ALL
            .iter()
            .map(|form| (*form, self.find_mask(form.feature_tag()).map_or(0, |f| (1 << f.shift) & f.mask)))
            .collect();
        for info in &mut buffer.infos {
            info.mask = self.global_mask;
            if let Some(form) = info.form {
                info.mask |= form_masks.iter().find(|(f, _)| *f == form).map_or(0, |(_, m)| *m);
            }
        }

        for feature in features.iter().filter(|f| !f.is_global()) {
            let Some(fm) = self.find_mask(feature.tag) else {
                continue;
            };
            // The shared global bit cannot be toggled per range
            if fm.shift == 0 {
                continue;
            }
            let value = (feature.value << fm.shift) & fm.mask;
            for info in buffer.infos.iter_mut().filter(|i| feature.covers(i.cluster)) {
                info.mask = (info.mask & !fm.mask) | value;
            }
        }
    }

    /// Segmenter preparation, glyph mapping, substitution and
    /// positioning on a validated Unicode buffer
    pub(crate) fn run(&self, font: &Font, buffer: &mut Buffer, features: &[Feature], config: &ShaperConfig) -> Result<()> {
        let input_len = buffer.len();
        unicode::prepare(buffer);
        self.setup_masks(buffer, features);
        map_glyphs(font, buffer);
        buffer.content_type = ContentType::Glyphs;

        match self.shaper {
            ShaperKind::Ot => {
                self.substitute(font, buffer, config.max_len(input_len), config.max_nesting)?;
                set_default_positions(font, buffer);
                self.position(font, buffer, config)?;
            }
            ShaperKind::Fallback => set_default_positions(font, buffer),
        }

        hide_default_ignorables(font, buffer);
        if buffer.direction().is_backward() {
            buffer.reverse();
        }
        Ok(())
    }

    fn substitute(&self, font: &Font, buffer: &mut Buffer, limit: usize, max_nesting: usize) -> Result<()> {
        let face = font.face();
        let gdef = face.gdef();
        layout::set_glyph_props(buffer, gdef);
        let Some(gsub) = face.gsub()? else {
            return Ok(());
        };

        let mut ctx = ApplyContext::new(gsub, gdef, font, buffer, max_nesting);
        for &pass in &self.gsub_lookups {
            ctx.apply_lookup(pass);
            if ctx.buffer_len() > limit {
                return Err(ShapeError::BufferOverflow { limit });
            }
        }
        Ok(())
    }

    fn position(&self, font: &Font, buffer: &mut Buffer, config: &ShaperConfig) -> Result<()> {
        let face = font.face();
        if let Some(gpos) = face.gpos()? {
            let mut ctx = ApplyContext::new(gpos, face.gdef(), font, buffer, config.max_nesting);
            for &pass in &self.gpos_lookups {
                ctx.apply_lookup(pass);
            }
        }
        layout::position_finish(buffer, config.zero_width_marks);
        Ok(())
    }
}

fn map_glyphs(font: &Font, buffer: &mut Buffer) {
    let not_found = buffer.not_found_glyph();
    for info in &mut buffer.infos {
        let glyph = font.nominal_glyph(info.codepoint).unwrap_or(not_found);
        info.set_glyph(glyph);
    }
}

/// Nominal advances; vertical glyphs are moved from their vertical origin
fn set_default_positions(font: &Font, buffer: &mut Buffer) {
    buffer.clear_positions();
    let direction = buffer.direction();
    for (info, pos) in buffer.infos.iter().zip(buffer.positions.iter_mut()) {
        let glyph = info.glyph_id();
        (pos.x_advance, pos.y_advance) = font.glyph_advance(glyph, direction);
        if direction.is_vertical() {
            let (x, y) = font.glyph_origin(glyph, direction);
            pos.x_offset -= x;
            pos.y_offset -= y;
        }
    }
}

/// Replace default ignorables with the invisible glyph at zero advance,
/// or drop them
fn hide_default_ignorables(font: &Font, buffer: &mut Buffer) {
    let flags = buffer.flags();
    if flags.contains(BufferFlags::PRESERVE_DEFAULT_IGNORABLES)
        || !buffer.infos.iter().any(|i| i.is_default_ignorable())
    {
        return;
    }

    let invisible = match buffer.invisible_glyph() {
        GlyphId::NOTDEF => font.nominal_glyph(' '),
        glyph => Some(glyph),
    };
    match invisible {
        Some(glyph) if !flags.contains(BufferFlags::REMOVE_DEFAULT_IGNORABLES) => {
            for (info, pos) in buffer.infos.iter_mut().zip(buffer.positions.iter_mut()) {
                if info.is_default_ignorable() {
                    info.set_glyph(glyph);
                    pos.x_advance = 0;
                    pos.y_advance = 0;
                }
            }
        }
        _ => {
            for i in (0..buffer.len()).rev() {
                if buffer.infos[i].is_default_ignorable() {
                    buffer.delete_glyph(i);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tag: &[u8; 4], global: bool, value: u32) -> FeatureRequest {
        FeatureRequest::from(&if global {
            Feature::new(Tag::new(tag), value)
        } else {
            Feature::with_range(Tag::new(tag), value, 2, 5)
        })
    }

    #[test]
    fn test_shaper_names() {
        assert_eq!("ot".parse::<ShaperKind>().unwrap(), ShaperKind::Ot);
        assert_eq!(ShaperKind::Fallback.to_string(), "fallback");
        assert!("graphite".parse::<ShaperKind>().is_err());
    }

    #[test]
    fn test_resolve_shapers() {
        assert_eq!(resolve_shapers(None).unwrap(), ShaperKind::ALL.to_vec());
        assert_eq!(resolve_shapers(Some(&["fallback", "bogus", "fallback"])).unwrap(), vec![ShaperKind::Fallback]);
        assert_eq!(resolve_shapers(Some(&["bogus"])).unwrap_err(), ShapeError::NoShaper);
        assert_eq!(resolve_shapers(Some(&[])).unwrap_err(), ShapeError::NoShaper);
    }

    #[test]
    fn test_merge_requests() {
        let merged = merge_requests([
            request(b"liga", true, 1),
            request(b"kern", true, 1),
            request(b"liga", false, 1),
            request(b"kern", true, 0),
            request(b"aalt", false, 3),
            request(b"aalt", false, 1),
            request(b"aalt", true, 2),
        ]);
        let tags: Vec<Tag> = merged.iter().map(|r| r.tag).collect();
        assert_eq!(tags, vec![Tag::new(b"liga"), Tag::new(b"kern"), Tag::new(b"aalt")]);

        // ranged request makes liga ranged but keeps it on by default
        assert!(!merged[0].global);
        assert_eq!(merged[0].default_value, 1);
        // later global request wins
        assert!(merged[1].global);
        assert_eq!(merged[1].max_value, 0);
        // a global request after a ranged one only sets the default
        assert!(!merged[2].global);
        assert_eq!(merged[2].max_value, 3);
        assert_eq!(merged[2].default_value, 2);
    }

    #[test]
    fn test_schedule_merges_masks() {
        let mut passes = Vec::new();
        schedule(&mut passes, Some(vec![4, 1, 4]), 0b10);
        schedule(&mut passes, Some(vec![0, 1]), 0b100);
        schedule(&mut passes, None, 0b1000);
        assert_eq!(
            passes,
            vec![
                LookupPass { index: 1, mask: 0b110 },
                LookupPass { index: 4, mask: 0b10 },
                LookupPass { index: 0, mask: 0b100 },
            ]
        );
    }

    #[test]
    fn test_default_features_by_script() {
        let tags = |props: &SegmentProperties| -> Vec<Tag> { default_requests(props).iter().map(|r| r.tag).collect() };

        let latin = SegmentProperties::new(Direction::LeftToRight, Some(Script::Latin), None);
        let latin_tags = tags(&latin);
        assert!(latin_tags.contains(&Tag::new(b"liga")));
        assert!(latin_tags.contains(&Tag::new(b"kern")));
        assert!(!latin_tags.contains(&Tag::new(b"init")));

        let arabic = SegmentProperties::new(Direction::RightToLeft, Some(Script::Arabic), None);
        let forms: Vec<_> = default_requests(&arabic).into_iter().filter(|r| r.tag == Tag::new(b"fina")).collect();
        assert_eq!(forms.len(), 1);
        assert!(!forms[0].global);

        let vertical = SegmentProperties::new(Direction::TopToBottom, Some(Script::Han), None);
        let vertical_tags = tags(&vertical);
        assert!(vertical_tags.contains(&Tag::new(b"vert")));
        assert!(!vertical_tags.contains(&Tag::new(b"kern")));
    }

    #[test]
    fn test_script_candidates_fall_back() {
        let candidates = script_candidates(Some(Script::Devanagari));
        assert_eq!(candidates[0], Tag::new(b"dev2"));
        assert_eq!(candidates.last(), Some(&Tag::new(b"latn")));
        assert_eq!(script_candidates(None)[0], Tag::new(b"DFLT"));
    }
}
