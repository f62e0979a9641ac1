//! End-to-end shaping tests for fos-shape
//!
//! Every font comes from fos-shape-test-data; expected glyph ids and
//! advances are spelled out from the tables those fonts carry.

use std::sync::Arc;

use fos_shape::{
    Buffer, BufferFlags, ClusterLevel, ContentType, Direction, Face, Feature, Font, GlyphId, Language,
    ShapePlan, ShapePlanCache, Shaper, ShaperConfig, ShaperKind, SegmentProperties, Script, Tag,
};
use fos_shape_test_data::fonts;
use fos_shape_test_data::glyphs::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn font(data: Vec<u8>) -> Font {
    Font::new(Face::from_bytes(data, 0).unwrap())
}

fn shape(font: &Font, text: &str, features: &[Feature]) -> Buffer {
    init_tracing();
    let mut buffer = Buffer::new();
    buffer.push_str(text);
    Shaper::new().shape(font, &mut buffer, features).unwrap();
    buffer
}

fn glyphs(buffer: &Buffer) -> Vec<u16> {
    buffer.glyph_infos().iter().map(|i| i.glyph_id().0).collect()
}

fn clusters(buffer: &Buffer) -> Vec<u32> {
    buffer.glyph_infos().iter().map(|i| i.cluster).collect()
}

fn advances(buffer: &Buffer) -> Vec<i32> {
    buffer.glyph_positions().iter().map(|p| p.x_advance).collect()
}

fn feature(s: &str) -> Feature {
    s.parse().unwrap()
}

// ============================================================================
// BASIC MAPPING
// ============================================================================

#[test]
fn test_empty_buffer() {
    let font = font(fonts::simple());
    let mut buffer = Buffer::new();
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(buffer.content_type(), ContentType::Glyphs);
    assert!(buffer.is_empty());
    assert!(buffer.glyph_positions().is_empty());
}

#[test]
fn test_nominal_glyphs_and_advances() {
    let font = font(fonts::simple());
    let buffer = shape(&font, "AV a", &[]);
    assert_eq!(buffer.content_type(), ContentType::Glyphs);
    assert_eq!(glyphs(&buffer), vec![A, V, SPACE, A_LOWER]);
    assert_eq!(clusters(&buffer), vec![0, 1, 2, 3]);
    assert_eq!(advances(&buffer), vec![600, 600, 250, 500]);
    assert_eq!(buffer.glyph_positions().len(), buffer.len());
}

#[test]
fn test_unmapped_character_is_notdef() {
    let font = font(fonts::simple());
    let buffer = shape(&font, "A\u{4E00}", &[]);
    assert_eq!(glyphs(&buffer), vec![A, NOTDEF]);
    assert_eq!(advances(&buffer), vec![600, 500]);
}

#[test]
fn test_custom_not_found_glyph() {
    let font = font(fonts::simple());
    let mut buffer = Buffer::new();
    buffer.push_str("\u{4E00}");
    buffer.set_not_found_glyph(GlyphId(X));
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(glyphs(&buffer), vec![X]);
}

#[test]
fn test_guessed_properties() {
    let font = font(fonts::simple());
    let buffer = shape(&font, "AV", &[]);
    assert_eq!(buffer.script(), Some(Script::Latin));
    assert_eq!(buffer.direction(), Direction::LeftToRight);
}

#[test]
fn test_scaled_advances() {
    let mut font = font(fonts::simple());
    font.set_scale(2000, 2000);
    let buffer = shape(&font, "A", &[]);
    assert_eq!(advances(&buffer), vec![1200]);
}

#[test]
fn test_rtl_output_is_reversed() {
    let font = font(fonts::simple());
    let mut buffer = Buffer::new();
    buffer.push_str("AV");
    buffer.set_direction(Direction::RightToLeft);
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(glyphs(&buffer), vec![V, A]);
    assert_eq!(clusters(&buffer), vec![1, 0]);
}

#[test]
fn test_vertical_advances() {
    let font = font(fonts::vertical());
    let mut buffer = Buffer::new();
    buffer.push_str("A");
    buffer.set_direction(Direction::TopToBottom);
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    let pos = buffer.glyph_positions()[0];
    assert_eq!((pos.x_advance, pos.y_advance), (0, -900));
    assert_eq!((pos.x_offset, pos.y_offset), (-300, -800));
}

// ============================================================================
// SUBSTITUTION
// ============================================================================

#[test]
fn test_ligatures() {
    let font = font(fonts::ligature());
    let buffer = shape(&font, "ffi", &[]);
    assert_eq!(glyphs(&buffer), vec![F_F_I]);
    assert_eq!(clusters(&buffer), vec![0]);
    assert_eq!(advances(&buffer), vec![750]);

    let buffer = shape(&font, "fix", &[]);
    assert_eq!(glyphs(&buffer), vec![F_I, X]);
    assert_eq!(clusters(&buffer), vec![0, 2]);
}

#[test]
fn test_ligature_takes_min_cluster() {
    let font = font(fonts::ligature());
    let mut buffer = Buffer::new();
    buffer.extend([('f', 7), ('i', 9)]);
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(glyphs(&buffer), vec![F_I]);
    assert_eq!(clusters(&buffer), vec![7]);
}

#[test]
fn test_feature_disabled() {
    let font = font(fonts::ligature());
    let buffer = shape(&font, "ffi", &[feature("-liga")]);
    assert_eq!(glyphs(&buffer), vec![F, F, I]);
}

#[test]
fn test_feature_range() {
    let font = font(fonts::ligature());
    // Ligatures off for the first cluster only
    let buffer = shape(&font, "fifi", &[feature("liga[0:1]=0")]);
    assert_eq!(glyphs(&buffer), vec![F, I, F_I]);
    assert_eq!(clusters(&buffer), vec![0, 1, 2]);
}

#[test]
fn test_multiple_substitution() {
    let font = font(fonts::multiple_subst());
    let buffer = shape(&font, "Ax", &[]);
    assert_eq!(glyphs(&buffer), vec![A, A, V]);
    assert_eq!(clusters(&buffer), vec![0, 1, 1]);
}

#[test]
fn test_empty_sequence_deletes_glyph() {
    let font = font(fonts::multiple_subst());
    let buffer = shape(&font, "AiV", &[]);
    assert_eq!(glyphs(&buffer), vec![A, V]);
    assert_eq!(clusters(&buffer), vec![0, 2]);
    assert_eq!(buffer.glyph_positions().len(), 2);
}

#[test]
fn test_alternates_by_feature_value() {
    let font = font(fonts::multiple_subst());
    assert_eq!(glyphs(&shape(&font, "A", &[])), vec![A]);
    assert_eq!(glyphs(&shape(&font, "A", &[feature("salt")])), vec![V]);
    assert_eq!(glyphs(&shape(&font, "A", &[feature("salt=2")])), vec![X]);
    // Out of range alternate index leaves the glyph alone
    assert_eq!(glyphs(&shape(&font, "A", &[feature("salt=3")])), vec![A]);
}

#[test]
fn test_chained_context() {
    let font = font(fonts::context());
    assert_eq!(glyphs(&shape(&font, "AV", &[])), vec![X, V]);
    assert_eq!(glyphs(&shape(&font, "AA", &[])), vec![A, A]);
    assert_eq!(glyphs(&shape(&font, "VAV", &[])), vec![V, X, V]);
}

#[test]
fn test_self_recursive_lookup_terminates() {
    let font = font(fonts::recursive_context());
    let buffer = shape(&font, "AAA", &[]);
    assert_eq!(glyphs(&buffer), vec![A, A, A]);
}

#[test]
fn test_arabic_positional_forms() {
    let font = font(fonts::arabic());
    let buffer = shape(&font, "\u{0628}\u{0628}", &[]);
    assert_eq!(buffer.direction(), Direction::RightToLeft);
    assert_eq!(glyphs(&buffer), vec![BEH_FINA, BEH_INIT]);
    assert_eq!(clusters(&buffer), vec![2, 0]);

    let buffer = shape(&font, "\u{0628}\u{0628}\u{0627}", &[]);
    assert_eq!(glyphs(&buffer), vec![ALEF_FINA, BEH_MEDI, BEH_INIT]);

    let buffer = shape(&font, "\u{0628}", &[]);
    assert_eq!(glyphs(&buffer), vec![BEH]);
}

#[test]
fn test_indic_pre_base_matra() {
    let font = font(fonts::simple());
    let buffer = shape(&font, "\u{0915}\u{093F}", &[]);
    assert_eq!(buffer.script(), Some(Script::Devanagari));
    assert_eq!(glyphs(&buffer), vec![I_MATRA, KA]);
    assert_eq!(clusters(&buffer), vec![0, 0]);
}

#[test]
fn test_reverse_chaining_runs_from_the_end() {
    let font = font(fonts::reverse_chain());
    // Each A sees the V produced to its right
    let buffer = shape(&font, "AAV", &[]);
    assert_eq!(glyphs(&buffer), vec![V, V, V]);

    let buffer = shape(&font, "AVA", &[]);
    assert_eq!(glyphs(&buffer), vec![V, V, A]);
    assert_eq!(clusters(&buffer), vec![0, 1, 2]);
}

#[test]
fn test_mark_filtering_set() {
    let font = font(fonts::mark_filtering());
    // The acute is outside the filtering set and is looked past
    let buffer = shape(&font, "a\u{0301}x", &[]);
    assert_eq!(glyphs(&buffer), vec![A, ACUTE, X]);

    // The grave is in the set and blocks the lookahead
    let buffer = shape(&font, "a\u{0300}x", &[]);
    assert_eq!(glyphs(&buffer), vec![A_LOWER, GRAVE, X]);

    let buffer = shape(&font, "ax", &[]);
    assert_eq!(glyphs(&buffer), vec![A, X]);
}

#[test]
fn test_language_system() {
    let font = font(fonts::localized());
    assert_eq!(glyphs(&shape(&font, "A", &[])), vec![A]);

    let mut buffer = Buffer::new();
    buffer.push_str("A");
    buffer.set_language(Language::from_bcp47("tr"));
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(glyphs(&buffer), vec![X]);

    let mut buffer = Buffer::new();
    buffer.push_str("A");
    let shaper = Shaper::with_config(ShaperConfig::new().default_language(Language::from_bcp47("tr-TR")));
    shaper.shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(glyphs(&buffer), vec![X]);
}

// ============================================================================
// POSITIONING
// ============================================================================

#[test]
fn test_pair_kerning() {
    let font = font(fonts::kerning());
    let buffer = shape(&font, "AV", &[]);
    assert_eq!(advances(&buffer), vec![520, 600]);

    let buffer = shape(&font, "VA", &[]);
    assert_eq!(advances(&buffer), vec![560, 600]);

    let buffer = shape(&font, "AA", &[]);
    assert_eq!(advances(&buffer), vec![600, 600]);
}

#[test]
fn test_kerning_disabled() {
    let font = font(fonts::kerning());
    let buffer = shape(&font, "AV", &[feature("kern=0")]);
    assert_eq!(advances(&buffer), vec![600, 600]);
}

#[test]
fn test_positioning_keeps_length() {
    let font = font(fonts::kerning());
    let buffer = shape(&font, "AVAVA", &[]);
    assert_eq!(buffer.len(), 5);
    assert_eq!(buffer.glyph_positions().len(), 5);
}

#[test]
fn test_mark_attachment() {
    let font = font(fonts::mark());
    let buffer = shape(&font, "a\u{0301}", &[]);
    assert_eq!(glyphs(&buffer), vec![A_LOWER, ACUTE]);
    assert_eq!(clusters(&buffer), vec![0, 0]);

    let mark = buffer.glyph_positions()[1];
    // Anchor difference, pulled back over the base advance
    assert_eq!(mark.x_offset, 250 - 100 - 500);
    assert_eq!(mark.y_offset, 600 - 500);
    assert_eq!(mark.x_advance, 0);
    assert_eq!(advances(&buffer)[0], 500);
}

#[test]
fn test_mark_stacking() {
    let font = font(fonts::mark());
    let buffer = shape(&font, "a\u{0300}\u{0301}", &[]);
    let positions = buffer.glyph_positions();
    assert_eq!(positions[1].y_offset, 100);
    assert_eq!(positions[2].y_offset, positions[1].y_offset + 400);
    assert_eq!(positions[2].x_offset, positions[1].x_offset);
}

#[test]
fn test_marks_keep_advance_when_configured() {
    let font = font(fonts::simple());
    let mut buffer = Buffer::new();
    buffer.push_str("a\u{0301}");
    let shaper = Shaper::with_config(ShaperConfig::new().zero_width_marks(false));
    shaper.shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(advances(&buffer), vec![500, 200]);

    let buffer = shape(&font, "a\u{0301}", &[]);
    assert_eq!(advances(&buffer), vec![500, 0]);
}

#[test]
fn test_mark_to_ligature_component() {
    let font = font(fonts::mark_ligature());
    let [first, second] = fonts::LIGATURE_ANCHORS;
    let (mark_x, mark_y) = fonts::MARK_ANCHOR;

    // Acute between f and i sits on the first component
    let buffer = shape(&font, "f\u{0301}i", &[]);
    assert_eq!(glyphs(&buffer), vec![F_I, ACUTE]);
    assert_eq!(clusters(&buffer), vec![0, 0]);
    let mark = buffer.glyph_positions()[1];
    assert_eq!(mark.x_offset, (first.0 - mark_x) as i32 - 500);
    assert_eq!(mark.y_offset, (first.1 - mark_y) as i32);

    // Acute after the ligature sits on the last component
    let buffer = shape(&font, "fi\u{0301}", &[]);
    assert_eq!(glyphs(&buffer), vec![F_I, ACUTE]);
    assert_eq!(clusters(&buffer), vec![0, 0]);
    let mark = buffer.glyph_positions()[1];
    assert_eq!(mark.x_offset, (second.0 - mark_x) as i32 - 500);
    assert_eq!(mark.y_offset, (second.1 - mark_y) as i32);
    assert_eq!(advances(&buffer), vec![500, 0]);
}

#[test]
fn test_cursive_attachment() {
    let font = font(fonts::cursive());
    let buffer = shape(&font, "AV", &[]);
    assert_eq!(glyphs(&buffer), vec![A, V]);
    // A ends at its exit anchor; V starts at its entry anchor
    assert_eq!(advances(&buffer), vec![550, 550]);
    let positions = buffer.glyph_positions();
    assert_eq!(positions[1].x_offset, -50);
    // V is raised so its entry meets the exit of A
    assert_eq!(positions[1].y_offset, 100);
    assert_eq!(positions[0].y_offset, 0);
}

#[test]
fn test_cursive_chain_reversed_right_to_left() {
    let font = font(fonts::cursive());
    let mut buffer = Buffer::new();
    buffer.push_str("AVx");
    buffer.set_direction(Direction::RightToLeft);
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();

    // Visual order; the right-to-left lookup hangs A and V below x
    assert_eq!(glyphs(&buffer), vec![X, V, A]);
    assert_eq!(clusters(&buffer), vec![2, 1, 0]);
    assert_eq!(advances(&buffer), vec![520, 50, 50]);
    let y_offsets: Vec<i32> = buffer.glyph_positions().iter().map(|p| p.y_offset).collect();
    assert_eq!(y_offsets, vec![0, -200, -300]);
    assert_eq!(buffer.glyph_positions()[2].x_offset, -550);
}

// ============================================================================
// CLUSTERS AND IGNORABLES
// ============================================================================

#[test]
fn test_clusters_monotone() {
    let font = font(fonts::ligature());
    let buffer = shape(&font, "ffi fi xffix", &[]);
    let clusters = clusters(&buffer);
    assert!(clusters.windows(2).all(|w| w[0] <= w[1]), "{clusters:?}");
}

#[test]
fn test_character_cluster_level() {
    let font = font(fonts::simple());
    let mut buffer = Buffer::new();
    buffer.push_str("a\u{0301}");
    buffer.set_cluster_level(ClusterLevel::MonotoneCharacters);
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(clusters(&buffer), vec![0, 1]);
}

#[test]
fn test_default_ignorable_hidden() {
    let font = font(fonts::simple());
    let buffer = shape(&font, "A\u{200B}V", &[]);
    assert_eq!(glyphs(&buffer), vec![A, SPACE, V]);
    assert_eq!(advances(&buffer), vec![600, 0, 600]);
}

#[test]
fn test_default_ignorable_removed() {
    let font = font(fonts::simple());
    let mut buffer = Buffer::new();
    buffer.push_str("A\u{200B}V");
    buffer.set_flags(BufferFlags::REMOVE_DEFAULT_IGNORABLES);
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(glyphs(&buffer), vec![A, V]);
    assert_eq!(clusters(&buffer), vec![0, 4]);
}

#[test]
fn test_default_ignorable_preserved() {
    let font = font(fonts::simple());
    let mut buffer = Buffer::new();
    buffer.push_str("A\u{200B}");
    buffer.set_flags(BufferFlags::PRESERVE_DEFAULT_IGNORABLES);
    Shaper::new().shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(glyphs(&buffer), vec![A, NOTDEF]);
}

// ============================================================================
// PLANS AND CACHING
// ============================================================================

fn latin() -> SegmentProperties {
    SegmentProperties::new(Direction::LeftToRight, Some(Script::Latin), None)
}

#[test]
fn test_plan_lookups() {
    let font = font(fonts::kerning());
    let plan = ShapePlan::new(&font, &latin(), &[], None).unwrap();
    assert_eq!(plan.shaper(), ShaperKind::Ot);
    assert_eq!(plan.lookup_indices(Tag::new(b"GPOS")), vec![0]);
    assert!(plan.lookup_indices(Tag::new(b"GSUB")).is_empty());
    assert!(plan.feature_mask(Tag::new(b"kern")).is_some());

    let plan = ShapePlan::new(&font, &latin(), &[feature("-kern")], None).unwrap();
    assert!(plan.lookup_indices(Tag::new(b"GPOS")).is_empty());
    assert_eq!(plan.feature_mask(Tag::new(b"kern")), None);
}

#[test]
fn test_plan_execute() {
    let font = font(fonts::kerning());
    let plan = ShapePlan::new(&font, &latin(), &[], None).unwrap();
    let mut buffer = Buffer::new();
    buffer.push_str("AV");
    plan.execute(&font, &mut buffer, &[]).unwrap();
    assert_eq!(advances(&buffer), vec![520, 600]);
}

#[test]
fn test_cache_hits() {
    let font = font(fonts::kerning());
    let cache = Arc::new(ShapePlanCache::new());
    let shaper = Shaper::new().with_cache(cache.clone());
    for _ in 0..3 {
        let mut buffer = Buffer::new();
        buffer.push_str("AV");
        shaper.shape(&font, &mut buffer, &[]).unwrap();
    }
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.compilations, 1);
    assert_eq!(stats.entries, 1);
}

#[test]
fn test_feature_order_shares_plan() {
    let font = font(fonts::ligature());
    let cache = ShapePlanCache::new();
    let a = cache.get_or_create(&font, &latin(), &[feature("-liga"), feature("kern")], None).unwrap();
    let b = cache.get_or_create(&font, &latin(), &[feature("kern"), feature("-liga")], None).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.compilations(), 1);

    cache.get_or_create(&font, &latin(), &[], None).unwrap();
    assert_eq!(cache.compilations(), 2);
}

#[test]
fn test_plans_are_per_face() {
    let first = font(fonts::simple());
    let second = font(fonts::simple());
    let cache = ShapePlanCache::new();
    cache.get_or_create(&first, &latin(), &[], None).unwrap();
    cache.get_or_create(&second, &latin(), &[], None).unwrap();
    assert_eq!(cache.compilations(), 2);
}

#[test]
fn test_concurrent_single_compile() {
    init_tracing();
    let font = font(fonts::ligature());
    let cache = Arc::new(ShapePlanCache::new());
    let outputs: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shaper = Shaper::new().with_cache(cache.clone());
                let font = &font;
                scope.spawn(move || {
                    let mut buffer = Buffer::new();
                    buffer.push_str("ffi fi");
                    shaper.shape(font, &mut buffer, &[]).unwrap();
                    buffer.serialize()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.compilations(), 1);
    let stats = cache.stats();
    assert_eq!(stats.hits + stats.misses, 8);
    assert!(outputs.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_bounded_cache_evicts() {
    let font = font(fonts::simple());
    let cache = ShapePlanCache::with_config(fos_shape::CacheConfig::default().max_entries(1));
    cache.get_or_create(&font, &latin(), &[], None).unwrap();
    cache.get_or_create(&font, &latin(), &[feature("kern")], None).unwrap();
    assert_eq!(cache.stats().entries, 1);

    // The first plan was evicted and compiles again
    cache.get_or_create(&font, &latin(), &[], None).unwrap();
    assert_eq!(cache.compilations(), 3);
}

#[test]
fn test_deterministic_output() {
    let font = font(fonts::mark());
    let first = shape(&font, "a\u{0300}\u{0301} A\u{0301}", &[]).serialize();
    let second = shape(&font, "a\u{0300}\u{0301} A\u{0301}", &[]).serialize();
    assert_eq!(first, second);
}

#[test]
fn test_global_shape_function() {
    let font = font(fonts::kerning());
    let mut buffer = Buffer::new();
    buffer.push_str("AV");
    fos_shape::shape(&font, &mut buffer, &[]).unwrap();
    assert_eq!(advances(&buffer), vec![520, 600]);
}
