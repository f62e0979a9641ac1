//! Small fonts exercising one shaping feature each
//!
//! All fonts share the glyph set in [`crate::glyphs`], 1000 units per
//! em, an 800 / -200 ascender and descender, and no vertical metrics.

use crate::glyphs::*;
use crate::layout::{self, gdef, gpos, gsub, lookup, LayoutBuilder};
use crate::{tables, FontBuilder};

pub const UNITS_PER_EM: u16 = 1000;

/// Horizontal advance of every glyph, by id
pub const ADVANCES: [u16; COUNT as usize] = [
    500, // .notdef
    250, // space
    600, // A
    600, // V
    300, // f
    250, // i
    500, // f_i
    750, // f_f_i
    500, // a
    200, // acute
    200, // grave
    400, // beh
    350, // beh.init
    300, // beh.medi
    450, // beh.fina
    200, // alef
    220, // alef.fina
    550, // ka
    250, // i-matra
    520, // x
];

pub fn advance(glyph: u16) -> i32 {
    ADVANCES[glyph as usize] as i32
}

const MAPPINGS: &[(char, u16)] = &[
    (' ', SPACE),
    ('A', A),
    ('V', V),
    ('f', F),
    ('i', I),
    ('a', A_LOWER),
    ('\u{0301}', ACUTE),
    ('\u{0300}', GRAVE),
    ('\u{0628}', BEH),
    ('\u{0627}', ALEF),
    ('\u{0915}', KA),
    ('\u{093F}', I_MATRA),
    ('x', X),
];

/// Tables every font carries
pub fn base() -> FontBuilder {
    let metrics: Vec<(u16, i16)> = ADVANCES.iter().map(|&advance| (advance, 0)).collect();
    FontBuilder::new()
        .table(b"head", tables::head(UNITS_PER_EM))
        .table(b"hhea", tables::hhea(800, -200, COUNT))
        .table(b"maxp", tables::maxp(COUNT))
        .table(b"hmtx", tables::long_metrics(&metrics))
        .table(b"cmap", tables::cmap4(MAPPINGS))
}

/// No layout tables
pub fn simple() -> Vec<u8> {
    base().build()
}

/// `simple` plus vhea / vmtx with a 900 unit vertical advance
pub fn vertical() -> Vec<u8> {
    let metrics = vec![(900u16, 100i16); COUNT as usize];
    base()
        .table(b"vhea", tables::vhea(500, -500, COUNT))
        .table(b"vmtx", tables::long_metrics(&metrics))
        .build()
}

/// Outline bounds of A: x_min, y_min, x_max, y_max
pub const A_BOUNDS: [i16; 4] = [-10, 0, 590, 700];

/// `simple` plus glyf / loca with outlines for A and V only
pub fn outlines() -> Vec<u8> {
    let mut boxes = vec![None; COUNT as usize];
    boxes[A as usize] = Some(A_BOUNDS);
    boxes[V as usize] = Some([0, 0, 600, 700]);
    let (glyf, loca) = tables::glyf_loca(&boxes);
    base().table(b"glyf", glyf).table(b"loca", loca).build()
}

/// Kerning lookup: -80 between A and V by glyph pair, -40 between V and A
/// by class. Both subtables sit behind extension subtables.
pub fn kerning_gpos() -> Vec<u8> {
    LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"kern", &[0])
        .lookup(lookup(
            gpos::EXTENSION,
            0,
            vec![
                layout::extension(gpos::PAIR, gpos::pair(&[(A, V, -80)])),
                layout::extension(gpos::PAIR, gpos::pair_classes(&[V], &[A], -40)),
            ],
        ))
        .build()
}

pub fn kerning() -> Vec<u8> {
    base().table(b"GPOS", kerning_gpos()).build()
}

/// `liga`: f f i and f i
pub fn ligature() -> Vec<u8> {
    let gsub = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"liga", &[0])
        .lookup(lookup(
            gsub::LIGATURE,
            0,
            vec![gsub::ligature(&[(&[F, F, I], F_F_I), (&[F, I], F_I)])],
        ))
        .build();
    let classes = [
        (F, layout::BASE),
        (I, layout::BASE),
        (F_I, layout::LIGATURE),
        (F_F_I, layout::LIGATURE),
    ];
    base()
        .table(b"GDEF", gdef(&classes, &[], &[]))
        .table(b"GSUB", gsub)
        .build()
}

/// Mark anchor on `a` and `A`
pub const BASE_ANCHOR_A_LOWER: (i16, i16) = (250, 600);
pub const BASE_ANCHOR_A: (i16, i16) = (300, 700);
/// Anchor of both combining marks
pub const MARK_ANCHOR: (i16, i16) = (100, 500);
/// Anchor on the grave for stacking a second mark
pub const MARK2_ANCHOR: (i16, i16) = (100, 900);

/// GDEF classes, `mark` attachment of the two accents to `a` / `A`
/// and `mkmk` stacking of acute on grave
pub fn mark() -> Vec<u8> {
    let classes = [
        (A, layout::BASE),
        (A_LOWER, layout::BASE),
        (ACUTE, layout::MARK),
        (GRAVE, layout::MARK),
    ];
    let gpos = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"mark", &[0])
        .feature(b"mkmk", &[1])
        .lookup(lookup(
            gpos::MARK_TO_BASE,
            0,
            vec![gpos::mark_to_base(
                &[(ACUTE, 0, MARK_ANCHOR), (GRAVE, 0, MARK_ANCHOR)],
                &[(A_LOWER, &[Some(BASE_ANCHOR_A_LOWER)]), (A, &[Some(BASE_ANCHOR_A)])],
            )],
        ))
        .lookup(lookup(
            gpos::MARK_TO_MARK,
            0,
            vec![gpos::mark_to_mark(&[(ACUTE, 0, MARK_ANCHOR)], &[(GRAVE, &[Some(MARK2_ANCHOR)])])],
        ))
        .build();
    base()
        .table(b"GDEF", gdef(&classes, &[], &[]))
        .table(b"GPOS", gpos)
        .build()
}

/// Positional forms for beh and alef under `init` / `medi` / `fina`
pub fn arabic() -> Vec<u8> {
    let gsub = LayoutBuilder::new(&[b"arab"])
        .feature(b"init", &[0])
        .feature(b"medi", &[1])
        .feature(b"fina", &[2])
        .lookup(lookup(gsub::SINGLE, 0, vec![gsub::single(&[(BEH, BEH_INIT)])]))
        .lookup(lookup(gsub::SINGLE, 0, vec![gsub::single(&[(BEH, BEH_MEDI)])]))
        .lookup(lookup(
            gsub::SINGLE,
            0,
            vec![gsub::single(&[(BEH, BEH_FINA), (ALEF, ALEF_FINA)])],
        ))
        .build();
    base().table(b"GSUB", gsub).build()
}

/// `ccmp` decomposes x into A V and deletes i; `salt` offers V and x as
/// alternates of A
pub fn multiple_subst() -> Vec<u8> {
    let gsub = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"ccmp", &[0])
        .feature(b"salt", &[1])
        .lookup(lookup(gsub::MULTIPLE, 0, vec![gsub::multiple(&[(X, &[A, V]), (I, &[])])]))
        .lookup(lookup(gsub::ALTERNATE, 0, vec![gsub::alternate(&[(A, &[V, X])])]))
        .build();
    base().table(b"GSUB", gsub).build()
}

/// `calt`: A becomes x when followed by V, through a nested single
/// substitution that no feature references directly
pub fn context() -> Vec<u8> {
    let gsub = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"calt", &[0])
        .lookup(lookup(
            gsub::CHAINED_CONTEXT,
            0,
            vec![gsub::chained_context(&[], &[&[A]], &[&[V]], &[(0, 1)])],
        ))
        .lookup(lookup(gsub::SINGLE, 0, vec![gsub::single(&[(A, X)])]))
        .build();
    base().table(b"GSUB", gsub).build()
}

/// A contextual lookup that invokes itself
pub fn recursive_context() -> Vec<u8> {
    let gsub = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"calt", &[0])
        .lookup(lookup(gsub::CONTEXT, 0, vec![gsub::context(&[&[A]], &[(0, 0)])]))
        .build();
    base().table(b"GSUB", gsub).build()
}

/// `calt` reverse chaining rule: A becomes V before V. Applied from
/// the end, so a run of A before V turns into V throughout.
pub fn reverse_chain() -> Vec<u8> {
    let gsub = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"calt", &[0])
        .lookup(lookup(gsub::REVERSE_CHAIN, 0, vec![gsub::reverse_chain(&[], &[&[V]], &[(A, V)])]))
        .build();
    base().table(b"GSUB", gsub).build()
}

/// Exit anchor of A and entry anchor of V in the first `curs` lookup
pub const CURSIVE_A_EXIT: (i16, i16) = (550, 100);
pub const CURSIVE_V_ENTRY: (i16, i16) = (50, 0);
/// Exit anchor of V and entry anchor of x in the right-to-left lookup
pub const CURSIVE_V_EXIT: (i16, i16) = (0, 200);
pub const CURSIVE_X_ENTRY: (i16, i16) = (520, 0);

/// Two `curs` lookups: A joins V, then V joins x with the
/// right-to-left flag set
pub fn cursive() -> Vec<u8> {
    let gpos = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"curs", &[0, 1])
        .lookup(lookup(
            gpos::CURSIVE,
            0,
            vec![gpos::cursive(&[
                (A, None, Some(CURSIVE_A_EXIT)),
                (V, Some(CURSIVE_V_ENTRY), None),
            ])],
        ))
        .lookup(lookup(
            gpos::CURSIVE,
            layout::flags::RIGHT_TO_LEFT,
            vec![gpos::cursive(&[
                (V, None, Some(CURSIVE_V_EXIT)),
                (X, Some(CURSIVE_X_ENTRY), None),
            ])],
        ))
        .build();
    base().table(b"GPOS", gpos).build()
}

/// Anchors of the two f_i components
pub const LIGATURE_ANCHORS: [(i16, i16); 2] = [(150, 700), (400, 700)];

/// `liga` f i ignoring marks, and `mark` placing the acute on either
/// component of f_i
pub fn mark_ligature() -> Vec<u8> {
    let classes = [
        (F, layout::BASE),
        (I, layout::BASE),
        (F_I, layout::LIGATURE),
        (ACUTE, layout::MARK),
    ];
    let gsub = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"liga", &[0])
        .lookup(lookup(
            gsub::LIGATURE,
            layout::flags::IGNORE_MARKS,
            vec![gsub::ligature(&[(&[F, I], F_I)])],
        ))
        .build();
    let components: [&[Option<gpos::Point>]; 2] = [&[Some(LIGATURE_ANCHORS[0])], &[Some(LIGATURE_ANCHORS[1])]];
    let ligatures: [(u16, &[&[Option<gpos::Point>]]); 1] = [(F_I, &components)];
    let gpos = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"mark", &[0])
        .lookup(lookup(
            gpos::MARK_TO_LIGATURE,
            0,
            vec![gpos::mark_to_ligature(&[(ACUTE, 0, MARK_ANCHOR)], &ligatures)],
        ))
        .build();
    base()
        .table(b"GDEF", gdef(&classes, &[], &[]))
        .table(b"GSUB", gsub)
        .table(b"GPOS", gpos)
        .build()
}

/// `calt`: a becomes A before x, looking past marks outside mark
/// glyph set 0 (which holds only the grave)
pub fn mark_filtering() -> Vec<u8> {
    let classes = [(A_LOWER, layout::BASE), (ACUTE, layout::MARK), (GRAVE, layout::MARK)];
    let gsub = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"calt", &[0])
        .lookup(layout::lookup_with_mark_set(
            gsub::CHAINED_CONTEXT,
            0,
            0,
            vec![gsub::chained_context(&[], &[&[A_LOWER]], &[&[X]], &[(0, 1)])],
        ))
        .lookup(lookup(gsub::SINGLE, 0, vec![gsub::single(&[(A_LOWER, A)])]))
        .build();
    base()
        .table(b"GDEF", gdef(&classes, &[], &[&[GRAVE]]))
        .table(b"GSUB", gsub)
        .build()
}

/// `locl` turns A into x, for Turkish only
pub fn localized() -> Vec<u8> {
    let gsub = LayoutBuilder::new(&[b"DFLT", b"latn"])
        .feature(b"locl", &[0])
        .default_features(&[])
        .language(b"TRK ", &[0])
        .lookup(lookup(gsub::SINGLE, 0, vec![gsub::single(&[(A, X)])]))
        .build();
    base().table(b"GSUB", gsub).build()
}

/// Kerning GPOS alongside a GSUB whose script list offset points past
/// the end of the table
pub fn corrupt_gsub() -> Vec<u8> {
    let gsub = crate::BeBuffer::new()
        .push(1u16)
        .push(0u16)
        .push(0xFFF0u16)
        .push(0u16)
        .push(0u16)
        .into_vec();
    base()
        .table(b"GSUB", gsub)
        .table(b"GPOS", kerning_gpos())
        .build()
}

/// Every table except cmap
pub fn no_cmap() -> Vec<u8> {
    base().without(b"cmap").build()
}

/// `simple` with a GDEF whose version is unsupported
pub fn bad_gdef() -> Vec<u8> {
    let gdef = crate::BeBuffer::new().push(2u16).push(0u16).into_vec();
    base().table(b"GDEF", gdef).build()
}
