//! Arabic joining
//!
//! Joining analysis for Arabic and the other cursive scripts: every
//! joining letter gets the positional form (`isol`, `init`, `medi`,
//! `fina`) that the plan later turns into a feature mask.

use crate::tag::Tag;

/// Unicode joining type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoiningType {
    /// Joins on the right side only (with the previous letter)
    Right,
    /// Joins on the left side only (with the next letter)
    Left,
    /// Joins on both sides
    Dual,
    /// Forces joining without joining itself (ZWJ, tatweel)
    Causing,
    #[default]
    NonJoining,
    /// Marks; invisible to joining
    Transparent,
}

/// Arabic positional form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionalForm {
    Isolated,
    Initial,
    Medial,
    Final,
}

impl PositionalForm {
    pub const ALL: [PositionalForm; 4] = [
        PositionalForm::Isolated,
        PositionalForm::Initial,
        PositionalForm::Medial,
        PositionalForm::Final,
    ];

    /// OpenType feature selecting this form
    pub fn feature_tag(self) -> Tag {
        match self {
            PositionalForm::Isolated => Tag::new(b"isol"),
            PositionalForm::Initial => Tag::new(b"init"),
            PositionalForm::Medial => Tag::new(b"medi"),
            PositionalForm::Final => Tag::new(b"fina"),
        }
    }
}

/// Get joining type for a character
pub fn joining_type(c: char) -> JoiningType {
    let code = c as u32;
    match code {
        0x0622..=0x0625 | 0x0627 | 0x0629 | 0x062F..=0x0632 | 0x0648 => JoiningType::Right,
        0x0671..=0x0673 | 0x0675..=0x0677 | 0x0688..=0x0699 => JoiningType::Right,
        0x06C0 | 0x06C3..=0x06CB | 0x06CD | 0x06CF | 0x06D2..=0x06D3 | 0x06D5 => JoiningType::Right,
        0x06EE..=0x06EF | 0x0710 | 0x0715..=0x0719 | 0x071E | 0x0728 | 0x072A | 0x072C => JoiningType::Right,

        0x0626 | 0x0628 | 0x062A..=0x062E | 0x0633..=0x063F => JoiningType::Dual,
        0x0641..=0x0647 | 0x0649..=0x064A | 0x066E..=0x066F => JoiningType::Dual,
        0x0678..=0x0687 | 0x069A..=0x06BF | 0x06C1..=0x06C2 | 0x06CC | 0x06CE => JoiningType::Dual,
        0x06D0..=0x06D1 | 0x06FA..=0x06FC | 0x06FF | 0x0750..=0x077F => JoiningType::Dual,
        0x08A0..=0x08A9 | 0x08AF..=0x08B0 | 0x08B3..=0x08B4 | 0x08B6..=0x08C7 => JoiningType::Dual,
        0x0712..=0x0714 | 0x071A..=0x071D | 0x071F..=0x0727 | 0x0729 | 0x072B => JoiningType::Dual,
        0x072D..=0x072F | 0x074E..=0x074F | 0x07CA..=0x07EA | 0x0840..=0x0858 => JoiningType::Dual,
        0x1820..=0x1878 | 0x1887..=0x18A8 | 0x18AA => JoiningType::Dual,

        0x0640 | 0x07FA | 0x180A | 0x200D => JoiningType::Causing,

        0x0610..=0x061A | 0x064B..=0x065F | 0x0670 | 0x06D6..=0x06DC => JoiningType::Transparent,
        0x06DF..=0x06E4 | 0x06E7..=0x06E8 | 0x06EA..=0x06ED => JoiningType::Transparent,
        0x0711 | 0x0730..=0x074A | 0x07EB..=0x07F3 | 0x07FD | 0x0859..=0x085B => JoiningType::Transparent,
        0x08D3..=0x08E1 | 0x08E3..=0x08FF | 0x180B..=0x180D | 0x200B => JoiningType::Transparent,
        0xFE00..=0xFE0F => JoiningType::Transparent,

        _ => JoiningType::NonJoining,
    }
}

/// Resolve positional forms for a run of characters.
///
/// Letters that take part in joining get `Some(form)`; transparent,
/// causing and non-joining characters get `None`.
pub fn positional_forms(chars: &[char]) -> Vec<Option<PositionalForm>> {
    let types: Vec<JoiningType> = chars.iter().map(|&c| joining_type(c)).collect();

    (0..types.len())
        .map(|i| {
            let joins_prev = || neighbour(types[..i].iter().rev())
                .is_some_and(|t| matches!(t, JoiningType::Dual | JoiningType::Left | JoiningType::Causing));
            let joins_next = || neighbour(types[i + 1..].iter())
                .is_some_and(|t| matches!(t, JoiningType::Dual | JoiningType::Right | JoiningType::Causing));

            match types[i] {
                JoiningType::Right => Some(if joins_prev() {
                    PositionalForm::Final
                } else {
                    PositionalForm::Isolated
                }),
                JoiningType::Left => Some(if joins_next() {
                    PositionalForm::Initial
                } else {
                    PositionalForm::Isolated
                }),
                JoiningType::Dual => Some(match (joins_prev(), joins_next()) {
                    (true, true) => PositionalForm::Medial,
                    (true, false) => PositionalForm::Final,
                    (false, true) => PositionalForm::Initial,
                    (false, false) => PositionalForm::Isolated,
                }),
                _ => None,
            }
        })
        .collect()
}

/// First non-transparent joining type in `types`
fn neighbour<'a>(mut types: impl Iterator<Item = &'a JoiningType>) -> Option<JoiningType> {
    types.find(|t| **t != JoiningType::Transparent).copied()
}
