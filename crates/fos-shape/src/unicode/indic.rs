//! Indic syllables
//!
//! Character categories, syllable segmentation and pre-base matra
//! reordering for the nine major Brahmic scripts. The blocks share the
//! ISCII-derived layout, so categories are read from the offset inside
//! the 128-codepoint block.

use std::ops::Range;

/// Indic character category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicCategory {
    Consonant,
    /// Ra, which can form a reph
    Ra,
    /// Independent vowel
    Vowel,
    /// Dependent vowel sign
    Matra,
    Nukta,
    /// Virama
    Halant,
    /// Candrabindu, anusvara, visarga
    Modifier,
    Number,
    /// Zero width joiner / non-joiner
    Joiner,
    Other,
}

/// Start of the Devanagari..Malayalam blocks
const FIRST_BLOCK: u32 = 0x0900;
const LAST_BLOCK: u32 = 0x0D7F;

/// Get Indic character category
pub fn indic_category(c: char) -> IndicCategory {
    let code = c as u32;
    if matches!(code, 0x200C | 0x200D) {
        return IndicCategory::Joiner;
    }
    if !(FIRST_BLOCK..=LAST_BLOCK).contains(&code) {
        return IndicCategory::Other;
    }

    let block = code & !0x7F;
    match code & 0x7F {
        0x01..=0x03 => IndicCategory::Modifier,
        0x04..=0x14 => IndicCategory::Vowel,
        // Tamil ra does not form a reph
        0x30 if block != 0x0B80 => IndicCategory::Ra,
        0x15..=0x39 | 0x58..=0x5F => IndicCategory::Consonant,
        0x3C => IndicCategory::Nukta,
        0x3E..=0x4C | 0x4E..=0x4F | 0x55..=0x57 | 0x62..=0x63 => IndicCategory::Matra,
        0x4D => IndicCategory::Halant,
        0x66..=0x6F => IndicCategory::Number,
        _ => IndicCategory::Other,
    }
}

/// Dependent vowels written to the left of the consonant cluster
pub fn is_pre_base_matra(c: char) -> bool {
    matches!(
        c as u32,
        0x093F | 0x094E // Devanagari
            | 0x09BF | 0x09C7 | 0x09C8 // Bengali
            | 0x0A3F // Gurmukhi
            | 0x0ABF // Gujarati
            | 0x0B47 // Oriya
            | 0x0BC6..=0x0BC8 // Tamil
            | 0x0D46..=0x0D48 // Malayalam
    )
}

/// Split a run into syllables. Every character belongs to exactly one
/// returned range; non-Indic characters form single-character ranges.
///
/// Consonant syllable: `(C N? H ZWJ?)* C N? M* Modifier*`, also started
/// by an independent vowel.
pub fn syllables(chars: &[char]) -> Vec<Range<usize>> {
    let cats: Vec<IndicCategory> = chars.iter().map(|&c| indic_category(c)).collect();
    let is_consonant = |i: usize| matches!(cats.get(i), Some(IndicCategory::Consonant | IndicCategory::Ra));
    let is = |i: usize, cat: IndicCategory| cats.get(i) == Some(&cat);

    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let start = i;
        if is_consonant(i) {
            i += 1;
            loop {
                if is(i, IndicCategory::Nukta) {
                    i += 1;
                }
                if is(i, IndicCategory::Halant) {
                    i += 1;
                    if is(i, IndicCategory::Joiner) {
                        i += 1;
                    }
                    if is_consonant(i) {
                        i += 1;
                        continue;
                    }
                }
                break;
            }
        } else if is(i, IndicCategory::Vowel) {
            i += 1;
            if is(i, IndicCategory::Nukta) {
                i += 1;
            }
        } else {
            out.push(start..start + 1);
            i += 1;
            continue;
        }

        while is(i, IndicCategory::Matra) || is(i, IndicCategory::Nukta) {
            i += 1;
        }
        while is(i, IndicCategory::Modifier) {
            i += 1;
        }
        out.push(start..i);
    }
    out
}

/// Reordering of one syllable: `(from, to)` moves the character at `from`
/// to position `to`. Only pre-base matras move, to the syllable start.
pub fn pre_base_moves(chars: &[char], syllable: Range<usize>) -> Vec<(usize, usize)> {
    let base_is_consonant = syllable
        .clone()
        .next()
        .is_some_and(|i| matches!(indic_category(chars[i]), IndicCategory::Consonant | IndicCategory::Ra));
    if !base_is_consonant {
        return Vec::new();
    }
    syllable
        .clone()
        .filter(|&i| i > syllable.start && is_pre_base_matra(chars[i]))
        .map(|i| (i, syllable.start))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(indic_category('क'), IndicCategory::Consonant);
        assert_eq!(indic_category('र'), IndicCategory::Ra);
        assert_eq!(indic_category('\u{093F}'), IndicCategory::Matra);
        assert_eq!(indic_category('\u{094D}'), IndicCategory::Halant);
        assert_eq!(indic_category('\u{0902}'), IndicCategory::Modifier);
        assert_eq!(indic_category('অ'), IndicCategory::Vowel);
        assert_eq!(indic_category('\u{0BB0}'), IndicCategory::Consonant);
        assert_eq!(indic_category('a'), IndicCategory::Other);
    }

    #[test]
    fn test_syllables() {
        // ka, ki (ka + i-matra), kSa (ka halant ssa) + i-matra
        let text: Vec<char> = "क कि क्षि".chars().collect();
        let syl = syllables(&text);
        assert_eq!(syl, vec![0..1, 1..2, 2..4, 4..5, 5..9]);
    }

    #[test]
    fn test_pre_base_matra_moves_to_start() {
        let text: Vec<char> = "क्षि".chars().collect();
        assert_eq!(pre_base_moves(&text, 0..4), vec![(3, 0)]);
        // A lone matra has no base to move over
        assert!(pre_base_moves(&['\u{093F}'], 0..1).is_empty());
    }
}
