//! Scripts, languages and directions
//!
//! Script detection by codepoint block, OpenType script and language
//! tags, and text direction.

use std::fmt;
use std::str::FromStr;

use crate::tag::Tag;

/// Unicode script, stored as its ISO 15924 code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum Script {
    /// Punctuation, digits, symbols
    Common = tag(b"Zyyy"),
    /// Combining marks that take the script of their base
    Inherited = tag(b"Zinh"),
    Latin = tag(b"Latn"),
    Greek = tag(b"Grek"),
    Cyrillic = tag(b"Cyrl"),
    Armenian = tag(b"Armn"),
    Hebrew = tag(b"Hebr"),
    Arabic = tag(b"Arab"),
    Syriac = tag(b"Syrc"),
    Thaana = tag(b"Thaa"),
    Nko = tag(b"Nkoo"),
    Mandaic = tag(b"Mand"),
    Devanagari = tag(b"Deva"),
    Bengali = tag(b"Beng"),
    Gurmukhi = tag(b"Guru"),
    Gujarati = tag(b"Gujr"),
    Oriya = tag(b"Orya"),
    Tamil = tag(b"Taml"),
    Telugu = tag(b"Telu"),
    Kannada = tag(b"Knda"),
    Malayalam = tag(b"Mlym"),
    Sinhala = tag(b"Sinh"),
    Thai = tag(b"Thai"),
    Lao = tag(b"Laoo"),
    Tibetan = tag(b"Tibt"),
    Myanmar = tag(b"Mymr"),
    Georgian = tag(b"Geor"),
    Hangul = tag(b"Hang"),
    Ethiopic = tag(b"Ethi"),
    Khmer = tag(b"Khmr"),
    Mongolian = tag(b"Mong"),
    Hiragana = tag(b"Hira"),
    Katakana = tag(b"Kana"),
    Bopomofo = tag(b"Bopo"),
    /// Han (CJK ideographs)
    Han = tag(b"Hani"),
    Yi = tag(b"Yiii"),
}

const fn tag(bytes: &[u8; 4]) -> u32 {
    Tag::new(bytes).0
}

const ALL_SCRIPTS: &[Script] = &[
    Script::Common,
    Script::Inherited,
    Script::Latin,
    Script::Greek,
    Script::Cyrillic,
    Script::Armenian,
    Script::Hebrew,
    Script::Arabic,
    Script::Syriac,
    Script::Thaana,
    Script::Nko,
    Script::Mandaic,
    Script::Devanagari,
    Script::Bengali,
    Script::Gurmukhi,
    Script::Gujarati,
    Script::Oriya,
    Script::Tamil,
    Script::Telugu,
    Script::Kannada,
    Script::Malayalam,
    Script::Sinhala,
    Script::Thai,
    Script::Lao,
    Script::Tibetan,
    Script::Myanmar,
    Script::Georgian,
    Script::Hangul,
    Script::Ethiopic,
    Script::Khmer,
    Script::Mongolian,
    Script::Hiragana,
    Script::Katakana,
    Script::Bopomofo,
    Script::Han,
    Script::Yi,
];

impl Script {
    /// ISO 15924 code as a tag (`Latn`, `Arab`, ...)
    pub fn iso_tag(self) -> Tag {
        Tag(self as u32)
    }

    /// Get script from Unicode codepoint
    pub fn of(c: char) -> Self {
        match c as u32 {
            0x0041..=0x005A | 0x0061..=0x007A | 0x00AA | 0x00BA => Script::Latin,
            0x00C0..=0x00D6 | 0x00D8..=0x00F6 | 0x00F8..=0x024F => Script::Latin,
            0x1E00..=0x1EFF | 0x2C60..=0x2C7F | 0xA720..=0xA7FF | 0xAB30..=0xAB6F => Script::Latin,
            0xFB00..=0xFB06 | 0xFF21..=0xFF3A | 0xFF41..=0xFF5A => Script::Latin,

            0x0300..=0x036F | 0x0485..=0x0486 | 0x064B..=0x0655 | 0x0670 => Script::Inherited,
            0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x200C..=0x200D => Script::Inherited,
            0x20D0..=0x20FF | 0xFE00..=0xFE0F | 0xFE20..=0xFE2F => Script::Inherited,
            0xE0100..=0xE01EF => Script::Inherited,

            0x0370..=0x0373 | 0x0375..=0x037D | 0x037F..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
            0x0400..=0x0484 | 0x0487..=0x052F | 0x1C80..=0x1C8F => Script::Cyrillic,
            0x2DE0..=0x2DFF | 0xA640..=0xA69F => Script::Cyrillic,
            0x0531..=0x058F | 0xFB13..=0xFB17 => Script::Armenian,
            0x0591..=0x05FF | 0xFB1D..=0xFB4F => Script::Hebrew,

            0x060C | 0x061B | 0x061F | 0x0640 => Script::Common,
            0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF => Script::Arabic,
            0xFB50..=0xFDFF | 0xFE70..=0xFEFC => Script::Arabic,
            0x0700..=0x074F | 0x0860..=0x086F => Script::Syriac,
            0x0780..=0x07BF => Script::Thaana,
            0x07C0..=0x07FF => Script::Nko,
            0x0840..=0x085F => Script::Mandaic,

            0x0964..=0x0965 => Script::Common,
            0x0900..=0x097F | 0xA8E0..=0xA8FF => Script::Devanagari,
            0x0980..=0x09FF => Script::Bengali,
            0x0A00..=0x0A7F => Script::Gurmukhi,
            0x0A80..=0x0AFF => Script::Gujarati,
            0x0B00..=0x0B7F => Script::Oriya,
            0x0B80..=0x0BFF => Script::Tamil,
            0x0C00..=0x0C7F => Script::Telugu,
            0x0C80..=0x0CFF => Script::Kannada,
            0x0D00..=0x0D7F => Script::Malayalam,
            0x0D80..=0x0DFF => Script::Sinhala,
            0x0E01..=0x0E3A | 0x0E40..=0x0E5B => Script::Thai,
            0x0E80..=0x0EFF => Script::Lao,
            0x0F00..=0x0FFF => Script::Tibetan,
            0x1000..=0x109F | 0xAA60..=0xAA7F => Script::Myanmar,
            0x10A0..=0x10FF | 0x2D00..=0x2D2F => Script::Georgian,
            0x1100..=0x11FF | 0x3131..=0x318E | 0xA960..=0xA97F => Script::Hangul,
            0xAC00..=0xD7A3 | 0xD7B0..=0xD7FF => Script::Hangul,
            0x1200..=0x139F | 0x2D80..=0x2DDF | 0xAB00..=0xAB2F => Script::Ethiopic,
            0x1780..=0x17FF | 0x19E0..=0x19FF => Script::Khmer,
            0x1800..=0x1801 | 0x1804 | 0x1806..=0x18AF => Script::Mongolian,

            0x3041..=0x3096 | 0x309D..=0x309F | 0x1B001..=0x1B11F => Script::Hiragana,
            0x30A1..=0x30FA | 0x30FD..=0x30FF | 0x31F0..=0x31FF | 0xFF66..=0xFF6F => Script::Katakana,
            0xFF71..=0xFF9D => Script::Katakana,
            0x3105..=0x312F | 0x31A0..=0x31BF => Script::Bopomofo,
            0x2E80..=0x2FD5 | 0x3005 | 0x3007 | 0x3021..=0x3029 | 0x3038..=0x303B => Script::Han,
            0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF => Script::Han,
            0x20000..=0x2FA1F | 0x30000..=0x3134F => Script::Han,
            0xA000..=0xA4CF => Script::Yi,

            _ => Script::Common,
        }
    }

    /// Written right to left
    pub fn is_rtl(self) -> bool {
        matches!(
            self,
            Script::Arabic | Script::Hebrew | Script::Syriac | Script::Thaana | Script::Nko | Script::Mandaic
        )
    }

    /// Uses cursive joining (Arabic shaping)
    pub fn is_joining(self) -> bool {
        matches!(
            self,
            Script::Arabic | Script::Syriac | Script::Nko | Script::Mandaic | Script::Mongolian
        )
    }

    /// Brahmic script handled by Indic reordering
    pub fn is_indic(self) -> bool {
        matches!(
            self,
            Script::Devanagari
                | Script::Bengali
                | Script::Gurmukhi
                | Script::Gujarati
                | Script::Oriya
                | Script::Tamil
                | Script::Telugu
                | Script::Kannada
                | Script::Malayalam
        )
    }

    /// True for Common and Inherited
    pub fn is_neutral(self) -> bool {
        matches!(self, Script::Common | Script::Inherited)
    }

    /// OpenType script tags to try, most specific first. Indic scripts
    /// prefer their version 2 tags.
    pub fn ot_tags(self) -> &'static [Tag] {
        match self {
            Script::Common | Script::Inherited => &[],
            Script::Latin => const { &[Tag::new(b"latn")] },
            Script::Greek => const { &[Tag::new(b"grek")] },
            Script::Cyrillic => const { &[Tag::new(b"cyrl")] },
            Script::Armenian => const { &[Tag::new(b"armn")] },
            Script::Hebrew => const { &[Tag::new(b"hebr")] },
            Script::Arabic => const { &[Tag::new(b"arab")] },
            Script::Syriac => const { &[Tag::new(b"syrc")] },
            Script::Thaana => const { &[Tag::new(b"thaa")] },
            Script::Nko => const { &[Tag::new(b"nko ")] },
            Script::Mandaic => const { &[Tag::new(b"mand")] },
            Script::Devanagari => const { &[Tag::new(b"dev2"), Tag::new(b"deva")] },
            Script::Bengali => const { &[Tag::new(b"bng2"), Tag::new(b"beng")] },
            Script::Gurmukhi => const { &[Tag::new(b"gur2"), Tag::new(b"guru")] },
            Script::Gujarati => const { &[Tag::new(b"gjr2"), Tag::new(b"gujr")] },
            Script::Oriya => const { &[Tag::new(b"ory2"), Tag::new(b"orya")] },
            Script::Tamil => const { &[Tag::new(b"tml2"), Tag::new(b"taml")] },
            Script::Telugu => const { &[Tag::new(b"tel2"), Tag::new(b"telu")] },
            Script::Kannada => const { &[Tag::new(b"knd2"), Tag::new(b"knda")] },
            Script::Malayalam => const { &[Tag::new(b"mlm2"), Tag::new(b"mlym")] },
            Script::Sinhala => const { &[Tag::new(b"sinh")] },
            Script::Thai => const { &[Tag::new(b"thai")] },
            Script::Lao => const { &[Tag::new(b"lao ")] },
            Script::Tibetan => const { &[Tag::new(b"tibt")] },
            Script::Myanmar => const { &[Tag::new(b"mym2"), Tag::new(b"mymr")] },
            Script::Georgian => const { &[Tag::new(b"geor")] },
            Script::Hangul => const { &[Tag::new(b"hang")] },
            Script::Ethiopic => const { &[Tag::new(b"ethi")] },
            Script::Khmer => const { &[Tag::new(b"khmr")] },
            Script::Mongolian => const { &[Tag::new(b"mong")] },
            Script::Hiragana | Script::Katakana => const { &[Tag::new(b"kana")] },
            Script::Bopomofo => const { &[Tag::new(b"bopo")] },
            Script::Han => const { &[Tag::new(b"hani")] },
            Script::Yi => const { &[Tag::new(b"yi  ")] },
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.iso_tag())
    }
}

/// Error for unknown script codes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown script {0:?}")]
pub struct UnknownScript(pub String);

impl FromStr for Script {
    type Err = UnknownScript;

    /// Parse an ISO 15924 code, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase();
        ALL_SCRIPTS
            .iter()
            .copied()
            .find(|script| script.iso_tag().to_lowercase().to_string() == wanted)
            .ok_or_else(|| UnknownScript(s.to_string()))
    }
}

/// BCP 47 language tag, stored lowercased
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Language(String);

impl Language {
    /// Create from a BCP 47 tag such as `en-US` or `zh-Hant`
    pub fn from_bcp47(tag: &str) -> Self {
        Self(tag.trim().replace('_', "-").to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or("")
    }

    /// OpenType language system tag, if known
    pub fn ot_tag(&self) -> Option<Tag> {
        let tag = match self.primary() {
            "ar" => b"ARA ",
            "bn" => b"BEN ",
            "de" => b"DEU ",
            "el" => b"ELL ",
            "en" => b"ENG ",
            "es" => b"ESP ",
            "fa" => b"FAR ",
            "fr" => b"FRA ",
            "gu" => b"GUJ ",
            "he" => b"IWR ",
            "hi" => b"HIN ",
            "ja" => b"JAN ",
            "kn" => b"KAN ",
            "ko" => b"KOR ",
            "ml" => b"MAL ",
            "mr" => b"MAR ",
            "ne" => b"NEP ",
            "pa" => b"PAN ",
            "ru" => b"RUS ",
            "sa" => b"SAN ",
            "sr" => b"SRB ",
            "ta" => b"TAM ",
            "te" => b"TEL ",
            "tr" => b"TRK ",
            "ur" => b"URD ",
            "vi" => b"VIT ",
            "zh" => {
                let traditional = ["hant", "tw", "hk", "mo"];
                if self.0.split('-').skip(1).any(|sub| traditional.contains(&sub)) {
                    b"ZHT "
                } else {
                    b"ZHS "
                }
            }
            _ => return None,
        };
        Some(Tag::new(tag))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_bcp47(s))
    }
}

/// Text direction. `Invalid` means "not set yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Invalid,
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Direction {
    pub fn is_valid(self) -> bool {
        self != Direction::Invalid
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::TopToBottom | Direction::BottomToTop)
    }

    /// Glyphs are emitted in reverse logical order
    pub fn is_backward(self) -> bool {
        matches!(self, Direction::RightToLeft | Direction::BottomToTop)
    }

    pub fn is_forward(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::TopToBottom)
    }

    /// Default direction of a script
    pub fn from_script(script: Script) -> Self {
        if script.is_rtl() {
            Direction::RightToLeft
        } else {
            Direction::LeftToRight
        }
    }
}

/// Error for unknown direction names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction {0:?}")]
pub struct UnknownDirection(pub String);

impl FromStr for Direction {
    type Err = UnknownDirection;

    /// Accepts `ltr`, `rtl`, `ttb`, `btt` (first letter is enough)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().chars().next() {
            Some('l') => Ok(Direction::LeftToRight),
            Some('r') => Ok(Direction::RightToLeft),
            Some('t') => Ok(Direction::TopToBottom),
            Some('b') => Ok(Direction::BottomToTop),
            _ => Err(UnknownDirection(s.to_string())),
        }
    }
}
