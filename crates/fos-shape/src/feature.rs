//! OpenType feature settings
//!
//! A feature record turns a font feature on, off or to an alternate index
//! over a range of clusters.

use std::fmt;
use std::str::FromStr;

use crate::tag::Tag;

/// Feature setting for a cluster range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Feature {
    pub tag: Tag,
    /// 0 disables, 1 enables, >1 selects an alternate
    pub value: u32,
    pub start: u32,
    pub end: u32,
}

impl Feature {
    pub const GLOBAL_START: u32 = 0;
    pub const GLOBAL_END: u32 = u32::MAX;

    /// Feature over the whole buffer
    pub fn new(tag: Tag, value: u32) -> Self {
        Self::with_range(tag, value, Self::GLOBAL_START, Self::GLOBAL_END)
    }

    /// Feature over clusters `start..end`
    pub fn with_range(tag: Tag, value: u32, start: u32, end: u32) -> Self {
        Self { tag, value, start, end }
    }

    pub fn is_global(&self) -> bool {
        self.start == Self::GLOBAL_START && self.end == Self::GLOBAL_END
    }

    /// Whether the feature covers a cluster
    pub fn covers(&self, cluster: u32) -> bool {
        self.start <= cluster && cluster < self.end
    }
}

impl PartialOrd for Feature {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Feature {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.tag, self.start, self.end, self.value).cmp(&(other.tag, other.start, other.end, other.value))
    }
}

/// Error for malformed feature strings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid feature string {0:?}")]
pub struct FeatureParseError(pub String);

impl FromStr for Feature {
    type Err = FeatureParseError;

    /// Parse `[+|-]tag[[start:end]][=value]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || FeatureParseError(s.to_string());
        let mut rest = s.trim();

        let mut value = 1;
        if let Some(r) = rest.strip_prefix('-') {
            value = 0;
            rest = r;
        } else if let Some(r) = rest.strip_prefix('+') {
            rest = r;
        }

        let tag_len = rest
            .find(|c: char| c == '[' || c == '=')
            .unwrap_or(rest.len());
        let (tag_str, mut rest) = rest.split_at(tag_len);
        let tag_str = tag_str.trim().trim_matches(|c| c == '"' || c == '\'');
        if tag_str.is_empty() || tag_str.len() > 4 || !tag_str.is_ascii() {
            return Err(err());
        }
        let tag = Tag::from_bytes_padded(tag_str.as_bytes());

        let (mut start, mut end) = (Self::GLOBAL_START, Self::GLOBAL_END);
        if let Some(r) = rest.strip_prefix('[') {
            let close = r.find(']').ok_or_else(err)?;
            let range = &r[..close];
            rest = &r[close + 1..];

            let parse_bound = |b: &str| b.trim().parse::<u32>().map_err(|_| err());
            match range.split_once(':') {
                Some((a, b)) => {
                    if !a.trim().is_empty() {
                        start = parse_bound(a)?;
                    }
                    if !b.trim().is_empty() {
                        end = parse_bound(b)?;
                    }
                }
                None if range.trim().is_empty() => {}
                None => {
                    start = parse_bound(range)?;
                    end = start.checked_add(1).ok_or_else(err)?;
                }
            }
        }

        if let Some(r) = rest.strip_prefix('=') {
            value = match r.trim() {
                "on" | "true" => 1,
                "off" | "false" => 0,
                v => v.parse().map_err(|_| err())?,
            };
            rest = "";
        }

        if !rest.trim().is_empty() {
            return Err(err());
        }
        Ok(Self { tag, value, start, end })
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value == 0 {
            f.write_str("-")?;
        }
        write!(f, "{}", self.tag.to_string().trim_end())?;
        if !self.is_global() {
            f.write_str("[")?;
            if self.start != Self::GLOBAL_START {
                write!(f, "{}", self.start)?;
            }
            if self.end != self.start.wrapping_add(1) || self.start == Self::GLOBAL_START {
                f.write_str(":")?;
                if self.end != Self::GLOBAL_END {
                    write!(f, "{}", self.end)?;
                }
            }
            f.write_str("]")?;
        }
        if self.value > 1 {
            write!(f, "={}", self.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Feature {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_simple() {
        assert_eq!(parse("kern"), Feature::new(Tag::new(b"kern"), 1));
        assert_eq!(parse("+liga"), Feature::new(Tag::new(b"liga"), 1));
        assert_eq!(parse("-kern"), Feature::new(Tag::new(b"kern"), 0));
        assert_eq!(parse("kern=0"), Feature::new(Tag::new(b"kern"), 0));
        assert_eq!(parse("aalt=2"), Feature::new(Tag::new(b"aalt"), 2));
        assert_eq!(parse("ss"), Feature::new(Tag::new(b"ss  "), 1));
    }

    #[test]
    fn test_parse_ranges() {
        assert_eq!(parse("liga[3:5]"), Feature::with_range(Tag::new(b"liga"), 1, 3, 5));
        assert_eq!(parse("liga[3]"), Feature::with_range(Tag::new(b"liga"), 1, 3, 4));
        assert_eq!(parse("kern[:5]=0"), Feature::with_range(Tag::new(b"kern"), 0, 0, 5));
        assert_eq!(parse("kern[3:]"), Feature::with_range(Tag::new(b"kern"), 1, 3, u32::MAX));
        assert!(parse("kern[]").is_global());
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Feature>().is_err());
        assert!("toolong".parse::<Feature>().is_err());
        assert!("kern[3".parse::<Feature>().is_err());
        assert!("kern=x".parse::<Feature>().is_err());
        assert!("kern]".parse::<Feature>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["kern", "-kern", "aalt=2", "liga[3:5]", "liga[3]", "-kern[:5]", "kern[3:]"] {
            assert_eq!(parse(s).to_string(), s);
        }
    }

    #[test]
    fn test_covers() {
        let f = Feature::with_range(Tag::new(b"liga"), 1, 3, 5);
        assert!(!f.covers(2));
        assert!(f.covers(3));
        assert!(!f.covers(5));
        assert!(Feature::new(Tag::new(b"liga"), 1).covers(u32::MAX - 1));
    }
}
