//! Header, metrics and cmap tables

use crate::{BeBuffer, Subtable};

/// `head` with the given units-per-em and short loca offsets
pub fn head(units_per_em: u16) -> Vec<u8> {
    BeBuffer::new()
        .push(0x0001_0000u32) // version
        .push(0x0001_0000u32) // font revision
        .push(0u32) // checksum adjustment
        .push(0x5F0F_3CF5u32) // magic
        .push(0u16) // flags
        .push(units_per_em)
        .extend([0u32; 4]) // created, modified
        .extend([0i16, -200, 1000, 800]) // bounding box
        .push(0u16) // mac style
        .push(8u16) // lowest rec ppem
        .push(2i16) // direction hint
        .push(0i16) // index to loc format
        .push(0i16) // glyph data format
        .into_vec()
}

fn metrics_header(version: u32, ascender: i16, descender: i16, long_metrics: u16) -> Vec<u8> {
    BeBuffer::new()
        .push(version)
        .push(ascender)
        .push(descender)
        .push(0i16) // line gap
        .push(1000u16) // advance max
        .extend([0i16; 3]) // min side bearings, max extent
        .extend([1i16, 0, 0]) // caret slope rise / run, caret offset
        .extend([0i16; 4]) // reserved
        .push(0i16) // metric data format
        .push(long_metrics)
        .into_vec()
}

pub fn hhea(ascender: i16, descender: i16, long_metrics: u16) -> Vec<u8> {
    metrics_header(0x0001_0000, ascender, descender, long_metrics)
}

pub fn vhea(ascender: i16, descender: i16, long_metrics: u16) -> Vec<u8> {
    metrics_header(0x0001_1000, ascender, descender, long_metrics)
}

pub fn maxp(num_glyphs: u16) -> Vec<u8> {
    BeBuffer::new().push(0x0000_5000u32).push(num_glyphs).into_vec()
}

/// `hmtx` / `vmtx` with one long metric (advance, side bearing) per entry
pub fn long_metrics(metrics: &[(u16, i16)]) -> Vec<u8> {
    metrics
        .iter()
        .fold(BeBuffer::new(), |buf, &(advance, bearing)| buf.push(advance).push(bearing))
        .into_vec()
}

/// `glyf` and short-format `loca` holding only glyph headers. `None`
/// entries are empty glyphs.
pub fn glyf_loca(boxes: &[Option<[i16; 4]>]) -> (Vec<u8>, Vec<u8>) {
    let mut glyf = BeBuffer::new();
    let mut loca = BeBuffer::new().push(0u16);
    for bbox in boxes {
        if let Some(bbox) = bbox {
            // zero contours, then x_min, y_min, x_max, y_max
            glyf = glyf.push(0i16).extend(*bbox);
        }
        loca = loca.push((glyf.len() / 2) as u16);
    }
    (glyf.into_vec(), loca.into_vec())
}

/// cmap wrapper around `(platform, encoding, subtable)` records
fn cmap(subtables: Vec<(u16, u16, Vec<u8>)>) -> Vec<u8> {
    let mut table = Subtable::new().push(0u16).push(subtables.len() as u16);
    for (platform, encoding, data) in subtables {
        table = table.push(platform).push(encoding).offset32(data);
    }
    table.build()
}

/// Sorted BMP mappings
fn bmp_mappings(mappings: &[(char, u16)]) -> Vec<(u16, u16)> {
    let mut bmp: Vec<(u16, u16)> = mappings
        .iter()
        .filter_map(|&(c, glyph)| Some((u16::try_from(c as u32).ok()?, glyph)))
        .collect();
    bmp.sort_unstable();
    bmp.dedup_by_key(|m| m.0);
    bmp
}

/// Format 4 subtable with one single-character segment per mapping
fn format4(mappings: &[(char, u16)]) -> Vec<u8> {
    let mut segments: Vec<(u16, u16, i16)> = bmp_mappings(mappings)
        .into_iter()
        .map(|(code, glyph)| (code, code, glyph.wrapping_sub(code) as i16))
        .collect();
    if segments.last().is_none_or(|s| s.1 != 0xFFFF) {
        segments.push((0xFFFF, 0xFFFF, 1));
    }

    let seg_count = segments.len() as u16;
    let entry_selector = 15 - seg_count.leading_zeros() as u16;
    let search_range = 2 * (1u16 << entry_selector);
    let length = 16 + 8 * seg_count;

    BeBuffer::new()
        .push(4u16)
        .push(length)
        .push(0u16) // language
        .push(seg_count * 2)
        .push(search_range)
        .push(entry_selector)
        .push(seg_count * 2 - search_range)
        .extend(segments.iter().map(|s| s.1))
        .push(0u16) // reserved pad
        .extend(segments.iter().map(|s| s.0))
        .extend(segments.iter().map(|s| s.2))
        .extend(segments.iter().map(|_| 0u16))
        .into_vec()
}

/// Format 12 subtable from `(start, end, start glyph)` groups
fn format12(groups: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut groups = groups.to_vec();
    groups.sort_unstable();
    BeBuffer::new()
        .push(12u16)
        .push(0u16)
        .push(16 + 12 * groups.len() as u32)
        .push(0u32) // language
        .push(groups.len() as u32)
        .extend(groups.iter().flat_map(|&(start, end, glyph)| [start, end, glyph]))
        .into_vec()
}

/// cmap with a Windows BMP format 4 subtable
pub fn cmap4(mappings: &[(char, u16)]) -> Vec<u8> {
    cmap(vec![(3, 1, format4(mappings))])
}

/// cmap with a BMP format 4 subtable and a full repertoire format 12
/// subtable holding the same mappings plus `groups`
pub fn cmap_with_format12(mappings: &[(char, u16)], groups: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut all: Vec<(u32, u32, u32)> = mappings
        .iter()
        .map(|&(c, glyph)| (c as u32, c as u32, glyph as u32))
        .collect();
    all.extend_from_slice(groups);
    cmap(vec![(3, 1, format4(mappings)), (3, 10, format12(&all))])
}

/// cmap with a format 6 subtable mapping `first..` to `glyphs`
pub fn cmap6(first: u16, glyphs: &[u16]) -> Vec<u8> {
    let subtable = BeBuffer::new()
        .push(6u16)
        .push(10 + 2 * glyphs.len() as u16)
        .push(0u16) // language
        .push(first)
        .push(glyphs.len() as u16)
        .extend(glyphs.iter().copied())
        .into_vec();
    cmap(vec![(0, 3, subtable)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_fields_at_expected_offsets() {
        let head = head(2048);
        assert_eq!(head.len(), 54);
        assert_eq!(&head[18..20], &2048u16.to_be_bytes());
        assert_eq!(&head[50..52], &[0, 0]);
    }

    #[test]
    fn hhea_long_metrics_at_34() {
        let hhea = hhea(800, -200, 7);
        assert_eq!(hhea.len(), 36);
        assert_eq!(&hhea[34..36], &[0, 7]);
    }

    #[test]
    fn loca_offsets_are_halved() {
        let (glyf, loca) = glyf_loca(&[None, Some([0, 0, 10, 10]), None]);
        assert_eq!(glyf.len(), 10);
        assert_eq!(loca, vec![0, 0, 0, 0, 0, 5, 0, 5]);
    }

    #[test]
    fn format4_ends_with_sentinel() {
        let data = format4(&[('B', 3), ('A', 2)]);
        // three segments: A, B, 0xFFFF
        assert_eq!(&data[6..8], &[0, 6]);
        assert_eq!(&data[14..16], &[0, b'A']);
        assert_eq!(&data[18..20], &[0xFF, 0xFF]);
    }
}
