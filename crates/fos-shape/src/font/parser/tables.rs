//! Header tables: head, hhea / vhea, maxp

use super::reader::FontReader;
use super::ParseError;

/// Head table (font header)
#[derive(Debug, Clone)]
pub struct HeadTable {
    pub units_per_em: u16,
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
    pub index_to_loc_format: i16,
}

impl HeadTable {
    /// Units-per-em used when the table is missing or the value is out of range
    pub const DEFAULT_UNITS_PER_EM: u16 = 1000;

    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut r = FontReader::new(data);
        r.skip(18)?; // version, revision, checksum adjustment, magic, flags
        let mut units_per_em = r.read_u16()?;
        r.skip(16)?; // timestamps
        let x_min = r.read_i16()?;
        let y_min = r.read_i16()?;
        let x_max = r.read_i16()?;
        let y_max = r.read_i16()?;
        r.skip(6)?; // mac style, lowest rec ppem, direction hint
        let index_to_loc_format = r.read_i16()?;

        if !(16..=16384).contains(&units_per_em) {
            units_per_em = Self::DEFAULT_UNITS_PER_EM;
        }

        Ok(Self {
            units_per_em,
            x_min,
            y_min,
            x_max,
            y_max,
            index_to_loc_format,
        })
    }
}

/// Hhea table (horizontal header). `vhea` shares the layout, with
/// ascender / descender holding the vertical typo metrics.
#[derive(Debug, Clone)]
pub struct HheaTable {
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
    pub advance_max: u16,
    pub number_of_long_metrics: u16,
}

impl HheaTable {
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut r = FontReader::new(data);
        r.skip(4)?; // version
        let ascender = r.read_i16()?;
        let descender = r.read_i16()?;
        let line_gap = r.read_i16()?;
        let advance_max = r.read_u16()?;
        r.skip(22)?; // other metrics
        let number_of_long_metrics = r.read_u16()?;

        Ok(Self {
            ascender,
            descender,
            line_gap,
            advance_max,
            number_of_long_metrics,
        })
    }
}

/// Maxp table (maximum profile)
#[derive(Debug, Clone)]
pub struct MaxpTable {
    pub num_glyphs: u16,
}

impl MaxpTable {
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut r = FontReader::new(data);
        r.skip(4)?; // version
        let num_glyphs = r.read_u16()?;
        Ok(Self { num_glyphs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fos_shape_test_data::tables;

    #[test]
    fn test_head_units_per_em() {
        let head = HeadTable::parse(&tables::head(2048)).unwrap();
        assert_eq!(head.units_per_em, 2048);
        assert_eq!(head.index_to_loc_format, 0);
    }

    #[test]
    fn test_head_bogus_units_per_em() {
        let head = HeadTable::parse(&tables::head(3)).unwrap();
        assert_eq!(head.units_per_em, HeadTable::DEFAULT_UNITS_PER_EM);
    }

    #[test]
    fn test_hhea_metrics() {
        let hhea = HheaTable::parse(&tables::hhea(800, -200, 5)).unwrap();
        assert_eq!(hhea.ascender, 800);
        assert_eq!(hhea.descender, -200);
        assert_eq!(hhea.number_of_long_metrics, 5);
    }

    #[test]
    fn test_truncated_maxp() {
        assert!(MaxpTable::parse(&[0, 0, 0x50, 0]).is_err());
        assert_eq!(MaxpTable::parse(&tables::maxp(12)).unwrap().num_glyphs, 12);
    }
}
