//! fOS Shape - OpenType Text Shaping Engine
//!
//! Converts Unicode text plus a font face into positioned glyphs:
//! - sfnt / TrueType Collection table store
//! - Glyph metrics and cmap lookup
//! - Unicode segmentation (clusters, marks, Arabic joining, Indic reordering)
//! - GSUB / GPOS lookup interpretation
//! - Shape plan compilation and caching

pub mod buffer;
pub mod feature;
pub mod font;
pub mod layout;
pub mod plan;
pub mod plan_cache;
pub mod shaper;
pub mod tag;
pub mod unicode;

pub use buffer::{
    Buffer, BufferFlags, ClusterLevel, ContentType, GlyphContent, GlyphFlags, GlyphInfo,
    GlyphPosition, SegmentProperties,
};
pub use feature::Feature;
pub use font::{face_count, Blob, Face, FaceId, Font, GlyphExtents, GlyphId, ParseError};
pub use plan::{PlanKey, ShapePlan, ShaperKind, UnknownShaper};
pub use plan_cache::{CacheConfig, CacheStats, ShapePlanCache};
pub use shaper::{list_shapers, shape, Shaper, ShaperConfig};
pub use tag::Tag;
pub use unicode::{Direction, Language, Script};

/// Shaping error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("invalid '{tag}' table: {reason}")]
    InvalidLayoutTable { tag: Tag, reason: String },

    #[error("required table '{0}' is missing")]
    MissingTable(Tag),

    #[error("buffer content type is not Unicode")]
    InvalidContentType,

    #[error("buffer grew past {limit} glyphs")]
    BufferOverflow { limit: usize },

    #[error("no usable shaper")]
    NoShaper,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type Result<T> = std::result::Result<T, ShapeError>;
