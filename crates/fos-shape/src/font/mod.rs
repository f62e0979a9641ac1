//! Font Module
//!
//! Table store (blob, directory, face) and the glyph property provider
//! built on top of it.

pub mod parser;
mod blob;
mod face;
mod metrics;

pub use blob::Blob;
pub use face::{face_count, Face, FaceId};
pub use metrics::{Font, FontExtents, GlyphExtents};
pub use parser::{GlyphId, ParseError};
