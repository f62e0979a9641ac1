//! Shaping entry points
//!
//! Validates the buffer, fills unset segment properties, fetches a plan
//! from the cache and runs it. Any failure leaves the buffer as it was.

use std::sync::Arc;

use crate::buffer::{Buffer, ContentType};
use crate::feature::Feature;
use crate::font::parser::tags;
use crate::font::Font;
use crate::plan::{ShapePlan, ShaperKind};
use crate::plan_cache::ShapePlanCache;
use crate::unicode::Language;
use crate::{Result, ShapeError};

/// Shaping limits and defaults
#[derive(Debug, Clone)]
pub struct ShaperConfig {
    /// Language used when the buffer has none
    pub default_language: Option<Language>,
    /// Depth limit for lookups invoked from contextual lookups
    pub max_nesting: usize,
    /// Substitution may grow the buffer to
    /// `input * max_len_factor + max_len_min` glyphs
    pub max_len_factor: usize,
    pub max_len_min: usize,
    /// Zero the advance of mark glyphs after positioning
    pub zero_width_marks: bool,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            default_language: None,
            max_nesting: 64,
            max_len_factor: 32,
            max_len_min: 8192,
            zero_width_marks: true,
        }
    }
}

impl ShaperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_language(mut self, language: Language) -> Self {
        self.default_language = Some(language);
        self
    }

    pub fn max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub fn max_len_factor(mut self, factor: usize) -> Self {
        self.max_len_factor = factor;
        self
    }

    pub fn max_len_min(mut self, min: usize) -> Self {
        self.max_len_min = min;
        self
    }

    pub fn zero_width_marks(mut self, zero: bool) -> Self {
        self.zero_width_marks = zero;
        self
    }

    /// Glyph limit for an input of `input` characters
    pub(crate) fn max_len(&self, input: usize) -> usize {
        input.saturating_mul(self.max_len_factor).saturating_add(self.max_len_min)
    }
}

/// Text shaper with its own (or a shared) plan cache
#[derive(Debug, Clone)]
pub struct Shaper {
    config: ShaperConfig,
    cache: Arc<ShapePlanCache>,
}

impl Default for Shaper {
    fn default() -> Self {
        Self::new()
    }
}

impl Shaper {
    /// Create a shaper with default settings and a private cache
    pub fn new() -> Self {
        Self::with_config(ShaperConfig::default())
    }

    pub fn with_config(config: ShaperConfig) -> Self {
        Self { config, cache: Arc::new(ShapePlanCache::new()) }
    }

    /// Share a plan cache with other shapers
    pub fn with_cache(mut self, cache: Arc<ShapePlanCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &ShaperConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ShapePlanCache> {
        &self.cache
    }

    /// Shape a Unicode buffer into glyphs
    pub fn shape(&self, font: &Font, buffer: &mut Buffer, features: &[Feature]) -> Result<()> {
        self.shape_full(font, buffer, features, None)
    }

    /// Shape trying the named shapers in order (`"ot"`, `"fallback"`)
    pub fn shape_full(
        &self,
        font: &Font,
        buffer: &mut Buffer,
        features: &[Feature],
        shapers: Option<&[&str]>,
    ) -> Result<()> {
        if !ready(font, buffer)? {
            return Ok(());
        }
        restoring(buffer, |buffer| {
            fill_properties(buffer, &self.config);
            let plan = self
                .cache
                .get_or_create(font, buffer.segment_properties(), features, shapers)?;
            plan.run(font, buffer, features, &self.config)
        })
    }
}

/// Names of the available shapers, in default order
pub fn list_shapers() -> Vec<&'static str> {
    ShaperKind::ALL.iter().map(|kind| kind.name()).collect()
}

/// Shape with default settings and the process-wide plan cache
pub fn shape(font: &Font, buffer: &mut Buffer, features: &[Feature]) -> Result<()> {
    Shaper::new().with_cache(ShapePlanCache::global()).shape(font, buffer, features)
}

/// Run an existing plan on a buffer
pub(crate) fn execute_plan(
    plan: &ShapePlan,
    font: &Font,
    buffer: &mut Buffer,
    features: &[Feature],
    config: &ShaperConfig,
) -> Result<()> {
    if !ready(font, buffer)? {
        return Ok(());
    }
    restoring(buffer, |buffer| {
        fill_properties(buffer, config);
        plan.run(font, buffer, features, config)
    })
}

/// Check the buffer and font can be shaped. An empty, never filled
/// buffer is already done and comes back as an empty glyph buffer.
fn ready(font: &Font, buffer: &mut Buffer) -> Result<bool> {
    match buffer.content_type() {
        ContentType::Invalid if buffer.is_empty() => {
            buffer.set_content_type(ContentType::Glyphs);
            return Ok(false);
        }
        ContentType::Unicode => {}
        _ => return Err(ShapeError::InvalidContentType),
    }
    if !font.face().has_table(tags::CMAP) {
        return Err(ShapeError::MissingTable(tags::CMAP));
    }
    Ok(true)
}

fn fill_properties(buffer: &mut Buffer, config: &ShaperConfig) {
    buffer.guess_segment_properties();
    if buffer.language().is_none() {
        if let Some(language) = &config.default_language {
            buffer.set_language(language.clone());
        }
    }
}

/// Run `shape` on the buffer, putting the original contents back if it fails
fn restoring(buffer: &mut Buffer, shape: impl FnOnce(&mut Buffer) -> Result<()>) -> Result<()> {
    let snapshot = buffer.clone();
    let result = shape(buffer);
    if let Err(err) = &result {
        tracing::debug!(%err, len = snapshot.len(), "shaping failed, buffer restored");
        *buffer = snapshot;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ShaperConfig::new()
            .max_nesting(8)
            .max_len_factor(2)
            .max_len_min(10)
            .zero_width_marks(false)
            .default_language(Language::from_bcp47("hi"));
        assert_eq!(config.max_nesting, 8);
        assert!(!config.zero_width_marks);
        assert_eq!(config.max_len(5), 20);
        assert_eq!(config.default_language.as_ref().map(Language::as_str), Some("hi"));
    }

    #[test]
    fn test_max_len_saturates() {
        assert_eq!(ShaperConfig::default().max_len(usize::MAX), usize::MAX);
        assert_eq!(ShaperConfig::default().max_len(0), 8192);
    }

    #[test]
    fn test_list_shapers() {
        assert_eq!(list_shapers(), vec!["ot", "fallback"]);
    }
}
