//! Shape plan cache
//!
//! Maps plan keys to compile-once cells. The map lock is only held while
//! locating a key's cell; compilation runs inside the cell, so callers
//! asking for the same key wait for one compilation while other keys
//! compile in parallel.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::buffer::SegmentProperties;
use crate::feature::Feature;
use crate::font::Font;
use crate::plan::{self, PlanKey, ShapePlan};
use crate::Result;

type PlanCell = Arc<OnceLock<Result<Arc<ShapePlan>>>>;

/// Cache settings
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheConfig {
    /// Evict the oldest entries past this many; unbounded if `None`
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub compilations: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct CacheMap {
    cells: HashMap<PlanKey, PlanCell>,
    /// Insertion order, for eviction
    order: VecDeque<PlanKey>,
}

/// Thread-safe shape plan cache
#[derive(Debug, Default)]
pub struct ShapePlanCache {
    config: CacheConfig,
    map: Mutex<CacheMap>,
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
}

impl ShapePlanCache {
    /// Create an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CacheConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Process-wide cache behind [`crate::shape`]
    pub fn global() -> Arc<ShapePlanCache> {
        static GLOBAL: OnceLock<Arc<ShapePlanCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(ShapePlanCache::new())).clone()
    }

    /// Get the plan for these inputs, compiling it at most once per key.
    /// Compile errors are cached like plans.
    pub fn get_or_create(
        &self,
        font: &Font,
        props: &SegmentProperties,
        features: &[Feature],
        shapers: Option<&[&str]>,
    ) -> Result<Arc<ShapePlan>> {
        let shapers = plan::resolve_shapers(shapers)?;
        let key = PlanKey::new(font, props, features, &shapers);
        let cell = self.cell(&key);
        cell.get_or_init(|| {
            self.compilations.fetch_add(1, Ordering::Relaxed);
            ShapePlan::compile(font.face(), key).map(Arc::new)
        })
        .clone()
    }

    fn cell(&self, key: &PlanKey) -> PlanCell {
        let mut map = self.map.lock();
        if let Some(cell) = map.cells.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(script = ?key.segment_properties().script, "plan cache hit");
            return cell.clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(script = ?key.segment_properties().script, "plan cache miss");
        let cell = PlanCell::default();
        map.cells.insert(key.clone(), cell.clone());
        map.order.push_back(key.clone());

        if let Some(max_entries) = self.config.max_entries {
            while map.cells.len() > max_entries {
                let Some(oldest) = map.order.pop_front() else {
                    break;
                };
                if let Some(evicted) = map.cells.remove(&oldest) {
                    if evicted.get().is_none() {
                        tracing::warn!("evicting a shape plan that is still compiling");
                    }
                }
            }
        }
        cell
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compilations: self.compilations(),
            entries: self.map.lock().cells.len(),
        }
    }

    /// Number of plan compilations so far
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Drop every entry; plans already handed out stay valid
    pub fn clear(&self) {
        let mut map = self.map.lock();
        map.cells.clear();
        map.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats { hits: 3, misses: 1, compilations: 1, entries: 1 };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_config_builder() {
        assert_eq!(CacheConfig::default().max_entries, None);
        assert_eq!(CacheConfig::default().max_entries(4).max_entries, Some(4));
    }
}
