use std::{collections::BTreeSet, num::NonZeroUsize};

use lru::LruCache;
use tokio::sync::Mutex;

use crate::models::{Coordinate, Poi, Source};

pub const DEFAULT_CAPACITY: usize = 8;
pub const DEFAULT_PRECISION: u32 = 4;
/// Sub-millimeter already; larger values would overflow the scaled `i64` key.
pub const MAX_PRECISION: u32 = 9;

/// Identifies one aggregation: where, how far and which sources.
///
/// The origin is kept as fixed-point integers at the configured precision so
/// that nearby taps on the same spot share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    latitude: i64,
    longitude: i64,
    radius_m: u32,
    sources: Vec<Source>,
}

impl CacheKey {
    pub fn new(
        origin: &Coordinate,
        radius_m: u32,
        sources: &BTreeSet<Source>,
        precision: u32,
    ) -> Self {
        let factor = 10f64.powi(precision.min(MAX_PRECISION) as i32);
        Self {
            latitude: (origin.latitude() * factor).round() as i64,
            longitude: (origin.longitude() * factor).round() as i64,
            radius_m,
            sources: sources.iter().copied().collect(),
        }
    }
}

/// Bounded LRU of deduplicated, ranked results. The type filter is not part of
/// the key, entries hold every type.
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<LruCache<CacheKey, Vec<Poi>>>,
    precision: u32,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_PRECISION)
    }
}

impl ResultCache {
    /// A capacity of 0 is treated as 1, precision is capped at [`MAX_PRECISION`].
    pub fn new(capacity: usize, precision: u32) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        if precision > MAX_PRECISION {
            log::warn!(
                "Cache coordinate precision {} capped to {}",
                precision,
                MAX_PRECISION
            );
        }
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            precision: precision.min(MAX_PRECISION),
        }
    }

    pub fn key(&self, origin: &Coordinate, radius_m: u32, sources: &BTreeSet<Source>) -> CacheKey {
        CacheKey::new(origin, radius_m, sources, self.precision)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Vec<Poi>> {
        let mut entries = self.entries.lock().await;
        entries.get(key).cloned()
    }

    pub async fn insert(&self, key: CacheKey, pois: Vec<Poi>) {
        let mut entries = self.entries.lock().await;
        if let Some((evicted, _)) = entries.push(key.clone(), pois)
            && evicted != key
        {
            log::debug!("Evicted cached result {:?}", evicted);
        }
    }

    pub async fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries.lock().await.pop(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
