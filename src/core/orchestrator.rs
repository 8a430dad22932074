use std::collections::{BTreeSet, HashSet};

use futures::future::join_all;
use tokio::sync::watch;

use crate::{
    adapters::{self, BoxedSourceAdapter, SourceAdapter},
    config::Config,
    core::{
        cache::{self, CacheKey, ResultCache},
        dedup::{DedupConfig, deduplicate_with},
    },
    error::{AdapterError, AdapterFailure, AggregationError},
    models::{Coordinate, Poi, PoiType, Source},
};

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub dedup: DedupConfig,
    pub cache_capacity: usize,
    pub coordinate_precision: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dedup: DedupConfig::default(),
            cache_capacity: cache::DEFAULT_CAPACITY,
            coordinate_precision: cache::DEFAULT_PRECISION,
        }
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            dedup: config.dedup,
            cache_capacity: config.cache.capacity,
            coordinate_precision: config.cache.coordinate_precision,
        }
    }
}

/// What to look for. `None` for sources or types means all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: u32,
    pub enabled_sources: Option<BTreeSet<Source>>,
    pub enabled_types: Option<HashSet<PoiType>>,
}

impl DiscoveryRequest {
    pub fn new(latitude: f64, longitude: f64, radius_m: u32) -> Self {
        Self {
            latitude,
            longitude,
            radius_m,
            enabled_sources: None,
            enabled_types: None,
        }
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.enabled_sources = Some(sources.into_iter().collect());
        self
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = PoiType>) -> Self {
        self.enabled_types = Some(types.into_iter().collect());
        self
    }

    fn wants_source(&self, source: Source) -> bool {
        self.enabled_sources
            .as_ref()
            .is_none_or(|sources| sources.contains(&source))
    }

    fn wants_type(&self, poi_type: PoiType) -> bool {
        self.enabled_types
            .as_ref()
            .is_none_or(|types| types.contains(&poi_type))
    }
}

/// Ranked places plus the adapters that failed along the way.
#[derive(Debug)]
pub struct Discovery {
    pub pois: Vec<Poi>,
    pub diagnostics: Vec<AdapterFailure>,
    pub from_cache: bool,
}

/// The location the orchestrator is currently working for.
#[derive(Debug, Clone, Default, PartialEq)]
struct Target {
    generation: u64,
    key: Option<CacheKey>,
}

/// Fans a request out to every enabled adapter and folds the answers into one
/// deduplicated, ranked list.
pub struct Orchestrator {
    adapters: Vec<BoxedSourceAdapter>,
    dedup: DedupConfig,
    cache: ResultCache,
    target: watch::Sender<Target>,
}

impl Orchestrator {
    pub fn new(adapters: Vec<BoxedSourceAdapter>, config: OrchestratorConfig) -> Self {
        let (target, _) = watch::channel(Target::default());
        Self {
            adapters,
            dedup: config.dedup,
            cache: ResultCache::new(config.cache_capacity, config.coordinate_precision),
            target,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(adapters::from_config(config), OrchestratorConfig::from(config))
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Supersedes every in-flight discovery; they resolve to [`AggregationError::Cancelled`].
    pub fn cancel(&self) {
        self.target.send_modify(|target| {
            target.generation += 1;
            target.key = None;
        });
        log::info!("Cancelled in-flight discoveries");
    }

    /// Makes `key` the current target. Requests for the same key share a generation.
    fn begin(&self, key: &CacheKey) -> u64 {
        let mut generation = 0;
        self.target.send_if_modified(|target| {
            let changed = target.key.as_ref() != Some(key);
            if changed {
                target.generation += 1;
                target.key = Some(key.clone());
            }
            generation = target.generation;
            changed
        });
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.target.borrow().generation == generation
    }

    /// Resolves once `generation` is no longer current.
    async fn superseded(mut receiver: watch::Receiver<Target>, generation: u64) {
        loop {
            if receiver.borrow_and_update().generation != generation {
                return;
            }
            if receiver.changed().await.is_err() {
                // sender gone together with the orchestrator, nothing can supersede us anymore
                std::future::pending::<()>().await;
            }
        }
    }

    pub async fn discover_pois(
        &self,
        request: &DiscoveryRequest,
    ) -> Result<Discovery, AggregationError> {
        let origin = Coordinate::new(request.latitude, request.longitude)?;

        let adapters: Vec<&BoxedSourceAdapter> = self
            .adapters
            .iter()
            .filter(|adapter| adapter.enabled() && request.wants_source(adapter.source()))
            .collect();
        if adapters.is_empty() {
            return Err(AggregationError::NoSourcesEnabled);
        }

        let sources: BTreeSet<Source> = adapters.iter().map(|adapter| adapter.source()).collect();
        let key = self.cache.key(&origin, request.radius_m, &sources);
        let generation = self.begin(&key);

        if let Some(pois) = self.cache.get(&key).await {
            log::info!("Serving {} cached places for {:?}", pois.len(), key);
            return Ok(Discovery {
                pois: filter_types(pois, request),
                diagnostics: vec![],
                from_cache: true,
            });
        }

        log::info!(
            "Querying {} sources within {}m of {},{}",
            adapters.len(),
            request.radius_m,
            origin.latitude(),
            origin.longitude()
        );

        let fetches = join_all(
            adapters
                .iter()
                .map(|adapter| fetch_with_timeout(adapter, origin, request.radius_m)),
        );

        let outcomes = tokio::select! {
            outcomes = fetches => outcomes,
            _ = Self::superseded(self.target.subscribe(), generation) => {
                log::info!("Discovery around {:?} superseded", key);
                return Err(AggregationError::Cancelled);
            }
        };

        let mut pois: Vec<Poi> = vec![];
        let mut failures: Vec<AdapterFailure> = vec![];
        for outcome in outcomes {
            match outcome {
                Ok(found) => pois.extend(found),
                Err(failure) => {
                    log::warn!("Source failed: {}", failure);
                    failures.push(failure);
                }
            }
        }

        if failures.len() == adapters.len() {
            return Err(AggregationError::AllSourcesFailed(failures));
        }

        let mut pois = deduplicate_with(pois, &self.dedup);
        pois.sort_by(|a, b| {
            b.notability_score()
                .cmp(&a.notability_score())
                .then_with(|| a.distance_from_origin.total_cmp(&b.distance_from_origin))
                .then_with(|| a.id.cmp(&b.id))
        });

        if !self.is_current(generation) {
            log::info!("Discarding stale result for {:?}", key);
            return Err(AggregationError::Cancelled);
        }

        if failures.is_empty() {
            self.cache.insert(key, pois.clone()).await;
        } else {
            log::debug!("Not caching partial result ({} failed)", failures.len());
        }

        Ok(Discovery {
            pois: filter_types(pois, request),
            diagnostics: failures,
            from_cache: false,
        })
    }
}

async fn fetch_with_timeout(
    adapter: &BoxedSourceAdapter,
    origin: Coordinate,
    radius_m: u32,
) -> Result<Vec<Poi>, AdapterFailure> {
    let source = adapter.source();
    let after = adapter.timeout();

    match tokio::time::timeout(after, adapter.filtered_fetch(origin, radius_m)).await {
        Ok(Ok(pois)) => Ok(pois),
        Ok(Err(error)) => Err(AdapterFailure { source, error }),
        Err(_) => Err(AdapterFailure {
            source,
            error: AdapterError::Timeout {
                adapter: source,
                after,
            },
        }),
    }
}

fn filter_types(pois: Vec<Poi>, request: &DiscoveryRequest) -> Vec<Poi> {
    pois.into_iter()
        .filter(|poi| request.wants_type(poi.poi_type))
        .collect()
}
