pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod utils;

pub use crate::core::{
    Discovery, DiscoveryRequest, Orchestrator, calculate_notability_score, deduplicate,
};
pub use error::{AdapterError, AdapterFailure, AggregationError, GeoError};
pub use models::{Coordinate, Poi, PoiType, Source};
pub use utils::{distance, similarity};
