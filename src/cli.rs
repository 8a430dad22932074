use clap::Parser;
use serde::Serialize;

use crate::models::{PoiType, Source};

/// Discover points of interest around a location from several open-data sources.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct CliArgs {
    /// Latitude of the search origin
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the search origin
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Search radius in meters (default: 10000)
    #[arg(short, long, env = "POI_RADIUS")]
    pub radius: Option<u32>,

    /// Only query these sources (default: every enabled source)
    #[arg(short, long = "source", value_enum)]
    pub sources: Vec<Source>,

    /// Only return these types (default: all)
    #[arg(short = 't', long = "type", value_enum)]
    pub types: Vec<PoiType>,

    /// Print at most this many results
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Config file path (default: "config.toml")
    #[arg(short, long, env = "POI_CONFIG")]
    pub config: Option<String>,

    /// Locations kept in the result cache (default: 8)
    #[arg(long, env = "POI_CACHE_CAPACITY")]
    pub cache_capacity: Option<usize>,

    /// Max distance in meters for two records to be the same place (default: 50)
    #[arg(long, env = "POI_DEDUP_MAX_DISTANCE")]
    pub dedup_max_distance: Option<f64>,

    /// Min name similarity for two records to be the same place (default: 0.7)
    #[arg(long, env = "POI_DEDUP_MIN_SIMILARITY")]
    pub dedup_min_similarity: Option<f64>,

    /// Geosearch endpoint
    #[arg(long, env = "POI_GEOSEARCH_ENDPOINT")]
    pub geosearch_endpoint: Option<String>,

    /// Geosearch result limit (default: 50)
    #[arg(long, env = "POI_GEOSEARCH_LIMIT")]
    pub geosearch_limit: Option<usize>,

    /// Geosearch timeout in sec (default: 15)
    #[arg(long, env = "POI_GEOSEARCH_TIMEOUT")]
    pub geosearch_timeout: Option<u64>,

    /// Disable Geosearch
    #[arg(long, env = "POI_GEOSEARCH_DISABLED")]
    pub geosearch_disabled: bool,

    /// Tag-Query endpoint
    #[arg(long, env = "POI_TAG_QUERY_ENDPOINT")]
    pub tag_query_endpoint: Option<String>,

    /// Tag-Query timeout in sec (default: 25)
    #[arg(long, env = "POI_TAG_QUERY_TIMEOUT")]
    pub tag_query_timeout: Option<u64>,

    /// Tag-Query minimum interval between requests in ms (default: 1000)
    #[arg(long, env = "POI_TAG_QUERY_MIN_INTERVAL")]
    pub tag_query_min_interval: Option<u64>,

    /// Disable Tag-Query
    #[arg(long, env = "POI_TAG_QUERY_DISABLED")]
    pub tag_query_disabled: bool,

    /// Structured-Data endpoint
    #[arg(long, env = "POI_STRUCTURED_DATA_ENDPOINT")]
    pub structured_data_endpoint: Option<String>,

    /// Structured-Data result limit (default: 100)
    #[arg(long, env = "POI_STRUCTURED_DATA_LIMIT")]
    pub structured_data_limit: Option<usize>,

    /// Structured-Data timeout in sec (default: 30)
    #[arg(long, env = "POI_STRUCTURED_DATA_TIMEOUT")]
    pub structured_data_timeout: Option<u64>,

    /// Structured-Data label language (default: "en")
    #[arg(long, env = "POI_STRUCTURED_DATA_LANGUAGE")]
    pub structured_data_language: Option<String>,

    /// Disable Structured-Data
    #[arg(long, env = "POI_STRUCTURED_DATA_DISABLED")]
    pub structured_data_disabled: bool,
}

/// Sparse config layer; only what was given on the command line or in the environment.
#[derive(Serialize, Debug, Default)]
pub struct ConfigOverrides {
    general: GeneralOverrides,
    cache: CacheOverrides,
    dedup: DedupOverrides,
    geosearch: GeosearchOverrides,
    tag_query: TagQueryOverrides,
    structured_data: StructuredDataOverrides,
}

#[derive(Serialize, Debug, Default)]
struct GeneralOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    radius: Option<u32>,
}

#[derive(Serialize, Debug, Default)]
struct CacheOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    capacity: Option<usize>,
}

#[derive(Serialize, Debug, Default)]
struct DedupOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_similarity: Option<f64>,
}

#[derive(Serialize, Debug, Default)]
struct GeosearchOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
}

#[derive(Serialize, Debug, Default)]
struct TagQueryOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_interval_ms: Option<u64>,
}

#[derive(Serialize, Debug, Default)]
struct StructuredDataOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

fn disabled(flag: bool) -> Option<bool> {
    if flag { Some(false) } else { None }
}

impl CliArgs {
    pub fn as_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            general: GeneralOverrides {
                radius: self.radius,
            },
            cache: CacheOverrides {
                capacity: self.cache_capacity,
            },
            dedup: DedupOverrides {
                max_distance_m: self.dedup_max_distance,
                min_similarity: self.dedup_min_similarity,
            },
            geosearch: GeosearchOverrides {
                enabled: disabled(self.geosearch_disabled),
                endpoint: self.geosearch_endpoint.clone(),
                limit: self.geosearch_limit,
                timeout: self.geosearch_timeout,
            },
            tag_query: TagQueryOverrides {
                enabled: disabled(self.tag_query_disabled),
                endpoint: self.tag_query_endpoint.clone(),
                timeout: self.tag_query_timeout,
                min_interval_ms: self.tag_query_min_interval,
            },
            structured_data: StructuredDataOverrides {
                enabled: disabled(self.structured_data_disabled),
                endpoint: self.structured_data_endpoint.clone(),
                limit: self.structured_data_limit,
                timeout: self.structured_data_timeout,
                language: self.structured_data_language.clone(),
            },
        }
    }
}
