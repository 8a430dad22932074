use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use anyhow::{Result, bail};
use figment::{
    Figment,
    providers::{Format, Json, Serialized, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::{
    cli::CliArgs,
    core::{DedupConfig, cache},
    models::PoiType,
};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
static CONFIG: OnceCell<Config> = OnceCell::const_new();

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub cache: Cache,
    pub dedup: DedupConfig,
    pub geosearch: GeosearchConfig,
    pub tag_query: TagQueryConfig,
    pub structured_data: StructuredDataConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct General {
    /// Search radius used when none is given, in meters
    pub radius: u32,
}

impl Default for General {
    fn default() -> Self {
        Self { radius: 10_000 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Cache {
    /// Number of locations kept resident
    pub capacity: usize,
    /// Decimals the origin is rounded to when building cache keys
    pub coordinate_precision: u32,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            capacity: cache::DEFAULT_CAPACITY,
            coordinate_precision: cache::DEFAULT_PRECISION,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeosearchConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Result cap passed to the source
    pub limit: usize,
    /// Timeout in seconds
    pub timeout: u64,
}

impl Default for GeosearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://en.wikipedia.org/w/api.php".to_string(),
            limit: 50,
            timeout: 15,
        }
    }
}

impl GeosearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TagQueryConfig {
    pub enabled: bool,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Timeout in seconds, also sent to the server as the query timeout
    pub timeout: u64,
    /// Minimum spacing between two requests, in milliseconds
    pub min_interval_ms: u64,
}

impl Default for TagQueryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://overpass-api.de/api/interpreter".to_string(),
            limit: None,
            timeout: 25,
            min_interval_ms: 1000,
        }
    }
}

impl TagQueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StructuredDataConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub limit: usize,
    /// Timeout in seconds
    pub timeout: u64,
    /// Label and article language
    pub language: String,
    /// Entity classes queried, mapped to the type their instances get
    pub classes: BTreeMap<String, PoiType>,
}

impl Default for StructuredDataConfig {
    fn default() -> Self {
        let classes = [
            ("Q33506", PoiType::Museum),
            ("Q207694", PoiType::Museum),
            ("Q4989906", PoiType::Monument),
            ("Q5003624", PoiType::Monument),
            ("Q2319498", PoiType::Landmark),
            ("Q12518", PoiType::Landmark),
            ("Q16970", PoiType::ReligiousSite),
            ("Q2977", PoiType::ReligiousSite),
            ("Q32815", PoiType::ReligiousSite),
            ("Q22698", PoiType::Park),
            ("Q6017969", PoiType::Viewpoint),
            ("Q570116", PoiType::TouristAttraction),
            ("Q1081138", PoiType::HistoricSite),
            ("Q23413", PoiType::HistoricSite),
            ("Q16560", PoiType::HistoricSite),
            ("Q174782", PoiType::Square),
        ]
        .into_iter()
        .map(|(class, poi_type)| (class.to_string(), poi_type))
        .collect();

        Self {
            enabled: true,
            endpoint: "https://query.wikidata.org/sparql".to_string(),
            limit: 100,
            timeout: 30,
            language: "en".to_string(),
            classes,
        }
    }
}

impl StructuredDataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Process-wide configuration, loaded on the first call; later calls return the stored value.
pub fn init_config(args: &CliArgs) -> Result<&'static Config> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = load_config(args)?;
    // a concurrent first caller may have won the race, keep whatever is stored
    let _ = CONFIG.set(config);
    CONFIG
        .get()
        .ok_or_else(|| anyhow::anyhow!("Configuration could not be stored"))
}

pub fn load_config(args: &CliArgs) -> Result<Config> {
    let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

    let explicit = args.config.is_some();
    let config_path = PathBuf::from(
        args.config
            .clone()
            .unwrap_or(DEFAULT_CONFIG_PATH.to_string()),
    );

    if config_path.exists() {
        log::info!("Config file found: {}", config_path.display());
        figment = match config_path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => figment.merge(Toml::file(&config_path)),
            Some("json") => figment.merge(Json::file(&config_path)),
            Some("yaml") | Some("yml") => figment.merge(Yaml::file(&config_path)),
            _ => bail!("Cannot identify config file type. Must be .toml, .json or .yaml"),
        };
    } else if explicit {
        bail!("Config file not found: {}", config_path.display());
    }

    let config: Config = figment
        .merge(Serialized::defaults(args.as_overrides()))
        .extract()?;

    if config.cache.coordinate_precision > cache::MAX_PRECISION {
        bail!(
            "cache.coordinate_precision must be at most {}, got {}",
            cache::MAX_PRECISION,
            config.cache.coordinate_precision
        );
    }

    log::debug!("Loaded config: {:#?}", config);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        let mut full = vec!["poi-aggregator", "--lat", "48.8584", "--lon", "2.2945"];
        full.extend_from_slice(argv);
        CliArgs::parse_from(full)
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.geosearch.timeout(), Duration::from_secs(15));
        assert_eq!(config.tag_query.timeout(), Duration::from_secs(25));
        assert_eq!(config.structured_data.timeout(), Duration::from_secs(30));
        assert_eq!(config.tag_query.min_interval(), Duration::from_millis(1000));
        assert_eq!(config.geosearch.limit, 50);
        assert_eq!(config.dedup.max_distance_m, 50.0);
        assert_eq!(config.general.radius, 10_000);
    }

    #[test]
    fn test_cli_overrides_defaults() {
        let config = load_config(&args(&[
            "--tag-query-disabled",
            "--geosearch-timeout",
            "5",
            "--cache-capacity",
            "1",
        ]))
        .unwrap();

        assert!(!config.tag_query.enabled);
        assert!(config.geosearch.enabled);
        assert_eq!(config.geosearch.timeout, 5);
        assert_eq!(config.cache.capacity, 1);
        assert_eq!(config.structured_data, StructuredDataConfig::default());
    }

    #[test]
    fn test_default_cache_matches_cache_defaults() {
        let config = Config::default();
        assert_eq!(config.cache.capacity, cache::DEFAULT_CAPACITY);
        assert_eq!(config.cache.coordinate_precision, cache::DEFAULT_PRECISION);
    }

    #[test]
    fn test_rejects_excessive_coordinate_precision() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("poi.toml", "[cache]\ncoordinate_precision = 19\n")?;
            assert!(load_config(&args(&["--config", "poi.toml"])).is_err());

            jail.create_file("poi.toml", "[cache]\ncoordinate_precision = 9\n")?;
            let config = load_config(&args(&["--config", "poi.toml"])).unwrap();
            assert_eq!(config.cache.coordinate_precision, 9);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_config_file_fails() {
        assert!(load_config(&args(&["--config", "/nonexistent/poi.toml"])).is_err());
    }

    #[test]
    fn test_file_layer() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "poi.toml",
                r#"
                [general]
                radius = 2500

                [tag_query]
                min_interval_ms = 2000

                [structured_data.classes]
                Q44539 = "religiousSite"
                "#,
            )?;

            let config = load_config(&args(&["--config", "poi.toml"])).unwrap();
            assert_eq!(config.general.radius, 2500);
            assert_eq!(config.tag_query.min_interval_ms, 2000);
            assert_eq!(config.tag_query.timeout, 25);
            assert_eq!(
                config.structured_data.classes.get("Q44539"),
                Some(&PoiType::ReligiousSite)
            );
            assert_eq!(
                config.structured_data.classes.get("Q33506"),
                Some(&PoiType::Museum)
            );
            Ok(())
        });
    }
}
