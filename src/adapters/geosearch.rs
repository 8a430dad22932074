use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    adapters::{SourceAdapter, read_body},
    config::GeosearchConfig,
    error::AdapterError,
    models::{Coordinate, Poi, PoiType, Source},
};

/// Namespace of encyclopedia articles; talk pages, files and the like live elsewhere.
const ARTICLE_NAMESPACE: i64 = 0;

#[derive(Deserialize)]
struct Response {
    query: Option<Query>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct Query {
    #[serde(default)]
    geosearch: Vec<Value>,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Deserialize, Debug)]
struct Entry {
    pageid: Option<u64>,
    #[serde(default)]
    ns: i64,
    title: String,
    lat: f64,
    lon: f64,
}

/// Articles-by-coordinate search of an encyclopedia.
#[derive(Clone, Debug)]
pub struct Geosearch {
    client: Client,
    endpoint: String,
    limit: usize,
    timeout: Duration,
    enabled: bool,
}

impl Geosearch {
    pub fn new(config: &GeosearchConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            limit: config.limit,
            timeout: config.timeout(),
            enabled: config.enabled,
        }
    }

    pub(crate) fn parse_response(
        body: &str,
        origin: &Coordinate,
    ) -> Result<Vec<Poi>, AdapterError> {
        let response: Response = serde_json::from_str(body).map_err(|e| AdapterError::Parse {
            adapter: Source::Geosearch,
            message: e.to_string(),
        })?;

        if let Some(error) = response.error {
            return Err(AdapterError::Api {
                adapter: Source::Geosearch,
                message: format!("{}: {}", error.code, error.info),
            });
        }

        let entries = response.query.map(|q| q.geosearch).unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Entry>(value) {
                Ok(entry) => Self::to_poi(entry, origin),
                Err(e) => {
                    log::warn!("Skipping malformed geosearch entry: {}", e);
                    None
                }
            })
            .collect())
    }

    fn to_poi(entry: Entry, origin: &Coordinate) -> Option<Poi> {
        if entry.ns != ARTICLE_NAMESPACE {
            log::debug!("Skipping non-article page {:?} (ns {})", entry.title, entry.ns);
            return None;
        }

        let title = entry.title.trim();
        if title.is_empty() {
            return None;
        }

        let coordinate = match Coordinate::new(entry.lat, entry.lon) {
            Ok(coordinate) => coordinate,
            Err(e) => {
                log::warn!("Skipping geosearch page {:?}: {}", entry.pageid, e);
                return None;
            }
        };

        let mut poi = Poi::new(
            Source::Geosearch,
            title,
            PoiType::from_keywords(title),
            coordinate,
            origin,
        );
        poi.wikipedia_title = Some(title.to_string());
        Some(poi.scored())
    }
}

#[async_trait]
impl SourceAdapter for Geosearch {
    fn source(&self) -> Source {
        Source::Geosearch
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn limit(&self) -> Option<usize> {
        Some(self.limit)
    }

    async fn fetch_nearby(
        &self,
        origin: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<Poi>, AdapterError> {
        log::info!(
            "Searching articles within {}m of {},{}",
            radius_m,
            origin.latitude(),
            origin.longitude()
        );

        let request = self.client.get(&self.endpoint).query(&[
            ("action", "query".to_string()),
            ("list", "geosearch".to_string()),
            (
                "gscoord",
                format!("{}|{}", origin.latitude(), origin.longitude()),
            ),
            ("gsradius", radius_m.to_string()),
            ("gslimit", self.limit.to_string()),
            ("gsnamespace", ARTICLE_NAMESPACE.to_string()),
            ("format", "json".to_string()),
        ]);

        let body = read_body(Source::Geosearch, self.timeout, request).await?;
        Self::parse_response(&body, &origin)
    }
}
