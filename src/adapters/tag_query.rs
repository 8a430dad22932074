use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    adapters::{RateLimiter, SourceAdapter, non_empty, parse_year, read_body},
    config::TagQueryConfig,
    error::AdapterError,
    models::{Coordinate, Poi, PoiType, Source},
};

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    elements: Vec<Value>,
    remark: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Element {
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
struct Center {
    lat: f64,
    lon: f64,
}

impl Element {
    fn tag(&self, key: &str) -> Option<String> {
        non_empty(self.tags.get(key).map(String::as_str))
    }

    /// Nodes carry their own position, ways and relations only a computed center.
    fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => Some((lat, lon)),
            (_, _, Some(center)) => Some((center.lat, center.lon)),
            _ => None,
        }
    }
}

/// Map-data tag index, queried for tourism, historic and a few amenity tag families.
#[derive(Debug)]
pub struct TagQuery {
    client: Client,
    endpoint: String,
    limit: Option<usize>,
    timeout: Duration,
    enabled: bool,
    rate_limiter: RateLimiter,
}

impl TagQuery {
    pub fn new(config: &TagQueryConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            limit: config.limit,
            timeout: config.timeout(),
            enabled: config.enabled,
            rate_limiter: RateLimiter::new(config.min_interval()),
        }
    }

    pub(crate) fn build_query(&self, origin: &Coordinate, radius_m: u32) -> String {
        let around = format!(
            "around:{},{},{}",
            radius_m,
            origin.latitude(),
            origin.longitude()
        );
        let filters = [
            r#"["tourism"~"^(attraction|museum|gallery|viewpoint|artwork)$"]"#,
            r#"["historic"]"#,
            r#"["amenity"="place_of_worship"]["name"]"#,
            r#"["leisure"~"^(park|garden)$"]["name"]"#,
            r#"["place"="square"]"#,
        ];

        let mut query = format!("[out:json][timeout:{}];\n(\n", self.timeout.as_secs());
        for filter in filters {
            query.push_str(&format!("  nwr({}){};\n", around, filter));
        }
        query.push_str(");\nout center tags;");
        query
    }

    pub(crate) fn parse_response(
        body: &str,
        origin: &Coordinate,
    ) -> Result<Vec<Poi>, AdapterError> {
        let response: Response = serde_json::from_str(body).map_err(|e| AdapterError::Parse {
            adapter: Source::TagQuery,
            message: e.to_string(),
        })?;

        // the server reports runtime errors (e.g. its own timeout) as a remark next to partial data
        if let Some(remark) = &response.remark {
            log::warn!("Tag query remark: {}", remark);
            if response.elements.is_empty() && remark.contains("error") {
                return Err(AdapterError::Api {
                    adapter: Source::TagQuery,
                    message: remark.clone(),
                });
            }
        }

        Ok(response
            .elements
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Element>(value) {
                Ok(element) => Self::to_poi(element, origin),
                Err(e) => {
                    log::warn!("Skipping malformed tag query element: {}", e);
                    None
                }
            })
            .collect())
    }

    fn to_poi(element: Element, origin: &Coordinate) -> Option<Poi> {
        let name = element.tag("name")?;

        let Some((lat, lon)) = element.position() else {
            log::warn!("Skipping element {} without position", element.id);
            return None;
        };
        let coordinate = match Coordinate::new(lat, lon) {
            Ok(coordinate) => coordinate,
            Err(e) => {
                log::warn!("Skipping element {}: {}", element.id, e);
                return None;
            }
        };

        let mut poi = Poi::new(
            Source::TagQuery,
            name,
            classify(&element.tags),
            coordinate,
            origin,
        );
        poi.description = element.tag("description");
        poi.external_entity_id = element.tag("wikidata");
        poi.wikipedia_title = element.tag("wikipedia").map(|w| article_title(&w));
        poi.website = element
            .tag("website")
            .or_else(|| element.tag("contact:website"))
            .or_else(|| element.tag("url"));
        poi.opening_hours = element.tag("opening_hours");
        poi.heritage_status = element.tag("heritage");
        poi.image_url = element.tag("image");
        poi.year_established = element.tag("start_date").and_then(|d| parse_year(&d));

        Some(poi.scored())
    }
}

/// `en:Eiffel Tower` -> `Eiffel Tower`; values without a language prefix are kept.
fn article_title(value: &str) -> String {
    match value.split_once(':') {
        Some((lang, title))
            if (2..=3).contains(&lang.len()) && lang.chars().all(|c| c.is_ascii_lowercase()) =>
        {
            title.trim().to_string()
        }
        _ => value.to_string(),
    }
}

fn classify(tags: &HashMap<String, String>) -> PoiType {
    let tag = |key: &str| tags.get(key).map(String::as_str);

    match (tag("tourism"), tag("historic"), tag("amenity")) {
        (Some("museum" | "gallery"), _, _) => PoiType::Museum,
        (_, _, Some("place_of_worship")) => PoiType::ReligiousSite,
        (_, Some("monument" | "memorial"), _) => PoiType::Monument,
        (_, Some(_), _) => PoiType::HistoricSite,
        (Some("viewpoint"), _, _) => PoiType::Viewpoint,
        _ if matches!(tag("leisure"), Some("park" | "garden")) => PoiType::Park,
        _ if tag("place") == Some("square") => PoiType::Square,
        (Some("attraction"), _, _) => PoiType::TouristAttraction,
        (Some("artwork"), _, _) => PoiType::Landmark,
        _ => PoiType::Other,
    }
}

#[async_trait]
impl SourceAdapter for TagQuery {
    fn source(&self) -> Source {
        Source::TagQuery
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn limit(&self) -> Option<usize> {
        self.limit
    }

    async fn fetch_nearby(
        &self,
        origin: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<Poi>, AdapterError> {
        let query = self.build_query(&origin, radius_m);
        log::debug!("Tag query: {}", query);

        self.rate_limiter.acquire().await;
        let request = self.client.post(&self.endpoint).form(&[("data", query)]);

        let body = read_body(Source::TagQuery, self.timeout, request).await?;
        Self::parse_response(&body, &origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Coordinate {
        Coordinate::new(48.8584, 2.2945).unwrap()
    }

    #[test]
    fn test_build_query() {
        let adapter = TagQuery::new(&TagQueryConfig::default());
        let query = adapter.build_query(&origin(), 1500);

        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains(r#"nwr(around:1500,48.8584,2.2945)["historic"];"#));
        assert!(query.contains(r#"["amenity"="place_of_worship"]["name"]"#));
        assert!(query.ends_with("out center tags;"));
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 1, "lat": 48.85837, "lon": 2.294481, "tags": {
                    "name": "Eiffel Tower", "tourism": "attraction", "wikidata": "Q243",
                    "wikipedia": "fr:Tour Eiffel", "website": "https://www.toureiffel.paris",
                    "opening_hours": "Mo-Su 09:00-23:45", "heritage": "1", "start_date": "1889"
                }},
                {"type": "node", "id": 2, "lat": 48.859, "lon": 2.295, "tags": {"tourism": "artwork"}},
                {"type": "way", "id": 3, "center": {"lat": 48.8556, "lon": 2.2986}, "tags": {
                    "name": "Champ de Mars", "leisure": "park"
                }},
                {"type": "node", "id": 4, "lat": 48.86, "tags": {"name": "No longitude"}},
                {"type": "node", "id": "five", "lat": 48.86, "lon": 2.29, "tags": {"name": "Bad id"}},
                {"type": "node", "id": 6, "lat": 48.8612, "lon": 2.2893, "tags": {
                    "name": "Palais de Chaillot", "historic": "building", "contact:website": "https://chaillot.example"
                }}
            ]
        }"#;

        let pois = TagQuery::parse_response(body, &origin()).unwrap();
        let names: Vec<&str> = pois.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Eiffel Tower", "Champ de Mars", "Palais de Chaillot"]);

        let tower = &pois[0];
        assert_eq!(tower.poi_type, PoiType::TouristAttraction);
        assert_eq!(tower.external_entity_id.as_deref(), Some("Q243"));
        assert_eq!(tower.wikipedia_title.as_deref(), Some("Tour Eiffel"));
        assert_eq!(tower.year_established, Some(1889));
        // base 50 + entity 20 + wikipedia 15 + unesco 30 + website 5 + hours 3, clamped
        assert_eq!(tower.notability_score(), 100);
        assert!(tower.distance_from_origin < 10.0);

        assert_eq!(pois[1].poi_type, PoiType::Park);
        assert_eq!(pois[1].notability_score(), 50);

        let chaillot = &pois[2];
        assert_eq!(chaillot.poi_type, PoiType::HistoricSite);
        assert_eq!(chaillot.website.as_deref(), Some("https://chaillot.example"));
        assert_eq!(chaillot.notability_score(), 67);
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        let pois = TagQuery::parse_response(r#"{"version":0.6,"elements":[]}"#, &origin());
        assert!(pois.unwrap().is_empty());

        assert!(matches!(
            TagQuery::parse_response("rate_limited", &origin()),
            Err(AdapterError::Parse { .. })
        ));
    }

    #[test]
    fn test_runtime_error_remark() {
        let body = r#"{"elements":[],"remark":"runtime error: Query timed out in \"query\" at line 3 after 26 seconds."}"#;
        assert!(matches!(
            TagQuery::parse_response(body, &origin()),
            Err(AdapterError::Api { .. })
        ));
    }

    #[test]
    fn test_article_title() {
        assert_eq!(article_title("en:Eiffel Tower"), "Eiffel Tower");
        assert_eq!(article_title("Star Wars: A New Hope"), "Star Wars: A New Hope");
    }

    #[test]
    fn test_classify() {
        let tags = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<String, String>>()
        };

        assert_eq!(
            classify(&tags(&[("tourism", "museum"), ("historic", "castle")])),
            PoiType::Museum
        );
        assert_eq!(classify(&tags(&[("historic", "memorial")])), PoiType::Monument);
        assert_eq!(classify(&tags(&[("historic", "ruins")])), PoiType::HistoricSite);
        assert_eq!(
            classify(&tags(&[("amenity", "place_of_worship")])),
            PoiType::ReligiousSite
        );
        assert_eq!(classify(&tags(&[("tourism", "viewpoint")])), PoiType::Viewpoint);
        assert_eq!(classify(&tags(&[("place", "square")])), PoiType::Square);
        assert_eq!(classify(&tags(&[("amenity", "cafe")])), PoiType::Other);
    }
}
