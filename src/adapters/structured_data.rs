use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, header::ACCEPT};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    adapters::{SourceAdapter, non_empty, parse_year, read_body},
    config::StructuredDataConfig,
    core::Heritage,
    error::AdapterError,
    models::{Coordinate, Poi, PoiType, Source},
};

/// WKT point literal, longitude first. An optional CRS IRI may precede it.
static POINT: Lazy<Regex> = Lazy::new(|| {
    let number = r"([+-]?[0-9.]+(?:[eE][+-]?[0-9]+)?)";
    Regex::new(&format!(r"(?i)Point\(\s*{number}\s+{number}\s*\)")).expect("invalid point regex")
});

#[derive(Deserialize)]
struct Response {
    results: Results,
}

#[derive(Deserialize)]
struct Results {
    #[serde(default)]
    bindings: Vec<Value>,
}

#[derive(Deserialize, Debug)]
struct Term {
    value: String,
}

type Binding = HashMap<String, Term>;

/// Parses `Point(lon lat)` into a validated coordinate.
pub fn parse_point(literal: &str) -> Option<Coordinate> {
    let captures = POINT.captures(literal)?;
    let lon: f64 = captures.get(1)?.as_str().parse().ok()?;
    let lat: f64 = captures.get(2)?.as_str().parse().ok()?;
    Coordinate::new(lat, lon).ok()
}

/// `http://www.wikidata.org/entity/Q243` -> `Q243`.
fn entity_id(uri: &str) -> Option<String> {
    let id = uri.rsplit('/').next()?.trim();
    let mut chars = id.chars();
    match chars.next() {
        Some('Q') if id.len() > 1 && chars.all(|c| c.is_ascii_digit()) => Some(id.to_string()),
        _ => None,
    }
}

/// Everything known about one entity; the store returns one row per combination of
/// multi-valued properties.
#[derive(Debug, Default)]
struct Entity {
    id: String,
    label: Option<String>,
    description: Option<String>,
    coordinate: Option<Coordinate>,
    poi_type: Option<PoiType>,
    image: Option<String>,
    website: Option<String>,
    year: Option<i32>,
    heritage: Option<String>,
    visitors: Option<u64>,
    article: Option<String>,
}

impl Entity {
    fn absorb(&mut self, binding: &Binding, classes: &BTreeMap<String, PoiType>) {
        let get = |key: &str| non_empty(binding.get(key).map(|term| term.value.as_str()));

        if self.label.is_none() {
            // the label service falls back to the bare id when no label exists
            self.label = get("itemLabel").filter(|label| *label != self.id);
        }
        if self.description.is_none() {
            self.description = get("itemDescription");
        }
        if self.coordinate.is_none() {
            self.coordinate = get("coord").and_then(|literal| {
                let parsed = parse_point(&literal);
                if parsed.is_none() {
                    log::warn!("Skipping unparsable coordinate {:?} of {}", literal, self.id);
                }
                parsed
            });
        }
        if self.poi_type.is_none() {
            self.poi_type = get("class")
                .and_then(|uri| entity_id(&uri))
                .and_then(|class| classes.get(&class).copied());
        }
        if self.image.is_none() {
            self.image = get("image");
        }
        if self.website.is_none() {
            self.website = get("website");
        }
        if self.article.is_none() {
            self.article = get("articleTitle");
        }

        if let Some(year) = get("inception").and_then(|d| parse_year(&d)) {
            self.year = Some(self.year.map_or(year, |current| current.min(year)));
        }

        if let Some(visitors) = get("visitors")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
        {
            let visitors = visitors as u64;
            self.visitors = Some(self.visitors.map_or(visitors, |current| current.max(visitors)));
        }

        let heritage = get("heritageLabel")
            .filter(|label| entity_id(label).is_none())
            .or_else(|| get("heritage").and_then(|uri| entity_id(&uri)));
        // keep the strongest designation when an entity has several
        if let Some(heritage) = heritage
            && Heritage::classify(Some(&heritage)) > Heritage::classify(self.heritage.as_deref())
        {
            self.heritage = Some(heritage);
        }
    }

    fn into_poi(self, origin: &Coordinate) -> Option<Poi> {
        let Some(name) = self.label else {
            log::debug!("Skipping unlabelled entity {}", self.id);
            return None;
        };
        let Some(coordinate) = self.coordinate else {
            log::warn!("Skipping entity {} without coordinate", self.id);
            return None;
        };

        let mut poi = Poi::new(
            Source::StructuredData,
            name,
            self.poi_type.unwrap_or(PoiType::Other),
            coordinate,
            origin,
        );
        poi.description = self.description;
        poi.external_entity_id = Some(self.id);
        poi.image_url = self.image;
        poi.website = self.website;
        poi.year_established = self.year;
        poi.heritage_status = self.heritage;
        poi.annual_visitors = self.visitors;
        poi.wikipedia_title = self.article;
        Some(poi.scored())
    }
}

/// Semantic graph store, queried for instances of notable place classes around a point.
#[derive(Clone, Debug)]
pub struct StructuredData {
    client: Client,
    endpoint: String,
    limit: usize,
    timeout: Duration,
    enabled: bool,
    language: String,
    classes: BTreeMap<String, PoiType>,
}

impl StructuredData {
    pub fn new(config: &StructuredDataConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            limit: config.limit,
            timeout: config.timeout(),
            enabled: config.enabled,
            language: config.language.clone(),
            classes: config.classes.clone(),
        }
    }

    pub(crate) fn build_query(&self, origin: &Coordinate, radius_m: u32) -> String {
        let classes = self
            .classes
            .keys()
            .map(|class| format!("wd:{}", class))
            .collect::<Vec<String>>()
            .join(" ");

        // the limit applies to distinct entities, nearest first, before the optional
        // properties multiply the rows of each one
        format!(
            r#"SELECT ?item ?itemLabel ?itemDescription ?dist ?coord ?class ?image ?website ?inception ?heritage ?heritageLabel ?visitors ?articleTitle WHERE {{
  {{
    SELECT ?item (MIN(?itemDist) AS ?dist) WHERE {{
      SERVICE wikibase:around {{
        ?item wdt:P625 ?itemCoord .
        bd:serviceParam wikibase:center "Point({lon} {lat})"^^geo:wktLiteral .
        bd:serviceParam wikibase:radius "{radius_km}" .
        bd:serviceParam wikibase:distance ?itemDist .
      }}
      VALUES ?itemClass {{ {classes} }}
      ?item wdt:P31 ?itemClass .
    }}
    GROUP BY ?item
    ORDER BY ?dist
    LIMIT {limit}
  }}
  VALUES ?class {{ {classes} }}
  ?item wdt:P625 ?coord ;
        wdt:P31 ?class .
  OPTIONAL {{ ?item wdt:P18 ?image . }}
  OPTIONAL {{ ?item wdt:P856 ?website . }}
  OPTIONAL {{ ?item wdt:P571 ?inception . }}
  OPTIONAL {{ ?item wdt:P1435 ?heritage . }}
  OPTIONAL {{ ?item wdt:P1174 ?visitors . }}
  OPTIONAL {{
    ?article schema:about ?item ;
             schema:isPartOf <https://{lang}.wikipedia.org/> ;
             schema:name ?articleTitle .
  }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language "{lang},en" . }}
}}
ORDER BY ?dist"#,
            classes = classes,
            lon = origin.longitude(),
            lat = origin.latitude(),
            radius_km = radius_m as f64 / 1000.0,
            lang = self.language,
            limit = self.limit,
        )
    }

    pub(crate) fn parse_response(
        &self,
        body: &str,
        origin: &Coordinate,
    ) -> Result<Vec<Poi>, AdapterError> {
        let response: Response = serde_json::from_str(body).map_err(|e| AdapterError::Parse {
            adapter: Source::StructuredData,
            message: e.to_string(),
        })?;

        let mut entities: Vec<Entity> = vec![];
        let mut index: HashMap<String, usize> = HashMap::new();

        for value in response.results.bindings {
            let binding: Binding = match serde_json::from_value(value) {
                Ok(binding) => binding,
                Err(e) => {
                    log::warn!("Skipping malformed binding: {}", e);
                    continue;
                }
            };
            let Some(id) = binding.get("item").and_then(|term| entity_id(&term.value)) else {
                log::warn!("Skipping binding without entity");
                continue;
            };

            let position = *index.entry(id.clone()).or_insert_with(|| {
                entities.push(Entity {
                    id,
                    ..Default::default()
                });
                entities.len() - 1
            });
            entities[position].absorb(&binding, &self.classes);
        }

        Ok(entities
            .into_iter()
            .filter_map(|entity| entity.into_poi(origin))
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for StructuredData {
    fn source(&self) -> Source {
        Source::StructuredData
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
        let query = self.build_query(&origin, radius_m);
        log::debug!("Structured data query: {}", query);

        let request = self
            .client
            .get(&self.endpoint)
            .header(ACCEPT, "application/sparql-results+json")
            .query(&[("query", query.as_str()), ("format", "json")]);

        let body = read_body(Source::StructuredData, self.timeout, request).await?;
        self.parse_response(&body, &origin)
    }
}
