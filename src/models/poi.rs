use std::collections::BTreeSet;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::core::notability::{MAX_SCORE, NotabilityFlags, calculate_notability_score};
use crate::models::{Coordinate, Source};
use crate::utils::similarity::normalize_name;

#[derive(
    strum_macros::Display,
    clap::ValueEnum,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum PoiType {
    Monument,
    Museum,
    Landmark,
    ReligiousSite,
    Park,
    Viewpoint,
    TouristAttraction,
    HistoricSite,
    Square,
    Other,
}

impl PoiType {
    pub const ALL: [PoiType; 10] = [
        PoiType::Monument,
        PoiType::Museum,
        PoiType::Landmark,
        PoiType::ReligiousSite,
        PoiType::Park,
        PoiType::Viewpoint,
        PoiType::TouristAttraction,
        PoiType::HistoricSite,
        PoiType::Square,
        PoiType::Other,
    ];

    pub fn is_historic(&self) -> bool {
        matches!(self, PoiType::Monument | PoiType::HistoricSite)
    }

    /// Best-effort classification from a free-text title, matching whole words only.
    pub fn from_keywords(text: &str) -> PoiType {
        let text = text.to_lowercase();
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .collect();
        let has = |keywords: &[&str]| words.iter().any(|word| keywords.contains(word));

        if has(&["museum", "museums", "gallery", "musée", "museo", "museu"]) {
            PoiType::Museum
        } else if has(&[
            "cathedral",
            "church",
            "basilica",
            "chapel",
            "abbey",
            "mosque",
            "synagogue",
            "temple",
            "monastery",
            "shrine",
        ]) {
            PoiType::ReligiousSite
        } else if has(&["monument", "memorial", "statue", "obelisk", "column"]) {
            PoiType::Monument
        } else if has(&["castle", "palace", "fortress", "fort", "ruins", "citadel"]) {
            PoiType::HistoricSite
        } else if has(&["square", "plaza", "piazza", "platz"])
            || words.windows(2).any(|pair| pair == ["place", "de"])
        {
            PoiType::Square
        } else if has(&["park", "garden", "gardens"]) {
            PoiType::Park
        } else if has(&["viewpoint", "lookout", "belvedere"]) {
            PoiType::Viewpoint
        } else if has(&["tower", "bridge", "gate", "arch"]) {
            PoiType::Landmark
        } else {
            PoiType::Other
        }
    }
}

/// A candidate real-world place, as produced by one source or merged from several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    /// Content-derived identifier, see [`Poi::derive_id`]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub poi_type: PoiType,
    pub coordinate: Coordinate,
    /// Meters from the query origin
    pub distance_from_origin: f64,
    pub sources: BTreeSet<Source>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikipedia_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heritage_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_established: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_visitors: Option<u64>,

    #[serde(deserialize_with = "deserialize_score")]
    pub(crate) notability_score: u8,
    pub(crate) discovered_at: DateTime<Utc>,
}

/// Scores read back from serialized records are clamped to the scorer's range.
fn deserialize_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u8::deserialize(deserializer)?.min(MAX_SCORE))
}

impl Poi {
    pub fn new(
        source: Source,
        name: impl Into<String>,
        poi_type: PoiType,
        coordinate: Coordinate,
        origin: &Coordinate,
    ) -> Self {
        let name = name.into().trim().to_string();
        let mut poi = Self {
            id: Self::derive_id(&name, &coordinate),
            name,
            description: None,
            poi_type,
            coordinate,
            distance_from_origin: origin.distance_to(&coordinate),
            sources: BTreeSet::from([source]),
            wikipedia_title: None,
            external_entity_id: None,
            image_url: None,
            website: None,
            opening_hours: None,
            heritage_status: None,
            year_established: None,
            annual_visitors: None,
            notability_score: 0,
            discovered_at: Utc::now(),
        };
        poi.rescore();
        poi
    }

    /// Hash of the normalized name and the coordinate rounded to 4 decimals (~11m).
    pub fn derive_id(name: &str, coordinate: &Coordinate) -> String {
        let (lat, lon) = coordinate.rounded(4);
        let mut hasher = Sha256::new();
        hasher.update(format!("{}|{:.4}|{:.4}", normalize_name(name), lat, lon).as_bytes());
        let digest = hasher.finalize();

        let mut out = String::with_capacity(16);
        for b in digest.iter().take(8) {
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    pub fn notability_score(&self) -> u8 {
        self.notability_score
    }

    pub fn discovered_at(&self) -> DateTime<Utc> {
        self.discovered_at
    }

    /// Highest merge priority among this record's sources.
    pub fn priority(&self) -> u8 {
        self.sources.iter().map(Source::priority).max().unwrap_or(0)
    }

    pub fn base_notability(&self) -> u8 {
        self.sources
            .iter()
            .map(Source::base_notability)
            .max()
            .unwrap_or(crate::core::notability::DEFAULT_BASE_SCORE)
    }

    pub fn notability_flags(&self) -> NotabilityFlags {
        NotabilityFlags::from_poi(self)
    }

    /// Recomputes the score after enrichment fields were filled in.
    pub fn scored(mut self) -> Self {
        self.rescore();
        self
    }

    pub(crate) fn rescore(&mut self) {
        self.notability_score =
            calculate_notability_score(self.base_notability(), &self.notability_flags());
    }
}
