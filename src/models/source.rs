use serde::{Deserialize, Serialize};

use crate::core::notability::DEFAULT_BASE_SCORE;

/// Provenance tag of a POI record.
#[derive(
    strum_macros::Display,
    clap::ValueEnum,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Source {
    /// Encyclopedia articles-by-coordinate search
    Geosearch,
    /// Map-data tag index
    TagQuery,
    /// Semantic graph store
    StructuredData,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Geosearch, Source::TagQuery, Source::StructuredData];

    /// Merge priority, higher wins. Reflects curation quality of the source.
    pub fn priority(&self) -> u8 {
        match self {
            Source::Geosearch => 3,
            Source::StructuredData => 2,
            Source::TagQuery => 1,
        }
    }

    /// Starting notability for records produced by this source.
    pub fn base_notability(&self) -> u8 {
        match self {
            Source::Geosearch => 75,
            Source::TagQuery | Source::StructuredData => DEFAULT_BASE_SCORE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(Source::Geosearch.priority() > Source::StructuredData.priority());
        assert!(Source::StructuredData.priority() > Source::TagQuery.priority());
    }

    #[test]
    fn test_display() {
        assert_eq!(Source::TagQuery.to_string(), "TagQuery");
        assert_eq!(
            serde_json::to_string(&Source::StructuredData).unwrap(),
            "\"structuredData\""
        );
    }
}
