use crate::models::Poi;

pub const DEFAULT_BASE_SCORE: u8 = 50;
pub const MAX_SCORE: u8 = 100;

const ENTITY_LINK_BONUS: u32 = 20;
const WIKIPEDIA_BONUS: u32 = 15;
const UNESCO_BONUS: u32 = 30;
const NATIONAL_HERITAGE_BONUS: u32 = 15;
const HIGH_VISITORS_BONUS: u32 = 10;
const WEBSITE_BONUS: u32 = 5;
const OPENING_HOURS_BONUS: u32 = 3;
const IMAGE_BONUS: u32 = 5;
const HISTORIC_BONUS: u32 = 12;

pub const HIGH_VISITOR_THRESHOLD: u64 = 1_000_000;
/// Places established before this year count as historically significant.
pub const HISTORIC_BEFORE_YEAR: i32 = 1900;

/// Graph entity for "UNESCO World Heritage Site".
const UNESCO_ENTITY: &str = "Q9259";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Heritage {
    #[default]
    None,
    National,
    Unesco,
}

impl Heritage {
    /// Interprets a heritage designation as reported by any of the sources.
    pub fn classify(status: Option<&str>) -> Heritage {
        let Some(status) = status.map(str::trim).filter(|s| !s.is_empty()) else {
            return Heritage::None;
        };

        let lower = status.to_lowercase();
        if status == "1"
            || status == UNESCO_ENTITY
            || lower.contains("unesco")
            || lower.contains("world heritage")
        {
            Heritage::Unesco
        } else {
            Heritage::National
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotabilityFlags {
    pub has_entity_link: bool,
    pub has_wikipedia: bool,
    pub heritage: Heritage,
    pub high_visitor_count: bool,
    pub has_website: bool,
    pub has_opening_hours: bool,
    pub has_image: bool,
    pub historic: bool,
}

impl NotabilityFlags {
    pub fn from_poi(poi: &Poi) -> Self {
        Self {
            has_entity_link: poi.external_entity_id.is_some(),
            has_wikipedia: poi.wikipedia_title.is_some(),
            heritage: Heritage::classify(poi.heritage_status.as_deref()),
            high_visitor_count: poi
                .annual_visitors
                .is_some_and(|visitors| visitors > HIGH_VISITOR_THRESHOLD),
            has_website: poi.website.is_some(),
            has_opening_hours: poi.opening_hours.is_some(),
            has_image: poi.image_url.is_some(),
            historic: poi.poi_type.is_historic()
                || poi
                    .year_established
                    .is_some_and(|year| year < HISTORIC_BEFORE_YEAR),
        }
    }
}

/// Scores a record from its flags, starting at `base`. Always within `0..=100`.
///
/// Must be called the same way for every source so scores stay comparable.
pub fn calculate_notability_score(base: u8, flags: &NotabilityFlags) -> u8 {
    let bonus = |flag: bool, weight: u32| if flag { weight } else { 0 };

    let heritage = match flags.heritage {
        Heritage::None => 0,
        Heritage::National => NATIONAL_HERITAGE_BONUS,
        Heritage::Unesco => UNESCO_BONUS,
    };

    let score = base as u32
        + bonus(flags.has_entity_link, ENTITY_LINK_BONUS)
        + bonus(flags.has_wikipedia, WIKIPEDIA_BONUS)
        + heritage
        + bonus(flags.high_visitor_count, HIGH_VISITORS_BONUS)
        + bonus(flags.has_website, WEBSITE_BONUS)
        + bonus(flags.has_opening_hours, OPENING_HOURS_BONUS)
        + bonus(flags.has_image, IMAGE_BONUS)
        + bonus(flags.historic, HISTORIC_BONUS);

    score.min(MAX_SCORE as u32) as u8
}
