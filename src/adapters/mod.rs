use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{RequestBuilder, header::USER_AGENT};

use crate::{
    config::Config,
    error::AdapterError,
    models::{Coordinate, Poi, Source},
};

pub mod geosearch;
pub mod rate_limit;
pub mod structured_data;
pub mod tag_query;

pub use geosearch::Geosearch;
pub use rate_limit::RateLimiter;
pub use structured_data::StructuredData;
pub use tag_query::TagQuery;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// One open-data source, converting its wire format into [`Poi`] records.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> Source;
    fn enabled(&self) -> bool;
    fn timeout(&self) -> Duration;
    fn limit(&self) -> Option<usize>;

    fn name(&self) -> &'static str {
        match self.source() {
            Source::Geosearch => "geosearch",
            Source::TagQuery => "tag-query",
            Source::StructuredData => "structured-data",
        }
    }

    /// Zero results is `Ok(vec![])`; only transport, status and whole-document
    /// decoding problems are errors.
    async fn fetch_nearby(
        &self,
        origin: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<Poi>, AdapterError>;

    /// Like [`SourceAdapter::fetch_nearby`], dropping records outside the radius and
    /// keeping at most [`SourceAdapter::limit`] of the closest.
    async fn filtered_fetch(
        &self,
        origin: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<Poi>, AdapterError> {
        let mut pois = self.fetch_nearby(origin, radius_m).await?;
        let fetched = pois.len();

        pois.retain(|poi| poi.distance_from_origin <= radius_m as f64);
        pois.sort_by(|a, b| a.distance_from_origin.total_cmp(&b.distance_from_origin));
        if let Some(limit) = self.limit() {
            pois.truncate(limit);
        }

        log::info!(
            "{} records left from {} fetched by {} (radius {}m, limit {})",
            pois.len(),
            fetched,
            self.name(),
            radius_m,
            self.limit().unwrap_or(0)
        );

        Ok(pois)
    }
}

pub type BoxedSourceAdapter = Arc<dyn SourceAdapter>;

/// Builds every adapter described in `config`, disabled ones included.
pub fn from_config(config: &Config) -> Vec<BoxedSourceAdapter> {
    vec![
        Arc::new(Geosearch::new(&config.geosearch)),
        Arc::new(TagQuery::new(&config.tag_query)),
        Arc::new(StructuredData::new(&config.structured_data)),
    ]
}

/// Sends `request` and returns the body of a successful response.
pub(crate) async fn read_body(
    source: Source,
    timeout: Duration,
    request: RequestBuilder,
) -> Result<String, AdapterError> {
    let response = request
        .header(USER_AGENT, APP_USER_AGENT)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AdapterError::from_reqwest(source, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        log::warn!("{} answered with HTTP {}", source, status);
        return Err(AdapterError::Status {
            adapter: source,
            status,
        });
    }

    response
        .text()
        .await
        .map_err(|e| AdapterError::from_reqwest(source, timeout, e))
}

/// Leading, optionally negative, year of a date-ish string:
/// `1889-03-31`, `~1650`, `-0500-01-01T00:00:00Z`.
pub(crate) fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim().trim_start_matches(['~', '+']);
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 || end > 4 {
        return None;
    }

    let year: i32 = digits[..end].parse().ok()?;
    Some(if negative { -year } else { year })
}

/// Trimmed value, or `None` for blanks.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
