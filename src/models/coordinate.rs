use serde::{Deserialize, Serialize};

use crate::{error::GeoError, utils::distance};

/// A validated WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        distance::validate(latitude, longitude)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance in meters. Both ends are already validated.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        distance::haversine(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Coordinate rounded to `decimals` places, for use in keys and ids.
    pub fn rounded(&self, decimals: u32) -> (f64, f64) {
        let factor = 10f64.powi(decimals as i32);
        (
            (self.latitude * factor).round() / factor,
            (self.longitude * factor).round() / factor,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Coordinate::new(91.0, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Result<Coordinate, _> =
            serde_json::from_str(r#"{"latitude": 48.8584, "longitude": 2.2945}"#);
        assert!(ok.is_ok());

        let bad: Result<Coordinate, _> =
            serde_json::from_str(r#"{"latitude": 120.0, "longitude": 2.2945}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_rounded() {
        let coordinate = Coordinate::new(48.858_44, 2.294_48).unwrap();
        assert_eq!(coordinate.rounded(3), (48.858, 2.294));
    }
}
