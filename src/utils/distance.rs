use crate::error::GeoError;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub(crate) fn validate(latitude: f64, longitude: f64) -> Result<(), GeoError> {
    if latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
    {
        Ok(())
    } else {
        Err(GeoError::InvalidCoordinate {
            latitude,
            longitude,
        })
    }
}

/// Great-circle distance in meters between two points.
///
/// Fails with [`GeoError::InvalidCoordinate`] for out of range input instead of clamping.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64, GeoError> {
    validate(lat1, lon1)?;
    validate(lat2, lon2)?;
    Ok(haversine(lat1, lon1, lat2, lon2))
}

pub(crate) fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` marginally above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: [(f64, f64, f64, f64); 4] = [
        (48.8584, 2.2945, 48.8606, 2.3376),
        (-33.8568, 151.2153, 51.5007, -0.1246),
        (0.0, 0.0, 0.0, 180.0),
        (89.9, -179.9, -89.9, 179.9),
    ];

    #[test]
    fn test_symmetric() {
        for (lat1, lon1, lat2, lon2) in PAIRS {
            let ab = distance(lat1, lon1, lat2, lon2).unwrap();
            let ba = distance(lat2, lon2, lat1, lon1).unwrap();
            assert!((ab - ba).abs() < 1e-6, "{ab} != {ba}");
        }
    }

    #[test]
    fn test_same_point_is_zero() {
        for (lat, lon, _, _) in PAIRS {
            assert_eq!(distance(lat, lon, lat, lon).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_reference_pair() {
        // Eiffel Tower to Arc de Triomphe
        let d = distance(48.8584, 2.2945, 48.8738, 2.2950).unwrap();
        let expected = 1_713.0;
        assert!((d - expected).abs() / expected < 0.01, "got {d}");

        // Eiffel Tower to Place de la Concorde
        let d = distance(48.8584, 2.2945, 48.8656, 2.3212).unwrap();
        let expected = 2_111.0;
        assert!((d - expected).abs() / expected < 0.01, "got {d}");
    }

    #[test]
    fn test_half_circumference() {
        let d = distance(0.0, 0.0, 0.0, 180.0).unwrap();
        let expected = std::f64::consts::PI * EARTH_RADIUS_M;
        assert!((d - expected).abs() < 1.0);
    }

    #[test]
    fn test_invalid_coordinate() {
        assert_eq!(
            distance(90.5, 0.0, 0.0, 0.0),
            Err(GeoError::InvalidCoordinate {
                latitude: 90.5,
                longitude: 0.0
            })
        );
        assert!(distance(0.0, 0.0, 0.0, 181.0).is_err());
        assert!(distance(0.0, f64::INFINITY, 0.0, 0.0).is_err());
    }
}
