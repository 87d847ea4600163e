//! Great-circle geometry over WGS84 coordinates.
//!
//! Pure functions; all distances in kilometers with the conventional
//! 6371 km Earth radius.

use tracing::warn;

use crate::error::{Error, Result};

/// Mean Earth radius, kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

fn validate(lat: f64, lon: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(Error::InvalidCoordinate { lat, lon });
    }
    Ok(())
}

/// Great-circle distance between two coordinate pairs, kilometers.
///
/// # Errors
///
/// [`Error::InvalidCoordinate`] if either latitude is outside
/// `[-90, 90]` or either longitude is outside `[-180, 180]` — an
/// out-of-range input never produces a distance.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
    validate(lat1, lon1)?;
    validate(lat2, lon2)?;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    Ok(EARTH_RADIUS_KM * c)
}

/// Count candidates strictly within `radius_km` of the origin.
///
/// The bound is strict (`<`), matching the platform's nearby-report
/// semantics: a candidate exactly on the radius is not counted. A
/// candidate with out-of-range coordinates is logged and skipped; an
/// invalid origin fails the whole call.
pub fn count_within_radius(
    origin: (f64, f64),
    candidates: &[(f64, f64)],
    radius_km: f64,
) -> Result<usize> {
    validate(origin.0, origin.1)?;

    let mut count = 0;
    for &(lat, lon) in candidates {
        match haversine_km(origin.0, origin.1, lat, lon) {
            Ok(d) if d < radius_km => count += 1,
            Ok(_) => {}
            Err(e) => {
                warn!(lat, lon, error = %e, "skipping candidate with invalid coordinates");
            }
        }
    }
    Ok(count)
}
