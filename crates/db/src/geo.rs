//! Geographic primitives for proximity search.

use thiserror::Error;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Coordinate validation error.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GeoError {
    /// Latitude outside [-90, 90] or not finite.
    #[error("latitude out of range: {0}")]
    Latitude(f64),
    /// Longitude outside [-180, 180] or not finite.
    #[error("longitude out of range: {0}")]
    Longitude(f64),
}

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Create a point, validating WGS84 ranges.
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::Latitude(lat));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::Longitude(lng));
        }
        Ok(Self { lat, lng })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Smallest lat/lng box containing every point within `radius_m`.
    ///
    /// The longitude range is `None` when the box would cross a pole or the
    /// antimeridian; callers then skip the longitude prefilter.
    #[must_use]
    pub fn bounding_box(&self, radius_m: f64) -> BoundingBox {
        let delta_lat = (radius_m / EARTH_RADIUS_M).to_degrees();
        let min_lat = self.lat - delta_lat;
        let max_lat = self.lat + delta_lat;

        if min_lat <= -90.0 || max_lat >= 90.0 {
            return BoundingBox {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                lng_range: None,
            };
        }

        // Widest at the latitude edge closest to a pole
        let widest = self.lat.abs() + delta_lat;
        let delta_lng = (radius_m / (EARTH_RADIUS_M * widest.to_radians().cos())).to_degrees();
        let min_lng = self.lng - delta_lng;
        let max_lng = self.lng + delta_lng;

        let lng_range = if min_lng < -180.0 || max_lng > 180.0 {
            None
        } else {
            Some((min_lng, max_lng))
        };

        BoundingBox {
            min_lat,
            max_lat,
            lng_range,
        }
    }
}

/// Latitude/longitude bounds used to prefilter proximity queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Southern bound in degrees.
    pub min_lat: f64,
    /// Northern bound in degrees.
    pub max_lat: f64,
    /// Western and eastern bounds in degrees, if representable.
    pub lng_range: Option<(f64, f64)>,
}
