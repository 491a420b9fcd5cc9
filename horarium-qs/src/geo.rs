//! Proximity geometry: bounding-box pre-filter and Haversine distance
//!
//! The bounding box is a cheap superset test that excludes distant
//! parishes before the exact great-circle computation. Superset is the
//! load-bearing word: the box may admit points outside the radius (the
//! Haversine pass removes them) but must never exclude a point inside it.

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres per degree of latitude.
///
/// Slightly under the true value, which widens the box: errors here must
/// always fall on the superset side.
const KM_PER_DEGREE_LAT: f64 = 111.0;

/// Latitude/longitude box around a search center.
///
/// Longitude spans are scaled by the cosine of the latitude nearest a pole
/// within the box, so the box stays a superset of the radius disk at high
/// latitudes. Near the poles (or for spans reaching half the globe) the
/// longitude test degenerates to "everything", which is still correct.
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
    all_longitudes: bool,
}

impl BoundingBox {
    pub fn around(center_lat: f64, center_lng: f64, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE_LAT;
        let min_lat = (center_lat - lat_delta).max(-90.0);
        let max_lat = (center_lat + lat_delta).min(90.0);

        // The parallel closest to a pole has the shortest degrees, so its
        // cosine gives the widest (safest) longitude delta for the box
        let widest_abs_lat = min_lat.abs().max(max_lat.abs());
        let cos_lat = widest_abs_lat.to_radians().cos();

        let lng_delta = if cos_lat > f64::EPSILON {
            radius_km / (KM_PER_DEGREE_LAT * cos_lat)
        } else {
            f64::INFINITY
        };

        if !lng_delta.is_finite() || lng_delta >= 180.0 {
            return Self {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
                all_longitudes: true,
            };
        }

        Self {
            min_lat,
            max_lat,
            min_lng: center_lng - lng_delta,
            max_lng: center_lng + lng_delta,
            all_longitudes: false,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        if self.all_longitudes {
            return true;
        }
        // A box spilling past the antimeridian wraps around
        if self.min_lng < -180.0 && lng > 0.0 {
            return lng >= self.min_lng + 360.0;
        }
        if self.max_lng > 180.0 && lng < 0.0 {
            return lng <= self.max_lng - 360.0;
        }
        lng >= self.min_lng && lng <= self.max_lng
    }
}

/// Exact great-circle distance between two points, in kilometres
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
