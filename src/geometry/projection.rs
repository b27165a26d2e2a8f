//! projection.rs
//!
//! Coordinate transforms for the matching pipeline.
//!
//! - Spherical-Mercator (EPSG:3857) inverse: the peatland dataset ships
//!   with meter coordinates under a geographic label, so the store
//!   reinterprets them and converts back to lon/lat here.
//! - `LocalFrame`: an equirectangular planar frame anchored at a reference
//!   latitude. All tolerance radii are compared in this frame, in true
//!   meters. Buffering in geographic degrees is disallowed (the
//!   degree-to-meter ratio varies with latitude), and Mercator "meters"
//!   are inflated by 1/cos(lat), so neither is usable for radius tests.

/// Spherical-Mercator earth radius (EPSG:3857), meters.
const MERCATOR_R: f64 = 6378137.0;

/// Mean earth radius used for planar distances, meters.
const EARTH_R: f64 = 6371000.0;

/// Inverse spherical Mercator: EPSG:3857 meters to WGS84 (lon, lat) degrees.
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / MERCATOR_R).to_degrees();
    let lat = (2.0 * (y / MERCATOR_R).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lon, lat)
}

/// A local equirectangular metric frame.
///
/// East-west distances are scaled by the cosine of the reference latitude,
/// which keeps planar Euclidean distance within a few percent of geodesic
/// distance across a regional extent. Anchor it at the polygon dataset's
/// mean latitude before matching.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    cos_ref_lat: f64,
}

impl LocalFrame {
    pub fn new(ref_lat_deg: f64) -> Self {
        Self {
            cos_ref_lat: ref_lat_deg.to_radians().cos(),
        }
    }

    /// WGS84 (lon, lat) degrees to planar (x, y) meters.
    pub fn to_planar(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            EARTH_R * lon.to_radians() * self.cos_ref_lat,
            EARTH_R * lat.to_radians(),
        )
    }
}

/// Great-circle distance between two WGS84 points, meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_R * a.sqrt().atan2((1.0 - a).sqrt())
}
