//! Great-circle distance between agents.

use super::types::Coordinates;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometers.
pub fn distance_km(p1: Coordinates, p2: Coordinates) -> f64 {
  let lat1 = p1.lat.to_radians();
  let lat2 = p2.lat.to_radians();
  let dlat = (p2.lat - p1.lat).to_radians();
  let dlong = (p2.long - p1.long).to_radians();

  let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlong / 2.0).sin().powi(2);
  EARTH_RADIUS_KM * 2.0 * a.sqrt().asin()
}
