use super::domain::{GeoPoint, Pincode};
use std::collections::HashMap;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points using the haversine formula.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let phi1 = from.latitude.to_radians();
    let phi2 = to.latitude.to_radians();
    let delta_phi = (to.latitude - from.latitude).to_radians();
    let delta_lambda = (to.longitude - from.longitude).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Resolves the distance between two location identifiers.
///
/// `None` means at least one identifier is unknown; callers treat it as an unknown distance
/// rather than a failure.
pub trait DistanceResolver: Send + Sync {
    fn distance_km(&self, from: Pincode, to: Pincode) -> Option<f64>;
}

/// Static pincode to coordinate table loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct PincodeDirectory {
    points: HashMap<Pincode, GeoPoint>,
}

impl PincodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later entries for the same pincode replace earlier ones.
    pub fn insert(&mut self, pincode: Pincode, point: GeoPoint) {
        self.points.insert(pincode, point);
    }

    pub fn lookup(&self, pincode: Pincode) -> Option<GeoPoint> {
        self.points.get(&pincode).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl FromIterator<(Pincode, GeoPoint)> for PincodeDirectory {
    fn from_iter<I: IntoIterator<Item = (Pincode, GeoPoint)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl DistanceResolver for PincodeDirectory {
    fn distance_km(&self, from: Pincode, to: Pincode) -> Option<f64> {
        let origin = self.lookup(from)?;
        let destination = self.lookup(to)?;
        Some(haversine_km(origin, destination))
    }
}
