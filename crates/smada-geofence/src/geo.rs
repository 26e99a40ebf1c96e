//! Geographic points and great-circle distance.
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_M`]. That is accurate to well under a meter at
//! campus scale, which is the only range the geofence cares about.

use serde::{Deserialize, Serialize};

use crate::error::{GeofenceError, Result};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A latitude/longitude pair in decimal degrees.
///
/// Fields are private so every value built through [`GeoPoint::new`] is
/// known to be in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    lat: f64,
    lng: f64,
}

impl GeoPoint {
    /// Create a validated point.
    ///
    /// Returns `GeofenceError::InvalidCoordinate` if latitude is outside
    /// [-90, 90], longitude outside [-180, 180], or either is not finite.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        if !lat.is_finite()
            || !lng.is_finite()
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lng)
        {
            return Err(GeofenceError::InvalidCoordinate { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    /// Create a point without validation. Use with trusted constants only.
    #[inline]
    pub const fn new_unchecked(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Point reached by travelling `distance_m` along a great circle from
    /// `self` with initial bearing `bearing_deg` (0 = north, 90 = east).
    pub fn destination(&self, bearing_deg: f64, distance_m: f64) -> GeoPoint {
        let delta = distance_m / EARTH_RADIUS_M;
        let theta = bearing_deg.to_radians();
        let phi1 = self.lat.to_radians();
        let lambda1 = self.lng.to_radians();

        let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos())
                .atan2(delta.cos() - phi1.sin() * phi2.sin());

        let lat = phi2.to_degrees().clamp(-90.0, 90.0);
        let lng = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
        GeoPoint::new_unchecked(lat, lng)
    }

    /// Point `meters` due north (negative goes south).
    pub fn offset_north(&self, meters: f64) -> GeoPoint {
        self.destination(0.0, meters)
    }

    /// Point `meters` due east (negative goes west).
    pub fn offset_east(&self, meters: f64) -> GeoPoint {
        self.destination(90.0, meters)
    }
}

#[derive(Deserialize)]
struct RawGeoPoint {
    lat: f64,
    lng: f64,
}

impl<'de> Deserialize<'de> for GeoPoint {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawGeoPoint::deserialize(deserializer)?;
        GeoPoint::new(raw.lat, raw.lng).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Great-circle distance between two points in meters (haversine).
pub fn compute_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 near antipodes.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Strategy for measuring the distance between two points.
pub trait DistanceCalculator {
    fn distance_meters(&self, a: &GeoPoint, b: &GeoPoint) -> f64;
}

/// Haversine great-circle distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Haversine;

impl DistanceCalculator for Haversine {
    fn distance_meters(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        compute_distance(a, b)
    }
}

impl<D: DistanceCalculator + ?Sized> DistanceCalculator for &D {
    fn distance_meters(&self, a: &GeoPoint, b: &GeoPoint) -> f64 {
        (**self).distance_meters(a, b)
    }
}
