//! Geofence configuration: an anchor point plus an inclusive radius.

use serde::{Deserialize, Serialize};

use crate::error::{GeofenceError, Result};
use crate::geo::{compute_distance, GeoPoint};

/// Anchor of the reference deployment (SMAN 2 Tanggul).
pub const SCHOOL_ANCHOR: GeoPoint = GeoPoint::new_unchecked(-8.156534, 113.447512);

/// Radius of the reference deployment, in meters.
pub const SCHOOL_RADIUS_M: f64 = 200.0;

/// Name of the reference deployment.
pub const SCHOOL_NAME: &str = "SMAN 2 Tanggul";

/// A circular region in which attendance may be recorded.
///
/// Built once when configuration is loaded and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeofenceConfig {
    anchor: GeoPoint,
    radius_m: f64,
    name: Option<String>,
}

impl GeofenceConfig {
    /// Validate and build a geofence.
    ///
    /// Fails fast on a negative or non-finite radius, or an anchor outside
    /// the valid coordinate range.
    pub fn new(anchor: GeoPoint, radius_m: f64, name: Option<String>) -> Result<Self> {
        // Re-check in case the anchor came through new_unchecked.
        GeoPoint::new(anchor.lat(), anchor.lng())?;
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(GeofenceError::InvalidRadius { radius_m });
        }
        Ok(Self {
            anchor,
            radius_m,
            name,
        })
    }

    /// The fixed school geofence: 200 m around SMAN 2 Tanggul.
    pub fn reference_school() -> Self {
        Self {
            anchor: SCHOOL_ANCHOR,
            radius_m: SCHOOL_RADIUS_M,
            name: Some(SCHOOL_NAME.to_string()),
        }
    }

    pub fn anchor(&self) -> &GeoPoint {
        &self.anchor
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display label, falling back to the anchor coordinates.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.anchor.to_string(),
        }
    }

    /// Whether `point` lies inside the fence (boundary inclusive).
    pub fn contains(&self, point: &GeoPoint) -> bool {
        compute_distance(&self.anchor, point) <= self.radius_m
    }
}

#[derive(Deserialize)]
struct RawGeofence {
    anchor: GeoPoint,
    radius_m: f64,
    #[serde(default)]
    name: Option<String>,
}

impl<'de> Deserialize<'de> for GeofenceConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawGeofence::deserialize(deserializer)?;
        GeofenceConfig::new(raw.anchor, raw.radius_m, raw.name).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_radius_rejected() {
        let err = GeofenceConfig::new(SCHOOL_ANCHOR, -1.0, None).unwrap_err();
        assert_eq!(err, GeofenceError::InvalidRadius { radius_m: -1.0 });
    }

    #[test]
    fn test_nan_radius_rejected() {
        assert!(GeofenceConfig::new(SCHOOL_ANCHOR, f64::NAN, None).is_err());
    }

    #[test]
    fn test_zero_radius_allowed() {
        let fence = GeofenceConfig::new(SCHOOL_ANCHOR, 0.0, None).unwrap();
        assert!(fence.contains(&SCHOOL_ANCHOR));
    }

    #[test]
    fn test_unchecked_out_of_range_anchor_rejected() {
        let bad = GeoPoint::new_unchecked(95.0, 0.0);
        assert!(matches!(
            GeofenceConfig::new(bad, 10.0, None),
            Err(GeofenceError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn test_reference_school() {
        let fence = GeofenceConfig::reference_school();
        assert_eq!(fence.radius_m(), 200.0);
        assert_eq!(fence.name(), Some("SMAN 2 Tanggul"));
        assert_eq!(fence.label(), "SMAN 2 Tanggul");
    }

    #[test]
    fn test_label_without_name_uses_anchor() {
        let fence = GeofenceConfig::new(SCHOOL_ANCHOR, 50.0, None).unwrap();
        assert_eq!(fence.label(), "(-8.156534, 113.447512)");
    }

    #[test]
    fn test_deserialize_validates_radius() {
        let json = r#"{"anchor":{"lat":-8.1,"lng":113.4},"radius_m":-3.0}"#;
        assert!(serde_json::from_str::<GeofenceConfig>(json).is_err());

        let json = r#"{"anchor":{"lat":-8.1,"lng":113.4},"radius_m":75.0,"name":"Lab"}"#;
        let fence: GeofenceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(fence.name(), Some("Lab"));
    }
}
