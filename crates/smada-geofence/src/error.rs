//! Error types for smada-geofence

use thiserror::Error;

/// Errors raised while building geofence configuration.
///
/// Classification itself never fails; every attempt yields an
/// `AttendanceOutcome`. These errors surface at configuration-load time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeofenceError {
    /// Latitude or longitude outside its valid range, or not finite
    #[error("invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    /// Negative or non-finite geofence radius
    #[error("invalid geofence radius: {radius_m}m (must be a finite value >= 0)")]
    InvalidRadius { radius_m: f64 },

    /// Malformed configuration value
    #[error("invalid configuration for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },
}

/// Result type for smada-geofence operations
pub type Result<T> = std::result::Result<T, GeofenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_radius_display() {
        let err = GeofenceError::InvalidRadius { radius_m: -5.0 };
        assert!(err.to_string().contains("-5"));
        assert!(err.to_string().contains("invalid geofence radius"));
    }

    #[test]
    fn test_invalid_config_names_key() {
        let err = GeofenceError::InvalidConfig {
            key: "SMADA_LATE_CUTOFF".to_string(),
            reason: "expected HH:MM".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SMADA_LATE_CUTOFF"));
        assert!(msg.contains("expected HH:MM"));
    }
}
