//! Presence configuration loaded from the environment.

use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};

use crate::classifier::{wib_offset, LatenessCutoff};
use crate::error::{GeofenceError, Result};
use crate::geo::GeoPoint;
use crate::geofence::{GeofenceConfig, SCHOOL_ANCHOR, SCHOOL_NAME, SCHOOL_RADIUS_M};

/// Default time to wait for a location fix.
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to evaluate attendance attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceSettings {
    pub geofence: GeofenceConfig,
    /// `None` disables lateness tracking.
    pub late_cutoff: Option<LatenessCutoff>,
    pub location_timeout: Duration,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            geofence: GeofenceConfig::reference_school(),
            late_cutoff: Some(LatenessCutoff::school_default()),
            location_timeout: DEFAULT_LOCATION_TIMEOUT,
        }
    }
}

impl PresenceSettings {
    /// Load settings from environment variables.
    ///
    /// Reads:
    /// - SMADA_SCHOOL_LAT / SMADA_SCHOOL_LNG (optional, default: SMAN 2 Tanggul)
    /// - SMADA_SCHOOL_RADIUS_M (optional, default: 200)
    /// - SMADA_SCHOOL_NAME (optional, default: "SMAN 2 Tanggul")
    /// - SMADA_LATE_CUTOFF (optional, "HH:MM" or "none", default: "07:00")
    /// - SMADA_UTC_OFFSET_HOURS (optional, default: 7)
    /// - SMADA_LOCATION_TIMEOUT_SECS (optional, default: 10)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lat = parse_f64(&lookup, "SMADA_SCHOOL_LAT")?.unwrap_or(SCHOOL_ANCHOR.lat());
        let lng = parse_f64(&lookup, "SMADA_SCHOOL_LNG")?.unwrap_or(SCHOOL_ANCHOR.lng());
        let radius_m = parse_f64(&lookup, "SMADA_SCHOOL_RADIUS_M")?.unwrap_or(SCHOOL_RADIUS_M);
        let name = lookup("SMADA_SCHOOL_NAME")
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| SCHOOL_NAME.to_string());

        let geofence = GeofenceConfig::new(GeoPoint::new(lat, lng)?, radius_m, Some(name))?;

        let utc_offset = match parse_f64(&lookup, "SMADA_UTC_OFFSET_HOURS")? {
            Some(hours) => offset_from_hours(hours)?,
            None => wib_offset(),
        };

        let late_cutoff = match lookup("SMADA_LATE_CUTOFF") {
            None => Some(LatenessCutoff::new(
                LatenessCutoff::school_default().time,
                utc_offset,
            )),
            Some(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            Some(raw) => {
                let time = NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
                    GeofenceError::InvalidConfig {
                        key: "SMADA_LATE_CUTOFF".to_string(),
                        reason: format!("expected HH:MM or \"none\", got {raw:?} ({e})"),
                    }
                })?;
                Some(LatenessCutoff::new(time, utc_offset))
            }
        };

        let location_timeout = match parse_f64(&lookup, "SMADA_LOCATION_TIMEOUT_SECS")? {
            Some(secs) => timeout_from_secs(secs)?,
            None => DEFAULT_LOCATION_TIMEOUT,
        };

        Ok(Self {
            geofence,
            late_cutoff,
            location_timeout,
        })
    }
}

fn timeout_from_secs(secs: f64) -> Result<Duration> {
    let invalid = |reason: String| GeofenceError::InvalidConfig {
        key: "SMADA_LOCATION_TIMEOUT_SECS".to_string(),
        reason,
    };
    if !(secs > 0.0) {
        return Err(invalid(format!("must be a positive number of seconds, got {secs}")));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(format!("{secs} seconds: {e}")))
}

fn parse_f64<F>(lookup: &F, key: &str) -> Result<Option<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| GeofenceError::InvalidConfig {
                key: key.to_string(),
                reason: format!("expected a number, got {raw:?} ({e})"),
            }),
    }
}

fn offset_from_hours(hours: f64) -> Result<FixedOffset> {
    let secs = (hours * 3600.0).round();
    if !secs.is_finite() || secs.abs() >= 86_400.0 {
        return Err(GeofenceError::InvalidConfig {
            key: "SMADA_UTC_OFFSET_HOURS".to_string(),
            reason: format!("offset out of range: {hours}"),
        });
    }
    FixedOffset::east_opt(secs as i32).ok_or_else(|| GeofenceError::InvalidConfig {
        key: "SMADA_UTC_OFFSET_HOURS".to_string(),
        reason: format!("offset out of range: {hours}"),
    })
}
