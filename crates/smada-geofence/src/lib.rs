//! SMADA Geofence: Geofenced Presence Evaluator
//!
//! Decides whether a check-in or check-out attempt happened inside the
//! school geofence, and whether an `in` attempt was on time.
//!
//! ## Key Components
//!
//! - [`compute_distance`]: haversine great-circle distance in meters
//! - [`classify_attempt`]: radius + cutoff policy producing an [`AttendanceOutcome`]
//! - [`LocationSource`]: async port for the device's position, with timeout handling
//! - [`PresenceSettings`]: geofence and cutoff configuration from the environment
//!
//! The classifier is pure and synchronous: no I/O, no shared state, safe to
//! call from any thread.

pub mod classifier;
mod error;
pub mod geo;
pub mod geofence;
pub mod location;
pub mod obs;
pub mod settings;
pub mod telemetry;

pub use classifier::{
    classify_attempt, wib_offset, AttendanceAttempt, AttendanceOutcome, Direction,
    LatenessCutoff, LocationFailure, LocationReport, OnTimeStatus, PresenceClassifier, Verdict,
};
pub use error::{GeofenceError, Result};
pub use geo::{compute_distance, DistanceCalculator, GeoPoint, Haversine, EARTH_RADIUS_M};
pub use geofence::{GeofenceConfig, SCHOOL_ANCHOR, SCHOOL_NAME, SCHOOL_RADIUS_M};
pub use location::{
    acquire_report, FailingLocationSource, FixedLocationSource, LocationReading, LocationSource,
};
pub use obs::{emit_attempt_classified, emit_location_failed, AttemptSpan};
pub use settings::{PresenceSettings, DEFAULT_LOCATION_TIMEOUT};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
