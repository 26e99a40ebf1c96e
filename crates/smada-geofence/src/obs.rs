//! Structured observability hooks for attendance attempts.
//!
//! Events are emitted at `info!` level unless noted (configurable via
//! `RUST_LOG`). For JSON output pass `--json` to the CLI.

use tracing::{info, warn};

use crate::classifier::{AttendanceAttempt, AttendanceOutcome, LocationReport};

/// RAII guard that enters an attempt-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = AttemptSpan::enter("2024001", "in");
/// // every event until the guard drops carries reporter_id = "2024001"
/// ```
pub struct AttemptSpan {
    _span: tracing::span::EnteredSpan,
}

impl AttemptSpan {
    pub fn enter(reporter_id: &str, direction: &str) -> Self {
        let span = tracing::info_span!(
            "smada.attempt",
            reporter_id = %reporter_id,
            direction = %direction
        );
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: an attempt was classified.
pub fn emit_attempt_classified(attempt: &AttendanceAttempt, outcome: &AttendanceOutcome) {
    if let LocationReport::Failed { failure } = &attempt.location {
        emit_location_failed(&attempt.reporter_id, failure);
    }
    info!(
        event = "attendance.classified",
        reporter_id = %attempt.reporter_id,
        direction = %attempt.direction,
        verdict = %outcome.verdict,
        distance_m = outcome.distance_meters.unwrap_or(-1.0),
        radius_m = outcome.radius_m,
        on_time_status = ?outcome.on_time_status,
    );
}

/// Emit event: location could not be obtained (warning level).
pub fn emit_location_failed(reporter_id: &str, failure: &dyn std::fmt::Display) {
    warn!(event = "attendance.location_failed", reporter_id = %reporter_id, failure = %failure);
}
