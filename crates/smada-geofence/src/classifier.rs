//! Presence classification for check-in / check-out attempts.
//!
//! Policy, first match wins:
//!
//! | Condition                         | Verdict               | within | on-time status          |
//! |-----------------------------------|-----------------------|--------|-------------------------|
//! | location permission denied        | `RejectedPermission`  | false  | not-applicable          |
//! | location unavailable              | `RejectedUnavailable` | false  | not-applicable          |
//! | distance > radius                 | `RejectedDistance`    | false  | not-applicable          |
//! | distance <= radius, `in` + cutoff | `Accepted`            | true   | on-time / late          |
//! | distance <= radius, otherwise     | `Accepted`            | true   | not-applicable          |
//!
//! Lateness is informational and never rejects an attempt.

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{DistanceCalculator, GeoPoint, Haversine};
use crate::geofence::GeofenceConfig;

/// Declared direction of an attendance attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
        }
    }
}

/// Failure signal from the upstream location source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "kebab-case")]
pub enum LocationFailure {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable")]
    Unavailable,
}

/// What the location source produced for this attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocationReport {
    /// A position fix, with the reported accuracy radius if known.
    Fix {
        point: GeoPoint,
        accuracy_m: Option<f64>,
    },
    /// No position could be obtained.
    Failed { failure: LocationFailure },
}

impl LocationReport {
    pub fn fix(point: GeoPoint) -> Self {
        LocationReport::Fix {
            point,
            accuracy_m: None,
        }
    }

    pub fn failed(failure: LocationFailure) -> Self {
        LocationReport::Failed { failure }
    }

    pub fn point(&self) -> Option<&GeoPoint> {
        match self {
            LocationReport::Fix { point, .. } => Some(point),
            LocationReport::Failed { .. } => None,
        }
    }
}

/// Input to the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceAttempt {
    /// Opaque reporter identity, passed through unvalidated.
    pub reporter_id: String,
    pub location: LocationReport,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
}

impl AttendanceAttempt {
    pub fn new(
        reporter_id: impl Into<String>,
        location: LocationReport,
        timestamp: DateTime<Utc>,
        direction: Direction,
    ) -> Self {
        Self {
            reporter_id: reporter_id.into(),
            location,
            timestamp,
            direction,
        }
    }
}

/// Latest on-time check-in, as a wall-clock time in the school's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatenessCutoff {
    pub time: NaiveTime,
    pub utc_offset: FixedOffset,
}

impl LatenessCutoff {
    pub fn new(time: NaiveTime, utc_offset: FixedOffset) -> Self {
        Self { time, utc_offset }
    }

    /// 07:00 WIB (UTC+07:00).
    pub fn school_default() -> Self {
        Self {
            time: NaiveTime::from_hms_opt(7, 0, 0).expect("07:00 is a valid time"),
            utc_offset: wib_offset(),
        }
    }

    /// Whether `timestamp`, read in the cutoff's offset, is at or before it.
    pub fn is_on_time(&self, timestamp: &DateTime<Utc>) -> bool {
        timestamp.with_timezone(&self.utc_offset).time() <= self.time
    }
}

/// Western Indonesia Time, UTC+07:00.
pub fn wib_offset() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).expect("UTC+07:00 is a valid offset")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnTimeStatus {
    OnTime,
    Late,
    NotApplicable,
}

/// Terminal classification of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Accepted,
    RejectedDistance,
    RejectedPermission,
    RejectedUnavailable,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Accepted => "accepted",
            Verdict::RejectedDistance => "rejected-distance",
            Verdict::RejectedPermission => "rejected-permission",
            Verdict::RejectedUnavailable => "rejected-unavailable",
        };
        f.write_str(s)
    }
}

/// Result of classifying one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttendanceOutcome {
    /// `None` when no geometry was computed (location failure).
    pub distance_meters: Option<f64>,
    pub within_geofence: bool,
    pub on_time_status: OnTimeStatus,
    pub verdict: Verdict,
    /// Radius the attempt was measured against.
    pub radius_m: f64,
}

impl AttendanceOutcome {
    /// One-line user-facing summary.
    pub fn message(&self) -> String {
        match self.verdict {
            Verdict::Accepted => {
                let distance = self.distance_meters.unwrap_or_default();
                match self.on_time_status {
                    OnTimeStatus::Late => format!(
                        "Attendance recorded (late), {:.0}m from school",
                        distance
                    ),
                    _ => format!("Attendance recorded, {:.0}m from school", distance),
                }
            }
            Verdict::RejectedDistance => format!(
                "Outside the geofence: you are {:.0}m away, maximum is {:.0}m",
                self.distance_meters.unwrap_or_default(),
                self.radius_m
            ),
            Verdict::RejectedPermission => {
                "Location permission denied; allow location access and try again".to_string()
            }
            Verdict::RejectedUnavailable => {
                "Location unavailable; enable GPS and try again".to_string()
            }
        }
    }
}

/// Classifies attempts with an injected distance strategy.
#[derive(Debug, Clone, Default)]
pub struct PresenceClassifier<D = Haversine> {
    calculator: D,
}

impl<D: DistanceCalculator> PresenceClassifier<D> {
    pub fn new(calculator: D) -> Self {
        Self { calculator }
    }

    pub fn classify(
        &self,
        attempt: &AttendanceAttempt,
        geofence: &GeofenceConfig,
        late_cutoff: Option<&LatenessCutoff>,
    ) -> AttendanceOutcome {
        let radius_m = geofence.radius_m();

        let point = match &attempt.location {
            LocationReport::Fix { point, .. } => point,
            LocationReport::Failed { failure } => {
                let verdict = match failure {
                    LocationFailure::PermissionDenied => Verdict::RejectedPermission,
                    LocationFailure::Unavailable => Verdict::RejectedUnavailable,
                };
                return AttendanceOutcome {
                    distance_meters: None,
                    within_geofence: false,
                    on_time_status: OnTimeStatus::NotApplicable,
                    verdict,
                    radius_m,
                };
            }
        };

        let distance = self.calculator.distance_meters(point, geofence.anchor());

        // NaN distances fail closed.
        if !(distance <= radius_m) {
            return AttendanceOutcome {
                distance_meters: Some(distance),
                within_geofence: false,
                on_time_status: OnTimeStatus::NotApplicable,
                verdict: Verdict::RejectedDistance,
                radius_m,
            };
        }

        let on_time_status = match (attempt.direction, late_cutoff) {
            (Direction::In, Some(cutoff)) if cutoff.is_on_time(&attempt.timestamp) => {
                OnTimeStatus::OnTime
            }
            (Direction::In, Some(_)) => OnTimeStatus::Late,
            _ => OnTimeStatus::NotApplicable,
        };

        AttendanceOutcome {
            distance_meters: Some(distance),
            within_geofence: true,
            on_time_status,
            verdict: Verdict::Accepted,
            radius_m,
        }
    }
}

/// Classify an attempt using haversine distance.
pub fn classify_attempt(
    attempt: &AttendanceAttempt,
    geofence: &GeofenceConfig,
    late_cutoff: Option<&LatenessCutoff>,
) -> AttendanceOutcome {
    PresenceClassifier::new(Haversine).classify(attempt, geofence, late_cutoff)
}
