//! Persisted document types for the SMADA application state
//!
//! The whole state is stored as a single JSON document. Lists are kept
//! newest-first.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use smada_geofence::{
    AttendanceAttempt, AttendanceOutcome, Direction, GeoPoint, LocationReport, OnTimeStatus,
};

use crate::error::StateError;

/// Current document layout version
pub const SCHEMA_VERSION: u32 = 1;

/// Student profile with running point balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub class_name: String,
    /// Discipline point balance, may go negative
    pub points: i64,
    pub violations: u32,
    pub avatar: String,
}

impl Student {
    /// The demo student every fresh state starts with
    pub fn mock() -> Self {
        Student {
            id: "2024001".to_string(),
            name: "Ahmad Rifai".to_string(),
            class_name: "XII MIPA 1".to_string(),
            points: 120,
            violations: 2,
            avatar: "https://picsum.photos/seed/ahmad/200".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Reward,
    Violation,
    Note,
}

impl std::fmt::Display for PointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointKind::Reward => write!(f, "reward"),
            PointKind::Violation => write!(f, "violation"),
            PointKind::Note => write!(f, "note"),
        }
    }
}

/// One entry in the point ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLog {
    pub id: String,
    pub student_id: String,
    pub title: String,
    pub description: String,
    /// Positive for rewards, negative for violations
    pub points: i64,
    pub kind: PointKind,
    pub date: DateTime<Utc>,
}

impl PointLog {
    /// Create a log entry with a fresh id
    pub fn new(
        student_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        points: i64,
        kind: PointKind,
        date: DateTime<Utc>,
    ) -> Self {
        PointLog {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.into(),
            title: title.into(),
            description: description.into(),
            points,
            kind,
            date,
        }
    }

    /// Points rendered with an explicit sign, e.g. `+50` or `-10`
    pub fn signed_points(&self) -> String {
        if self.points > 0 {
            format!("+{}", self.points)
        } else {
            self.points.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    OnTime,
    Late,
    Invalid,
}

impl std::fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttendanceStatus::OnTime => write!(f, "ontime"),
            AttendanceStatus::Late => write!(f, "late"),
            AttendanceStatus::Invalid => write!(f, "invalid"),
        }
    }
}

/// A recorded (accepted) attendance attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub location: GeoPoint,
    pub distance_m: f64,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// Build a record from a classified attempt.
    ///
    /// Only accepted outcomes carrying a position fix produce a record.
    pub fn from_outcome(
        attempt: &AttendanceAttempt,
        outcome: &AttendanceOutcome,
    ) -> Result<Self, StateError> {
        let rejected = || StateError::AttemptRejected {
            verdict: outcome.verdict.to_string(),
        };

        if !outcome.verdict.is_accepted() {
            return Err(rejected());
        }
        let location = match &attempt.location {
            LocationReport::Fix { point, .. } => *point,
            LocationReport::Failed { .. } => return Err(rejected()),
        };
        let distance_m = outcome.distance_meters.ok_or_else(rejected)?;

        let status = match outcome.on_time_status {
            OnTimeStatus::Late => AttendanceStatus::Late,
            OnTimeStatus::OnTime | OnTimeStatus::NotApplicable => AttendanceStatus::OnTime,
        };

        Ok(AttendanceRecord {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: attempt.reporter_id.clone(),
            timestamp: attempt.timestamp,
            direction: attempt.direction,
            location,
            distance_m,
            status,
        })
    }
}

/// The whole persisted application state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub current_user: Student,
    /// Newest first
    pub attendance: Vec<AttendanceRecord>,
    /// Newest first
    pub history: Vec<PointLog>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl AppState {
    /// Initial state: the mock student and two sample ledger entries.
    pub fn seed(now: DateTime<Utc>) -> Self {
        let student = Student::mock();
        let history = vec![
            PointLog {
                id: "1".to_string(),
                student_id: student.id.clone(),
                title: "Juara 1 Lomba Puisi".to_string(),
                description: "Prestasi tingkat kabupaten".to_string(),
                points: 50,
                kind: PointKind::Reward,
                date: now - Duration::days(2),
            },
            PointLog {
                id: "2".to_string(),
                student_id: student.id.clone(),
                title: "Atribut Tidak Lengkap".to_string(),
                description: "Tidak memakai dasi saat upacara".to_string(),
                points: -10,
                kind: PointKind::Violation,
                date: now - Duration::days(5),
            },
        ];

        AppState {
            current_user: student,
            attendance: Vec::new(),
            history,
            schema_version: SCHEMA_VERSION,
        }
    }
}
