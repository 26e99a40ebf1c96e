//! Prompt construction for behavior analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;
use smada_geofence::wib_offset;
use smada_state::{PointLog, Student};

/// How many ledger entries are sent to the provider.
pub const MAX_HISTORY_LINES: usize = 5;

/// One ledger entry as presented to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLine {
    pub date: DateTime<Utc>,
    pub title: String,
    pub points: i64,
}

impl From<&PointLog> for HistoryLine {
    fn from(log: &PointLog) -> Self {
        HistoryLine {
            date: log.date,
            title: log.title.clone(),
            points: log.points,
        }
    }
}

impl std::fmt::Display for HistoryLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let day = self.date.with_timezone(&wib_offset()).format("%d/%m/%Y");
        let sign = if self.points > 0 { "+" } else { "" };
        write!(f, "{}: {} ({}{})", day, self.title, sign, self.points)
    }
}

/// Everything the provider sees about a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightRequest {
    pub student_name: String,
    pub school_name: String,
    pub points: i64,
    pub violations: u32,
    /// Newest first, at most [`MAX_HISTORY_LINES`]
    pub recent: Vec<HistoryLine>,
}

impl InsightRequest {
    /// `history` is expected newest-first, as stored.
    pub fn from_student(student: &Student, history: &[PointLog], school_name: &str) -> Self {
        InsightRequest {
            student_name: student.name.clone(),
            school_name: school_name.to_string(),
            points: student.points,
            violations: student.violations,
            recent: history
                .iter()
                .take(MAX_HISTORY_LINES)
                .map(HistoryLine::from)
                .collect(),
        }
    }
}

pub fn render_prompt(request: &InsightRequest) -> String {
    let history = if request.recent.is_empty() {
        "No recent activity.".to_string()
    } else {
        request
            .recent
            .iter()
            .map(|line| line.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Analyze behavior for student: {name} from {school}.\n\
         Current Stats: Points: {points}, Violations: {violations}.\n\
         Recent History: {history}\n\
         \n\
         Provide:\n\
         1. A short summary of their behavior (1-2 sentences).\n\
         2. A motivational quote or advice based on their current status.\n\
         3. A risk assessment (Low, Medium, High) regarding their discipline.\n",
        name = request.student_name,
        school = request.school_name,
        points = request.points,
        violations = request.violations,
        history = history,
    )
}
