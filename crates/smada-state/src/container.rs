//! Explicit state container: the single owner of `AppState`.
//!
//! Every mutation builds the next document, persists it through the
//! `StateStore`, and only then replaces the in-memory copy. A failed save
//! leaves the container unchanged.

use chrono::{DateTime, Utc};
use serde::Serialize;
use smada_geofence::{AttendanceAttempt, AttendanceOutcome};
use tracing::info;

use crate::catalog::find_action;
use crate::error::StateError;
use crate::schema::{AppState, AttendanceRecord, PointKind, PointLog};
use crate::storage_traits::StateStore;
use crate::Result;

/// Description attached to actions applied from the teacher panel.
pub const MANUAL_ACTION_DESCRIPTION: &str = "Input manual via panel guru";

/// Dashboard numbers for the current student.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentStats {
    pub points: i64,
    pub violations: u32,
    pub attendance_count: usize,
    pub last_attendance: Option<AttendanceRecord>,
}

pub struct StateContainer<S: StateStore> {
    store: S,
    state: AppState,
}

impl<S: StateStore> StateContainer<S> {
    /// Load the stored state, or seed and persist a fresh one.
    pub async fn open(store: S, now: DateTime<Utc>) -> Result<Self> {
        let state = match store.load().await? {
            Some(state) => state,
            None => {
                info!(event = "state.seeded");
                let seeded = AppState::seed(now);
                store.save(&seeded).await?;
                seeded
            }
        };
        Ok(Self { store, state })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn commit(&mut self, next: AppState) -> Result<()> {
        self.store.save(&next).await?;
        self.state = next;
        Ok(())
    }

    /// Prepend `log` to the ledger and apply it to the balance.
    pub async fn add_point_log(&mut self, log: PointLog) -> Result<()> {
        let mut next = self.state.clone();
        next.current_user.points = next.current_user.points.saturating_add(log.points);
        if log.kind == PointKind::Violation {
            next.current_user.violations = next.current_user.violations.saturating_add(1);
        }

        info!(
            event = "ledger.appended",
            student_id = %log.student_id,
            kind = %log.kind,
            points = log.points,
            balance = next.current_user.points,
        );
        next.history.insert(0, log);
        self.commit(next).await
    }

    /// Apply a catalog action to the current student.
    pub async fn apply_action(&mut self, code: &str, now: DateTime<Utc>) -> Result<PointLog> {
        let action = find_action(code).ok_or_else(|| StateError::UnknownAction(code.to_string()))?;
        let log = PointLog::new(
            self.state.current_user.id.clone(),
            action.label,
            MANUAL_ACTION_DESCRIPTION,
            action.points,
            action.kind(),
            now,
        );
        self.add_point_log(log.clone()).await?;
        Ok(log)
    }

    /// Record an accepted attempt. Rejected outcomes leave the state untouched.
    pub async fn record_attendance(
        &mut self,
        attempt: &AttendanceAttempt,
        outcome: &AttendanceOutcome,
    ) -> Result<AttendanceRecord> {
        let record = AttendanceRecord::from_outcome(attempt, outcome)?;

        let mut next = self.state.clone();
        next.attendance.insert(0, record.clone());
        self.commit(next).await?;

        info!(
            event = "attendance.recorded",
            student_id = %record.student_id,
            direction = %record.direction,
            status = %record.status,
        );
        Ok(record)
    }

    pub fn stats(&self) -> StudentStats {
        StudentStats {
            points: self.state.current_user.points,
            violations: self.state.current_user.violations,
            attendance_count: self.state.attendance.len(),
            last_attendance: self.state.attendance.first().cloned(),
        }
    }

    /// Up to `n` most recent ledger entries.
    pub fn recent_history(&self, n: usize) -> &[PointLog] {
        &self.state.history[..n.min(self.state.history.len())]
    }

    /// Up to `n` most recent attendance records.
    pub fn recent_attendance(&self, n: usize) -> &[AttendanceRecord] {
        &self.state.attendance[..n.min(self.state.attendance.len())]
    }

    /// Ledger entries whose title or description contains `query`, ignoring case.
    pub fn search_history(&self, query: &str) -> Vec<&PointLog> {
        let needle = query.trim().to_lowercase();
        self.state
            .history
            .iter()
            .filter(|log| {
                log.title.to_lowercase().contains(&needle)
                    || log.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Discard everything and start again from the seed state.
    pub async fn reset(&mut self, now: DateTime<Utc>) -> Result<()> {
        info!(event = "state.reset");
        self.commit(AppState::seed(now)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryStateStore;

    #[tokio::test]
    async fn test_open_seeds_and_saves_once() {
        let container = StateContainer::open(MemoryStateStore::new(), Utc::now())
            .await
            .unwrap();
        assert_eq!(container.state().current_user.points, 120);
        assert_eq!(container.store().save_count(), 1);
    }

    #[tokio::test]
    async fn test_open_existing_does_not_save() {
        let mut stored = AppState::seed(Utc::now());
        stored.current_user.points = 7;
        let container = StateContainer::open(MemoryStateStore::with_state(stored), Utc::now())
            .await
            .unwrap();
        assert_eq!(container.state().current_user.points, 7);
        assert_eq!(container.store().save_count(), 0);
    }

    #[tokio::test]
    async fn test_note_changes_points_not_violations() {
        let now = Utc::now();
        let mut container = StateContainer::open(MemoryStateStore::new(), now).await.unwrap();
        let note = PointLog::new("2024001", "Catatan", "Wali kelas", 0, PointKind::Note, now);

        container.add_point_log(note).await.unwrap();

        assert_eq!(container.stats().points, 120);
        assert_eq!(container.stats().violations, 2);
        assert_eq!(container.state().history[0].title, "Catatan");
    }

    #[tokio::test]
    async fn test_extreme_points_saturate() {
        let now = Utc::now();
        let mut container = StateContainer::open(MemoryStateStore::new(), now).await.unwrap();

        for _ in 0..2 {
            let log = PointLog::new("2024001", "Bonus", "", i64::MAX, PointKind::Reward, now);
            container.add_point_log(log).await.unwrap();
        }
        assert_eq!(container.stats().points, i64::MAX);

        for _ in 0..3 {
            let log = PointLog::new("2024001", "Denda", "", i64::MIN, PointKind::Violation, now);
            container.add_point_log(log).await.unwrap();
        }
        assert_eq!(container.stats().points, i64::MIN);
        assert_eq!(container.stats().violations, 5);
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected() {
        let mut container = StateContainer::open(MemoryStateStore::new(), Utc::now())
            .await
            .unwrap();
        let err = container.apply_action("Z1", Utc::now()).await.unwrap_err();
        assert!(matches!(err, StateError::UnknownAction(code) if code == "Z1"));
        assert_eq!(container.state().history.len(), 2);
    }

    #[tokio::test]
    async fn test_recent_history_clamps() {
        let container = StateContainer::open(MemoryStateStore::new(), Utc::now())
            .await
            .unwrap();
        assert_eq!(container.recent_history(1).len(), 1);
        assert_eq!(container.recent_history(50).len(), 2);
        assert!(container.recent_attendance(5).is_empty());
    }
}
