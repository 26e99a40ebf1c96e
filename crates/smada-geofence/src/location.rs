//! Location-source port.
//!
//! Acquiring a fix is asynchronous and may fail or time out. The
//! classifier never waits on a device; callers turn whatever the source
//! produced into a [`LocationReport`] first, via [`acquire_report`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{LocationFailure, LocationReport};
use crate::geo::GeoPoint;

/// A position fix from the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationReading {
    pub point: GeoPoint,
    /// Reported accuracy radius in meters, if the device supplied one.
    pub accuracy_m: Option<f64>,
}

impl LocationReading {
    pub fn new(point: GeoPoint) -> Self {
        Self {
            point,
            accuracy_m: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = Some(accuracy_m);
        self
    }
}

impl From<LocationReading> for LocationReport {
    fn from(reading: LocationReading) -> Self {
        LocationReport::Fix {
            point: reading.point,
            accuracy_m: reading.accuracy_m,
        }
    }
}

/// Anything that can produce the device's current position.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self) -> Result<LocationReading, LocationFailure>;
}

/// Query `source`, giving up after `timeout`.
///
/// An elapsed timeout is reported as `LocationFailure::Unavailable`.
pub async fn acquire_report<S>(source: &S, timeout: Duration) -> LocationReport
where
    S: LocationSource + ?Sized,
{
    match tokio::time::timeout(timeout, source.current_position()).await {
        Ok(Ok(reading)) => reading.into(),
        Ok(Err(failure)) => {
            debug!(failure = %failure, "location source failed");
            LocationReport::failed(failure)
        }
        Err(_) => {
            debug!(timeout_ms = timeout.as_millis() as u64, "location fix timed out");
            LocationReport::failed(LocationFailure::Unavailable)
        }
    }
}

/// Always returns the same reading. Used by the CLI for coordinates given
/// on the command line, and by tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationSource {
    reading: LocationReading,
}

impl FixedLocationSource {
    pub fn new(reading: LocationReading) -> Self {
        Self { reading }
    }
}

#[async_trait]
impl LocationSource for FixedLocationSource {
    async fn current_position(&self) -> Result<LocationReading, LocationFailure> {
        Ok(self.reading)
    }
}

/// Always fails with the configured signal.
#[derive(Debug, Clone, Copy)]
pub struct FailingLocationSource {
    failure: LocationFailure,
}

impl FailingLocationSource {
    pub fn new(failure: LocationFailure) -> Self {
        Self { failure }
    }
}

#[async_trait]
impl LocationSource for FailingLocationSource {
    async fn current_position(&self) -> Result<LocationReading, LocationFailure> {
        Err(self.failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geofence::SCHOOL_ANCHOR;

    struct SlowSource;

    #[async_trait]
    impl LocationSource for SlowSource {
        async fn current_position(&self) -> Result<LocationReading, LocationFailure> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(LocationReading::new(SCHOOL_ANCHOR))
        }
    }

    #[tokio::test]
    async fn test_fixed_source_yields_fix_with_accuracy() {
        let source =
            FixedLocationSource::new(LocationReading::new(SCHOOL_ANCHOR).with_accuracy(12.5));
        let report = acquire_report(&source, Duration::from_secs(1)).await;
        assert_eq!(
            report,
            LocationReport::Fix {
                point: SCHOOL_ANCHOR,
                accuracy_m: Some(12.5)
            }
        );
    }

    #[tokio::test]
    async fn test_failing_source_passes_failure_through() {
        let source = FailingLocationSource::new(LocationFailure::PermissionDenied);
        let report = acquire_report(&source, Duration::from_secs(1)).await;
        assert_eq!(report, LocationReport::failed(LocationFailure::PermissionDenied));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_unavailable() {
        let report = acquire_report(&SlowSource, Duration::from_secs(5)).await;
        assert_eq!(report, LocationReport::failed(LocationFailure::Unavailable));
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let source: Box<dyn LocationSource> =
            Box::new(FailingLocationSource::new(LocationFailure::Unavailable));
        let report = acquire_report(source.as_ref(), Duration::from_secs(1)).await;
        assert!(report.point().is_none());
    }
}
