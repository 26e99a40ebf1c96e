//! In-memory insight providers (testing and offline use)

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::InsightError;
use crate::model::BehaviorInsight;
use crate::prompt::InsightRequest;
use crate::provider::InsightProvider;
use crate::InsightResult;

/// Always answers with the same insight.
#[derive(Debug)]
pub struct StaticInsightProvider {
    insight: BehaviorInsight,
    calls: AtomicUsize,
}

impl StaticInsightProvider {
    pub fn new(insight: BehaviorInsight) -> Self {
        Self {
            insight,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightProvider for StaticInsightProvider {
    async fn analyze(&self, _request: &InsightRequest) -> InsightResult<BehaviorInsight> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.insight.clone())
    }
}

/// Always fails with the same error.
#[derive(Debug, Clone)]
pub struct FailingInsightProvider {
    error: InsightError,
}

impl FailingInsightProvider {
    pub fn new(error: InsightError) -> Self {
        Self { error }
    }

    /// Provider used when analysis is switched off.
    pub fn offline() -> Self {
        Self::new(InsightError::NotConfigured("offline mode".to_string()))
    }
}

#[async_trait]
impl InsightProvider for FailingInsightProvider {
    async fn analyze(&self, _request: &InsightRequest) -> InsightResult<BehaviorInsight> {
        Err(self.error.clone())
    }
}
