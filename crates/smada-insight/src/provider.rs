//! Insight provider port and the never-failing entry point.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::model::BehaviorInsight;
use crate::prompt::InsightRequest;
use crate::InsightResult;

/// Something that can summarise a student's behavior.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn analyze(&self, request: &InsightRequest) -> InsightResult<BehaviorInsight>;
}

/// Ask `provider` for an insight, substituting the fallback on any failure.
pub async fn analyze_or_fallback<P>(provider: &P, request: &InsightRequest) -> BehaviorInsight
where
    P: InsightProvider + ?Sized,
{
    match provider.analyze(request).await.and_then(|insight| {
        insight.validate()?;
        Ok(insight)
    }) {
        Ok(insight) => {
            info!(
                event = "insight.analyzed",
                student = %request.student_name,
                risk_level = %insight.risk_level,
            );
            insight
        }
        Err(e) => {
            warn!(event = "insight.fallback", student = %request.student_name, error = %e);
            BehaviorInsight::fallback()
        }
    }
}
