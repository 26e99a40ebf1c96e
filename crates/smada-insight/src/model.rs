//! Structured behavior summary returned by an insight provider.

use serde::{Deserialize, Serialize};

use crate::error::InsightError;
use crate::InsightResult;

/// Discipline risk assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "Low"),
            RiskLevel::Medium => write!(f, "Medium"),
            RiskLevel::High => write!(f, "High"),
        }
    }
}

/// Short summary, advice and risk level for one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BehaviorInsight {
    pub summary: String,
    pub advice: String,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
}

impl BehaviorInsight {
    /// Shown whenever automatic analysis is unavailable.
    pub fn fallback() -> Self {
        BehaviorInsight {
            summary: "Analisis otomatis sedang tidak tersedia.".to_string(),
            advice: "Teruslah berbuat baik dan patuhi peraturan sekolah.".to_string(),
            risk_level: RiskLevel::Low,
        }
    }

    pub fn validate(&self) -> InsightResult<()> {
        if self.summary.trim().is_empty() {
            return Err(InsightError::InvalidResponse("summary is empty".to_string()));
        }
        if self.advice.trim().is_empty() {
            return Err(InsightError::InvalidResponse("advice is empty".to_string()));
        }
        Ok(())
    }
}

/// Parse and validate provider output.
///
/// Accepts the bare JSON object, optionally wrapped in a ```json fence.
pub fn parse_insight(text: &str) -> InsightResult<BehaviorInsight> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(InsightError::EmptyResponse);
    }

    let insight: BehaviorInsight =
        serde_json::from_str(body).map_err(|e| InsightError::InvalidResponse(e.to_string()))?;
    insight.validate()?;
    Ok(insight)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
