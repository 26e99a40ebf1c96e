//! SMADA Insight: behavior summaries for the student dashboard
//!
//! Builds a prompt from the student's stats and recent ledger entries, asks
//! an [`InsightProvider`] (Gemini by default) for a structured summary, and
//! falls back to a fixed message when analysis is unavailable.

mod error;
pub mod fakes;
pub mod gemini;
pub mod model;
pub mod prompt;
pub mod provider;

pub use error::InsightError;
pub use fakes::{FailingInsightProvider, StaticInsightProvider};
pub use gemini::{GeminiClient, GeminiConfig};
pub use model::{parse_insight, BehaviorInsight, RiskLevel};
pub use prompt::{render_prompt, HistoryLine, InsightRequest, MAX_HISTORY_LINES};
pub use provider::{analyze_or_fallback, InsightProvider};

/// Result type for smada-insight operations
pub type InsightResult<T> = std::result::Result<T, InsightError>;
