//! Gemini `generateContent` client
//!
//! Sends the rendered prompt with a JSON response schema and parses the
//! first candidate's text as a [`BehaviorInsight`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::error::InsightError;
use crate::model::{parse_insight, BehaviorInsight};
use crate::prompt::{render_prompt, InsightRequest};
use crate::provider::InsightProvider;
use crate::InsightResult;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Gemini configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL up to and including the API version
    pub endpoint: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        GeminiConfig {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read `GEMINI_API_KEY` (required), `GEMINI_MODEL`, `GEMINI_ENDPOINT`
    /// and `GEMINI_TIMEOUT_SECS`.
    pub fn from_env() -> InsightResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> InsightResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| InsightError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        let mut config = GeminiConfig::new(api_key.trim());
        if let Some(model) = lookup("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(endpoint) = lookup("GEMINI_ENDPOINT").filter(|e| !e.trim().is_empty()) {
            config.endpoint = endpoint.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("GEMINI_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                InsightError::NotConfigured(format!("GEMINI_TIMEOUT_SECS is not an integer: {raw}"))
            })?;
            if secs == 0 {
                return Err(InsightError::NotConfigured(
                    "GEMINI_TIMEOUT_SECS must be at least 1".to_string(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn build_request(prompt: String) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part { text: Some(prompt) }],
        }],
        generation_config: json!({
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "summary": { "type": "STRING" },
                    "advice": { "type": "STRING" },
                    "riskLevel": { "type": "STRING", "enum": ["Low", "Medium", "High"] }
                },
                "required": ["summary", "advice", "riskLevel"]
            }
        }),
    }
}

/// `candidates[0].content.parts[0].text`
fn extract_text(response: GenerateContentResponse) -> InsightResult<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.trim().is_empty())
        .ok_or(InsightError::EmptyResponse)
}

/// Gemini client
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> InsightResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("smada-insight/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(GeminiClient {
            config,
            http_client,
        })
    }

    pub fn from_env() -> InsightResult<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl InsightProvider for GeminiClient {
    async fn analyze(&self, request: &InsightRequest) -> InsightResult<BehaviorInsight> {
        let url = self.config.generate_url();
        debug!(model = %self.config.model, "requesting behavior analysis");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&build_request(render_prompt(request)))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| InsightError::InvalidResponse(e.to_string()))?;
        parse_insight(&extract_text(parsed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_config_requires_api_key() {
        let err = GeminiConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, InsightError::NotConfigured(_)));

        let blank = GeminiConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "  ")]));
        assert!(blank.is_err());
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = GeminiConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "k")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);

        let config = GeminiConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("GEMINI_ENDPOINT", "http://localhost:9000/v1/"),
            ("GEMINI_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(
            config.generate_url(),
            "http://localhost:9000/v1/models/gemini-pro:generateContent"
        );
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_config_rejects_bad_timeout() {
        for raw in ["soon", "0", "-3"] {
            let result = GeminiConfig::from_lookup(lookup_from(&[
                ("GEMINI_API_KEY", "k"),
                ("GEMINI_TIMEOUT_SECS", raw),
            ]));
            assert!(
                matches!(result, Err(InsightError::NotConfigured(_))),
                "timeout {raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(build_request("hello".to_string())).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            body["generationConfig"]["responseSchema"]["properties"]["riskLevel"]["enum"][2],
            "High"
        );
    }

    #[test]
    fn test_extract_first_candidate_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [ { "text": "{\"a\":1}" } ], "role": "model" } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_extract_without_candidates() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert_eq!(extract_text(response).unwrap_err(), InsightError::EmptyResponse);
    }
}
