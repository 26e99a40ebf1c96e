//! End-to-end insight flow: state -> request -> provider -> insight.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use smada_geofence::SCHOOL_NAME;
use smada_insight::{
    analyze_or_fallback, BehaviorInsight, FailingInsightProvider, GeminiClient, GeminiConfig,
    InsightError, InsightProvider, InsightRequest, RiskLevel, StaticInsightProvider,
};
use smada_state::{AppState, PointKind, PointLog};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn seeded_request() -> InsightRequest {
    let state = AppState::seed(Utc::now());
    InsightRequest::from_student(&state.current_user, &state.history, SCHOOL_NAME)
}

/// Serve one canned HTTP response on a local port. The handle yields the
/// raw request that was received.
async fn serve_once(status_line: &str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/v1beta", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {status_line}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });
    (endpoint, handle)
}

/// Read headers and a `Content-Length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&raw);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

#[tokio::test]
async fn static_provider_is_called_once_per_request() {
    let insight = BehaviorInsight {
        summary: "Disiplin baik.".to_string(),
        advice: "Pertahankan prestasi.".to_string(),
        risk_level: RiskLevel::Medium,
    };
    let provider = StaticInsightProvider::new(insight.clone());

    assert_eq!(analyze_or_fallback(&provider, &seeded_request()).await, insight);
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn offline_provider_yields_fallback() {
    let provider = FailingInsightProvider::offline();

    let err = provider.analyze(&seeded_request()).await.unwrap_err();
    assert!(matches!(err, InsightError::NotConfigured(_)));
    assert_eq!(
        analyze_or_fallback(&provider, &seeded_request()).await,
        BehaviorInsight::fallback()
    );
}

#[tokio::test]
async fn request_reflects_newest_history_first() {
    let now = Utc::now();
    let mut state = AppState::seed(now);
    state.history.insert(
        0,
        PointLog::new("2024001", "Terlambat", "", -5, PointKind::Violation, now),
    );

    let request = InsightRequest::from_student(&state.current_user, &state.history, SCHOOL_NAME);

    assert_eq!(request.recent.len(), 3);
    assert_eq!(request.recent[0].title, "Terlambat");
    assert_eq!(request.school_name, "SMAN 2 Tanggul");
}

#[tokio::test]
async fn unreachable_endpoint_is_http_error_and_falls_back() {
    let config = GeminiConfig::new("test-key")
        .with_endpoint("http://127.0.0.1:9/v1beta")
        .with_timeout(Duration::from_secs(2));
    let client = GeminiClient::new(config).unwrap();

    let err = client.analyze(&seeded_request()).await.unwrap_err();
    assert!(matches!(err, InsightError::Http(_)));
    assert_eq!(
        analyze_or_fallback(&client, &seeded_request()).await,
        BehaviorInsight::fallback()
    );
}

#[tokio::test]
async fn gemini_success_is_parsed_into_insight() {
    let text = json!({
        "summary": "Siswa cukup disiplin.",
        "advice": "Datang lebih awal.",
        "riskLevel": "Medium"
    })
    .to_string();
    let body = json!({
        "candidates": [ { "content": { "parts": [ { "text": text } ], "role": "model" } } ]
    })
    .to_string();
    let (endpoint, server) = serve_once("200 OK", body).await;
    let client = GeminiClient::new(GeminiConfig::new("test-key").with_endpoint(&endpoint)).unwrap();

    let insight = client.analyze(&seeded_request()).await.unwrap();

    assert_eq!(insight.summary, "Siswa cukup disiplin.");
    assert_eq!(insight.advice, "Datang lebih awal.");
    assert_eq!(insight.risk_level, RiskLevel::Medium);

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1beta/models/gemini-3-flash-preview:generateContent "));
    assert!(request.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
    assert!(request.contains("Ahmad Rifai"));
}

#[tokio::test]
async fn gemini_error_status_is_reported_and_falls_back() {
    let body = json!({ "error": { "code": 503, "message": "overloaded" } }).to_string();
    let (endpoint, server) = serve_once("503 Service Unavailable", body).await;
    let client = GeminiClient::new(GeminiConfig::new("test-key").with_endpoint(&endpoint)).unwrap();

    let err = client.analyze(&seeded_request()).await.unwrap_err();
    match err {
        InsightError::Status { status, body } => {
            assert_eq!(status, 503);
            assert!(body.contains("overloaded"));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
    server.await.unwrap();

    let (endpoint, _server) = serve_once("500 Internal Server Error", String::new()).await;
    let client = GeminiClient::new(GeminiConfig::new("test-key").with_endpoint(&endpoint)).unwrap();
    assert_eq!(
        analyze_or_fallback(&client, &seeded_request()).await,
        BehaviorInsight::fallback()
    );
}
