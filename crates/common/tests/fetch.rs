use std::time::Duration;

use common::{fetch, try_fetch, CrawlerError, HttpSession, MemoryLog, RetryPolicy};
use reqwest::Method;
use serde_json::json;
use tracing::instrument::WithSubscriber;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn fast_session() -> HttpSession {
    HttpSession::new(RetryPolicy::default().with_backoff_factor(0.0), "test-agent").unwrap()
}

#[tokio::test]
async fn test_retryable_status_uses_five_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;

    let session = fast_session();
    let url = format!("{}/feed", server.uri());
    let result = try_fetch(&session, &url, None, session.headers(), TIMEOUT, "/data").await;

    match result {
        Err(CrawlerError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 5),
        other => panic!("expected exhausted retries, got {other:?}"),
    }
}

#[tokio::test]
async fn test_every_retryable_status_is_retried() {
    for status in [429u16, 500, 502, 503, 504] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .expect(5)
            .mount(&server)
            .await;

        let session = fast_session();
        let records =
            try_fetch(&session, &server.uri(), None, session.headers(), TIMEOUT, "/data").await;
        assert!(records.is_err(), "status {status} should fail");
    }
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [1, 2]})))
        .expect(1)
        .mount(&server)
        .await;

    let session = fast_session();
    let records = try_fetch(&session, &server.uri(), None, session.headers(), TIMEOUT, "/data")
        .await
        .unwrap();
    assert_eq!(records, vec![json!(1), json!(2)]);
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let session = fast_session();
    let result =
        try_fetch(&session, &server.uri(), None, session.headers(), TIMEOUT, "/data").await;
    assert!(matches!(result, Err(CrawlerError::HttpRequest(_))));
}

#[tokio::test]
async fn test_method_outside_policy_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let session = fast_session();
    let response = session
        .send(Method::DELETE, &server.uri(), None, session.headers(), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 503);
}

#[tokio::test]
async fn test_retry_after_overrides_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    // A 30s computed backoff would blow the outer timeout.
    let session =
        HttpSession::new(RetryPolicy::default().with_backoff_factor(30.0), "test-agent").unwrap();
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        try_fetch(&session, &server.uri(), None, session.headers(), TIMEOUT, "/data"),
    )
    .await
    .expect("Retry-After should have been honoured");
    assert_eq!(result.unwrap(), Vec::<serde_json::Value>::new());
}

#[tokio::test]
async fn test_retry_warnings_report_attempt_and_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;

    let log = MemoryLog::new();
    let session = fast_session();
    let result = try_fetch(&session, &server.uri(), None, session.headers(), TIMEOUT, "/data")
        .with_subscriber(log.dispatch())
        .await;
    assert!(result.is_err());

    let warnings = log.lines_at("WARN");
    assert_eq!(warnings.len(), 4);
    for (i, line) in warnings.iter().enumerate() {
        let expected = format!("(attempt {}/5, retrying in 0ns)", i + 1);
        assert!(line.contains("returned 503"), "{line}");
        assert!(line.contains(&expected), "{line}");
    }
}

#[tokio::test]
async fn test_retry_warning_reports_server_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let log = MemoryLog::new();
    let session = fast_session();
    let result = try_fetch(&session, &server.uri(), None, session.headers(), TIMEOUT, "/data")
        .with_subscriber(log.dispatch())
        .await;
    assert!(result.is_ok());

    let warnings = log.lines_at("WARN");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("(attempt 1/5, retrying in 1s)"), "{}", warnings[0]);
}

#[tokio::test]
async fn test_timeouts_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(5)
        .mount(&server)
        .await;

    let session = fast_session();
    let result = try_fetch(
        &session,
        &server.uri(),
        None,
        session.headers(),
        Duration::from_millis(50),
        "/data",
    )
    .await;
    assert!(matches!(
        result,
        Err(CrawlerError::RetriesExhausted { attempts: 5, .. })
    ));
}

#[tokio::test]
async fn test_sends_user_agent_and_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "test-agent"))
        .and(query_param("limit", "50"))
        .and(query_param("desktop", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": ["x"]})))
        .expect(1)
        .mount(&server)
        .await;

    let session = fast_session();
    let params = [("limit", "50"), ("desktop", "true")];
    let records = try_fetch(
        &session,
        &server.uri(),
        Some(&params[..]),
        session.headers(),
        TIMEOUT,
        "/data",
    )
    .await
    .unwrap();
    assert_eq!(records, vec![json!("x")]);
}

#[tokio::test]
async fn test_fetch_logs_keys_for_wrong_typed_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "not-a-list"})))
        .mount(&server)
        .await;

    let log = MemoryLog::new();
    let session = fast_session();
    let records = fetch(&session, &server.uri(), None, session.headers(), TIMEOUT, "/data")
        .with_subscriber(log.dispatch())
        .await;

    assert!(records.is_empty());
    let warnings = log.lines_at("WARN");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains(r#"["data"]"#), "{}", warnings[0]);
    assert!(log.lines_at("ERROR").is_empty());
}

#[tokio::test]
async fn test_fetch_logs_error_for_invalid_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let log = MemoryLog::new();
    let session = fast_session();
    let records = fetch(&session, &server.uri(), None, session.headers(), TIMEOUT, "/data")
        .with_subscriber(log.dispatch())
        .await;

    assert!(records.is_empty());
    assert_eq!(log.lines_at("ERROR").len(), 1);
}

#[tokio::test]
async fn test_fetch_logs_error_when_unreachable() {
    // Nothing listens on port 1.
    let url = "http://127.0.0.1:1/";

    let log = MemoryLog::new();
    let session = fast_session();
    let records = fetch(&session, url, None, session.headers(), TIMEOUT, "/data")
        .with_subscriber(log.dispatch())
        .await;

    assert!(records.is_empty());
    assert_eq!(log.lines_at("ERROR").len(), 1);
    let warnings = log.lines_at("WARN");
    assert_eq!(warnings.len(), 4);
    assert!(warnings[3].contains("failed:"), "{}", warnings[3]);
    assert!(warnings[3].contains("(attempt 4/5, retrying in 0ns)"), "{}", warnings[3]);
}
