//! Integration tests for the HTTP bulk path
//!
//! These tests run the handler against a `wiremock` server through the real
//! `reqwest` transport:
//! - NDJSON request shape and headers
//! - Per-item failures retried as a subset
//! - HTTP-level errors failing whole rounds

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use access_log_ingest::bulk::{OpenSearchBulkClient, SignedHttpTransport};
use access_log_ingest::geoip::NoopGeoEnrichment;
use access_log_ingest::random::ThreadRandomizer;
use access_log_ingest::{IngestError, KinesisStreamHandler, RetryPolicy};

use helpers::*;

fn handler_for(server: &MockServer, rounds: usize) -> KinesisStreamHandler {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build HTTP client");
    let transport = SignedHttpTransport::new(Arc::new(http), None).with_retry(1, 0);
    let client = OpenSearchBulkClient::new(&server.uri(), Arc::new(transport))
        .expect("mock server URI is a valid endpoint");
    KinesisStreamHandler::new(
        Arc::new(NoopGeoEnrichment),
        Arc::new(client),
        Arc::new(ThreadRandomizer),
    )
    .with_retry_policy(RetryPolicy::immediate(rounds))
}

/// Answers each bulk request item by item, failing the ids listed in `reject`.
struct RejectIds {
    reject: Vec<String>,
}

impl Respond for RejectIds {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = String::from_utf8_lossy(&request.body).into_owned();
        let items: Vec<Value> = body
            .lines()
            .step_by(2)
            .map(|line| {
                let action: Value = serde_json::from_str(line).expect("action line");
                let id = action["create"]["_id"].as_str().unwrap_or_default().to_string();
                if self.reject.contains(&id) {
                    json!({"create": {"_id": id, "status": 429,
                        "error": {"type": "es_rejected_execution_exception"}}})
                } else {
                    json!({"create": {"_id": id, "status": 201}})
                }
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({
            "took": 1,
            "errors": items.iter().any(|i| i["create"]["error"].is_object()),
            "items": items
        }))
    }
}

/// Accepts everything: one 201 item per action line.
struct AcceptAll;

impl Respond for AcceptAll {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        RejectIds { reject: Vec::new() }.respond(request)
    }
}

#[tokio::test]
async fn test_bulk_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/_bulk"))
        .and(header("content-type", "application/x-ndjson"))
        .respond_with(AcceptAll)
        .expect(1)
        .mount(&server)
        .await;

    let report = handler_for(&server, 3)
        .handle(&event(vec![record("1", V1_TLS), record("2", COMMON)]))
        .await
        .expect("batch should be written");
    assert_eq!(report.attempts, 1);

    let requests = server.received_requests().await.expect("recording enabled");
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert!(body.ends_with('\n'));
    let lines: Vec<Value> = body
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is JSON"))
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["create"]["_index"], "access-logs-2021.04.20");
    assert_eq!(lines[0]["create"]["_id"].as_str().map(str::len), Some(22));
    assert_eq!(lines[1]["labels.log_format"], "v1");
    assert_eq!(lines[2]["create"]["_index"], "access-logs-2000.10.10");
    assert_eq!(lines[3]["http.request.line"], "GET /apache_pb.gif HTTP/1.0");
}

#[tokio::test]
async fn test_rejected_items_are_resubmitted_alone() {
    let server = MockServer::start().await;
    let handler = handler_for(&server, 3);
    let batch = event(vec![record("1", V1_TLS), record("2", V1_PLAINTEXT), record("3", COMMON)]);

    // Reject the second document on first sight; the retry then succeeds
    struct RejectFirstTime {
        seen: std::sync::Mutex<std::collections::HashSet<String>>,
    }
    impl Respond for RejectFirstTime {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body = String::from_utf8_lossy(&request.body).into_owned();
            let mut seen = self.seen.lock().unwrap();
            let reject: Vec<String> = body
                .lines()
                .step_by(2)
                .enumerate()
                .filter_map(|(position, line)| {
                    let action: Value = serde_json::from_str(line).ok()?;
                    let id = action["create"]["_id"].as_str()?.to_string();
                    (position == 1 && seen.insert(id.clone())).then_some(id)
                })
                .collect();
            RejectIds { reject }.respond(request)
        }
    }
    Mock::given(method("POST"))
        .respond_with(RejectFirstTime {
            seen: Default::default(),
        })
        .mount(&server)
        .await;

    let report = handler.handle(&batch).await.expect("retry succeeds");
    assert_eq!(report.attempts, 2);
    assert_eq!(report.stats["retried documents"], 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let retry_body = String::from_utf8_lossy(&requests[1].body).into_owned();
    assert_eq!(retry_body.lines().count(), 2);
    let first_body = String::from_utf8_lossy(&requests[0].body).into_owned();
    let second_action = first_body.lines().nth(2).unwrap();
    assert_eq!(retry_body.lines().next().unwrap(), second_action);
}

#[tokio::test]
async fn test_http_error_fails_every_round() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(3)
        .mount(&server)
        .await;

    let result = handler_for(&server, 2)
        .handle(&event(vec![record("1", V1_TLS)]))
        .await;
    match result {
        Err(IngestError::UnresolvedDocuments { failed, attempts }) => {
            assert_eq!(attempts, 3);
            assert_eq!(failed.len(), 1);
            assert!(failed[0].error["reason"]
                .as_str()
                .is_some_and(|r| r.contains("HTTP 500")));
        }
        other => panic!("expected unresolved documents, got {other:?}"),
    }
}

#[tokio::test]
async fn test_conflict_on_retry_counts_as_written() {
    let server = MockServer::start().await;
    // The store stored the document but the first response was lost (502);
    // the resubmitted create then conflicts
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    struct Conflict;
    impl Respond for Conflict {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body = String::from_utf8_lossy(&request.body).into_owned();
            let items: Vec<Value> = body
                .lines()
                .step_by(2)
                .map(|_| {
                    json!({"create": {"status": 409,
                        "error": {"type": "version_conflict_engine_exception"}}})
                })
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({"errors": true, "items": items}))
        }
    }
    Mock::given(method("POST"))
        .respond_with(Conflict)
        .mount(&server)
        .await;

    let report = handler_for(&server, 3)
        .handle(&event(vec![record("1", V1_TLS)]))
        .await
        .expect("conflict means already stored");
    assert_eq!(report.attempts, 2);
    assert_eq!(report.stats["documents written"], 1);
}
