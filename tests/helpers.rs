// Shared test helpers: log line fixtures, stream records and in-process fakes
// for the handler's collaborators.

#![allow(dead_code)] // Each test file uses a different subset

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use access_log_ingest::bulk::{
    BulkWriteClient, BulkWriteOutcome, FailedDocument, HttpRequest, HttpResponse, HttpTransport,
};
use access_log_ingest::error_handling::{BulkWriteError, TransportError};
use access_log_ingest::geoip::{CityInfo, GeoEnrichment, NetworkInfo};
use access_log_ingest::random::Randomizer;
use access_log_ingest::stream::{KinesisStreamEvent, KinesisStreamRecord};
use access_log_ingest::EcsDocument;

pub const V1_TLS: &str = r#"v1.0 20120211 "https://testapps.nrs.gov.bc.ca:443" "2001:569:be94:4700:61b4:917e:808:e3c6" [20/Apr/2021:15:10:40 -0700] "POST /int/fncs/activities/details.xhtml HTTP/1.1" 200 2600 bytes 1112 bytes "https://testapps.nrs.gov.bc.ca/int/fncs/activities/details.xhtml?activityGuid=0123C676CBAB461E8C6A0A14567A16AC" "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.128 Safari/537.36" 133 ms, "TLSv1.2" "ECDHE-RSA-AES256-GCM-SHA384""#;

pub const V1_BAD_TIMESTAMP: &str = r#"v1.0 20120211 "https://testapps.nrs.gov.bc.ca:443" "2001:569:be94:4700:61b4:917e:808:e3c6" [36/Amz/2021:15:10:40 -0700] "POST /int/fncs/activities/details.xhtml HTTP/1.1" 200 2600 bytes 1112 bytes "https://testapps.nrs.gov.bc.ca/int/fncs/activities/details.xhtml?activityGuid=0123C676CBAB461E8C6A0A14567A16AC" "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.128 Safari/537.36" 133 ms, "TLSv1.2" "ECDHE-RSA-AES256-GCM-SHA384""#;

pub const V1_PLAINTEXT: &str = r#"v1.0 20120211 "http://testapps.nrs.gov.bc.ca" "142.34.120.12" [21/Apr/2021:09:01:02 -0700] "GET /int/fncs/index.xhtml?tab=2 HTTP/1.1" 200 5120 bytes 431 bytes "-" "curl/7.68.0" 12 ms, "-" "-""#;

pub const V1_KEEPALIVE: &str = r#"v1.0 20120211 "https://testapps.nrs.gov.bc.ca:443" "10.0.0.12" [21/Apr/2021:09:01:02 -0700] "GET /keepalive.html HTTP/1.1" 200 43 bytes - bytes "-" "ELB-HealthChecker/2.0" 0 ms, "TLSv1.2" "ECDHE-RSA-AES128-GCM-SHA256""#;

pub const COMBINED_TLS: &str = r#"142.34.120.12 - - [21/Apr/2021:09:01:02 -0700] "GET /pub/app/index.html?lang=en HTTP/1.1" 200 2326 "https://www.example.gov.bc.ca/" "Mozilla/5.0 (X11; Linux x86_64)" 87 "TLSv1.3" "TLS_AES_256_GCM_SHA384""#;

pub const COMMON: &str = r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#;

/// Envelope metadata the log shipper attaches to every line.
pub fn envelope_signature() -> Value {
    json!({
        "event": {"kind": "event", "category": "web", "dataset": "apache.access"},
        "agent": {"type": "fluent-bit"},
        "labels": {"project": "nrs"}
    })
}

/// Stream record carrying `message` merged into the envelope signature.
pub fn record(sequence_number: &str, message: &str) -> KinesisStreamRecord {
    record_with_envelope(sequence_number, message, envelope_signature())
}

pub fn record_with_envelope(
    sequence_number: &str,
    message: &str,
    mut envelope: Value,
) -> KinesisStreamRecord {
    envelope["message"] = Value::from(message);
    KinesisStreamRecord::from_envelope(sequence_number, &envelope)
}

pub fn event(records: Vec<KinesisStreamRecord>) -> KinesisStreamEvent {
    KinesisStreamEvent { records }
}

/// Always returns the bytes of `"buffer"`.
pub struct FixedRandomizer;

impl Randomizer for FixedRandomizer {
    fn random_bytes(&self, _size: usize) -> Vec<u8> {
        b"buffer".to_vec()
    }
}

/// Returns 0, 1, 2, ... as the first byte so identifiers are distinct and predictable.
#[derive(Default)]
pub struct CountingRandomizer {
    next: Mutex<u8>,
}

impl Randomizer for CountingRandomizer {
    fn random_bytes(&self, size: usize) -> Vec<u8> {
        let mut next = self.next.lock().unwrap();
        let mut bytes = vec![0u8; size];
        if let Some(first) = bytes.first_mut() {
            *first = *next;
        }
        *next = next.wrapping_add(1);
        bytes
    }
}

/// Geo lookups that match every address.
pub struct FakeGeo;

impl GeoEnrichment for FakeGeo {
    fn lookup_network(&self, _ip: &str) -> Option<NetworkInfo> {
        Some(NetworkInfo {
            asn: Some(852),
            organization: Some("TELUS Communications Inc.".to_string()),
        })
    }

    fn lookup_city(&self, _ip: &str) -> Option<CityInfo> {
        Some(CityInfo {
            city_name: Some("Victoria".to_string()),
            country_iso_code: Some("CA".to_string()),
            latitude: Some(48.4284),
            longitude: Some(-123.3656),
            ..Default::default()
        })
    }
}

type Script =
    dyn Fn(usize, &[EcsDocument]) -> Result<BulkWriteOutcome, BulkWriteError> + Send + Sync;

/// Bulk client answering from a script of (call number, documents) and
/// recording every submission.
pub struct ScriptedBulkClient {
    script: Box<Script>,
    pub calls: Mutex<Vec<Vec<EcsDocument>>>,
}

impl ScriptedBulkClient {
    pub fn new(
        script: impl Fn(usize, &[EcsDocument]) -> Result<BulkWriteOutcome, BulkWriteError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(ScriptedBulkClient {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn always_succeeds() -> Arc<Self> {
        Self::new(|_, documents| Ok(BulkWriteOutcome::succeeded(documents.len())))
    }

    pub fn always_fails() -> Arc<Self> {
        Self::new(|_, documents| Ok(fail_all(documents)))
    }

    pub fn call_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }

    pub fn call_ids(&self, call: usize) -> Vec<String> {
        self.calls.lock().unwrap()[call]
            .iter()
            .map(|d| d.id().unwrap_or_default().to_string())
            .collect()
    }
}

#[async_trait]
impl BulkWriteClient for ScriptedBulkClient {
    async fn write(&self, documents: &[EcsDocument]) -> Result<BulkWriteOutcome, BulkWriteError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(documents.to_vec());
            calls.len() - 1
        };
        (self.script)(call, documents)
    }
}

pub fn fail_all(documents: &[EcsDocument]) -> BulkWriteOutcome {
    BulkWriteOutcome::from_failures(
        documents.len(),
        documents
            .iter()
            .enumerate()
            .map(|(position, document)| FailedDocument {
                position,
                document: document.clone(),
                error: json!({"type": "es_rejected_execution_exception"}),
            })
            .collect(),
    )
}

/// Transport that answers bulk requests item by item: an item fails when
/// `fails(request_number, position)` is true. Records request bodies.
pub struct BulkItemTransport {
    fails: Box<dyn Fn(usize, usize) -> bool + Send + Sync>,
    pub bodies: Mutex<Vec<String>>,
}

impl BulkItemTransport {
    pub fn new(fails: impl Fn(usize, usize) -> bool + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(BulkItemTransport {
            fails: Box::new(fails),
            bodies: Mutex::new(Vec::new()),
        })
    }

    /// `_id`s of the action lines of request `n`.
    pub fn request_ids(&self, n: usize) -> Vec<String> {
        let bodies = self.bodies.lock().unwrap();
        bodies[n]
            .lines()
            .step_by(2)
            .map(|line| {
                let action: Value = serde_json::from_str(line).unwrap();
                action["create"]["_id"].as_str().unwrap().to_string()
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for BulkItemTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let body = request.body_text();
        let request_number = {
            let mut bodies = self.bodies.lock().unwrap();
            bodies.push(body.clone());
            bodies.len() - 1
        };

        let mut errors = false;
        let items: Vec<Value> = body
            .trim()
            .lines()
            .step_by(2)
            .enumerate()
            .map(|(position, line)| {
                let action: Value = serde_json::from_str(line).unwrap();
                let mut item = json!({"create": {"_id": action["create"]["_id"].clone()}});
                if (self.fails)(request_number, position) {
                    errors = true;
                    item["create"]["error"] = json!({});
                } else {
                    item["create"]["status"] = json!(201);
                }
                item
            })
            .collect();

        Ok(HttpResponse {
            status: 200,
            body: json!({"errors": errors, "items": items}).to_string(),
        })
    }
}
