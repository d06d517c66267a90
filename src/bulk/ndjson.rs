//! Bulk wire format.
//!
//! Requests are newline-delimited JSON: one `create` action line followed by
//! one document line per document. Responses carry one item per action, in
//! request order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transform::EcsDocument;

/// Content type of bulk request bodies
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// HTTP status the store uses for a `create` whose identifier already exists.
pub const CONFLICT_STATUS: u16 = 409;
const VERSION_CONFLICT_ERROR: &str = "version_conflict_engine_exception";

#[derive(Serialize)]
struct CreateAction<'a> {
    create: ActionMetadata<'a>,
}

#[derive(Serialize)]
struct ActionMetadata<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
}

/// Serializes documents into a bulk request body, including the trailing newline.
pub fn build_bulk_body(documents: &[EcsDocument]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for document in documents {
        let action = CreateAction {
            create: ActionMetadata {
                index: document.index(),
                id: document.id(),
            },
        };
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&document.source())?);
        body.push('\n');
    }
    Ok(body)
}

/// Bulk response body.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    /// True when at least one item failed
    #[serde(default)]
    pub errors: bool,
    /// One entry per action, in request order
    #[serde(default)]
    pub items: Vec<BulkResponseItem>,
    /// Server-side processing time in milliseconds
    #[serde(default)]
    pub took: Option<u64>,
}

/// One response item, keyed by the action name (`create`, `index`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct BulkResponseItem(BTreeMap<String, BulkItemResult>);

impl BulkResponseItem {
    /// The action result carried by this item.
    pub fn result(&self) -> Option<&BulkItemResult> {
        self.0.values().next()
    }

    /// True when the store rejected this item.
    pub fn is_failure(&self) -> bool {
        self.result().is_none_or(BulkItemResult::is_failure)
    }

    /// Error payload for a failed item. Items without one get a synthetic
    /// description so the failure is never opaque to callers.
    pub fn error_payload(&self) -> Value {
        match self.result() {
            Some(BulkItemResult {
                error: Some(error), ..
            }) => error.clone(),
            Some(result) => serde_json::json!({ "status": result.status }),
            None => serde_json::json!({ "reason": "empty bulk response item" }),
        }
    }
}

/// Result of one bulk action.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemResult {
    /// Document identifier echoed back
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    /// HTTP status of this item
    #[serde(default)]
    pub status: Option<u16>,
    /// Error payload, present on failure
    #[serde(default)]
    pub error: Option<Value>,
}

impl BulkItemResult {
    /// A conflict on `create` means the document is already stored, which
    /// happens when an earlier attempt succeeded but was reported as failed.
    pub fn is_conflict(&self) -> bool {
        self.status == Some(CONFLICT_STATUS)
            || self
                .error
                .as_ref()
                .and_then(|error| error.get("type"))
                .and_then(Value::as_str)
                == Some(VERSION_CONFLICT_ERROR)
    }

    /// Whether the document still needs writing. Conflicts do not.
    pub fn is_failure(&self) -> bool {
        if self.is_conflict() {
            return false;
        }
        self.error.is_some() || self.status.is_some_and(|status| status >= 300)
    }
}
