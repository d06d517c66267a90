//! Normalized output document.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Namespaces owned by the transformer. Envelope passthrough never writes
/// into them, so the TLS/plaintext URL rules cannot be undone by metadata.
const RESERVED_NAMESPACES: &[&str] = &[
    "@timestamp",
    "_index",
    "_id",
    "client",
    "http",
    "url",
    "tls",
    "user_agent",
];

/// A flat mapping of dotted field names to values plus routing metadata.
///
/// Fields are kept sorted so identical inputs serialize to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EcsDocument {
    #[serde(rename = "_index")]
    index: String,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl EcsDocument {
    /// Empty document routed to `index`.
    pub fn new(index: impl Into<String>) -> Self {
        EcsDocument {
            index: index.into(),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    /// Index the document is routed to.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Write-time identifier, assigned once before the first bulk write.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Sets the identifier used for the bulk `create`.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Value of a flat field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// True when `key` is a field or one of the routing keys.
    pub fn has_property(&self, key: &str) -> bool {
        match key {
            "_index" => true,
            "_id" => self.id.is_some(),
            _ => self.fields.contains_key(key),
        }
    }

    /// All flat fields in key order.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Sets a field only when `value` is present.
    pub fn insert_opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Merges an envelope field. Existing fields and reserved namespaces win.
    ///
    /// Returns whether the field was added.
    pub fn merge_passthrough(&mut self, key: String, value: Value) -> bool {
        if is_reserved(&key) || self.fields.contains_key(&key) {
            return false;
        }
        self.fields.insert(key, value);
        true
    }

    /// Document body as sent to the store, without routing metadata.
    pub fn source(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

fn is_reserved(key: &str) -> bool {
    RESERVED_NAMESPACES.iter().any(|namespace| {
        key == *namespace
            || key
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}
