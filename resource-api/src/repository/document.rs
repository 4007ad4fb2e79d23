//! Persisted document representation
//!
//! A [`Document`] is a JSON object owned by the store. The controller only
//! touches a handful of bookkeeping paths on it: `_id`, `timestamps.created.by`,
//! `timestamps.updated.by` and `mark.deleted`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key of the store-assigned identifier
pub const ID_FIELD: &str = "_id";

/// Key of the audit timestamps substructure
pub const TIMESTAMPS_FIELD: &str = "timestamps";

/// A document as read from or written to the store
///
/// # Example
///
/// ```rust
/// use resource_api::repository::Document;
/// use serde_json::json;
///
/// let mut doc = Document::from_value(json!({ "_id": "5b0f8f1c9d3e2a1f4c8b4567", "name": "a" })).unwrap();
/// doc.stamp_updated_by("alice");
/// assert_eq!(doc.id().as_deref(), Some("5b0f8f1c9d3e2a1f4c8b4567"));
/// assert_eq!(doc.to_plain()["timestamps"]["updated"]["by"], "alice");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, returning `None` unless it is an object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// The document identifier rendered as a string
    ///
    /// Accepts plain string or numeric ids as well as extended-JSON
    /// `{"$oid": "..."}` ids.
    pub fn id(&self) -> Option<String> {
        match self.0.get(ID_FIELD)? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            Value::Object(oid) => oid.get("$oid").and_then(Value::as_str).map(str::to_owned),
            _ => None,
        }
    }

    /// Get a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a top-level field, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Overwrite each top-level key present in `body`
    ///
    /// This is a replace-by-key merge, nested objects are not merged.
    pub fn merge(&mut self, body: Map<String, Value>) {
        for (key, value) in body {
            self.0.insert(key, value);
        }
    }

    /// Record the actor that created the document
    pub fn stamp_created_by(&mut self, actor: &str) {
        self.stamp("created", actor);
    }

    /// Record the actor that last updated the document
    pub fn stamp_updated_by(&mut self, actor: &str) {
        self.stamp("updated", actor);
    }

    /// Flag the document as soft-deleted
    pub fn mark_deleted(&mut self) {
        if let Some(mark) = object_entry(&mut self.0, "mark") {
            mark.insert("deleted".to_string(), Value::Bool(true));
        }
    }

    /// Whether the document carries the soft-delete flag
    pub fn is_marked_deleted(&self) -> bool {
        self.0
            .get("mark")
            .and_then(|mark| mark.get("deleted"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Plain JSON representation for responses
    pub fn to_plain(&self) -> Value {
        Value::Object(self.0.clone())
    }

    fn stamp(&mut self, slot: &str, actor: &str) {
        let entry = object_entry(&mut self.0, TIMESTAMPS_FIELD)
            .and_then(|timestamps| object_entry(timestamps, slot));
        if let Some(entry) = entry {
            entry.insert("by".to_string(), Value::String(actor.to_string()));
        }
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc.0)
    }
}

/// Get `key` as a mutable object, replacing any non-object value
fn object_entry<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> Option<&'a mut Map<String, Value>> {
    if !map.get(key).is_some_and(Value::is_object) {
        map.insert(key.to_string(), Value::Object(Map::new()));
    }
    map.get_mut(key).and_then(Value::as_object_mut)
}
