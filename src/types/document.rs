//! Versioned document type
//!
//! Documents carry a monotonically increasing version used for optimistic
//! concurrency control. Every accepted write advances the version by exactly
//! one; a write naming a stale version fails atomically.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A patch is a shallow JSON-object merge: each key replaces (or adds)
/// the corresponding payload field.
pub type Patch = Map<String, Value>;

/// A document under optimistic concurrency control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedDocument {
    /// Stable document id (application-chosen, e.g. "LOAN-1")
    pub id: String,

    /// Monotonic version, starts at 1 on creation
    pub version: u64,

    /// Application payload fields (a JSON object)
    pub payload: Value,

    /// Unix millis of the last accepted write
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,

    /// Who performed the last accepted write
    #[serde(rename = "updatedBy")]
    pub updated_by: String,
}

impl VersionedDocument {
    /// Create a new document at version 1
    pub fn new(id: String, payload: Value, updated_by: String, now_ms: i64) -> Self {
        Self {
            id,
            version: 1,
            payload,
            updated_at: now_ms,
            updated_by,
        }
    }

    /// Read a single payload field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Merge a patch into the payload (shallow, key-by-key)
    pub fn apply_patch(&mut self, patch: &Patch) {
        if !self.payload.is_object() {
            self.payload = Value::Object(Map::new());
        }
        if let Some(obj) = self.payload.as_object_mut() {
            for (key, value) in patch {
                obj.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_document_starts_at_version_one() {
        let doc = VersionedDocument::new(
            "LOAN-1".to_string(),
            json!({"status": "pending"}),
            "tester".to_string(),
            1_700_000_000_000,
        );
        assert_eq!(doc.version, 1);
        assert_eq!(doc.field("status"), Some(&json!("pending")));
    }

    #[test]
    fn test_apply_patch_merges_and_overwrites() {
        let mut doc = VersionedDocument::new(
            "LOAN-1".to_string(),
            json!({"status": "pending", "amount": 1000}),
            "tester".to_string(),
            0,
        );

        let mut patch = Patch::new();
        patch.insert("status".to_string(), json!("approved"));
        patch.insert("approver".to_string(), json!("alice"));
        doc.apply_patch(&patch);

        assert_eq!(doc.field("status"), Some(&json!("approved")));
        assert_eq!(doc.field("approver"), Some(&json!("alice")));
        // Untouched fields survive
        assert_eq!(doc.field("amount"), Some(&json!(1000)));
    }

    #[test]
    fn test_serialization_uses_camel_case_wire_names() {
        let doc = VersionedDocument::new(
            "DOC-1".to_string(),
            json!({}),
            "tester".to_string(),
            42,
        );
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"updatedAt\":42"));
        assert!(json.contains("\"updatedBy\":\"tester\""));

        let parsed: VersionedDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "DOC-1");
        assert_eq!(parsed.version, 1);
    }
}
