//! Helpers for constructing Qdrant payloads and reading metadata back out of them.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

/// Payload key holding the chunk text.
pub const TEXT_KEY: &str = "text";
/// Payload key holding the ingestion timestamp.
pub const INDEXED_AT_KEY: &str = "indexed_at";

/// Build the payload object stored alongside each indexed chunk.
///
/// Metadata entries are copied verbatim; the chunk text and ingestion time are stored under
/// reserved keys and win over metadata entries with the same name.
pub(crate) fn build_payload(
    text: &str,
    timestamp_rfc3339: &str,
    metadata: &Map<String, Value>,
) -> Value {
    let mut payload = metadata.clone();
    payload.insert(
        INDEXED_AT_KEY.into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    payload.insert(TEXT_KEY.into(), Value::String(text.to_string()));
    Value::Object(payload)
}

/// Split a stored payload into the chunk text and the metadata returned to callers.
pub fn split_payload(mut payload: Map<String, Value>) -> (Option<String>, Map<String, Value>) {
    let text = match payload.remove(TEXT_KEY) {
        Some(Value::String(text)) => Some(text),
        _ => None,
    };
    (text, payload)
}

/// Generate a fresh point identifier.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current time formatted as RFC3339, falling back to the Unix epoch on formatting errors.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_carries_text_timestamp_and_metadata() {
        let mut metadata = Map::new();
        metadata.insert("source".into(), json!("cv.pdf"));
        metadata.insert("text".into(), json!("shadowed"));

        let payload = build_payload("chunk body", "2024-01-01T00:00:00Z", &metadata);

        assert_eq!(payload["source"], json!("cv.pdf"));
        assert_eq!(payload["text"], json!("chunk body"));
        assert_eq!(payload["indexed_at"], json!("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn split_payload_removes_text() {
        let payload = json!({ "text": "body", "source": "cv.pdf" })
            .as_object()
            .cloned()
            .expect("object");
        let (text, metadata) = split_payload(payload);
        assert_eq!(text.as_deref(), Some("body"));
        assert!(!metadata.contains_key("text"));
        assert_eq!(metadata["source"], json!("cv.pdf"));
    }

    #[test]
    fn point_ids_are_unique() {
        assert_ne!(generate_point_id(), generate_point_id());
    }
}
