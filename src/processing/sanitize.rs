//! Helpers for normalizing request input and chunk metadata.

use serde_json::{Map, Value, json};

const MAX_COLLECTION_NAME_LEN: usize = 255;

/// Sanitize arbitrary string input by trimming whitespace and dropping empties.
pub(crate) fn sanitize_string(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Validate a caller-supplied collection name.
///
/// Blank input yields `Ok(None)` so callers can fall back to the configured collection. Names
/// end up in Qdrant URL paths, so only ASCII letters, digits, `_`, `-` and `.` are accepted.
pub fn sanitize_collection(value: Option<String>) -> Result<Option<String>, String> {
    let Some(name) = sanitize_string(value) else {
        return Ok(None);
    };

    if name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(format!(
            "Collection name must be at most {MAX_COLLECTION_NAME_LEN} characters"
        ));
    }
    if name == "." || name == ".." {
        return Err(format!("Invalid collection name: {name}"));
    }
    let valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(format!(
            "Invalid collection name '{name}': use letters, digits, '_', '-' or '.'"
        ));
    }
    Ok(Some(name))
}

/// Where a chunk came from inside an uploaded document.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkOrigin<'a> {
    pub(crate) source: &'a str,
    pub(crate) document_id: &'a str,
    pub(crate) page_number: usize,
    pub(crate) total_pages: usize,
    pub(crate) chunk_index: usize,
}

/// Metadata recorded for a chunk, before flattening.
pub(crate) fn chunk_metadata(origin: ChunkOrigin<'_>) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("source".into(), Value::String(origin.source.to_string()));
    metadata.insert(
        "document_id".into(),
        Value::String(origin.document_id.to_string()),
    );
    metadata.insert("pdf".into(), json!({ "totalPages": origin.total_pages }));
    metadata.insert("loc".into(), json!({ "pageNumber": origin.page_number }));
    metadata.insert("chunk_index".into(), json!(origin.chunk_index));
    metadata
}

/// Replace nested values with their JSON encoding so every entry is a primitive.
///
/// Objects, arrays and `null` are encoded; strings, numbers and booleans pass through.
pub fn flatten_metadata(metadata: Map<String, Value>) -> Map<String, Value> {
    metadata
        .into_iter()
        .map(|(key, value)| {
            let flat = match value {
                Value::Object(_) | Value::Array(_) | Value::Null => {
                    Value::String(value.to_string())
                }
                primitive => primitive,
            };
            (key, flat)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_collection_falls_back() {
        assert_eq!(sanitize_collection(None), Ok(None));
        assert_eq!(sanitize_collection(Some("   ".into())), Ok(None));
    }

    #[test]
    fn collection_names_are_trimmed() {
        assert_eq!(
            sanitize_collection(Some("  session-42_docs.v1 ".into())),
            Ok(Some("session-42_docs.v1".into()))
        );
    }

    #[test]
    fn collection_names_cannot_escape_the_url_path() {
        assert!(sanitize_collection(Some("../points".into())).is_err());
        assert!(sanitize_collection(Some("a/b".into())).is_err());
        assert!(sanitize_collection(Some("..".into())).is_err());
        assert!(sanitize_collection(Some("x".repeat(256))).is_err());
    }

    #[test]
    fn flatten_encodes_nested_values() {
        let metadata = json!({
            "source": "cv.pdf",
            "chunk_index": 3,
            "scanned": false,
            "loc": { "pageNumber": 2 },
            "tags": ["a", "b"],
            "missing": null
        })
        .as_object()
        .cloned()
        .expect("object");

        let flat = flatten_metadata(metadata);

        assert_eq!(flat["source"], json!("cv.pdf"));
        assert_eq!(flat["chunk_index"], json!(3));
        assert_eq!(flat["scanned"], json!(false));
        assert_eq!(flat["loc"], json!("{\"pageNumber\":2}"));
        assert_eq!(flat["tags"], json!("[\"a\",\"b\"]"));
        assert_eq!(flat["missing"], json!("null"));
        assert!(flat.values().all(|value| !value.is_object() && !value.is_array()));
    }

    #[test]
    fn chunk_metadata_flattens_to_loader_shape() {
        let metadata = flatten_metadata(chunk_metadata(ChunkOrigin {
            source: "resume.pdf",
            document_id: "doc-1",
            page_number: 1,
            total_pages: 2,
            chunk_index: 0,
        }));

        assert_eq!(metadata["source"], json!("resume.pdf"));
        assert_eq!(metadata["document_id"], json!("doc-1"));
        assert_eq!(metadata["pdf"], json!("{\"totalPages\":2}"));
        assert_eq!(metadata["loc"], json!("{\"pageNumber\":1}"));
        assert_eq!(metadata["chunk_index"], json!(0));
    }
}
