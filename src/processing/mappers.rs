//! Mapping helpers between pages, chunks and Qdrant points.

use crate::{
    processing::{
        chunking::chunk_text,
        sanitize::{ChunkOrigin, chunk_metadata, flatten_metadata},
        types::ChunkingError,
    },
    qdrant::{ScoredPoint, split_payload},
};
use serde_json::{Map, Value};

/// Chunk text with its flattened metadata, ready for embedding.
#[derive(Debug, Clone)]
pub(crate) struct PreparedChunk {
    pub(crate) text: String,
    pub(crate) metadata: Map<String, Value>,
}

/// Chunk every page of a document and attach per-chunk metadata.
///
/// Chunk indexes run across the whole document; page numbers start at 1.
pub(crate) fn prepare_chunks(
    pages: &[String],
    source: &str,
    document_id: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<PreparedChunk>, ChunkingError> {
    let total_pages = pages.len();
    let mut prepared = Vec::new();

    for (page_idx, page) in pages.iter().enumerate() {
        for text in chunk_text(page, chunk_size, overlap)? {
            let metadata = flatten_metadata(chunk_metadata(ChunkOrigin {
                source,
                document_id,
                page_number: page_idx + 1,
                total_pages,
                chunk_index: prepared.len(),
            }));
            prepared.push(PreparedChunk { text, metadata });
        }
    }

    Ok(prepared)
}

/// Chunk retrieved for a question.
#[derive(Debug, Clone)]
pub(crate) struct RetrievedChunk {
    pub(crate) text: String,
    pub(crate) metadata: Map<String, Value>,
}

/// Separate a scored point into its text and caller-facing metadata.
pub(crate) fn map_scored_point(point: ScoredPoint) -> RetrievedChunk {
    let (text, metadata) = split_payload(point.payload.unwrap_or_default());
    RetrievedChunk {
        text: text.unwrap_or_default(),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pages_are_numbered_and_chunks_indexed_across_document() {
        let pages = vec![
            "First page text.".to_string(),
            String::new(),
            "Third page text.".to_string(),
        ];
        let chunks = prepare_chunks(&pages, "cv.pdf", "doc-7", 500, 200).expect("chunks");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "First page text.");
        assert_eq!(chunks[0].metadata["loc"], json!("{\"pageNumber\":1}"));
        assert_eq!(chunks[0].metadata["chunk_index"], json!(0));
        assert_eq!(chunks[1].metadata["loc"], json!("{\"pageNumber\":3}"));
        assert_eq!(chunks[1].metadata["chunk_index"], json!(1));
        assert_eq!(chunks[1].metadata["pdf"], json!("{\"totalPages\":3}"));
        assert!(chunks.iter().all(|c| c.metadata["document_id"] == json!("doc-7")));
    }

    #[test]
    fn scored_point_text_is_split_from_metadata() {
        let point = ScoredPoint {
            id: "p1".into(),
            score: 0.8,
            payload: json!({ "text": "body", "source": "cv.pdf" })
                .as_object()
                .cloned(),
        };
        let chunk = map_scored_point(point);
        assert_eq!(chunk.text, "body");
        assert_eq!(chunk.metadata.get("source"), Some(&json!("cv.pdf")));
        assert!(!chunk.metadata.contains_key("text"));
    }

    #[test]
    fn scored_point_without_payload_maps_to_empty_chunk() {
        let chunk = map_scored_point(ScoredPoint {
            id: "p2".into(),
            score: 0.1,
            payload: None,
        });
        assert!(chunk.text.is_empty());
        assert!(chunk.metadata.is_empty());
    }
}
