//! Core data types and error definitions for the processing pipeline.

use crate::{
    embedding::EmbeddingClientError, generation::GenerationClientError, qdrant::QdrantError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while turning page text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk length.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap would leave no room for new text in a chunk.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidOverlap {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested chunk size in characters.
        chunk_size: usize,
    },
}

/// Errors produced while reading text out of an uploaded document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Staged file could not be read back.
    #[error("Failed to read staged upload: {0}")]
    Io(#[from] std::io::Error),
    /// PDF parser rejected the document.
    #[error("Failed to extract text from PDF: {0}")]
    Pdf(String),
    /// Document parsed but contained no text.
    #[error("No extractable text found in PDF")]
    NoText,
    /// Extraction task died before returning.
    #[error("PDF extraction aborted: {0}")]
    Panicked(String),
}

/// An external call did not finish before its deadline.
#[derive(Debug, Error)]
#[error("{stage} timed out after {seconds}s")]
pub struct DeadlineExceeded {
    /// Pipeline stage that was waiting.
    pub stage: &'static str,
    /// Deadline that elapsed, in seconds.
    pub seconds: u64,
}

/// Errors emitted by the upload pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Upload could not be written to the staging directory.
    #[error("Failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),
    /// Text extraction failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors for the chunks.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Qdrant interaction failed during ingestion.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Generation client could not be constructed.
    #[error(transparent)]
    Generation(#[from] GenerationClientError),
    /// An external call exceeded its deadline.
    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),
}

/// Errors emitted while answering a question.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Question was missing or blank.
    #[error("Question is required!")]
    EmptyQuestion,
    /// Embedding provider failed to return a vector for the question.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the question")]
    EmptyEmbedding,
    /// Qdrant lookup or search failed.
    #[error("Qdrant request failed: {0}")]
    Qdrant(#[from] QdrantError),
    /// Generation model failed to answer.
    #[error(transparent)]
    Generation(#[from] GenerationClientError),
    /// An external call exceeded its deadline.
    #[error(transparent)]
    Timeout(#[from] DeadlineExceeded),
}

/// Raw upload handed to the pipeline by the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadedPdf {
    /// File name reported by the client; stored as the chunk `source`.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Identifier shared by every chunk of this upload.
    pub document_id: String,
    /// Number of pages read from the document.
    pub page_count: usize,
    /// Number of chunks stored.
    pub chunk_count: usize,
}

/// Generated answer plus the metadata of the chunks it was grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
    /// Text produced by the generation model.
    pub answer: String,
    /// Metadata of the retrieved chunks, nearest first.
    #[serde(default)]
    pub sources: Vec<Map<String, Value>>,
}

/// Reachability snapshot for Qdrant.
#[derive(Debug, Clone, Serialize)]
pub struct QdrantHealthSnapshot {
    /// Whether Qdrant answered the probe.
    pub reachable: bool,
    /// Whether the default collection exists.
    pub default_collection_present: bool,
    /// Diagnostic captured when Qdrant is unreachable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
