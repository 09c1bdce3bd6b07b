//! Document pipeline: staging, extraction, chunking, embedding, retrieval and generation.

mod chunking;
mod mappers;
pub mod pdf;
mod prompt;
pub mod sanitize;
mod service;
pub mod types;

pub use pdf::{DocumentLoader, PdfLoader};
pub use prompt::RETRIEVAL_LIMIT;
pub use service::{PipelineSettings, ProcessingService, RagApi};
pub use types::{
    ChunkingError, DeadlineExceeded, ExtractionError, IngestOutcome, ProcessingError,
    QdrantHealthSnapshot, QueryAnswer, QueryError, UploadedPdf,
};
