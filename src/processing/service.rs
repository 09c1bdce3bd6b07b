//! Processing service coordinating extraction, chunking, embedding, retrieval and generation.

use crate::{
    config::{Config, get_config},
    embedding::{EmbeddingClient, get_embedding_client},
    generation::{GenerationClient, get_generation_client},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        mappers::{RetrievedChunk, map_scored_point, prepare_chunks},
        pdf::{DocumentLoader, PdfLoader, stage_upload},
        prompt::{RETRIEVAL_LIMIT, build_context, build_prompt},
        types::{
            DeadlineExceeded, ExtractionError, IngestOutcome, ProcessingError,
            QdrantHealthSnapshot, QueryAnswer, QueryError, UploadedPdf,
        },
    },
    qdrant::{IndexSummary, PointInsert, QdrantService},
};
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Tunables the pipeline reads on every request.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Maximum chunk length, in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
    /// Directory where uploads are staged.
    pub upload_dir: PathBuf,
    /// Deadline applied to every external call.
    pub external_timeout: Duration,
    /// Collection probed by the health check.
    pub default_collection: String,
}

impl PipelineSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.text_splitter_chunk_size,
            chunk_overlap: config.text_splitter_chunk_overlap,
            upload_dir: config.upload_dir.clone(),
            external_timeout: config.external_timeout(),
            default_collection: config.qdrant_collection_name.clone(),
        }
    }
}

/// Runs the upload and question pipelines.
///
/// The service owns long-lived handles to the Ollama clients, the Qdrant transport and the
/// metrics registry. Build it once at start-up and share it through an `Arc`. It keeps no
/// per-document state: everything durable lives in Qdrant.
pub struct ProcessingService {
    embedding_client: Box<dyn EmbeddingClient>,
    generation_client: Box<dyn GenerationClient>,
    qdrant_service: QdrantService,
    loader: Arc<dyn DocumentLoader>,
    metrics: Arc<PipelineMetrics>,
    settings: PipelineSettings,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Stage, extract, chunk, embed and store an uploaded PDF in `collection_name`.
    async fn ingest_pdf(
        &self,
        collection_name: &str,
        upload: UploadedPdf,
    ) -> Result<IngestOutcome, ProcessingError>;

    /// Answer `question` from the chunks stored in `collection_name`.
    async fn answer_question(
        &self,
        collection_name: &str,
        question: &str,
    ) -> Result<QueryAnswer, QueryError>;

    /// Probe the vector store.
    async fn health(&self) -> QdrantHealthSnapshot;

    /// Retrieve the current metrics snapshot.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ProcessingService {
    /// Build a service from the global configuration, using the PDF loader.
    pub fn new() -> Result<Self, ProcessingError> {
        let config = get_config();
        tracing::info!("Initializing Ollama clients");
        let embedding_client = get_embedding_client()?;
        let generation_client = get_generation_client()?;
        let qdrant_service = QdrantService::new()?;
        tracing::info!(
            embedding_model = %config.embedding_model,
            generation_model = %config.generation_model,
            "Processing service ready"
        );

        Ok(Self {
            embedding_client,
            generation_client,
            qdrant_service,
            loader: Arc::new(PdfLoader),
            metrics: Arc::new(PipelineMetrics::new()),
            settings: PipelineSettings::from_config(config),
        })
    }

    /// Replace the document loader.
    pub fn with_loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Stage, extract, chunk, embed and store an uploaded PDF.
    ///
    /// The staged file is removed on every exit path. A failure after some points were written
    /// leaves them in the collection.
    pub async fn ingest_pdf(
        &self,
        collection_name: &str,
        upload: UploadedPdf,
    ) -> Result<IngestOutcome, ProcessingError> {
        let started = Instant::now();
        let UploadedPdf { file_name, bytes } = upload;
        tracing::info!(
            collection = collection_name,
            file = %file_name,
            bytes = bytes.len(),
            "Processing upload"
        );

        let loader = Arc::clone(&self.loader);
        let upload_dir = self.settings.upload_dir.clone();
        let (staged, pages) = tokio::task::spawn_blocking(move || {
            let staged = stage_upload(&upload_dir, &bytes)?;
            tracing::debug!(path = %staged.path().display(), "Upload staged");
            let pages = loader.load_pages(staged.path())?;
            Ok::<_, ProcessingError>((staged, pages))
        })
        .await
        .map_err(|error| ExtractionError::Panicked(error.to_string()))??;

        let document_id = Uuid::new_v4().to_string();
        let prepared = prepare_chunks(
            &pages,
            &file_name,
            &document_id,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        )?;
        if prepared.is_empty() {
            return Err(ExtractionError::NoText.into());
        }
        tracing::debug!(
            pages = pages.len(),
            chunks = prepared.len(),
            chunk_size = self.settings.chunk_size,
            overlap = self.settings.chunk_overlap,
            "Split document"
        );

        let texts: Vec<String> = prepared.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self
            .within("embedding", self.embedding_client.generate_embeddings(texts))
            .await??;

        let vector_size = embeddings.first().map(Vec::len).unwrap_or_default() as u64;
        self.within(
            "collection setup",
            self.qdrant_service
                .create_collection_if_not_exists(collection_name, vector_size),
        )
        .await??;

        let points: Vec<PointInsert> = prepared
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, vector)| PointInsert {
                text: chunk.text,
                metadata: chunk.metadata,
                vector,
            })
            .collect();

        let IndexSummary { inserted } = self
            .within(
                "vector upsert",
                self.qdrant_service.index_points(collection_name, points),
            )
            .await??;

        if let Err(error) = staged.close() {
            tracing::warn!(error = %error, "Failed to remove staged upload");
        }

        self.metrics.record_document(inserted as u64);
        tracing::info!(
            collection = collection_name,
            document_id = %document_id,
            pages = pages.len(),
            chunks = inserted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document indexed"
        );

        Ok(IngestOutcome {
            document_id,
            page_count: pages.len(),
            chunk_count: inserted,
        })
    }

    /// Answer a question from the nearest stored chunks.
    ///
    /// The collection is looked up on every call. A collection that does not exist yet is
    /// treated as an empty corpus and the model answers without context.
    pub async fn answer_question(
        &self,
        collection_name: &str,
        question: &str,
    ) -> Result<QueryAnswer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }
        tracing::info!(collection = collection_name, question, "Answering question");

        let exists = self
            .within(
                "collection lookup",
                self.qdrant_service.collection_exists(collection_name),
            )
            .await??;

        let retrieved: Vec<RetrievedChunk> = if exists {
            let mut vectors = self
                .within(
                    "embedding",
                    self.embedding_client
                        .generate_embeddings(vec![question.to_string()]),
                )
                .await??;
            let vector = vectors.pop().ok_or(QueryError::EmptyEmbedding)?;
            let hits = self
                .within(
                    "vector search",
                    self.qdrant_service
                        .search_points(collection_name, vector, RETRIEVAL_LIMIT),
                )
                .await??;
            hits.into_iter().map(map_scored_point).collect()
        } else {
            tracing::debug!(
                collection = collection_name,
                "Collection missing; answering without context"
            );
            Vec::new()
        };

        let context = build_context(retrieved.iter().map(|chunk| chunk.text.as_str()));
        let prompt = build_prompt(&context, question);
        let answer = self
            .within("generation", self.generation_client.generate(prompt))
            .await??;

        self.metrics.record_answer();
        tracing::info!(
            collection = collection_name,
            sources = retrieved.len(),
            "Question answered"
        );

        Ok(QueryAnswer {
            answer,
            sources: retrieved.into_iter().map(|chunk| chunk.metadata).collect(),
        })
    }

    /// Probe Qdrant by listing collections.
    pub async fn health(&self) -> QdrantHealthSnapshot {
        let probe = self
            .within("health probe", self.qdrant_service.list_collections())
            .await;
        let error = match probe {
            Ok(Ok(collections)) => {
                let default_present = collections
                    .iter()
                    .any(|name| name == &self.settings.default_collection);
                return QdrantHealthSnapshot {
                    reachable: true,
                    default_collection_present: default_present,
                    error: None,
                };
            }
            Ok(Err(error)) => error.to_string(),
            Err(error) => error.to_string(),
        };
        tracing::warn!(error = %error, "Qdrant health probe failed");
        QdrantHealthSnapshot {
            reachable: false,
            default_collection_present: false,
            error: Some(error),
        }
    }

    /// Return the current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run `future` under the external-call deadline. Dropping the request cancels it.
    async fn within<F, T>(&self, stage: &'static str, future: F) -> Result<T, DeadlineExceeded>
    where
        F: Future<Output = T>,
    {
        let deadline = self.settings.external_timeout;
        tokio::time::timeout(deadline, future).await.map_err(|_| {
            tracing::error!(stage, seconds = deadline.as_secs(), "External call timed out");
            DeadlineExceeded {
                stage,
                seconds: deadline.as_secs(),
            }
        })
    }
}

#[async_trait]
impl RagApi for ProcessingService {
    async fn ingest_pdf(
        &self,
        collection_name: &str,
        upload: UploadedPdf,
    ) -> Result<IngestOutcome, ProcessingError> {
        ProcessingService::ingest_pdf(self, collection_name, upload).await
    }

    async fn answer_question(
        &self,
        collection_name: &str,
        question: &str,
    ) -> Result<QueryAnswer, QueryError> {
        ProcessingService::answer_question(self, collection_name, question).await
    }

    async fn health(&self) -> QdrantHealthSnapshot {
        ProcessingService::health(self).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ProcessingService::metrics_snapshot(self)
    }
}
