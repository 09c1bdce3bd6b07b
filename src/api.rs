//! HTTP surface for pdfchat.
//!
//! The router exposes four endpoints:
//!
//! - `POST /upload` – Multipart upload with a `pdfFile` field (and an optional `collection`
//!   field). The PDF is extracted, chunked, embedded and stored in Qdrant.
//! - `POST /query` – JSON `{ "question": "...", "collection": "..." }`. Retrieves the nearest
//!   chunks and asks the generation model for a grounded answer.
//! - `GET /health` – Qdrant reachability probe.
//! - `GET /metrics` – Ingestion and query counters.
//!
//! Errors are always returned as `{ "error": "..." }`: 400 for invalid client input and 500
//! for anything that failed downstream.

use crate::config::get_config;
use crate::processing::{
    ProcessingError, QueryAnswer, QueryError, RagApi, UploadedPdf, sanitize::sanitize_collection,
};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::MultipartRejection,
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Multipart field carrying the uploaded document.
pub const PDF_FIELD: &str = "pdfFile";
/// Multipart field carrying the optional collection override.
pub const COLLECTION_FIELD: &str = "collection";
/// Message returned after a successful upload.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "PDF processed and stored in Qdrant!";

const MISSING_FILE_MESSAGE: &str = "PDF file is required!";

/// Build the HTTP router exposing the upload and question API.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: RagApi + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/upload",
            post(upload_pdf::<S>).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/query", post(query::<S>))
        .route("/health", get(health::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Success response for `POST /upload`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Collection the chunks were written to.
    pub collection: String,
    /// Identifier shared by every chunk of the upload.
    pub document_id: String,
    /// Number of chunks stored.
    pub chunks_indexed: usize,
}

/// Request body for `POST /query`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Question to answer.
    #[serde(default)]
    pub question: Option<String>,
    /// Optional collection override (defaults to `QDRANT_COLLECTION_NAME`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

/// Accept a PDF upload and run it through the ingestion pipeline.
async fn upload_pdf<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError>
where
    S: RagApi,
{
    let mut multipart = multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let mut upload: Option<UploadedPdf> = None;
    let mut collection: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::BadRequest(format!("Failed to read upload: {error}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            PDF_FIELD => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload.pdf".to_string());
                let bytes = field.bytes().await.map_err(|error| {
                    ApiError::BadRequest(format!("Failed to read upload: {error}"))
                })?;
                if !bytes.is_empty() {
                    upload = Some(UploadedPdf {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            COLLECTION_FIELD => {
                let value = field.text().await.map_err(|error| {
                    ApiError::BadRequest(format!("Failed to read collection field: {error}"))
                })?;
                collection = Some(value);
            }
            other => tracing::debug!(field = other, "Ignoring unexpected multipart field"),
        }
    }

    let upload = upload.ok_or_else(|| ApiError::BadRequest(MISSING_FILE_MESSAGE.into()))?;
    let collection = resolve_collection(collection)?;
    let outcome = service.ingest_pdf(&collection, upload).await?;

    Ok(Json(UploadResponse {
        message: UPLOAD_SUCCESS_MESSAGE.to_string(),
        collection,
        document_id: outcome.document_id,
        chunks_indexed: outcome.chunk_count,
    }))
}

/// Answer a question from the stored chunks.
async fn query<S>(
    State(service): State<Arc<S>>,
    request: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryAnswer>, ApiError>
where
    S: RagApi,
{
    let Json(request) = request.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let question = request
        .question
        .filter(|question| !question.trim().is_empty())
        .ok_or(ApiError::Query(QueryError::EmptyQuestion))?;
    let collection = resolve_collection(request.collection)?;

    let answer = service.answer_question(&collection, &question).await?;
    Ok(Json(answer))
}

/// Report Qdrant reachability; 503 when the probe fails.
async fn health<S>(State(service): State<Arc<S>>) -> Response
where
    S: RagApi,
{
    let snapshot = service.health().await;
    let (status, label) = if snapshot.reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };
    (status, Json(json!({ "status": label, "qdrant": snapshot }))).into_response()
}

/// Return the current pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Response
where
    S: RagApi,
{
    Json(service.metrics_snapshot()).into_response()
}

fn resolve_collection(requested: Option<String>) -> Result<String, ApiError> {
    let collection = sanitize_collection(requested).map_err(ApiError::BadRequest)?;
    Ok(collection.unwrap_or_else(|| get_config().qdrant_collection_name.clone()))
}

/// Error returned by the HTTP handlers.
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Processing(ProcessingError),
    Query(QueryError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Query(QueryError::EmptyQuestion) => {
                StatusCode::BAD_REQUEST
            }
            Self::Processing(_) | Self::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Processing(error) => error.to_string(),
            Self::Query(error) => error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(error = %message, "Request failed");
        } else {
            tracing::warn!(error = %message, "Rejected request");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

impl From<QueryError> for ApiError {
    fn from(inner: QueryError) -> Self {
        Self::Query(inner)
    }
}
