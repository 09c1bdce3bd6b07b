//! HTTP client for the pdfchat service.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Client, StatusCode, multipart};
use serde::Deserialize;
use thiserror::Error;

use crate::api::{COLLECTION_FIELD, PDF_FIELD, QueryRequest, UploadResponse};
use crate::processing::QueryAnswer;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Errors reported by [`RagClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// File does not look like a PDF.
    #[error("{0} is not a PDF file")]
    NotPdf(String),
    /// Question was blank.
    #[error("Question is required!")]
    EmptyQuestion,
    /// Local file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Request never produced a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Service answered with an error status.
    #[error("Server returned {status}: {message}")]
    Server {
        /// HTTP status code.
        status: StatusCode,
        /// Message from the `{error}` body, or the raw body.
        message: String,
    },
    /// Another request from this client is still running.
    #[error("A request is already in progress")]
    Busy,
}

/// Acknowledgement returned after an upload.
pub type UploadReceipt = UploadResponse;

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client allowing one request in flight at a time.
pub struct RagClient {
    client: Client,
    base_url: String,
    busy: AtomicBool,
}

/// Clears the busy flag when the request finishes, however it finishes.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RagClient {
    /// Build a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(concat!("pdfchat-cli/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            busy: AtomicBool::new(false),
        })
    }

    /// Whether a request is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Validate and upload a PDF from disk.
    pub async fn upload_pdf(
        &self,
        path: &Path,
        collection: Option<&str>,
    ) -> Result<UploadReceipt, ClientError> {
        let _guard = self.acquire()?;
        let shown = path.display().to_string();
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: shown.clone(),
            source,
        })?;
        validate_pdf(path, &bytes)?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.pdf")
            .to_string();
        tracing::info!(file = %shown, bytes = bytes.len(), "Uploading PDF");

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let mut form = multipart::Form::new().part(PDF_FIELD, part);
        if let Some(collection) = collection {
            form = form.text(COLLECTION_FIELD, collection.to_string());
        }

        let response = self
            .client
            .post(self.endpoint("/upload"))
            .multipart(form)
            .send()
            .await?;
        read_json(response).await
    }

    /// Ask a question.
    pub async fn query(
        &self,
        question: &str,
        collection: Option<&str>,
    ) -> Result<QueryAnswer, ClientError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ClientError::EmptyQuestion);
        }
        let _guard = self.acquire()?;
        tracing::info!(question, "Sending question");

        let body = QueryRequest {
            question: Some(question.to_string()),
            collection: collection.map(str::to_string),
        };
        let response = self
            .client
            .post(self.endpoint("/query"))
            .json(&body)
            .send()
            .await?;
        read_json(response).await
    }

    fn acquire(&self) -> Result<BusyGuard<'_>, ClientError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Accept only `.pdf` files that start with the PDF magic bytes.
pub fn validate_pdf(path: &Path, bytes: &[u8]) -> Result<(), ClientError> {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if has_extension && bytes.starts_with(PDF_MAGIC) {
        Ok(())
    } else {
        Err(ClientError::NotPdf(path.display().to_string()))
    }
}

async fn read_json<T>(response: reqwest::Response) -> Result<T, ClientError>
where
    T: serde::de::DeserializeOwned,
{
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.error)
        .unwrap_or(body);
    tracing::warn!(status = %status, error = %message, "Service rejected request");
    Err(ClientError::Server { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::Write;

    fn client_for(server: &MockServer) -> RagClient {
        RagClient::new(&server.base_url(), Duration::from_secs(5)).expect("client")
    }

    fn pdf_on_disk(name: &str, contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(contents).expect("write");
        (dir, path)
    }

    #[test]
    fn validation_requires_extension_and_magic() {
        assert!(validate_pdf(Path::new("cv.pdf"), b"%PDF-1.7").is_ok());
        assert!(validate_pdf(Path::new("CV.PDF"), b"%PDF-1.7").is_ok());
        assert!(matches!(
            validate_pdf(Path::new("cv.txt"), b"%PDF-1.7"),
            Err(ClientError::NotPdf(_))
        ));
        assert!(matches!(
            validate_pdf(Path::new("cv.pdf"), b"PK\x03\x04"),
            Err(ClientError::NotPdf(_))
        ));
        assert!(validate_pdf(Path::new("cv"), b"%PDF").is_err());
    }

    #[tokio::test]
    async fn upload_sends_pdf_field_and_collection() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/upload")
                    .body_contains("name=\"pdfFile\"")
                    .body_contains("filename=\"resume.pdf\"")
                    .body_contains("name=\"collection\"")
                    .body_contains("session-9");
                then.status(200).json_body(json!({
                    "message": "PDF processed and stored in Qdrant!",
                    "collection": "session-9",
                    "document_id": "doc-1",
                    "chunks_indexed": 3
                }));
            })
            .await;

        let (_dir, path) = pdf_on_disk("resume.pdf", b"%PDF-1.4 body");
        let receipt = client_for(&server)
            .upload_pdf(&path, Some("session-9"))
            .await
            .expect("upload");

        mock.assert_async().await;
        assert_eq!(receipt.chunks_indexed, 3);
        assert_eq!(receipt.collection, "session-9");
    }

    #[tokio::test]
    async fn non_pdf_is_rejected_before_sending() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/upload");
                then.status(200);
            })
            .await;

        let (_dir, path) = pdf_on_disk("notes.pdf", b"plain text");
        let error = client_for(&server)
            .upload_pdf(&path, None)
            .await
            .expect_err("not a pdf");

        assert!(matches!(error, ClientError::NotPdf(_)));
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn unreadable_file_reports_its_path() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/upload");
                then.status(200);
            })
            .await;

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("gone.pdf");
        let client = client_for(&server);
        let error = client
            .upload_pdf(&path, None)
            .await
            .expect_err("missing file");

        match error {
            ClientError::Io { path: reported, .. } => assert!(reported.ends_with("gone.pdf")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!client.is_busy());
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn query_returns_answer_and_sources() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/query")
                    .json_body(json!({ "question": "What skills?" }));
                then.status(200).json_body(json!({
                    "answer": "- Rust",
                    "sources": [{ "source": "cv.pdf" }]
                }));
            })
            .await;

        let answer = client_for(&server)
            .query("  What skills?  ", None)
            .await
            .expect("answer");

        mock.assert_async().await;
        assert_eq!(answer.answer, "- Rust");
        assert_eq!(answer.sources.len(), 1);
    }

    #[tokio::test]
    async fn blank_question_never_reaches_server() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/query");
                then.status(200);
            })
            .await;

        let error = client_for(&server)
            .query("   ", None)
            .await
            .expect_err("blank");

        assert!(matches!(error, ClientError::EmptyQuestion));
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/query");
                then.status(500)
                    .json_body(json!({ "error": "generation timed out after 120s" }));
            })
            .await;

        let error = client_for(&server)
            .query("Anything?", None)
            .await
            .expect_err("server error");

        match error {
            ClientError::Server { status, message } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "generation timed out after 120s");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_request_while_busy_is_rejected() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/query");
                then.status(200)
                    .delay(Duration::from_millis(300))
                    .json_body(json!({ "answer": "- slow", "sources": [] }));
            })
            .await;

        let client = client_for(&server);
        let (first, second) = tokio::join!(client.query("one", None), client.query("two", None));

        assert!(first.is_ok());
        assert!(matches!(second, Err(ClientError::Busy)));
        assert!(!client.is_busy());
        mock.assert_hits_async(1).await;

        assert!(client.query("three", None).await.is_ok());
    }
}
