//! Staging uploads on disk and reading their text back out page by page.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use time::OffsetDateTime;

use super::types::{ExtractionError, ProcessingError};

/// Source of page text for a staged document.
pub trait DocumentLoader: Send + Sync {
    /// Return the text of each page, in order. Blank pages are kept so numbering stays stable.
    fn load_pages(&self, path: &Path) -> Result<Vec<String>, ExtractionError>;
}

/// Loader backed by `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load_pages(&self, path: &Path) -> Result<Vec<String>, ExtractionError> {
        let bytes = std::fs::read(path)?;
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|error| ExtractionError::Pdf(error.to_string()))?;
        let pages = split_pages(&text);
        if pages.is_empty() {
            tracing::warn!(path = %path.display(), "No text extracted; the PDF may be a scan");
        }
        Ok(pages)
    }
}

/// Split extracted text on form feeds, dropping trailing blank pages.
pub(crate) fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text
        .split('\x0c')
        .map(|page| page.trim().to_string())
        .collect();
    while pages.last().is_some_and(|page| page.is_empty()) {
        pages.pop();
    }
    pages
}

/// Write an upload into `dir` under a timestamp-qualified name.
///
/// The returned handle removes the file when dropped, so every early return cleans up.
pub(crate) fn stage_upload(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile, ProcessingError> {
    std::fs::create_dir_all(dir).map_err(ProcessingError::Staging)?;
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let mut staged = tempfile::Builder::new()
        .prefix(&format!("{millis}-"))
        .suffix(".pdf")
        .tempfile_in(dir)
        .map_err(ProcessingError::Staging)?;
    staged.write_all(bytes).map_err(ProcessingError::Staging)?;
    staged.flush().map_err(ProcessingError::Staging)?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_pages_on_form_feed() {
        let pages = split_pages("Page one\x0cPage two\x0c\x0cPage four\x0c");
        assert_eq!(pages, vec!["Page one", "Page two", "", "Page four"]);
    }

    #[test]
    fn split_pages_without_separator_is_one_page() {
        assert_eq!(split_pages("  just text  "), vec!["just text"]);
    }

    #[test]
    fn split_pages_of_blank_text_is_empty() {
        assert!(split_pages(" \n\x0c \x0c").is_empty());
    }

    #[test]
    fn staged_upload_is_named_by_timestamp_and_removed_on_drop() {
        let dir = tempfile::tempdir().expect("temp dir");
        let staged = stage_upload(dir.path(), b"%PDF-1.4 body").expect("staged");
        let path = staged.path().to_path_buf();

        let name = path.file_name().and_then(|n| n.to_str()).expect("file name");
        let (millis, _) = name.split_once('-').expect("timestamp prefix");
        assert!(millis.parse::<i128>().is_ok());
        assert!(name.ends_with(".pdf"));
        assert_eq!(std::fs::read(&path).expect("read back"), b"%PDF-1.4 body");

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn loader_rejects_non_pdf_bytes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let staged = stage_upload(dir.path(), b"definitely not a pdf").expect("staged");
        let error = PdfLoader
            .load_pages(staged.path())
            .expect_err("garbage input");
        assert!(matches!(error, ExtractionError::Pdf(_)));
    }
}
