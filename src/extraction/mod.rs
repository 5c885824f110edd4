//! Text extraction from uploaded files.
//!
//! `.pdf` files are read page by page; `.txt` files are decoded lossily as UTF-8. Both paths end
//! in [`normalize_text`] so chunking always sees the same whitespace shape. PDF parsing runs on
//! the blocking pool; OCR subprocesses are awaited with a per-command deadline.

mod ocr;
mod pdf;

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Deadline applied to each OCR subprocess unless overridden.
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised while turning a stored upload into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Extension is neither `.pdf` nor `.txt`.
    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType {
        /// Lowercased extension, empty when the file had none.
        extension: String,
    },
    /// File decoded but produced no usable text.
    #[error("No extractable text found in document")]
    NoExtractableText,
    /// File could not be read.
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),
    /// PDF structure could not be parsed at all.
    #[error("Failed to parse PDF: {0}")]
    Pdf(String),
    /// Blocking parse task panicked or was cancelled.
    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Portable Document Format.
    Pdf,
    /// Plain text.
    Text,
}

impl DocumentKind {
    /// Detect the kind from a path's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::Text),
            _ => Err(ExtractionError::UnsupportedFileType { extension }),
        }
    }
}

/// File-to-text collaborator used by the upload path.
#[derive(Debug, Clone, Copy)]
pub struct DocumentExtractor {
    enable_ocr: bool,
    ocr_min_chars: usize,
    ocr_timeout: Duration,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(false, 500)
    }
}

impl DocumentExtractor {
    /// Build an extractor; OCR only runs when enabled and primary PDF text is short.
    pub const fn new(enable_ocr: bool, ocr_min_chars: usize) -> Self {
        Self {
            enable_ocr,
            ocr_min_chars,
            ocr_timeout: DEFAULT_OCR_TIMEOUT,
        }
    }

    /// Override the deadline applied to each OCR subprocess.
    pub const fn with_ocr_timeout(mut self, timeout: Duration) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    /// Extract and normalize the text of `path`.
    pub async fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
        let kind = DocumentKind::from_path(path)?;
        let raw = match kind {
            DocumentKind::Text => {
                let bytes = tokio::fs::read(path).await?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
            DocumentKind::Pdf => self.extract_pdf(path).await?,
        };

        let text = normalize_text(&raw);
        if text.is_empty() {
            tracing::warn!(path = %path.display(), ?kind, "Upload produced no text");
            return Err(ExtractionError::NoExtractableText);
        }
        tracing::debug!(path = %path.display(), ?kind, chars = text.chars().count(), "Extracted text");
        Ok(text)
    }

    async fn extract_pdf(&self, path: &Path) -> Result<String, ExtractionError> {
        let owned: PathBuf = path.to_path_buf();
        let primary = tokio::task::spawn_blocking(move || pdf::extract_pages(&owned))
            .await
            .map_err(|error| ExtractionError::Task(error.to_string()))??;
        let primary_chars = primary.trim().chars().count();
        if !self.enable_ocr || primary_chars >= self.ocr_min_chars {
            return Ok(primary);
        }

        tracing::info!(
            path = %path.display(),
            primary_chars,
            threshold = self.ocr_min_chars,
            "Primary PDF text is short; running OCR"
        );
        match ocr::ocr_pdf(path, self.ocr_timeout).await {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => {
                tracing::warn!(path = %path.display(), "OCR produced no text; keeping primary text");
                Ok(primary)
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "OCR unavailable; keeping primary text");
                Ok(primary)
            }
        }
    }
}

/// Collapse blank-line runs to single newlines and space runs to single spaces, then trim.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    for ch in text.chars() {
        if (ch == '\n' || ch == ' ') && previous == Some(ch) {
            continue;
        }
        out.push(ch);
        previous = Some(ch);
    }
    out.trim().to_string()
}
