use super::ExtractionError;
use lopdf::Document;
use std::path::Path;

/// Concatenate the text of every readable page; unreadable pages are skipped.
pub(super) fn extract_pages(path: &Path) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)?;
    let document =
        Document::load_mem(&bytes).map_err(|error| ExtractionError::Pdf(error.to_string()))?;

    let mut text = String::new();
    for page_number in document.get_pages().into_keys() {
        match document.extract_text(&[page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(error) => {
                tracing::warn!(page = page_number, %error, "Skipping unreadable PDF page");
            }
        }
    }
    Ok(text)
}
