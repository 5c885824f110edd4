//! Helpers for normalizing caller-supplied values.

use std::path::Path;

const FALLBACK_FILENAME: &str = "upload";

/// Sanitize arbitrary string input by trimming whitespace and dropping empties.
pub fn sanitize_string(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Reduce a client-supplied filename to a safe final path component.
///
/// Directory parts are dropped and anything outside `[A-Za-z0-9._-]` becomes `_`, so the result
/// can never escape the upload directory. The extension survives for type detection.
pub fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name.trim())
        .file_name()
        .and_then(|part| part.to_str())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned.to_string()
    }
}
