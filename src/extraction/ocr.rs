//! OCR fallback through the `pdftoppm` and `tesseract` command-line tools.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

const RENDER_DPI: &str = "300";

/// Render each page to PNG and OCR it. Page failures are logged and skipped.
///
/// Every subprocess is bounded by `timeout` and killed when it expires.
pub(super) async fn ocr_pdf(path: &Path, timeout: Duration) -> io::Result<String> {
    let workdir = tempfile::Builder::new().prefix("docqa-ocr").tempdir()?;
    let prefix = workdir.path().join("page");

    let mut render = Command::new("pdftoppm");
    render
        .args(["-r", RENDER_DPI, "-png"])
        .arg(path)
        .arg(&prefix);
    let output = run_bounded(render, timeout).await?;
    if !output.status.success() {
        return Err(io::Error::other(format!(
            "pdftoppm exited with {}",
            output.status
        )));
    }

    let mut pages: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(workdir.path()).await?;
    while let Some(entry) = entries.next_entry().await? {
        let page = entry.path();
        if page.extension().is_some_and(|ext| ext == "png") {
            pages.push(page);
        }
    }
    pages.sort();

    let mut text = String::new();
    for page in pages {
        let mut tesseract = Command::new("tesseract");
        tesseract.arg(&page).arg("stdout");
        let output = match run_bounded(tesseract, timeout).await {
            Ok(output) => output,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Err(error),
            Err(error) => {
                tracing::warn!(page = %page.display(), %error, "OCR failed for page");
                continue;
            }
        };
        if !output.status.success() {
            tracing::warn!(page = %page.display(), status = %output.status, "OCR failed for page");
            continue;
        }
        text.push_str(&String::from_utf8_lossy(&output.stdout));
        text.push('\n');
    }
    Ok(text)
}

async fn run_bounded(mut command: Command, timeout: Duration) -> io::Result<Output> {
    let program = command.as_std().get_program().to_string_lossy().into_owned();
    command.kill_on_drop(true);
    match tokio::time::timeout(timeout, command.output()).await {
        Ok(output) => output,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{program} exceeded {}ms", timeout.as_millis()),
        )),
    }
}
