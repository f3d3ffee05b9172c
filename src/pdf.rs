use std::path::Path;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::parser::PAGE_BREAK;

/// Per-page text of a PDF file.
pub fn read_pages(path: &Path) -> Result<Vec<String>, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::Input(format!(
            "{} does not exist or is not a file",
            path.display()
        )));
    }
    let bytes = std::fs::read(path)
        .map_err(|e| PipelineError::Input(format!("cannot read {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), bytes = bytes.len(), "read pdf");

    let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| {
        PipelineError::Input(format!("PDF extraction failed for {}: {}", path.display(), e))
    })?;
    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(PipelineError::Input(format!(
            "no extractable text in {}",
            path.display()
        )));
    }
    info!(path = %path.display(), pages = pages.len(), "extracted pdf text");
    Ok(pages)
}

/// Raw document text: pages separated by form feeds.
pub fn join_pages(pages: &[String]) -> String {
    pages.join(&PAGE_BREAK.to_string())
}

// ── Tests ──
