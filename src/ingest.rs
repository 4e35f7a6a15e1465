//! Document ingestion: paths in, page-structured documents out.
//!
//! Reads files only. Nothing here touches pipeline state, so a failed
//! ingest leaves any loaded corpus exactly as it was.

use std::path::{Path, PathBuf};

use pdfqa_core::models::Document;
use pdfqa_core::PipelineError;
use tracing::debug;

use crate::config::IngestConfig;
use crate::extract::extract_pages;

/// Ingest every path, in order. The first failure aborts the whole batch.
pub fn ingest(paths: &[PathBuf], config: &IngestConfig) -> Result<Vec<Document>, PipelineError> {
    if paths.is_empty() {
        return Err(PipelineError::NoDocuments);
    }
    paths.iter().map(|p| ingest_one(p, config)).collect()
}

/// Ingest a single PDF.
pub fn ingest_one(path: &Path, config: &IngestConfig) -> Result<Document, PipelineError> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(PipelineError::parse(path, e.to_string())),
    };

    if !meta.is_file() {
        return Err(PipelineError::parse(path, "not a file"));
    }
    if meta.len() > config.max_file_bytes {
        return Err(PipelineError::parse(
            path,
            format!(
                "file is {} bytes, larger than the {} byte limit",
                meta.len(),
                config.max_file_bytes
            ),
        ));
    }

    let bytes = std::fs::read(path).map_err(|e| PipelineError::parse(path, e.to_string()))?;
    let pages = extract_pages(&bytes).map_err(|e| PipelineError::parse(path, e.to_string()))?;

    debug!(path = %path.display(), pages = pages.len(), "ingested document");
    Ok(Document::new(path.to_path_buf(), pages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("missing.pdf");
        let err = ingest_one(&path, &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(p) if p == path));
    }

    #[test]
    fn test_non_pdf_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.pdf");
        std::fs::write(&path, "just some text").unwrap();
        let err = ingest_one(&path, &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn test_directory_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let err = ingest_one(tmp.path(), &IngestConfig::default()).unwrap_err();
        assert!(err.to_string().contains("not a file"));
    }

    #[test]
    fn test_oversized_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.pdf");
        std::fs::write(&path, vec![b'x'; 64]).unwrap();
        let config = IngestConfig { max_file_bytes: 16 };
        let err = ingest_one(&path, &config).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn test_empty_path_list() {
        let err = ingest(&[], &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::NoDocuments));
    }

    #[test]
    fn test_batch_stops_at_first_failure() {
        let tmp = TempDir::new().unwrap();
        let bad = tmp.path().join("bad.pdf");
        std::fs::write(&bad, "nope").unwrap();
        let missing = tmp.path().join("missing.pdf");
        let err = ingest(&[bad, missing], &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }
}
