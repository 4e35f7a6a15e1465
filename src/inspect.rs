//! `pdfqa inspect`: ingest and chunk without calling any service.
//!
//! Shows what a load would index: pages and chunks per document, plus
//! totals. Useful for tuning `[chunking]` before spending API quota.

use anyhow::Result;
use std::path::PathBuf;

use pdfqa_core::chunk::split_documents;

use crate::config::Config;
use crate::ingest::ingest;

pub fn run_inspect(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let params = config.chunk_params()?;
    let documents = ingest(paths, &config.ingest)?;
    let chunks = split_documents(&documents, params);

    for (doc_idx, doc) in documents.iter().enumerate() {
        let doc_chunks = chunks.iter().filter(|c| c.document_index == doc_idx).count();
        let chars: usize = doc.pages.iter().map(|p| p.text.chars().count()).sum();
        println!(
            "{}: {} pages, {} chars, {} chunks",
            doc.source(),
            doc.pages.len(),
            chars,
            doc_chunks
        );
    }

    let pages: usize = documents.iter().map(|d| d.pages.len()).sum();
    println!(
        "documents: {}, pages: {}, chunks: {} (chunk_size {}, overlap {})",
        documents.len(),
        pages,
        chunks.len(),
        params.chunk_size,
        params.chunk_overlap
    );

    Ok(())
}
