//! PDF text extraction.
//!
//! Text is pulled page by page with `lopdf` so chunks can report the page
//! they came from. Some PDFs use font encodings `lopdf` cannot decode; when
//! every page comes back empty the document is re-read with `pdf-extract`
//! and returned as a single page.

use pdfqa_core::models::Page;
use thiserror::Error;
use tracing::debug;

/// How far into the file the `%PDF-` marker may appear.
const HEADER_SCAN_BYTES: usize = 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("not a PDF file (missing %PDF- header)")]
    NotPdf,
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Extract normalized page text from PDF bytes.
///
/// Pages keep their 1-based numbers. A page with no text is still returned
/// (with empty text) so numbering stays aligned with the source file.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<Page>, ExtractError> {
    let scan = &bytes[..bytes.len().min(HEADER_SCAN_BYTES)];
    if !scan.windows(5).any(|w| w == b"%PDF-") {
        return Err(ExtractError::NotPdf);
    }

    match lopdf::Document::load_mem(bytes) {
        Ok(doc) => {
            let mut pages = Vec::new();
            for number in doc.get_pages().into_keys() {
                let text = match doc.extract_text(&[number]) {
                    Ok(raw) => normalize_text(&raw),
                    Err(e) => {
                        debug!(page = number, error = %e, "page text extraction failed");
                        String::new()
                    }
                };
                pages.push(Page { number, text });
            }

            if pages.iter().all(|p| p.text.is_empty()) {
                if let Ok(whole) = extract_whole(bytes) {
                    if !whole.is_empty() {
                        debug!("per-page extraction was empty, using whole-document text");
                        return Ok(vec![Page {
                            number: 1,
                            text: whole,
                        }]);
                    }
                }
            }

            Ok(pages)
        }
        Err(load_err) => {
            debug!(error = %load_err, "lopdf could not load document, trying pdf-extract");
            let text = extract_whole(bytes)?;
            Ok(vec![Page { number: 1, text }])
        }
    }
}

fn extract_whole(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes)
        .map(|raw| normalize_text(&raw))
        .map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Normalize extracted text.
///
/// Line endings become `\n`; runs of spaces and tabs collapse to one space;
/// trailing whitespace is dropped from every line; three or more newlines
/// collapse to a single blank line. Leading and trailing blank lines are
/// removed.
pub fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(unified.len());
    let mut blank_run = 0usize;

    for line in unified.split('\n') {
        let mut collapsed = String::with_capacity(line.len());
        let mut in_space = false;
        for c in line.chars() {
            if c == ' ' || c == '\t' {
                if !in_space {
                    collapsed.push(' ');
                }
                in_space = true;
            } else {
                collapsed.push(c);
                in_space = false;
            }
        }
        let collapsed = collapsed.trim_end();

        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }

        if !out.is_empty() {
            out.push('\n');
            if blank_run > 0 {
                out.push('\n');
            }
        }
        out.push_str(collapsed);
        blank_run = 0;
    }

    out
}
