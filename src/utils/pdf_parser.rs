use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{info, warn};

use super::ocr::{ocr_pdf_pages, OcrEngine, PageRasterizer};
use crate::error::{ExtractError, ExtractResult};

/// Reads the embedded text layer of a PDF, one string per page.
pub trait PdfTextLayer {
    fn page_texts(&self, path: &Path) -> ExtractResult<Vec<String>>;
}

/// Text layer reader backed by `pdf_extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractTextLayer;

impl PdfTextLayer for PdfExtractTextLayer {
    fn page_texts(&self, path: &Path) -> ExtractResult<Vec<String>> {
        let bytes = fs::read(path).map_err(|e| ExtractError::io(path, e))?;

        // pdf_extract panics on some malformed files instead of returning an error.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        }));
        match result {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(ExtractError::Pdf(e.to_string())),
            Err(_) => Err(ExtractError::Pdf(
                "pdf_extract panicked (malformed document)".to_string(),
            )),
        }
    }
}

/// Text pulled from a PDF's text layer
#[derive(Debug, Clone)]
pub struct PdfContent {
    pub text: String,
    pub page_count: usize,
    pub has_text: bool,
}

/// Extract the text layer, keeping only non-blank pages.
pub fn extract_text_layer(path: &Path, layer: &dyn PdfTextLayer) -> ExtractResult<PdfContent> {
    info!("Extracting text from PDF: {:?}", path);

    let pages = layer.page_texts(path)?;
    let page_count = pages.len();

    let mut text = String::new();
    for page in pages.iter().filter(|p| !p.trim().is_empty()) {
        text.push_str(page);
        text.push_str("\n\n");
    }

    let has_text = !text.trim().is_empty();
    if !has_text {
        warn!("PDF appears to be scanned or has no extractable text: {:?}", path);
    }

    info!("Extracted {} pages from PDF", page_count);

    Ok(PdfContent {
        text,
        page_count,
        has_text,
    })
}

/// Extract text from a PDF, falling back to OCR when the text layer is blank.
///
/// A text layer made only of whitespace counts as blank, so such a PDF is
/// treated as scanned.
pub fn extract_text_from_pdf(
    path: &Path,
    layer: &dyn PdfTextLayer,
    rasterizer: &dyn PageRasterizer,
    ocr: &dyn OcrEngine,
) -> ExtractResult<String> {
    let content = extract_text_layer(path, layer)?;
    if content.has_text {
        return Ok(content.text);
    }

    info!("PDF appears to be scanned, using OCR: {:?}", path);
    ocr_pdf_pages(path, rasterizer, ocr)
}
