use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

use super::command::{is_installed, run_tool};
use crate::error::{ExtractError, ExtractResult};

/// Turns a page or photo into text.
pub trait OcrEngine {
    fn recognize(&self, image: &Path) -> ExtractResult<String>;
}

/// Renders every page of a PDF into an image file inside `workdir`.
///
/// Returned paths are in page order.
pub trait PageRasterizer {
    fn rasterize(&self, pdf: &Path, workdir: &Path) -> ExtractResult<Vec<PathBuf>>;
}

/// OCR through the Tesseract command-line tool.
///
/// Note: This requires Tesseract and the trained data for every language in
/// the hint to be installed on the system.
/// - Windows: https://github.com/UB-Mannheim/tesseract/wiki
/// - Linux: sudo apt-get install tesseract-ocr tesseract-ocr-fra
/// - Mac: brew install tesseract tesseract-lang
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    program: String,
    languages: String,
}

impl TesseractOcr {
    pub fn new(program: impl Into<String>, languages: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            languages: languages.into(),
        }
    }

    pub fn languages(&self) -> &str {
        &self.languages
    }

    pub fn is_available(&self) -> bool {
        is_installed(&self.program)
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &Path) -> ExtractResult<String> {
        let stdout = run_tool(
            Command::new(&self.program)
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(&self.languages),
        )?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Page rasterization with `pdftoppm` (part of poppler-utils).
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: String,
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(program: impl Into<String>, dpi: u32) -> Self {
        Self {
            program: program.into(),
            dpi,
        }
    }
}

impl PageRasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf: &Path, workdir: &Path) -> ExtractResult<Vec<PathBuf>> {
        info!("Converting PDF to images: {:?}", pdf);

        run_tool(
            Command::new(&self.program)
                .arg("-r")
                .arg(self.dpi.to_string())
                .arg("-png")
                .arg(pdf)
                .arg(workdir.join("page")),
        )?;

        // pdftoppm zero-pads page numbers to a common width, so name order is page order.
        let mut pages = Vec::new();
        for entry in fs::read_dir(workdir).map_err(|e| ExtractError::io(workdir, e))? {
            let path = entry.map_err(|e| ExtractError::io(workdir, e))?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("png") {
                pages.push(path);
            }
        }
        pages.sort();

        if pages.is_empty() {
            warn!("pdftoppm produced no pages for {:?}", pdf);
        }
        Ok(pages)
    }
}

/// Rasterize a scanned PDF and OCR every page, joining pages with a blank line.
pub fn ocr_pdf_pages(
    path: &Path,
    rasterizer: &dyn PageRasterizer,
    ocr: &dyn OcrEngine,
) -> ExtractResult<String> {
    let workdir = tempfile::Builder::new()
        .prefix("doc_harvest_ocr")
        .tempdir()
        .map_err(|e| ExtractError::io(std::env::temp_dir(), e))?;

    let pages = rasterizer.rasterize(path, workdir.path())?;

    let mut all_text = String::new();
    for (idx, page) in pages.iter().enumerate() {
        info!("OCR processing page {}/{}...", idx + 1, pages.len());
        all_text.push_str(&ocr.recognize(page)?);
        all_text.push_str("\n\n");
    }

    info!("OCR completed: {} pages processed", pages.len());
    Ok(all_text)
}

/// OCR a standalone image file.
///
/// The image is decoded first and handed to the engine as PNG, so any format
/// the `image` crate reads (GIF and BMP included) reaches the engine in a form
/// it accepts.
pub fn ocr_image(path: &Path, ocr: &dyn OcrEngine) -> ExtractResult<String> {
    info!("Performing OCR on image: {:?}", path);

    let img = image::open(path)?;

    let workdir = tempfile::Builder::new()
        .prefix("doc_harvest_img")
        .tempdir()
        .map_err(|e| ExtractError::io(std::env::temp_dir(), e))?;
    let png = workdir.path().join("image.png");
    img.save_with_format(&png, image::ImageFormat::Png)?;

    ocr.recognize(&png)
}
