use std::fmt;
use std::path::Path;
use tracing::{debug, error, warn};

use crate::config::HarvestConfig;
use crate::error::ExtractResult;
use crate::utils::legacy::{doc_backends, ppt_backends};
use crate::utils::{
    extract_text_from_docx, extract_text_from_pdf, extract_text_from_pptx, extract_with_fallback,
    ocr_image, LegacyBackend, OcrEngine, PageRasterizer, PdfExtractTextLayer, PdfTextLayer,
    PdftoppmRasterizer, TesseractOcr,
};

/// Document families the dispatcher knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image,
    Docx,
    Doc,
    Pptx,
    Ppt,
}

impl FileKind {
    /// Classify an extension (with or without leading dot), ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "jpg" | "jpeg" | "png" | "tiff" | "tif" | "bmp" | "gif" => Some(FileKind::Image),
            "docx" => Some(FileKind::Docx),
            "doc" => Some(FileKind::Doc),
            "pptx" => Some(FileKind::Pptx),
            "ppt" => Some(FileKind::Ppt),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|s| s.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::Pdf => "PDF",
            FileKind::Image => "image",
            FileKind::Docx => "DOCX",
            FileKind::Doc => "DOC",
            FileKind::Pptx => "PPTX",
            FileKind::Ppt => "PPT",
        };
        f.write_str(name)
    }
}

/// Outcome of extracting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Backend produced text with at least one non-whitespace character.
    Text(String),
    /// Backend succeeded but the document holds no text.
    Empty,
    /// Every applicable backend failed.
    Failed(String),
    /// Extension has no backend; nothing was attempted.
    Unsupported,
}

impl Extraction {
    fn from_result(result: ExtractResult<String>, kind: FileKind, path: &Path) -> Self {
        match result {
            Ok(text) if text.trim().is_empty() => Extraction::Empty,
            Ok(text) => Extraction::Text(text),
            Err(e) => {
                error!("Error extracting text from {} {:?}: {}", kind, path, e);
                debug!("{:?}", e);
                Extraction::Failed(e.to_string())
            }
        }
    }
}

/// Anything that can turn a path into an [`Extraction`].
pub trait Extract {
    fn extract(&self, path: &Path) -> Extraction;
}

/// Routes each file to the backend for its format.
pub struct Extractor {
    text_layer: Box<dyn PdfTextLayer>,
    rasterizer: Box<dyn PageRasterizer>,
    ocr: Box<dyn OcrEngine>,
    doc_backends: Vec<Box<dyn LegacyBackend>>,
    ppt_backends: Vec<Box<dyn LegacyBackend>>,
}

impl Extractor {
    /// Build the production backends from configuration.
    pub fn from_config(config: &HarvestConfig) -> Self {
        let tools = &config.tools;
        Self {
            text_layer: Box::new(PdfExtractTextLayer),
            rasterizer: Box::new(PdftoppmRasterizer::new(&tools.pdftoppm, config.rasterize_dpi)),
            ocr: Box::new(TesseractOcr::new(&tools.tesseract, &config.ocr_languages)),
            doc_backends: doc_backends(&tools.antiword, &tools.powershell),
            ppt_backends: ppt_backends(&tools.catppt, &tools.powershell),
        }
    }

    pub fn new(
        text_layer: Box<dyn PdfTextLayer>,
        rasterizer: Box<dyn PageRasterizer>,
        ocr: Box<dyn OcrEngine>,
    ) -> Self {
        Self {
            text_layer,
            rasterizer,
            ocr,
            doc_backends: Vec::new(),
            ppt_backends: Vec::new(),
        }
    }

    pub fn with_doc_backends(mut self, backends: Vec<Box<dyn LegacyBackend>>) -> Self {
        self.doc_backends = backends;
        self
    }

    pub fn with_ppt_backends(mut self, backends: Vec<Box<dyn LegacyBackend>>) -> Self {
        self.ppt_backends = backends;
        self
    }

    fn run(&self, kind: FileKind, path: &Path) -> ExtractResult<String> {
        match kind {
            FileKind::Pdf => extract_text_from_pdf(
                path,
                self.text_layer.as_ref(),
                self.rasterizer.as_ref(),
                self.ocr.as_ref(),
            ),
            FileKind::Image => ocr_image(path, self.ocr.as_ref()),
            FileKind::Docx => extract_text_from_docx(path),
            FileKind::Pptx => extract_text_from_pptx(path),
            FileKind::Doc => extract_with_fallback(path, &self.doc_backends),
            FileKind::Ppt => extract_with_fallback(path, &self.ppt_backends),
        }
    }
}

impl Extract for Extractor {
    fn extract(&self, path: &Path) -> Extraction {
        let Some(kind) = FileKind::from_path(path) else {
            warn!("Unsupported file type: {:?}", path);
            return Extraction::Unsupported;
        };

        Extraction::from_result(self.run(kind, path), kind, path)
    }
}
