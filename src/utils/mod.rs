pub mod command;
pub mod legacy;
pub mod ocr;
pub mod office;
pub mod pdf_parser;
pub mod text_processor;

pub use legacy::{extract_with_fallback, LegacyBackend};
pub use ocr::{ocr_image, OcrEngine, PageRasterizer, PdftoppmRasterizer, TesseractOcr};
pub use office::{extract_text_from_docx, extract_text_from_pptx};
pub use pdf_parser::{extract_text_from_pdf, PdfExtractTextLayer, PdfTextLayer};
pub use text_processor::clean_text;
