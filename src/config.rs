use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::FileKind;

/// Extensions recognised out of the box, lowercase and without the dot.
pub const DEFAULT_EXTENSIONS: [&str; 12] = [
    "pdf", "jpg", "jpeg", "png", "tiff", "tif", "bmp", "gif", "docx", "doc", "pptx", "ppt",
];

/// Names (or paths) of the external programs the backends shell out to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub tesseract: String,
    pub pdftoppm: String,
    pub antiword: String,
    pub catppt: String,
    pub powershell: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            tesseract: "tesseract".to_string(),
            pdftoppm: "pdftoppm".to_string(),
            antiword: "antiword".to_string(),
            catppt: "catppt".to_string(),
            powershell: "powershell".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Tesseract language hint, applied to every page regardless of content.
    pub ocr_languages: String,
    pub extensions: Vec<String>,
    pub log_file: PathBuf,
    pub rasterize_dpi: u32,
    pub tools: ToolsConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("Annales"),
            output_dir: PathBuf::from("Textes_Extraits"),
            ocr_languages: "fra+eng".to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            log_file: PathBuf::from("extraction.log"),
            rasterize_dpi: 200,
            tools: ToolsConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Load a JSON config file; missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: HarvestConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ocr_languages.trim().is_empty() {
            anyhow::bail!("ocr_languages must not be empty");
        }
        if self.extensions.is_empty() {
            anyhow::bail!("extensions must not be empty");
        }
        for ext in &self.extensions {
            if FileKind::from_extension(ext).is_none() {
                anyhow::bail!("extension {:?} has no extraction backend", ext);
            }
        }
        if self.rasterize_dpi == 0 {
            anyhow::bail!("rasterize_dpi must be > 0");
        }
        Ok(())
    }

    /// Whether `path` carries one of the configured extensions (case-insensitive).
    pub fn is_supported(&self, path: &Path) -> bool {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) => self
                .extensions
                .iter()
                .any(|known| known.trim_start_matches('.').eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

impl fmt::Display for HarvestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} -> {:?} (ocr: {}, {} extensions)",
            self.input_dir,
            self.output_dir,
            self.ocr_languages,
            self.extensions.len()
        )
    }
}
