use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, warn};

use doc_harvest::utils::TesseractOcr;
use doc_harvest::{logging, Extractor, HarvestConfig, Harvester};

#[derive(Debug, Parser)]
#[command(author, version, about = "Extract text from a tree of PDF, image and Office documents")]
struct Cli {
    /// Input directory with documents
    input: Option<PathBuf>,

    /// Output directory for extracted text
    output: Option<PathBuf>,

    /// Path to configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tesseract language hint (e.g. "fra+eng")
    #[arg(long)]
    ocr_lang: Option<String>,

    /// Log file, truncated at the start of each run
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HarvestConfig::from_file(path)?,
        None => HarvestConfig::default(),
    };
    if let Some(input) = cli.input {
        config.input_dir = input;
    }
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if let Some(lang) = cli.ocr_lang {
        config.ocr_languages = lang;
    }
    if let Some(log_file) = cli.log_file {
        config.log_file = log_file;
    }
    config.validate()?;

    logging::init(&config.log_file)?;

    println!("{:?} -> {:?}", config.input_dir, config.output_dir);
    info!("Configuration: {}", config);

    if !config.input_dir.is_dir() {
        error!("Input directory does not exist: {:?}", config.input_dir);
        println!("Input directory does not exist: {:?}", config.input_dir);
        return Ok(());
    }

    if !TesseractOcr::new(&config.tools.tesseract, &config.ocr_languages).is_available() {
        warn!(
            "{} not found; scanned PDFs and images will fail",
            config.tools.tesseract
        );
    }

    let extractor = Extractor::from_config(&config);
    let harvester = Harvester::new(config, extractor);
    let summary = harvester.run()?;

    println!(
        "Extraction complete. Succeeded: {}, Failed: {}",
        summary.succeeded, summary.failed
    );

    Ok(())
}
