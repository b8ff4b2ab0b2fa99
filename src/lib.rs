// Library exports for the binary and integration tests

pub mod config;
pub mod data;
pub mod error;
pub mod extract;
pub mod logging;
pub mod utils;

// Re-export commonly used types
pub use config::HarvestConfig;
pub use data::{Harvester, Metadata, RunSummary};
pub use error::ExtractError;
pub use extract::{Extract, Extraction, Extractor, FileKind};
