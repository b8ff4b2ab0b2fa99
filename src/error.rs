use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single extraction backend.
///
/// These never abort a run: the dispatcher logs them and turns them into
/// [`crate::extract::Extraction::Failed`].
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF text layer unreadable: {0}")]
    Pdf(String),

    #[error("could not launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid OOXML package: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("DOCX parse failed: {0}")]
    Docx(String),

    #[error("no backend could extract the file ({tried} tried)")]
    NoBackends { tried: usize },

    #[error("{0}")]
    Other(String),
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;
