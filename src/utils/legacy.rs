//! Pre-XML binary Office formats (`.doc`, `.ppt`).
//!
//! Each format has an ordered chain of backends: a generic command-line
//! converter first, then desktop Office automation where the platform has it.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use super::command::run_tool;
use crate::error::{ExtractError, ExtractResult};

/// One way of getting text out of a legacy binary document.
pub trait LegacyBackend {
    fn name(&self) -> &str;

    /// Capability query, consulted before [`LegacyBackend::extract`].
    fn is_available(&self) -> bool;

    fn extract(&self, path: &Path) -> ExtractResult<String>;
}

/// A converter that prints the document's text on stdout
/// (`antiword file.doc`, `catppt file.ppt`).
#[derive(Debug, Clone)]
pub struct ConverterBackend {
    program: String,
}

impl ConverterBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl LegacyBackend for ConverterBackend {
    fn name(&self) -> &str {
        &self.program
    }

    // The converter is always attempted; a missing binary surfaces as a spawn error.
    fn is_available(&self) -> bool {
        true
    }

    fn extract(&self, path: &Path) -> ExtractResult<String> {
        let stdout = run_tool(Command::new(&self.program).arg(path))?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeApp {
    Word,
    PowerPoint,
}

impl OfficeApp {
    fn backend_name(self) -> &'static str {
        match self {
            OfficeApp::Word => "Word.Application",
            OfficeApp::PowerPoint => "PowerPoint.Application",
        }
    }

    fn script(self) -> &'static str {
        match self {
            OfficeApp::Word => WORD_SCRIPT,
            OfficeApp::PowerPoint => POWERPOINT_SCRIPT,
        }
    }
}

// The source path arrives through DOC_HARVEST_SOURCE so no quoting is needed.
const WORD_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8
$app = New-Object -ComObject Word.Application
$app.Visible = $false
try {
    $doc = $app.Documents.Open($env:DOC_HARVEST_SOURCE, $false, $true)
    $text = $doc.Content.Text
    $doc.Close($false)
    Write-Output $text
} finally {
    $app.Quit()
}
"#;

const POWERPOINT_SCRIPT: &str = r#"
$ErrorActionPreference = 'Stop'
[Console]::OutputEncoding = [System.Text.Encoding]::UTF8
$app = New-Object -ComObject PowerPoint.Application
try {
    $pres = $app.Presentations.Open($env:DOC_HARVEST_SOURCE, $true, $false, $false)
    $sb = New-Object System.Text.StringBuilder
    foreach ($slide in $pres.Slides) {
        foreach ($shape in $slide.Shapes) {
            if ($shape.HasTextFrame -and $shape.TextFrame.HasText) {
                [void]$sb.Append($shape.TextFrame.TextRange.Text)
                [void]$sb.Append("`n`n")
            }
        }
    }
    $pres.Close()
    Write-Output $sb.ToString()
} finally {
    $app.Quit()
}
"#;

/// Drives an installed Microsoft Office application through COM.
///
/// Only Windows has COM automation; elsewhere the capability query is false
/// and the chain moves on without trying.
#[derive(Debug, Clone)]
pub struct OfficeAutomation {
    app: OfficeApp,
    powershell: String,
}

impl OfficeAutomation {
    pub fn new(app: OfficeApp, powershell: impl Into<String>) -> Self {
        Self {
            app,
            powershell: powershell.into(),
        }
    }
}

impl LegacyBackend for OfficeAutomation {
    fn name(&self) -> &str {
        self.app.backend_name()
    }

    fn is_available(&self) -> bool {
        cfg!(windows)
            && Command::new(&self.powershell)
                .args(["-NoProfile", "-NonInteractive", "-Command", "exit 0"])
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
    }

    fn extract(&self, path: &Path) -> ExtractResult<String> {
        // COM needs an absolute path.
        let absolute: PathBuf = std::path::absolute(path).map_err(|e| ExtractError::io(path, e))?;
        let stdout = run_tool(
            Command::new(&self.powershell)
                .args(["-NoProfile", "-NonInteractive", "-Command", self.app.script()])
                .env("DOC_HARVEST_SOURCE", &absolute),
        )?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

/// Try each backend in order until one succeeds.
pub fn extract_with_fallback(
    path: &Path,
    backends: &[Box<dyn LegacyBackend>],
) -> ExtractResult<String> {
    for backend in backends {
        if !backend.is_available() {
            debug!("Backend {} not available, skipping", backend.name());
            continue;
        }

        match backend.extract(path) {
            Ok(text) => {
                info!("Extracted {:?} with {}", path, backend.name());
                return Ok(text);
            }
            Err(e) => {
                warn!("{} failed for {:?}: {}", backend.name(), path, e);
            }
        }
    }

    Err(ExtractError::NoBackends {
        tried: backends.len(),
    })
}

/// Default chain for `.doc` files.
pub fn doc_backends(antiword: &str, powershell: &str) -> Vec<Box<dyn LegacyBackend>> {
    vec![
        Box::new(ConverterBackend::new(antiword)),
        Box::new(OfficeAutomation::new(OfficeApp::Word, powershell)),
    ]
}

/// Default chain for `.ppt` files.
pub fn ppt_backends(catppt: &str, powershell: &str) -> Vec<Box<dyn LegacyBackend>> {
    vec![
        Box::new(ConverterBackend::new(catppt)),
        Box::new(OfficeAutomation::new(OfficeApp::PowerPoint, powershell)),
    ]
}
