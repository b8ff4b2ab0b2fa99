use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::metadata::Metadata;
use crate::config::HarvestConfig;
use crate::extract::{Extract, Extraction};
use crate::utils::clean_text;

/// Tally of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Files with an extension outside the supported set.
    pub skipped: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Successfully processed: {}, Failed: {}, Skipped: {}",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Per-file result inside a run.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileOutcome {
    Written(PathBuf),
    Failed,
}

/// Walks the input tree and writes one cleaned text file per document.
pub struct Harvester<E: Extract> {
    config: HarvestConfig,
    extractor: E,
}

impl<E: Extract> Harvester<E> {
    pub fn new(config: HarvestConfig, extractor: E) -> Self {
        Self { config, extractor }
    }

    /// Process every file under the input root, one at a time.
    ///
    /// Only a missing input root aborts; every per-file problem is logged and
    /// counted as a failure.
    pub fn run(&self) -> Result<RunSummary> {
        let input = &self.config.input_dir;
        let output = &self.config.output_dir;

        if !input.is_dir() {
            anyhow::bail!("Input directory does not exist: {:?}", input);
        }

        info!("Starting text extraction from {:?} to {:?}", input, output);

        fs::create_dir_all(output)
            .with_context(|| format!("Failed to create output directory: {:?}", output))?;

        let mut summary = RunSummary::default();

        for entry in WalkDir::new(input)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();

            if !self.config.is_supported(path) {
                debug!("Skipping unsupported file: {:?}", path);
                summary.skipped += 1;
                continue;
            }

            match self.process_file(path) {
                Ok(FileOutcome::Written(out)) => {
                    info!("Successfully processed: {:?} -> {:?}", path, out);
                    summary.succeeded += 1;
                }
                Ok(FileOutcome::Failed) => summary.failed += 1,
                Err(e) => {
                    error!("Error processing {:?}: {}", path, e);
                    debug!("{:?}", e);
                    summary.failed += 1;
                }
            }
        }

        info!("Extraction complete. {}", summary);
        Ok(summary)
    }

    fn process_file(&self, path: &Path) -> Result<FileOutcome> {
        let text = match self.extractor.extract(path) {
            Extraction::Text(text) => text,
            Extraction::Empty => {
                warn!("No text extracted from: {:?}", path);
                return Ok(FileOutcome::Failed);
            }
            Extraction::Failed(reason) => {
                warn!("Extraction failed for {:?}: {}", path, reason);
                return Ok(FileOutcome::Failed);
            }
            Extraction::Unsupported => return Ok(FileOutcome::Failed),
        };

        let cleaned = clean_text(&text);
        if cleaned.is_empty() {
            warn!("No text left after cleaning: {:?}", path);
            return Ok(FileOutcome::Failed);
        }

        let header = Metadata::from_path(path, &self.config.input_dir).to_header();

        let out = self.output_path_for(path)?;
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }

        let mut contents = header;
        contents.push_str(&cleaned);
        fs::write(&out, contents).with_context(|| format!("Failed to write: {:?}", out))?;

        Ok(FileOutcome::Written(out))
    }

    /// Mirror `file` into the output tree with a `.txt` extension.
    pub fn output_path_for(&self, file: &Path) -> Result<PathBuf> {
        let relative = file.strip_prefix(&self.config.input_dir).with_context(|| {
            format!(
                "{:?} is not inside the input directory {:?}",
                file, self.config.input_dir
            )
        })?;
        Ok(self.config.output_dir.join(relative).with_extension("txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Returns canned results keyed by file name and records every call.
    struct CannedExtractor {
        results: HashMap<&'static str, Extraction>,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl CannedExtractor {
        fn new(results: Vec<(&'static str, Extraction)>) -> Self {
            Self {
                results: results.into_iter().collect(),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Extract for CannedExtractor {
        fn extract(&self, path: &Path) -> Extraction {
            self.calls.borrow_mut().push(path.to_path_buf());
            let name = path.file_name().unwrap().to_str().unwrap();
            self.results
                .get(name)
                .cloned()
                .unwrap_or(Extraction::Failed("no canned result".to_string()))
        }
    }

    fn config_for(input: &Path, output: &Path) -> HarvestConfig {
        HarvestConfig {
            input_dir: input.to_path_buf(),
            output_dir: output.to_path_buf(),
            ..HarvestConfig::default()
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"source bytes").unwrap();
    }

    #[test]
    fn test_output_path_mirrors_input() {
        let harvester = Harvester::new(
            config_for(Path::new("A"), Path::new("B")),
            CannedExtractor::new(vec![]),
        );
        assert_eq!(
            harvester.output_path_for(Path::new("A/x/y/report.docx")).unwrap(),
            PathBuf::from("B/x/y/report.txt")
        );
        assert!(harvester.output_path_for(Path::new("elsewhere/report.docx")).is_err());
    }

    #[test]
    fn test_missing_input_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let harvester = Harvester::new(
            config_for(&tmp.path().join("missing"), &tmp.path().join("out")),
            CannedExtractor::new(vec![]),
        );
        assert!(harvester.run().is_err());
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_unsupported_files_are_skipped_without_extraction() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        touch(&input.join("2023/notes.txt"));
        touch(&input.join("2023/Bio/sheet.xlsx"));
        touch(&input.join("2023/Bio/cours.pdf"));

        let extractor = CannedExtractor::new(vec![(
            "cours.pdf",
            Extraction::Text("Cours de biologie".to_string()),
        )]);
        let harvester = Harvester::new(config_for(&input, &tmp.path().join("out")), extractor);

        let summary = harvester.run().unwrap();
        assert_eq!(
            summary,
            RunSummary {
                succeeded: 1,
                failed: 0,
                skipped: 2
            }
        );
        assert_eq!(summary.total(), 3);
        assert_eq!(harvester.extractor.calls.borrow().len(), 1);
    }

    #[test]
    fn test_empty_after_cleaning_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        touch(&input.join("2023/Bio/blank.pdf"));

        let extractor = CannedExtractor::new(vec![(
            "blank.pdf",
            Extraction::Text("Page 1 of 2\n\n Page 2 \n".to_string()),
        )]);
        let summary = Harvester::new(config_for(&input, &output), extractor).run().unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 0);
        assert!(!output.join("2023").exists());
    }

    #[test]
    fn test_failed_and_empty_extractions_count_as_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        touch(&input.join("a.doc"));
        touch(&input.join("b.ppt"));

        let extractor = CannedExtractor::new(vec![
            ("a.doc", Extraction::Failed("antiword missing".to_string())),
            ("b.ppt", Extraction::Empty),
        ]);
        let summary = Harvester::new(config_for(&input, &output), extractor).run().unwrap();

        assert_eq!(summary.failed, 2);
        assert!(fs::read_dir(&output).unwrap().next().is_none());
    }

    #[test]
    fn test_written_file_has_header_then_body() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        touch(&input.join("x/y/report.DOCX"));

        let extractor = CannedExtractor::new(vec![(
            "report.DOCX",
            Extraction::Text("Page 3 of 10\n\n  Hello   world  \n\n\n".to_string()),
        )]);
        let summary = Harvester::new(config_for(&input, &output), extractor).run().unwrap();
        assert_eq!(summary.succeeded, 1);

        let written = fs::read_to_string(output.join("x/y/report.txt")).unwrap();
        assert_eq!(
            written,
            "---\nyear: x\nmodule: y\nsource_file: report.DOCX\n---\n\nHello world"
        );
    }

    #[test]
    fn test_rerun_overwrites_identically() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        touch(&input.join("2024/Physio/cm.pptx"));

        let run = || {
            let extractor = CannedExtractor::new(vec![(
                "cm.pptx",
                Extraction::Text("Slide one\n\nSlide two".to_string()),
            )]);
            Harvester::new(config_for(&input, &output), extractor).run().unwrap()
        };

        run();
        let first = fs::read_to_string(output.join("2024/Physio/cm.txt")).unwrap();
        run();
        let second = fs::read_to_string(output.join("2024/Physio/cm.txt")).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_files_are_processed() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        let shared = tmp.path().join("shared/partiel.pdf");
        touch(&shared);
        fs::create_dir_all(input.join("2022/Anat")).unwrap();
        std::os::unix::fs::symlink(&shared, input.join("2022/Anat/partiel.pdf")).unwrap();

        let extractor = CannedExtractor::new(vec![(
            "partiel.pdf",
            Extraction::Text("Linked".to_string()),
        )]);
        let summary = Harvester::new(config_for(&input, &output), extractor).run().unwrap();
        assert_eq!(summary.succeeded, 1);

        let written = fs::read_to_string(output.join("2022/Anat/partiel.txt")).unwrap();
        assert!(written.ends_with("source_file: partiel.pdf\n---\n\nLinked"));
    }
}
