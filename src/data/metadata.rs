use std::path::{Component, Path};

pub const KEY_YEAR: &str = "year";
pub const KEY_MODULE: &str = "module";
pub const KEY_TYPE: &str = "type";
pub const KEY_SOURCE: &str = "source_file";

const HEADER_DELIMITER: &str = "---";

/// Attributes inferred from where a file sits in the archive.
///
/// Layout is `<root>/<year>/<module>/<type>/.../<file>`; missing levels simply
/// drop their key. Nothing is validated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// Build metadata from the directories between `root` and `file`.
    ///
    /// The first three directory segments become `year`, `module` and `type`.
    /// The file name is never used for any of them, so a file directly under
    /// `root` only gets `source_file`.
    pub fn from_path(file: &Path, root: &Path) -> Self {
        let relative = file.strip_prefix(root).unwrap_or(file);

        let mut segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        // Drop the file name; only directories carry attributes.
        segments.pop();

        let mut metadata = Metadata::default();
        for (key, segment) in [KEY_YEAR, KEY_MODULE, KEY_TYPE].into_iter().zip(segments) {
            metadata.insert(key, segment);
        }

        let source = file
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        metadata.insert(KEY_SOURCE, source);

        metadata
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Render the front-matter block, blank line included.
    pub fn to_header(&self) -> String {
        let mut header = String::new();
        header.push_str(HEADER_DELIMITER);
        header.push('\n');
        for (key, value) in &self.entries {
            header.push_str(key);
            header.push_str(": ");
            header.push_str(value);
            header.push('\n');
        }
        header.push_str(HEADER_DELIMITER);
        header.push_str("\n\n");
        header
    }
}
