//! Document loaders.
//!
//! A loader turns one file into text for the normalizer. An empty string
//! means "no text" and the streamer skips the document.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::LoadError;

/// Reads the text of a single document.
pub trait DocumentLoader {
    /// File extension (without the dot) of documents this loader reads.
    fn extension(&self) -> &str;

    /// Loads the text of the document at `path`.
    fn load_text(&self, path: &Path) -> Result<String, LoadError>;

    /// Whether `path` carries this loader's extension.
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension())
    }
}

impl<L: DocumentLoader + ?Sized> DocumentLoader for &L {
    fn extension(&self) -> &str {
        (**self).extension()
    }

    fn load_text(&self, path: &Path) -> Result<String, LoadError> {
        (**self).load_text(path)
    }
}

/// Text fields of an opinion record, most annotated first.
pub const OPINION_TEXT_FIELDS: [&str; 5] = [
    "html_with_citations",
    "html_lawbox",
    "html_columbia",
    "html",
    "plain_text",
];

/// Loads opinion records stored as JSON objects.
///
/// Returns the first non-blank string among [`OPINION_TEXT_FIELDS`]. Markup
/// is kept as is, since the citation rules match inline HTML.
#[derive(Debug, Clone, Default)]
pub struct JsonOpinionLoader {
    fields: Vec<String>,
}

impl JsonOpinionLoader {
    /// Reads [`OPINION_TEXT_FIELDS`] in priority order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads only `fields`, in the given order.
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Extracts the document text from a parsed record.
    pub fn text_of(&self, record: &Value) -> String {
        let pick = |field: &str| {
            record
                .get(field)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
        };

        let found = if self.fields.is_empty() {
            OPINION_TEXT_FIELDS.iter().find_map(|f| pick(f))
        } else {
            self.fields.iter().find_map(|f| pick(f))
        };
        found.map(str::to_owned).unwrap_or_default()
    }
}

impl DocumentLoader for JsonOpinionLoader {
    fn extension(&self) -> &str {
        "json"
    }

    fn load_text(&self, path: &Path) -> Result<String, LoadError> {
        let bytes = fs::read(path)?;
        let record: Value = serde_json::from_slice(&bytes)?;
        Ok(self.text_of(&record))
    }
}

/// Loads UTF-8 text files verbatim.
#[derive(Debug, Clone)]
pub struct PlainTextLoader {
    extension: String,
}

impl Default for PlainTextLoader {
    fn default() -> Self {
        Self::with_extension("txt")
    }
}

impl PlainTextLoader {
    /// Reads `.txt` files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads files ending in `extension`; a leading dot is ignored.
    pub fn with_extension(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }
}

impl DocumentLoader for PlainTextLoader {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn load_text(&self, path: &Path) -> Result<String, LoadError> {
        Ok(fs::read_to_string(path)?)
    }
}
