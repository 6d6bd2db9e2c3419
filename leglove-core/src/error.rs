//! Error types for loaders and the corpus streamer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A document could not be turned into text.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The file is not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure while walking a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// The root or a group directory could not be listed.
    #[error("cannot list directory {}: {source}", path.display())]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The loader failed on one document.
    #[error("cannot load document {}: {source}", path.display())]
    DocumentLoad {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
}

impl CorpusError {
    /// Path of the directory or document involved.
    pub fn path(&self) -> &std::path::Path {
        match self {
            CorpusError::UnreadableDirectory { path, .. } | CorpusError::DocumentLoad { path, .. } => {
                path
            }
        }
    }
}

pub type Result<T, E = CorpusError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_path() {
        let err = CorpusError::UnreadableDirectory {
            path: PathBuf::from("/no/such/root"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/no/such/root"));
        assert!(msg.contains("missing"));
        assert_eq!(err.path(), std::path::Path::new("/no/such/root"));
    }

    #[test]
    fn load_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: LoadError = json_err.into();
        assert!(matches!(err, LoadError::Json(_)));
        assert!(err.to_string().starts_with("invalid json"));
    }

    #[test]
    fn document_error_keeps_source() {
        use std::error::Error as _;
        let err = CorpusError::DocumentLoad {
            path: PathBuf::from("a/b.json"),
            source: LoadError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
        };
        assert!(err.source().is_some());
    }
}
