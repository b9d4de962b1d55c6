//! Error types for the restitch library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for restitch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while post-processing extraction artifacts.
///
/// Per-item failures (a block that cannot be converted, a text fragment that
/// cannot be anchored, a malformed page record) are not represented here:
/// they degrade to explicit skip/fallback outcomes at their call sites and
/// only surface in statistics.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error, annotated with the offending path.
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path of the file or directory the operation failed on.
        path: PathBuf,
        /// Underlying system error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid JSON.
    #[error("{}: invalid JSON: {source}", .path.display())]
    Json {
        /// Path of the offending file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A required top-level key is absent from the document.
    #[error("missing required key `{0}` (is this a middle.json file?)")]
    MissingKey(&'static str),

    /// A top-level value has the wrong container type.
    #[error("invalid document structure: {0}")]
    InvalidStructure(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }
}
