use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DapisError {
    // Session
    #[error("unknown session_id: {0}")]
    UnknownSession(String),

    #[error("invalid session_id: {0:?}")]
    InvalidSession(String),

    // Config
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid thread count: {0}")]
    InvalidThreadCount(usize),

    #[error("config error: {0}")]
    Config(String),

    // Extraction
    #[error("IO error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("spreadsheet error at {}: {message}", path.display())]
    Spreadsheet { path: PathBuf, message: String },

    #[error("PDF error at {}: {message}", path.display())]
    Pdf { path: PathBuf, message: String },

    #[error("conversion to PDF failed for {}: {message}", path.display())]
    Conversion { path: PathBuf, message: String },

    // Runtime
    #[error("worker failure: {0}")]
    ThreadPool(String),

    #[error("result store error: {0}")]
    Store(String),
}

impl DapisError {
    /// The path this error occurred at, if applicable.
    /// Callers use this to present "Skipped: <path>" without pattern matching on variants.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. }
            | Self::Spreadsheet { path, .. }
            | Self::Pdf { path, .. }
            | Self::Conversion { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Whether the query can continue after this error.
    ///
    /// Recoverable errors belong to a single target: they are recorded on that
    /// target's report and the remaining targets keep going.
    ///
    /// Everything else (unknown session, bad pattern, store failure) fails the
    /// whole query.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Spreadsheet { .. }
                | Self::Pdf { .. }
                | Self::Conversion { .. }
                | Self::ThreadPool(_)
        )
    }
}

impl From<sqlx::Error> for DapisError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(e.to_string())
    }
}
