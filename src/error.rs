use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for volume loading operations
pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Unsupported format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Corrupt file {}: {reason}", .path.display())]
    CorruptFile { path: PathBuf, reason: String },

    /// More than one series was found and none was selected
    #[error("Ambiguous series in {}: found {}", .path.display(), .series.join(", "))]
    AmbiguousSeries { path: PathBuf, series: Vec<String> },

    #[error("No valid DICOM series found in {}", .0.display())]
    EmptySeries(PathBuf),

    #[error("Inconsistent geometry: {0}")]
    InconsistentGeometry(String),

    #[error("Failed to export {}: {reason}", .path.display())]
    Export { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoaderError {
    pub(crate) fn corrupt(path: &Path, reason: impl Display) -> Self {
        LoaderError::CorruptFile {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn geometry(reason: impl Into<String>) -> Self {
        LoaderError::InconsistentGeometry(reason.into())
    }
}
