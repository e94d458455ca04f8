//! Error types for loading and saving data files

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for data access
pub type Result<T> = std::result::Result<T, DataError>;

/// Failures while reading or writing a data file.
///
/// Every variant names the file involved so the caller can report it.
#[derive(Debug, Error)]
pub enum DataError {
    /// Required input file does not exist
    #[error("Data file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// File exists but its contents cannot be used
    #[error("Malformed data in {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// CSV reader or writer failure
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Filesystem failure other than a missing file
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// Path of the file the error refers to
    pub fn path(&self) -> &Path {
        match self {
            Self::MissingFile { path }
            | Self::Malformed { path, .. }
            | Self::Csv { path, .. }
            | Self::Io { path, .. } => path,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::MissingFile { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_missing_file() {
        let err = DataError::io(
            Path::new("Data/dfsectorquarter.csv"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_missing());
        assert_eq!(err.to_string(), "Data file not found: Data/dfsectorquarter.csv");
    }

    #[test]
    fn test_malformed_names_path() {
        let err = DataError::malformed(Path::new("Data/Bank_Type.csv"), "missing TICKER column");
        assert_eq!(err.path(), Path::new("Data/Bank_Type.csv"));
        assert!(err.to_string().contains("missing TICKER column"));
    }
}
