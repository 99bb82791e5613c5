//! Common error types for uncork.

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for uncork operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The prefix cannot be captured: missing `drive_c`/`system.reg`, or
    /// nothing to export.
    #[error("Invalid prefix structure: {0}")]
    InvalidPrefixStructure(String),

    /// A declared executable, icon or prefix path does not exist.
    #[error("{what} not found: {}", path.display())]
    SourceNotFound { what: &'static str, path: PathBuf },

    #[error("Bundled Wine runtime not found: {}", .0.display())]
    BundledRuntimeMissing(PathBuf),

    #[error("Duplicate executable id: {0}")]
    DuplicateExecutable(String),

    #[error("Invalid exclusion pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("Capture was already exported to {}", .0.display())]
    AlreadyExported(PathBuf),

    /// An external tool (wineboot, icon extraction) did not succeed.
    #[error("{tool} failed: {reason}")]
    Tool { tool: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::SourceNotFound`].
    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Error::SourceNotFound {
            what,
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_not_found_message() {
        let err = Error::not_found("Executable", "/tmp/prefix/drive_c/app.exe");
        assert_eq!(
            err.to_string(),
            "Executable not found: /tmp/prefix/drive_c/app.exe"
        );
    }

    #[test]
    fn test_bundled_runtime_message() {
        let err = Error::BundledRuntimeMissing(PathBuf::from("/opt/wine-9.0"));
        assert_eq!(
            err.to_string(),
            "Bundled Wine runtime not found: /opt/wine-9.0"
        );
    }
}
