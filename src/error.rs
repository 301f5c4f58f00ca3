use std::path::{Path, PathBuf};

/// Result alias used by every report stage.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Failures that abort a report run.
///
/// Lookup misses and numeric coercion fallbacks are not errors; they are
/// recovered inside the stage that meets them.
#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    /// A workbook or CSV file is missing, unreadable, corrupt or cannot be written.
    #[error("cannot access {}: {reason}", path.display())]
    FileAccess { path: PathBuf, reason: String },

    /// The template or an input file does not have the expected layout.
    #[error("invalid structure: {0}")]
    Structure(String),
}

impl ReportError {
    pub(crate) fn file_access(path: &Path, reason: impl ToString) -> Self {
        ReportError::FileAccess { path: path.to_path_buf(), reason: reason.to_string() }
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        ReportError::Structure(msg.into())
    }
}
