//! Errors in reading punch files
use std::fmt::Display;

use crate::layout::LayoutError;

/// Type alias for a `Result` with [`PunchError`] as the error type.
pub type PResult<T> = Result<T, PunchError>;

/// A hard failure while reading a punch stream.
///
/// Malformed lines are never errors; they are recorded as
/// [`Warning`](crate::warnings::Warning)s and skipped. Only problems with the
/// stream itself or with the configured layout end up here.
#[derive(Debug)]
pub enum PunchError {
    /// Indicates that reading line `line` (1-based) from the input failed.
    Read { line: usize, source: std::io::Error },

    /// Indicates that the layout string given in the settings is invalid.
    Layout(LayoutError),
}

impl Display for PunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PunchError::Read { line, source } => {
                write!(f, "Error reading line {line} of punch data: {source}")
            },
            PunchError::Layout(e) => write!(f, "Invalid line layout: {e}"),
        }
    }
}

impl std::error::Error for PunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PunchError::Read { source, .. } => Some(source),
            PunchError::Layout(e) => Some(e),
        }
    }
}

impl From<LayoutError> for PunchError {
    fn from(value: LayoutError) -> Self {
        Self::Layout(value)
    }
}
