//! Error types for litscreen.
//!
//! Every fallible operation returns `Result<T, ScreenError>`. Only
//! [`ScreenError::InvariantViolation`] aborts a screening run; everything
//! else is scoped to a single source file or a single enrichment row.

use thiserror::Error;

/// Main error type for litscreen operations.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// Source file could not be parsed as its declared format
    #[error("Format error in {source_name}: {message}")]
    Format {
        /// Source (file stem) the error belongs to
        source_name: String,
        /// Parser message, usually with a line number
        message: String,
    },

    /// Pipeline wiring bug, e.g. an unclassified record reached the tally
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// PDF text extraction error
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Configuration error (bad rule pattern, bad path, ...)
    #[error("Config error: {0}")]
    Config(String),
}

impl ScreenError {
    /// Whether this error must abort the whole run rather than one file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScreenError::InvariantViolation(_))
    }

    pub(crate) fn format(source_name: &str, message: impl Into<String>) -> Self {
        ScreenError::Format {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias using `ScreenError`
pub type Result<T> = std::result::Result<T, ScreenError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a format error for `source_name`
    fn ok_or_format(self, source_name: &str, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_format(self, source_name: &str, msg: &str) -> Result<T> {
        self.ok_or_else(|| ScreenError::format(source_name, msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invariant_violation_is_fatal() {
        assert!(ScreenError::InvariantViolation("x".into()).is_fatal());
        assert!(!ScreenError::format("scopus", "bad line").is_fatal());
        assert!(!ScreenError::Config("x".into()).is_fatal());
    }

    #[test]
    fn test_ok_or_format() {
        let missing: Option<u8> = None;
        let err = missing.ok_or_format("acm", "unterminated entry").unwrap_err();
        assert_eq!(err.to_string(), "Format error in acm: unterminated entry");
    }
}
