//! Error types for the converter

use crate::span::Span;
use thiserror::Error;

/// Main error type for tsubame.
///
/// Ordinary user-facing problems (bad syntax, type mismatches) never surface
/// here — they are collected as [`crate::diagnostics::Diagnostic`]s and the
/// conversion keeps going. This enum is for the cases that genuinely stop a
/// run: the reverse emitter refusing an unsupported construct, a broken
/// internal invariant, and I/O at the CLI boundary.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot express {construct} in Python (offset {})", span.start)]
    Unsupported { construct: String, span: Span },

    #[error("internal converter error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed API surface: {0}")]
    ApiSurface(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_display() {
        let err = ConvertError::Unsupported {
            construct: "delete expression".to_string(),
            span: Span::new(12, 18),
        };
        assert_eq!(
            format!("{err}"),
            "cannot express delete expression in Python (offset 12)"
        );
    }

    #[test]
    fn test_internal_display() {
        let err = ConvertError::Internal("symbol has no qualified name".to_string());
        assert_eq!(
            format!("{err}"),
            "internal converter error: symbol has no qualified name"
        );
    }
}
