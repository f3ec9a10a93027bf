//! Error types for mxpredict.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for mxpredict operations.
pub type Result<T> = std::result::Result<T, MxError>;

/// Errors that can occur while building or driving a predictor.
#[derive(Debug, Error)]
pub enum MxError {
    /// Rejected locally, before any native call was made.
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// The native call could not be carried out, or produced an unusable
    /// result while reporting success.
    #[error("Native call failed: {0}")]
    NativeCall(String),

    /// The native call ran and returned a failure status.
    #[error("{op} failed with status {code}: {message}")]
    Native {
        /// Name of the C entry point that failed.
        op: &'static str,
        /// Raw status returned by the call.
        code: i32,
        /// Last-error diagnostic fetched right after the failing call.
        message: String,
    },

    /// Invalid tensor.
    #[error("Invalid tensor: {0}")]
    Tensor(String),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

impl MxError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a native call error.
    pub fn native_call(msg: impl Into<String>) -> Self {
        Self::NativeCall(msg.into())
    }

    /// Create a native status error.
    pub fn native(op: &'static str, code: i32, message: impl Into<String>) -> Self {
        Self::Native {
            op,
            code,
            message: message.into(),
        }
    }

    /// Create a tensor error.
    pub fn tensor(msg: impl Into<String>) -> Self {
        Self::Tensor(msg.into())
    }

    /// True for errors raised before reaching the native library.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True for errors reported by the native library.
    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native { .. } | Self::NativeCall(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MxError::validation("invalid empty symbol");
        assert_eq!(format!("{}", err), "Invalid argument: invalid empty symbol");

        let err = MxError::native("MXPredForward", -1, "out of memory");
        assert_eq!(
            format!("{}", err),
            "MXPredForward failed with status -1: out of memory"
        );

        let err = MxError::FileNotFound(PathBuf::from("/path/to/model-symbol.json"));
        assert_eq!(format!("{}", err), "File not found: /path/to/model-symbol.json");
    }

    #[test]
    fn test_error_kinds() {
        assert!(MxError::validation("x").is_validation());
        assert!(!MxError::validation("x").is_native());
        assert!(MxError::native("MXPredFree", 1, "x").is_native());
        assert!(MxError::native_call("null handle").is_native());
        assert!(!MxError::tensor("x").is_validation());
    }
}
