use std::path::PathBuf;

use crate::document::segment::SchemaError;

/// Convenience result type used across flipreel.
pub type FlipreelResult<T> = Result<T, FlipreelError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum FlipreelError {
    /// A segment record is missing a required field, has an invalid value, or reuses a name.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A segment refers to another segment that has not been resolved.
    #[error("reference error: {0}")]
    Reference(String),

    /// An image asset could not be read or decoded.
    #[error("asset load error: '{}': {reason}", path.display())]
    AssetLoad {
        /// Normalized asset path.
        path: PathBuf,
        /// Human-readable cause.
        reason: String,
    },

    /// The whole document could not be read or parsed.
    #[error("document parse error: {0}")]
    DocumentParse(String),

    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipreelError {
    /// Build a [`FlipreelError::Reference`] value.
    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }

    /// Build a [`FlipreelError::AssetLoad`] value.
    pub fn asset_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`FlipreelError::DocumentParse`] value.
    pub fn document_parse(msg: impl Into<String>) -> Self {
        Self::DocumentParse(msg.into())
    }

    /// Build a [`FlipreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
