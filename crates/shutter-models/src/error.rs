//! Model error types.

use std::path::PathBuf;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Unsupported file type for artifact generation: {}", .0.display())]
    UnsupportedType(PathBuf),
}

impl ModelError {
    pub fn unsupported_type(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedType(path.into())
    }
}
