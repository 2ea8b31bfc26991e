//! # Notebook Errors

use thiserror::Error;

/// Result type for notebook operations
pub type NotebookResult<T> = Result<T, NotebookError>;

/// Notebook repository errors
#[derive(Debug, Clone, Error)]
pub enum NotebookError {
    /// Notebook does not exist
    #[error("Notebook not found")]
    NotFound,

    /// Cell does not exist in this notebook
    #[error("Cell not found")]
    CellNotFound,

    /// Caller does not own the notebook
    #[error("Notebook belongs to another user")]
    NotOwner,

    /// The backing store failed
    #[error("Notebook store failure: {0}")]
    Store(String),
}

impl NotebookError {
    /// HTTP status code this error maps to
    pub fn status_code(&self) -> u16 {
        match self {
            NotebookError::NotFound | NotebookError::CellNotFound => 404,
            NotebookError::NotOwner => 403,
            NotebookError::Store(_) => 500,
        }
    }
}

impl From<crate::store::StoreError> for NotebookError {
    fn from(err: crate::store::StoreError) -> Self {
        NotebookError::Store(err.to_string())
    }
}
