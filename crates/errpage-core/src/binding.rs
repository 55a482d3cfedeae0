use errpage_schema::StatusCode;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A default `errorfile` binding: the proxy serves `path` for `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFileBinding {
    pub code: StatusCode,
    pub path: PathBuf,
}

impl ErrorFileBinding {
    pub fn new(code: StatusCode, path: impl Into<PathBuf>) -> Self {
        Self {
            code,
            path: path.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("control API rejected the request: {0}")]
    Rejected(String),
    #[error("control API transport failed: {0}")]
    Transport(String),
}

/// The proxy's control API, narrowed to the error-file bindings of its
/// defaults section.
///
/// Bindings are addressed by position, not by code: the caller clears the
/// list and re-registers every active code at consecutive indices.
pub trait BindingApi: Send + Sync {
    fn name(&self) -> &str;

    /// Remove every default error-file binding.
    fn clear_default_error_bindings(&self) -> Result<(), BindingError>;

    /// Register `binding` at position `index`.
    fn set_default_error_binding(
        &self,
        binding: &ErrorFileBinding,
        index: usize,
    ) -> Result<(), BindingError>;
}
