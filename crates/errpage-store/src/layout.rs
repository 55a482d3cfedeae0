use crate::StoreError;
use errpage_schema::StatusCode;
use std::fs;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = ".lock";

/// Directory layout of the error-file store.
///
/// Every code file sits directly in the root, named by the code. Dot-files
/// (the pass lock, in-flight temp files) share the directory and are never
/// treated as code files.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the proxy binding for `code` points at.
    #[inline]
    pub fn code_path(&self, code: StatusCode) -> PathBuf {
        self.root.join(code.file_name())
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}
