//! Durable storage for custom error pages.
//!
//! One file per status code lives under a single directory, named by the code
//! and holding the page body verbatim. `ErrorFileStore` replaces files
//! atomically (temp file, fsync, rename, directory fsync) so that a proxy
//! reading the directory never observes a torn page. `OrphanPruner` removes
//! files for codes that are no longer part of the desired state.

pub mod files;
pub mod layout;
pub mod prune;

pub use files::{ErrorFileStore, DEFAULT_FILE_MODE};
pub use layout::StoreLayout;
pub use prune::{OrphanPruner, PruneReport};

use std::path::Path;
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` or `unlink()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("error file not found for code {0}")]
    NotFound(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
