use crate::files::ErrorFileStore;
use crate::layout::StoreLayout;
use crate::StoreError;
use errpage_schema::StatusCode;
use std::collections::BTreeSet;
use tracing::{debug, error};

/// Removes stored pages whose codes are no longer wanted.
pub struct OrphanPruner {
    layout: StoreLayout,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub orphaned: Vec<StatusCode>,
    pub removed: Vec<StatusCode>,
    pub failed: Vec<(StatusCode, String)>,
}

impl OrphanPruner {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Stored codes that are not in `keep`, in numeric order.
    pub fn find(&self, keep: &BTreeSet<StatusCode>) -> Result<Vec<StatusCode>, StoreError> {
        let store = ErrorFileStore::new(self.layout.clone());
        Ok(store
            .list()?
            .into_iter()
            .filter(|code| !keep.contains(code))
            .collect())
    }

    /// Remove every orphan. Listing the store is the only fatal step; a file
    /// that cannot be removed is recorded in `failed` and the rest continue.
    pub fn prune(
        &self,
        keep: &BTreeSet<StatusCode>,
        dry_run: bool,
    ) -> Result<PruneReport, StoreError> {
        let store = ErrorFileStore::new(self.layout.clone());
        let mut report = PruneReport {
            orphaned: self.find(keep)?,
            ..PruneReport::default()
        };

        if dry_run {
            return Ok(report);
        }

        for &code in &report.orphaned {
            match store.remove(code) {
                Ok(path) => {
                    debug!("pruned orphaned error file {}", path.display());
                    report.removed.push(code);
                }
                // Raced with another remover; nothing left to do.
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    error!(
                        "failed pruning '{}': {e}",
                        store.path(code).display()
                    );
                    report.failed.push((code, e.to_string()));
                }
            }
        }

        Ok(report)
    }
}
