use crate::CoreError;
use errpage_store::StoreLayout;
use fs2::FileExt;
use std::fs::{File, OpenOptions};

/// Exclusive advisory lock on the store's `.lock` file.
///
/// Holding one is the precondition for [`Reconciler::reconcile`](crate::Reconciler::reconcile):
/// neither file writes nor control-API calls are synchronized against an
/// interleaved pass on the same store. The lock file is a dot-file, so it
/// never shows up as a code file.
pub struct PassLock {
    lock_file: File,
}

impl PassLock {
    /// Block until no other pass holds the store.
    pub fn acquire(layout: &StoreLayout) -> Result<Self, CoreError> {
        let lock_file = open_lock_file(layout)?;
        lock_file.lock_exclusive().map_err(|e| {
            CoreError::Lock(format!("{}: {e}", layout.lock_file().display()))
        })?;
        Ok(Self { lock_file })
    }

    /// `None` while another pass is running on the same store.
    pub fn try_acquire(layout: &StoreLayout) -> Result<Option<Self>, CoreError> {
        let lock_file = open_lock_file(layout)?;
        Ok(lock_file
            .try_lock_exclusive()
            .ok()
            .map(|()| Self { lock_file }))
    }
}

/// Creates the store directory too, so a first pass can lock before
/// anything else exists.
fn open_lock_file(layout: &StoreLayout) -> Result<File, CoreError> {
    layout.initialize()?;
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(layout.lock_file())?)
}

impl Drop for PassLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}
