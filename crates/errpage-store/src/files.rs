use crate::layout::StoreLayout;
use crate::{fsync_dir, StoreError};
use errpage_schema::StatusCode;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Permission bits for written error files: readable by the proxy, writable by us.
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Per-code error-page files under a single directory.
///
/// Writes go through a `NamedTempFile` in the same directory and are renamed
/// over the final path, so a concurrent reader sees either the old page or the
/// new one in full.
pub struct ErrorFileStore {
    layout: StoreLayout,
    file_mode: u32,
}

impl ErrorFileStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self {
            layout,
            file_mode: DEFAULT_FILE_MODE,
        }
    }

    #[must_use]
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    #[inline]
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    #[inline]
    pub fn path(&self, code: StatusCode) -> PathBuf {
        self.layout.code_path(code)
    }

    /// Atomically replace the page for `code` with `content`.
    pub fn write(&self, code: StatusCode, content: &[u8]) -> Result<PathBuf, StoreError> {
        let dir = self.layout.root();
        let dest = self.layout.code_path(code);

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content)?;
        set_mode(tmp.as_file(), self.file_mode)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&dest).map_err(|e| StoreError::Io(e.error))?;

        debug!("wrote {} bytes to {}", content.len(), dest.display());
        Ok(committed(dest, fsync_dir(dir)))
    }

    /// Remove the page for `code`. A missing file is reported as `NotFound`.
    pub fn remove(&self, code: StatusCode) -> Result<PathBuf, StoreError> {
        let path = self.layout.code_path(code);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(code.file_name()));
            }
            Err(e) => return Err(StoreError::Io(e)),
        }
        debug!("removed {}", path.display());
        Ok(committed(path, fsync_dir(self.layout.root())))
    }

    pub fn read(&self, code: StatusCode) -> Result<Vec<u8>, StoreError> {
        let path = self.layout.code_path(code);
        fs::read(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::NotFound(code.file_name())
            } else {
                StoreError::Io(e)
            }
        })
    }

    pub fn exists(&self, code: StatusCode) -> bool {
        self.layout.code_path(code).is_file()
    }

    /// Codes with a stored page, in numeric order. Dot-files and names that
    /// are not canonical status codes are skipped.
    pub fn list(&self) -> Result<Vec<StatusCode>, StoreError> {
        let dir = self.layout.root();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut codes = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }
            match StatusCode::parse(&name) {
                Ok(code) => codes.push(code),
                Err(_) => debug!("ignoring non-code file in store: {name}"),
            }
        }
        codes.sort_unstable();
        Ok(codes)
    }
}

/// The rename or unlink has already happened when the directory is synced, so
/// a sync failure only loses durability. The change itself stands.
fn committed(path: PathBuf, synced: Result<(), std::io::Error>) -> PathBuf {
    if let Err(e) = synced {
        warn!(
            "{} changed but its directory could not be synced: {e}",
            path.display()
        );
    }
    path
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: u32) -> Result<(), std::io::Error> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: u32) -> Result<(), std::io::Error> {
    Ok(())
}
