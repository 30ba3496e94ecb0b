//! Scoped backup of a build configuration file

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BACKUP_SUFFIX: &str = "origin";

/// Backs up `file` on creation and restores it when dropped.
///
/// If the file existed it is copied to `<file>.origin` and moved back on drop,
/// discarding whatever was generated in between. If it did not exist, any file
/// created at that path is removed on drop.
#[derive(Debug)]
pub struct RestoreGuard {
    path: PathBuf,
    backup: Option<PathBuf>,
}

impl RestoreGuard {
    pub fn new(path: &Path) -> io::Result<Self> {
        let backup = if path.is_file() {
            let mut name = path.as_os_str().to_owned();
            name.push(".");
            name.push(BACKUP_SUFFIX);
            let backup = PathBuf::from(name);
            fs::copy(path, &backup)?;
            debug!(target: "simreg::runner", "Backed up {} -> {}", path.display(), backup.display());
            Some(backup)
        } else {
            None
        };
        Ok(Self { path: path.to_path_buf(), backup })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn had_original(&self) -> bool {
        self.backup.is_some()
    }

    fn restore(&self) -> io::Result<()> {
        match &self.backup {
            Some(backup) => fs::rename(backup, &self.path),
            None if self.path.exists() => fs::remove_file(&self.path),
            None => Ok(()),
        }
    }
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!(target: "simreg::runner", "Failed to restore {}: {e}", self.path.display());
        }
    }
}
