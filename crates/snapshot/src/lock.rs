use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{Result, SnapshotError};

/// Exclusive advisory lock held for as long as a watcher owns a snapshot.
///
/// Two watchers pointed at the same snapshot would interleave load/save and
/// announce the same threads twice, so the second one fails to start.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SnapshotError::io(parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(SnapshotError::io(&path))?;
        FileExt::try_lock_exclusive(&file)
            .map_err(|_| SnapshotError::Locked { path: path.clone() })?;
        // A previous holder may have unlinked the file between our open and
        // our lock; a lock on an orphaned inode excludes nobody.
        if !still_linked(&file, &path) {
            return Err(SnapshotError::Locked { path });
        }
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        // Unlink while still holding the lock so nobody can lock the old inode
        // while a newcomer locks a fresh file at the same path.
        let _ = fs::remove_file(&self.path);
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(unix)]
fn still_linked(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(named)) => held.dev() == named.dev() && held.ino() == named.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn still_linked(_file: &File, path: &Path) -> bool {
    path.exists()
}
