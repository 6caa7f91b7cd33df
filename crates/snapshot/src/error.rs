use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode thread {id}")]
    Encode {
        id: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot header")]
    Header(#[source] serde_json::Error),

    #[error("snapshot lock {} is held by another watcher", .path.display())]
    Locked { path: PathBuf },
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
