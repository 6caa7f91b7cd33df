//! On-disk snapshot of the previous thread generation.
//!
//! The snapshot is a JSONL file: one header line followed by one [`Thread`]
//! record per line.  Records that do not decode are dropped, never fatal, so a
//! partial write from a crashed cycle cannot poison the next one.
//!
//! [`Thread`]: threadwatch_core::Thread

pub mod error;
pub mod lock;
pub mod store;

pub use error::{Result, SnapshotError};
pub use lock::StoreLock;
pub use store::{
    JsonlSnapshotStore, SNAPSHOT_FORMAT, SNAPSHOT_VERSION, SanitizeReport, SnapshotHeader,
    SnapshotStore,
};
