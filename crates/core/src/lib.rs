//! Snapshot-diff and classification engine for board catalog watching.
//!
//! Raw catalog pages are normalized into a [`Generation`] of [`Thread`]s, two
//! generations are compared by thread id, and the delta comes out as an
//! ordered list of [`NotificationIntent`]s.

pub mod catalog;
pub mod diff;
pub mod normalize;
pub mod relevance;
pub mod sanitize;
pub mod thread;

pub use catalog::{CatalogPage, RawReply, RawThread};
pub use diff::{Classification, DiffEngine, LinkBuilder, NotificationIntent, classify_thread};
pub use normalize::Normalizer;
pub use relevance::Keywords;
pub use sanitize::{DEFAULT_MAX_LEN, ELLIPSIS, Sanitizer};
pub use thread::{Generation, LastReply, Thread};
