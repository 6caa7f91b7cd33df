//! Poll-cycle driver: fetch, normalize, classify, dispatch, persist.

pub mod catalog;
pub mod schedule;
pub mod watcher;

pub use catalog::{CatalogError, CatalogSource, HttpCatalog};
pub use schedule::{Schedule, run_until_shutdown};
pub use watcher::{CycleReport, Watcher};

#[cfg(test)]
mod testing;
