//! Glue between a bundler's output directory and the `fob-serve` engine.
//!
//! - [`OutputDirSource`] snapshots the directory into a `BuildResult`
//! - [`FileWatcher`] reports changes under it, debounced
//! - [`LocaleDataMiddleware`] serves locale-data modules as an extension

pub mod locale_data;
pub mod source;
pub mod watcher;

pub use locale_data::{LOCALE_DATA_ROUTE, LocaleDataMiddleware};
pub use source::{BUILD_ERRORS_FILE, OutputDirSource, SnapshotSummary, summarize};
pub use watcher::{FileChange, FileWatcher};
