//! Command implementations for the fob CLI.
//!
//! - [`serve`] - Serve a bundler's output directory with live updates
//! - [`locale`] - Resolve locale tags against a locale-data directory
//!
//! Each command provides an `execute` function taking its parsed arguments.

pub mod locale;
pub mod serve;

pub use locale::execute as locale_execute;
pub use serve::execute as serve_execute;
