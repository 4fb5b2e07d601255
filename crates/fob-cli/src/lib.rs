//! fob CLI - development server for bundler output.
//!
//! The CLI watches the directory an external bundler writes to and serves it
//! through the `fob-serve` engine: rebuilds are reconciled by content hash,
//! stylesheet edits are patched in place, and other edits reload the page.
//!
//! # Architecture
//!
//! - [`cli`] - clap argument definitions
//! - [`config`] - `fob.serve.json` / `FOB_SERVE_*` / flag merging with figment
//! - [`dev`] - output-directory snapshots, file watching, locale-data serving
//! - [`commands`] - `serve` and `locale`
//! - [`error`] - error types and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal status output
//!
//! # Example
//!
//! ```rust,no_run
//! use fob_cli::config::ServeConfig;
//! use fob_cli::{cli::ServeArgs, error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     let config = ServeConfig::load(&ServeArgs::default())?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result, ResultExt};
