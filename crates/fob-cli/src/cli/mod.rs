//! Command-line interface definition for fob.
//!
//! # Command Structure
//!
//! - `fob serve` - Serve a bundler's output directory with live updates
//! - `fob locale` - Resolve locale tags against a locale-data directory

mod commands;
mod validation;

use clap::Parser;

pub use commands::{Command, LocaleArgs, ServeArgs};
pub use validation::parse_header;

/// fob - development server for bundler output
#[derive(Parser, Debug)]
#[command(
    name = "fob",
    version,
    about = "Development server for bundler output",
    long_about = "fob serves the output directory of an external bundler from memory.\n\
                  Rebuilds are reconciled by content hash, stylesheets are patched in place,\n\
                  and every other change triggers a single page reload."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
