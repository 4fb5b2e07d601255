//! Logging infrastructure for the fob CLI.
//!
//! Sets up a `tracing` subscriber for the CLI and the `fob-serve` engine.
//! Verbosity comes from `--verbose`/`--quiet`, falling back to `RUST_LOG`.
//!
//! # Example
//!
//! ```rust,no_run
//! use fob_cli::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false);
//! info!("Watching dist/");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "fob=debug,fob_cli=debug,fob_serve=debug";
const QUIET_FILTER: &str = "fob=error,fob_cli=error,fob_serve=error";
const DEFAULT_FILTER: &str = "fob=info,fob_cli=info,fob_serve=info";

/// Build the filter for the given flags.
///
/// `--verbose` wins over `--quiet`; with neither, `RUST_LOG` is honored.
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the tracing subscriber.
///
/// Call once at startup, before any logging occurs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize logger with a custom environment filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    // A second initialization (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
