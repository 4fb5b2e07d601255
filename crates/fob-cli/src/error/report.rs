//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => miette::miette!("{}", e),
        CliError::Server(fob_serve::Error::Bind { addr, source }) => miette::miette!(
            "Failed to bind {}: {}\n\nHint: Another process may be using the port; try --port",
            addr,
            source
        ),
        _ => miette::miette!("{}", err),
    }
}
