//! fob CLI - development server for bundler output.
//!
//! Parses arguments, sets up logging and colors, and dispatches commands.

use clap::Parser;
use fob_cli::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    ui::init_colors(args.no_color);
    logger::init_logger(args.verbose, args.quiet, !ui::colors_enabled());

    let result = match args.command {
        cli::Command::Serve(serve_args) => commands::serve_execute(serve_args).await,
        cli::Command::Locale(locale_args) => commands::locale_execute(locale_args).await,
    };

    // Render CLI errors as miette diagnostics
    result.map_err(error::cli_error_to_miette)
}
