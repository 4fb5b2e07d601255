use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::cli::validation::parse_header;

/// Available fob subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a bundler's output directory
    ///
    /// Watches the directory, reconciles every rebuild against the previous
    /// one and pushes live updates to connected browsers.
    Serve(ServeArgs),

    /// Resolve locale tags to locale-data modules
    ///
    /// Prints one line per tag: exact, fallback (with the substituted tag),
    /// or missing.
    Locale(LocaleArgs),
}

/// Arguments for the serve command
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Output directory written by the bundler
    ///
    /// Defaults to `output_dir` from fob.serve.json, or `dist`.
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Port to listen on; the next ten ports are tried when it is busy
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Config file (defaults to fob.serve.json when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Disable page reloads on change
    #[arg(long)]
    pub no_live_reload: bool,

    /// Disable in-place stylesheet patching
    #[arg(long)]
    pub no_hmr: bool,

    /// Output file served as /index.html
    #[arg(long, value_name = "NAME")]
    pub index: Option<String>,

    /// Also write updated outputs to this directory
    #[arg(long, value_name = "DIR")]
    pub write: Option<PathBuf>,

    /// Header added to every response
    ///
    /// Examples:
    ///   --header X-Frame-Options=DENY
    ///   --header "Cross-Origin-Opener-Policy=same-origin"
    #[arg(long = "header", value_name = "NAME=VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Directory holding locale-data modules served at /__fob_locale__/
    #[arg(long, value_name = "DIR")]
    pub locale_data: Option<PathBuf>,
}

/// Arguments for the locale command
#[derive(Args, Debug, Clone)]
pub struct LocaleArgs {
    /// Locale tags to resolve (e.g. en-GB, zh-Hant-TW, fr-x-custom)
    #[arg(required = true, value_name = "TAG")]
    pub tags: Vec<String>,

    /// Directory holding locale-data modules
    #[arg(long, value_name = "DIR")]
    pub data_dir: PathBuf,

    /// Module prefix joined with each tag, relative to the data directory
    #[arg(long, default_value = "")]
    pub base: String,

    /// Fail when any tag has no locale data
    #[arg(long)]
    pub strict: bool,
}
