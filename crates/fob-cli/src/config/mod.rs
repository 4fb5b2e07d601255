//! Configuration for `fob serve` with multi-source loading.
//!
//! Priority: CLI > Environment (`FOB_SERVE_*`) > File (`fob.serve.json`) > Defaults

mod defaults;
mod loading;
mod port;
mod validation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use defaults::*;
pub use loading::CONFIG_FILE_NAME;
pub use port::find_available_port;

/// Dev-server configuration, loaded from fob.serve.json, the environment and
/// CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServeConfig {
    /// Directory the bundler writes its output to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Host to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Requested port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Reload the page on non-stylesheet changes
    #[serde(default = "default_true")]
    pub live_reload: bool,

    /// Patch stylesheets without reloading
    #[serde(default = "default_true")]
    pub hmr: bool,

    /// Output file served as /index.html
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    /// Mirror updated outputs into this directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<PathBuf>,

    /// Headers added to every response
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Upper bound on transform worker threads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<usize>,

    /// Keep source map comments in transformed modules
    #[serde(default = "default_true")]
    pub sourcemap: bool,

    /// Keep source map comments for node_modules sources too
    #[serde(default)]
    pub third_party_sourcemaps: bool,

    /// Directory holding locale-data modules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale_data_dir: Option<PathBuf>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            host: default_host(),
            port: default_port(),
            live_reload: true,
            hmr: true,
            index: None,
            write: None,
            headers: BTreeMap::new(),
            max_threads: None,
            sourcemap: true,
            third_party_sourcemaps: false,
            locale_data_dir: None,
        }
    }
}
