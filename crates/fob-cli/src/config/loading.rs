use crate::cli::ServeArgs;
use crate::config::ServeConfig;
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "fob.serve.json";

const ENV_PREFIX: &str = "FOB_SERVE_";

/// Values given on the command line. Unset flags are skipped so they do not
/// mask lower-priority sources.
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    live_reload: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hmr: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    write: Option<PathBuf>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locale_data_dir: Option<PathBuf>,
}

impl From<&ServeArgs> for CliOverrides {
    fn from(args: &ServeArgs) -> Self {
        Self {
            output_dir: args.output_dir.clone(),
            host: args.host.clone(),
            port: args.port,
            live_reload: args.no_live_reload.then_some(false),
            hmr: args.no_hmr.then_some(false),
            index: args.index.clone(),
            write: args.write.clone(),
            headers: args.headers.iter().cloned().collect(),
            locale_data_dir: args.locale_data.clone(),
        }
    }
}

impl ServeConfig {
    /// Load configuration relative to the current directory.
    pub fn load(args: &ServeArgs) -> Result<Self> {
        Self::load_from(args, Path::new("."))
    }

    /// Load configuration, looking for fob.serve.json in `cwd`.
    ///
    /// Priority: CLI args > environment variables > config file > defaults.
    /// Header maps are merged key by key across sources.
    pub fn load_from(args: &ServeArgs, cwd: &Path) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let config_file = match &args.config {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.clone()).into());
            }
            Some(path) => Some(path.clone()),
            None => {
                let default_path = cwd.join(CONFIG_FILE_NAME);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Json::file(path));
        }

        // FOB_SERVE_PORT, FOB_SERVE_LIVE_RELOAD, ...
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        figment = figment.merge(Serialized::defaults(CliOverrides::from(args)));

        figment
            .extract()
            .map_err(|e| ConfigError::Extract(e.to_string()).into())
    }
}
