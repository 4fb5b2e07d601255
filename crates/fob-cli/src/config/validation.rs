use crate::config::ServeConfig;
use crate::error::{ConfigError, Result};
use fob_serve::middleware::CustomHeaders;
use fob_serve::{PoolOptions, ServeOptions, TransformOptions};
use std::net::SocketAddr;
use std::path::Path;

fn require_dir(field: &str, path: &Path, hint: &str) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        value: path.display().to_string(),
        hint: hint.to_string(),
    }
    .into())
}

impl ServeConfig {
    /// Validate configuration before starting the server.
    pub fn validate(&self) -> Result<()> {
        require_dir(
            "output_dir",
            &self.output_dir,
            "Output directory does not exist. Run the bundler first or pass the directory it writes to",
        )?;

        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "host".to_string(),
                value: self.host.clone(),
                hint: "Host cannot be empty".to_string(),
            }
            .into());
        }

        if let Err(fob_serve::Error::InvalidHeader { name, reason }) =
            CustomHeaders::parse(&self.headers)
        {
            return Err(ConfigError::InvalidValue {
                field: format!("headers.{}", name),
                value: self.headers.get(&name).cloned().unwrap_or_default(),
                hint: reason,
            }
            .into());
        }

        if let Some(dir) = &self.locale_data_dir {
            require_dir(
                "locale_data_dir",
                dir,
                "Locale data directory does not exist",
            )?;
        }

        if self.max_threads == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_threads".to_string(),
                value: "0".to_string(),
                hint: "Use at least one worker thread, or omit it for one per spare CPU".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Session options for a resolved listen address.
    pub fn serve_options(&self, addr: SocketAddr) -> ServeOptions {
        let mut pool = PoolOptions::default();
        if let Some(max_threads) = self.max_threads {
            pool.max_threads = max_threads;
        }

        let transform = TransformOptions {
            sourcemap: self.sourcemap,
            third_party_sourcemaps: self.third_party_sourcemaps,
            ..TransformOptions::default()
        };

        let mut options = ServeOptions::new(addr)
            .with_live_reload(self.live_reload)
            .with_hmr(self.hmr)
            .with_transform_options(transform)
            .with_pool_options(pool);
        options.headers = self.headers.clone();
        if let Some(index) = &self.index {
            options = options.with_index_output(index.clone());
        }
        if let Some(dir) = &self.write {
            options = options.with_write_dir(dir.clone());
        }
        options
    }
}
