//! Programmatic configuration for a dev-serve session.

use crate::live_update::LiveUpdateOptions;
use crate::transform::{PoolOptions, TransformOptions};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Dev-serve session configuration.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Listen address
    pub addr: SocketAddr,
    /// Reload the page on non-stylesheet changes
    pub live_reload: bool,
    /// Patch stylesheets without reloading
    pub hmr: bool,
    /// Render non-static routes on the server
    pub ssr: bool,
    /// Ask the renderer to inline critical CSS
    pub inline_critical_css: bool,
    /// Output path served as `/index.html`
    pub index_output: Option<String>,
    /// Headers added to every served response
    pub headers: BTreeMap<String, String>,
    /// Mirror updated outputs and assets into this directory
    pub write_dir: Option<PathBuf>,
    /// Root for modules loaded outside the outputs
    pub workspace_root: PathBuf,
    /// Transform behavior
    pub transform: TransformOptions,
    /// Transform pool sizing
    pub pool: PoolOptions,
}

impl ServeOptions {
    /// Defaults: live reload and HMR on, SSR off.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            live_reload: true,
            hmr: true,
            ssr: false,
            inline_critical_css: false,
            index_output: None,
            headers: BTreeMap::new(),
            write_dir: None,
            workspace_root: PathBuf::from("."),
            transform: TransformOptions::default(),
            pool: PoolOptions::default(),
        }
    }

    pub fn with_live_reload(mut self, enabled: bool) -> Self {
        self.live_reload = enabled;
        self
    }

    pub fn with_hmr(mut self, enabled: bool) -> Self {
        self.hmr = enabled;
        self
    }

    pub fn with_ssr(mut self, enabled: bool) -> Self {
        self.ssr = enabled;
        self
    }

    pub fn with_inline_critical_css(mut self, enabled: bool) -> Self {
        self.inline_critical_css = enabled;
        self
    }

    pub fn with_index_output(mut self, path: impl Into<String>) -> Self {
        self.index_output = Some(path.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_write_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.write_dir = Some(dir.into());
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn with_transform_options(mut self, options: TransformOptions) -> Self {
        self.transform = options;
        self
    }

    pub fn with_pool_options(mut self, options: PoolOptions) -> Self {
        self.pool = options;
        self
    }

    /// Live-update behavior derived from these options.
    pub fn live_update(&self) -> LiveUpdateOptions {
        LiveUpdateOptions {
            live_reload: self.live_reload,
            hmr: self.hmr,
        }
    }

    /// Whether served HTML should load the live-update client.
    pub fn injects_client(&self) -> bool {
        self.live_reload || self.hmr
    }

    /// Base URL for a bound address. Unspecified hosts map to `localhost`.
    pub fn server_url(addr: SocketAddr) -> String {
        if addr.ip().is_unspecified() {
            format!("http://localhost:{}", addr.port())
        } else {
            format!("http://{}", addr)
        }
    }
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 4200)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_url() {
        assert_eq!(
            ServeOptions::server_url("127.0.0.1:3000".parse().unwrap()),
            "http://127.0.0.1:3000"
        );
        assert_eq!(
            ServeOptions::server_url("0.0.0.0:3000".parse().unwrap()),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_client_injection_follows_live_update_flags() {
        let options = ServeOptions::default().with_live_reload(false).with_hmr(false);
        assert!(!options.injects_client());
        assert!(ServeOptions::default().with_live_reload(false).injects_client());
    }
}
