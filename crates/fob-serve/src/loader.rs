//! Module loading for server-side rendering.

use crate::error::LoadError;
use crate::middleware::BundleLoader;
use crate::output::normalize_served_path;
use crate::state::SharedState;
use crate::transform::{TransformFlags, TransformWorkerPool};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Loads modules from the current outputs, falling back to transforming the
/// workspace file through the worker pool.
pub struct OutputModuleLoader {
    state: SharedState,
    pool: Arc<TransformWorkerPool>,
    workspace_root: PathBuf,
}

impl OutputModuleLoader {
    pub fn new(
        state: SharedState,
        pool: Arc<TransformWorkerPool>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            state,
            pool,
            workspace_root: workspace_root.into(),
        }
    }

    fn workspace_file(&self, served: &str) -> Option<PathBuf> {
        let relative = Path::new(served.trim_start_matches('/'));
        let inside = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        (inside && !served.ends_with('/')).then(|| self.workspace_root.join(relative))
    }
}

#[async_trait]
impl BundleLoader for OutputModuleLoader {
    async fn load_bundle(&self, uri: &str) -> Result<Bytes, LoadError> {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let served = normalize_served_path(path);

        if let Some(record) = self.state.snapshot().get(&served) {
            return Ok(record.contents.clone());
        }

        let Some(file) = self.workspace_file(&served) else {
            return Err(LoadError::NotFound(uri.to_string()));
        };
        match tokio::fs::metadata(&file).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(LoadError::NotFound(uri.to_string())),
        }

        tracing::debug!(file = %file.display(), "loading module from workspace");
        let flags = TransformFlags {
            skip_linker: true,
            ..TransformFlags::default()
        };
        Ok(self.pool.transform_file(file, flags).await?)
    }
}
