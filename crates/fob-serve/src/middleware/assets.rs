use super::{DevRequest, Flow, Middleware};
use crate::error::MiddlewareError;
use crate::state::SharedState;
use async_trait::async_trait;

/// Rewrites requests for copied assets to their on-disk source.
///
/// Never answers; the file is read later by
/// [`FileFallbackMiddleware`](super::FileFallbackMiddleware).
pub struct AssetRewriteMiddleware {
    state: SharedState,
}

impl AssetRewriteMiddleware {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Middleware for AssetRewriteMiddleware {
    fn name(&self) -> &'static str {
        "asset-rewrite"
    }

    async fn handle(&self, request: &mut DevRequest) -> Result<Flow, MiddlewareError> {
        if !request.is_read() {
            return Ok(Flow::Continue);
        }

        let assets = self.state.assets();
        if let Some(source) = assets.source_for(&request.path) {
            tracing::debug!(path = %request.path, source = %source.display(), "asset rewrite");
            request.disk_source = Some(source.to_path_buf());
        }
        Ok(Flow::Continue)
    }
}
