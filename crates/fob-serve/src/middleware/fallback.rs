use super::{DevRequest, Flow, Middleware, asset_response};
use crate::error::MiddlewareError;
use crate::mime::content_type_for;
use crate::state::SharedState;
use async_trait::async_trait;

/// Terminal handler: reads rewritten assets from disk and serves any servable
/// output the earlier handlers skipped (scripts, HTML documents).
pub struct FileFallbackMiddleware {
    state: SharedState,
}

impl FileFallbackMiddleware {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Middleware for FileFallbackMiddleware {
    fn name(&self) -> &'static str {
        "file-fallback"
    }

    async fn handle(&self, request: &mut DevRequest) -> Result<Flow, MiddlewareError> {
        if !request.is_read() {
            return Ok(Flow::Continue);
        }

        if let Some(source) = &request.disk_source {
            let contents =
                tokio::fs::read(source)
                    .await
                    .map_err(|e| MiddlewareError::AssetRead {
                        path: source.clone(),
                        source: e,
                    })?;
            return Ok(Flow::Handled(asset_response(
                contents,
                content_type_for(&request.path),
                self.state.headers(),
            )));
        }

        let snapshot = self.state.snapshot();
        match snapshot.get(&request.path) {
            Some(record) if record.servable => Ok(Flow::Handled(asset_response(
                record.contents.clone(),
                content_type_for(&record.path),
                self.state.headers(),
            ))),
            _ => Ok(Flow::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_result::{AssetFile, RebuildFile};
    use crate::middleware::{AssetRewriteMiddleware, CustomHeaders, MiddlewareChain};
    use crate::output::OutputReconciler;
    use crate::state::DevServerState;
    use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
    use std::sync::Arc;

    fn state() -> SharedState {
        Arc::new(DevServerState::new(
            OutputReconciler::new(),
            CustomHeaders::default(),
        ))
    }

    fn get(uri: &'static str) -> DevRequest {
        DevRequest::new(Method::GET, Uri::from_static(uri), HeaderMap::new())
    }

    #[tokio::test]
    async fn test_serves_rewritten_asset_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("logo.svg");
        std::fs::write(&source, "<svg/>").unwrap();

        let state = state();
        state.replace_assets(&[AssetFile {
            source,
            destination: "assets/logo.svg".to_string(),
        }]);
        let chain = MiddlewareChain::new()
            .with(Arc::new(AssetRewriteMiddleware::new(state.clone())))
            .with(Arc::new(FileFallbackMiddleware::new(state)));

        let response = chain.run(get("/assets/logo.svg")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"<svg/>");
    }

    #[tokio::test]
    async fn test_missing_disk_asset_is_an_error() {
        let middleware = FileFallbackMiddleware::new(state());
        let mut request = get("/gone.png");
        request.disk_source = Some(std::path::PathBuf::from("/definitely/not/here.png"));

        let err = middleware.handle(&mut request).await.unwrap_err();
        assert!(matches!(err, MiddlewareError::AssetRead { .. }));
    }

    #[tokio::test]
    async fn test_serves_script_output() {
        let state = state();
        state.reconcile(&[RebuildFile::new("main.js", "main()", Some("j".into()))]);
        let middleware = FileFallbackMiddleware::new(state);

        let mut request = get("/main.js");
        let Flow::Handled(response) = middleware.handle(&mut request).await.unwrap() else {
            panic!("script should be served");
        };
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/javascript; charset=utf-8"
        );
    }
}
