use super::{DevRequest, Flow, Middleware, asset_response};
use crate::error::MiddlewareError;
use crate::mime::{content_type_for, is_script_or_html};
use crate::state::SharedState;
use async_trait::async_trait;

/// Serves buffered outputs that are neither scripts nor HTML documents.
///
/// Scripts and the index document are left to later handlers so that SSR and
/// index transforms can see them first.
pub struct InMemoryResourceMiddleware {
    state: SharedState,
}

impl InMemoryResourceMiddleware {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Middleware for InMemoryResourceMiddleware {
    fn name(&self) -> &'static str {
        "in-memory-resource"
    }

    async fn handle(&self, request: &mut DevRequest) -> Result<Flow, MiddlewareError> {
        if !request.is_read() || request.disk_source.is_some() {
            return Ok(Flow::Continue);
        }
        if request.path == "/" || is_script_or_html(&request.path) {
            return Ok(Flow::Continue);
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
    use crate::build_result::{OutputFileType, RebuildFile};
    use crate::middleware::CustomHeaders;
    use crate::output::OutputReconciler;
    use crate::state::DevServerState;
    use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
    use std::sync::Arc;

    fn middleware() -> InMemoryResourceMiddleware {
        let state = Arc::new(DevServerState::new(
            OutputReconciler::new(),
            CustomHeaders::default(),
        ));
        state.reconcile(&[
            RebuildFile::new("styles.css", "body{}", Some("c".into())),
            RebuildFile::new("main.js", "main()", Some("j".into())),
            RebuildFile::new("server/app.css", "x", Some("s".into()))
                .with_type(OutputFileType::ServerApplication),
        ]);
        InMemoryResourceMiddleware::new(state)
    }

    async fn run(middleware: &InMemoryResourceMiddleware, uri: &'static str) -> Flow {
        let mut request = DevRequest::new(Method::GET, Uri::from_static(uri), HeaderMap::new());
        middleware.handle(&mut request).await.unwrap()
    }

    #[tokio::test]
    async fn test_serves_stylesheet_with_no_cache() {
        let middleware = middleware();
        let Flow::Handled(response) = run(&middleware, "/styles.css").await else {
            panic!("stylesheet should be served");
        };

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/css; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_skips_scripts_and_unservable_outputs() {
        let middleware = middleware();
        assert!(matches!(run(&middleware, "/main.js").await, Flow::Continue));
        assert!(matches!(run(&middleware, "/server/app.css").await, Flow::Continue));
        assert!(matches!(run(&middleware, "/missing.css").await, Flow::Continue));
    }
}
