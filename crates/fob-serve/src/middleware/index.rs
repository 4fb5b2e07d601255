use super::{DevRequest, Flow, Middleware, asset_response};
use crate::error::{IndexTransformError, MiddlewareError};
use crate::output::INDEX_HTML_PATH;
use crate::state::SharedState;
use async_trait::async_trait;
use std::sync::Arc;

/// Route of the live-update client script.
pub const CLIENT_SCRIPT_PATH: &str = "/__fob_client__.js";

/// Caller-supplied rewrite of served HTML documents.
#[async_trait]
pub trait IndexTransformer: Send + Sync {
    /// Rewrite the document. `Ok(None)` means "do not serve this response".
    async fn transform(&self, html: String) -> Result<Option<String>, IndexTransformError>;
}

/// Transformations applied to every served HTML document.
#[derive(Clone, Default)]
pub struct IndexHtmlPipeline {
    inject_client: bool,
    transformer: Option<Arc<dyn IndexTransformer>>,
}

impl IndexHtmlPipeline {
    /// Create a pipeline; `inject_client` adds the live-update script tag.
    pub fn new(inject_client: bool) -> Self {
        Self {
            inject_client,
            transformer: None,
        }
    }

    /// Run a caller transform before script injection.
    pub fn with_transformer(mut self, transformer: Arc<dyn IndexTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Apply the pipeline. `Ok(None)` means the caller transform declined.
    pub async fn apply(&self, html: String) -> Result<Option<String>, IndexTransformError> {
        let html = match &self.transformer {
            Some(transformer) => match transformer.transform(html).await? {
                Some(html) => html,
                None => return Ok(None),
            },
            None => html,
        };

        if self.inject_client {
            Ok(Some(inject_client_script(&html)))
        } else {
            Ok(Some(html))
        }
    }
}

/// Add the client script tag before `</body>`, or append it.
pub fn inject_client_script(html: &str) -> String {
    let script_tag = format!(r#"<script src="{}"></script>"#, CLIENT_SCRIPT_PATH);
    if html.contains(&script_tag) {
        return html.to_string();
    }

    match html.rfind("</body>") {
        Some(pos) => {
            let mut result = String::with_capacity(html.len() + script_tag.len() + 4);
            result.push_str(&html[..pos]);
            result.push_str("  ");
            result.push_str(&script_tag);
            result.push('\n');
            result.push_str(&html[pos..]);
            result
        }
        None => format!("{}\n{}", html, script_tag),
    }
}

/// Serves `/` and `/index.html` from the in-memory index document.
pub struct IndexHtmlMiddleware {
    state: SharedState,
    pipeline: IndexHtmlPipeline,
}

impl IndexHtmlMiddleware {
    pub fn new(state: SharedState, pipeline: IndexHtmlPipeline) -> Self {
        Self { state, pipeline }
    }
}

#[async_trait]
impl Middleware for IndexHtmlMiddleware {
    fn name(&self) -> &'static str {
        "index-html"
    }

    async fn handle(&self, request: &mut DevRequest) -> Result<Flow, MiddlewareError> {
        if !request.is_read() || (request.path != "/" && request.path != INDEX_HTML_PATH) {
            return Ok(Flow::Continue);
        }

        let snapshot = self.state.snapshot();
        let Some(record) = snapshot.get(INDEX_HTML_PATH) else {
            return Ok(Flow::Continue);
        };
        let html = String::from_utf8_lossy(&record.contents).into_owned();

        match self.pipeline.apply(html).await? {
            Some(html) => Ok(Flow::Handled(asset_response(
                html,
                "text/html; charset=utf-8",
                self.state.headers(),
            ))),
            None => Ok(Flow::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_result::RebuildFile;
    use crate::middleware::CustomHeaders;
    use crate::output::OutputReconciler;
    use crate::state::DevServerState;
    use axum::http::{HeaderMap, Method, Uri};

    struct Decline;

    #[async_trait]
    impl IndexTransformer for Decline {
        async fn transform(&self, _html: String) -> Result<Option<String>, IndexTransformError> {
            Ok(None)
        }
    }

    struct Broken;

    #[async_trait]
    impl IndexTransformer for Broken {
        async fn transform(&self, _html: String) -> Result<Option<String>, IndexTransformError> {
            Err(IndexTransformError("template error".to_string()))
        }
    }

    fn middleware(pipeline: IndexHtmlPipeline) -> IndexHtmlMiddleware {
        let state = Arc::new(DevServerState::new(
            OutputReconciler::new(),
            CustomHeaders::default(),
        ));
        state.reconcile(&[RebuildFile::new(
            "index.html",
            "<html><body></body></html>",
            Some("i".into()),
        )]);
        IndexHtmlMiddleware::new(state, pipeline)
    }

    fn get(uri: &'static str) -> DevRequest {
        DevRequest::new(Method::GET, Uri::from_static(uri), HeaderMap::new())
    }

    #[test]
    fn test_inject_before_body() {
        let result = inject_client_script("<html><body><h1>Test</h1></body></html>");
        let script_pos = result.find(CLIENT_SCRIPT_PATH).unwrap();
        let body_pos = result.find("</body>").unwrap();
        assert!(script_pos < body_pos);
    }

    #[test]
    fn test_inject_without_body_appends() {
        let result = inject_client_script("<h1>Test</h1>");
        assert!(result.ends_with(r#"<script src="/__fob_client__.js"></script>"#));
    }

    #[test]
    fn test_inject_is_idempotent() {
        let once = inject_client_script("<body></body>");
        assert_eq!(inject_client_script(&once), once);
    }

    #[tokio::test]
    async fn test_serves_root_and_index() {
        let middleware = middleware(IndexHtmlPipeline::new(true));
        for uri in ["/", "/index.html"] {
            let mut request = get(uri);
            assert!(matches!(
                middleware.handle(&mut request).await.unwrap(),
                Flow::Handled(_)
            ));
        }

        let mut other = get("/about");
        assert!(matches!(
            middleware.handle(&mut other).await.unwrap(),
            Flow::Continue
        ));
    }

    #[tokio::test]
    async fn test_declining_transform_continues() {
        let middleware = middleware(IndexHtmlPipeline::new(false).with_transformer(Arc::new(Decline)));
        let mut request = get("/");
        assert!(matches!(
            middleware.handle(&mut request).await.unwrap(),
            Flow::Continue
        ));
    }

    #[tokio::test]
    async fn test_transform_error_is_forwarded() {
        let middleware = middleware(IndexHtmlPipeline::new(false).with_transformer(Arc::new(Broken)));
        let mut request = get("/");
        let err = middleware.handle(&mut request).await.unwrap_err();
        assert!(matches!(err, MiddlewareError::IndexTransform(_)));
    }
}
