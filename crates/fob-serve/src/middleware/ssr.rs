use super::{DevRequest, Flow, IndexHtmlPipeline, Middleware, asset_response};
use crate::error::{LoadError, MiddlewareError, RenderError};
use crate::output::OutputSnapshot;
use crate::state::SharedState;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;

/// Served path of the server-rendering shell document.
pub const SSR_SHELL_PATH: &str = "/index.server.html";

/// Loads server chunks for the renderer.
#[async_trait]
pub trait BundleLoader: Send + Sync {
    /// Load the module at `uri`.
    async fn load_bundle(&self, uri: &str) -> Result<Bytes, LoadError>;
}

/// Input to a page render.
#[derive(Clone)]
pub struct RenderRequest {
    /// Shell document
    pub document: String,
    /// Absolute URL of the page being rendered
    pub route: String,
    /// Server chunk loader
    pub loader: Arc<dyn BundleLoader>,
    /// Current outputs
    pub outputs: OutputSnapshot,
    /// Inline critical stylesheet rules into the page
    pub inline_critical_css: bool,
}

/// Rendered page markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Full HTML document
    pub content: String,
}

/// Server-side render collaborator.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render one page.
    async fn render_page(&self, request: RenderRequest) -> Result<RenderedPage, RenderError>;
}

/// Whether the path looks like a static file: a 2-4 letter extension, or
/// `.html`.
pub fn looks_like_static_file(path: &str) -> bool {
    if path.ends_with(".html") {
        return true;
    }
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| (2..=4).contains(&ext.len()) && ext.bytes().all(|b| b.is_ascii_alphabetic()))
}

/// Renders non-static routes on the server.
///
/// Render failures fall through to the next middleware; index-transform
/// failures are forwarded as errors.
pub struct SsrMiddleware {
    state: SharedState,
    renderer: Arc<dyn PageRenderer>,
    loader: Arc<dyn BundleLoader>,
    pipeline: IndexHtmlPipeline,
    base_url: String,
    inline_critical_css: bool,
}

impl SsrMiddleware {
    /// Create the handler. `base_url` is the server origin, e.g.
    /// `http://localhost:4200`.
    pub fn new(
        state: SharedState,
        renderer: Arc<dyn PageRenderer>,
        loader: Arc<dyn BundleLoader>,
        pipeline: IndexHtmlPipeline,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            state,
            renderer,
            loader,
            pipeline,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            inline_critical_css: false,
        }
    }

    pub fn with_inline_critical_css(mut self, inline: bool) -> Self {
        self.inline_critical_css = inline;
        self
    }

    fn route(&self, request: &DevRequest) -> String {
        let path_and_query = request
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(request.uri.path());
        format!("{}{}", self.base_url, path_and_query)
    }
}

#[async_trait]
impl Middleware for SsrMiddleware {
    fn name(&self) -> &'static str {
        "ssr"
    }

    async fn handle(&self, request: &mut DevRequest) -> Result<Flow, MiddlewareError> {
        if !request.is_read()
            || request.disk_source.is_some()
            || looks_like_static_file(&request.path)
        {
            return Ok(Flow::Continue);
        }

        let outputs = self.state.snapshot();
        let Some(shell) = outputs.get(SSR_SHELL_PATH) else {
            tracing::debug!("no server shell document; skipping render");
            return Ok(Flow::Continue);
        };

        let render = RenderRequest {
            document: String::from_utf8_lossy(&shell.contents).into_owned(),
            route: self.route(request),
            loader: Arc::clone(&self.loader),
            outputs: outputs.clone(),
            inline_critical_css: self.inline_critical_css,
        };

        let page = match self.renderer.render_page(render).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(path = %request.path, "Server-side rendering failed: {}", e);
                return Ok(Flow::Continue);
            }
        };

        match self.pipeline.apply(page.content).await? {
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
    use crate::build_result::{OutputFileType, RebuildFile};
    use crate::error::IndexTransformError;
    use crate::middleware::{CustomHeaders, IndexTransformer};
    use crate::output::OutputReconciler;
    use crate::state::DevServerState;
    use axum::http::{HeaderMap, Method, Uri};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct EchoRenderer {
        routes: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl PageRenderer for EchoRenderer {
        async fn render_page(&self, request: RenderRequest) -> Result<RenderedPage, RenderError> {
            self.routes.lock().push(request.route.clone());
            if self.fail {
                return Err(RenderError("window is not defined".to_string()));
            }
            let chunk = request.loader.load_bundle("/server/main.mjs").await;
            Ok(RenderedPage {
                content: request
                    .document
                    .replace("<!--app-->", &format!("rendered:{}", chunk.is_ok())),
            })
        }
    }

    struct SnapshotLoader(SharedState);

    #[async_trait]
    impl BundleLoader for SnapshotLoader {
        async fn load_bundle(&self, uri: &str) -> Result<Bytes, LoadError> {
            self.0
                .snapshot()
                .get(uri)
                .map(|record| record.contents.clone())
                .ok_or_else(|| LoadError::NotFound(uri.to_string()))
        }
    }

    struct Broken;

    #[async_trait]
    impl IndexTransformer for Broken {
        async fn transform(&self, _html: String) -> Result<Option<String>, IndexTransformError> {
            Err(IndexTransformError("bad html".to_string()))
        }
    }

    fn setup(renderer: Arc<EchoRenderer>, pipeline: IndexHtmlPipeline) -> SsrMiddleware {
        let state = Arc::new(DevServerState::new(
            OutputReconciler::new(),
            CustomHeaders::default(),
        ));
        state.reconcile(&[
            RebuildFile::new(
                "index.server.html",
                "<html><body><!--app--></body></html>",
                Some("s".into()),
            )
            .with_type(OutputFileType::ServerRoot),
            RebuildFile::new("server/main.mjs", "export {}", Some("m".into()))
                .with_type(OutputFileType::ServerApplication),
        ]);
        let loader = Arc::new(SnapshotLoader(state.clone()));
        SsrMiddleware::new(state, renderer, loader, pipeline, "http://localhost:4200/")
    }

    fn get(uri: &'static str) -> DevRequest {
        DevRequest::new(Method::GET, Uri::from_static(uri), HeaderMap::new())
    }

    #[test]
    fn test_static_file_detection() {
        assert!(looks_like_static_file("/main.js"));
        assert!(looks_like_static_file("/styles.css"));
        assert!(looks_like_static_file("/docs/page.html"));
        assert!(!looks_like_static_file("/products/42"));
        assert!(!looks_like_static_file("/"));
        assert!(!looks_like_static_file("/archive.v2"));
        assert!(!looks_like_static_file("/data.json5"));
    }

    #[tokio::test]
    async fn test_renders_route_with_absolute_url() {
        let renderer = Arc::new(EchoRenderer::default());
        let middleware = setup(renderer.clone(), IndexHtmlPipeline::new(false));

        let mut request = get("/products/42?tab=reviews");
        let Flow::Handled(response) = middleware.handle(&mut request).await.unwrap() else {
            panic!("route should be rendered");
        };

        assert_eq!(
            *renderer.routes.lock(),
            vec!["http://localhost:4200/products/42?tab=reviews"]
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("rendered:true"));
    }

    #[tokio::test]
    async fn test_static_paths_are_not_rendered() {
        let renderer = Arc::new(EchoRenderer::default());
        let middleware = setup(renderer.clone(), IndexHtmlPipeline::new(false));

        let mut request = get("/main.js");
        assert!(matches!(
            middleware.handle(&mut request).await.unwrap(),
            Flow::Continue
        ));
        assert!(renderer.routes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rewritten_disk_assets_are_not_rendered() {
        let renderer = Arc::new(EchoRenderer::default());
        let middleware = setup(renderer.clone(), IndexHtmlPipeline::new(false));

        let mut request = get("/LICENSE");
        request.disk_source = Some(std::path::PathBuf::from("/project/LICENSE"));
        assert!(matches!(
            middleware.handle(&mut request).await.unwrap(),
            Flow::Continue
        ));
        assert!(renderer.routes.lock().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_falls_through() {
        let renderer = Arc::new(EchoRenderer {
            fail: true,
            ..EchoRenderer::default()
        });
        let middleware = setup(renderer, IndexHtmlPipeline::new(false));

        let mut request = get("/about");
        assert!(matches!(
            middleware.handle(&mut request).await.unwrap(),
            Flow::Continue
        ));
    }

    #[tokio::test]
    async fn test_pipeline_failure_is_an_error() {
        let renderer = Arc::new(EchoRenderer::default());
        let middleware = setup(
            renderer,
            IndexHtmlPipeline::new(false).with_transformer(Arc::new(Broken)),
        );

        let mut request = get("/about");
        assert!(middleware.handle(&mut request).await.is_err());
    }
}
