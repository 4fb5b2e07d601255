//! Request handling through a session router.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use fob_serve::middleware::text_response;
use fob_serve::{
    AssetFile, BuildResult, DevRequest, DevSession, Flow, Middleware, MiddlewareError,
    OutputFileType, PageRenderer, RebuildFile, RenderError, ServeOptions,
};
use fob_serve::middleware::{RenderRequest, RenderedPage};
use std::sync::Arc;
use tower::ServiceExt;

fn options() -> ServeOptions {
    ServeOptions::new("127.0.0.1:4200".parse().unwrap())
}

fn outputs() -> BuildResult {
    BuildResult::success(vec![
        RebuildFile::new(
            "index.html",
            "<html><body><div id=\"app\"></div></body></html>",
            Some("i".into()),
        ),
        RebuildFile::new("main.js", "main()", Some("j".into())),
        RebuildFile::new("styles.css", "body{}", Some("c".into())),
        RebuildFile::new("main.js.map", "{}", None),
        RebuildFile::new("media/logo.png", vec![0x89, b'P', b'N', b'G'], Some("m".into()))
            .with_type(OutputFileType::Media),
        RebuildFile::new(
            "index.server.html",
            "<html><body><!--ssr--></body></html>",
            Some("s".into()),
        )
        .with_type(OutputFileType::ServerRoot),
        RebuildFile::new("server/main.mjs", "export default 1", Some("sm".into()))
            .with_type(OutputFileType::ServerApplication),
    ])
}

async fn get(session: &DevSession, uri: &str) -> Response {
    session
        .router()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Reconcile without starting a listener.
fn load(session: &DevSession, result: &BuildResult) {
    session.state().reconcile(&result.output_files);
    session.state().replace_assets(&result.asset_files);
}

#[tokio::test]
async fn serves_outputs_with_uniform_headers() {
    let session = DevSession::new(options().with_header("X-Dev-Server", "fob")).unwrap();
    load(&session, &outputs());

    let css = get(&session, "/styles.css").await;
    assert_eq!(css.status(), StatusCode::OK);
    assert_eq!(css.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(css.headers()["x-dev-server"], "fob");

    let script = get(&session, "/main.js").await;
    assert_eq!(script.status(), StatusCode::OK);
    assert_eq!(
        script.headers()[header::CONTENT_TYPE],
        "text/javascript; charset=utf-8"
    );
    assert_eq!(script.headers()["x-dev-server"], "fob");

    let media = get(&session, "/media/logo.png").await;
    assert_eq!(media.headers()[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn server_outputs_are_never_served() {
    let session = DevSession::new(options()).unwrap();
    load(&session, &outputs());

    assert_eq!(
        get(&session, "/server/main.mjs").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn index_gets_client_script_only_with_live_updates() {
    let session = DevSession::new(options()).unwrap();
    load(&session, &outputs());
    let html = body_text(get(&session, "/").await).await;
    assert!(html.contains("/__fob_client__.js"));

    let quiet = DevSession::new(options().with_live_reload(false).with_hmr(false)).unwrap();
    load(&quiet, &outputs());
    let html = body_text(get(&quiet, "/index.html").await).await;
    assert!(!html.contains("/__fob_client__.js"));
}

#[tokio::test]
async fn custom_index_output_is_served_at_index() {
    let session = DevSession::new(options().with_index_output("app.html")).unwrap();
    load(
        &session,
        &BuildResult::success(vec![RebuildFile::new(
            "app.html",
            "<html><body>custom</body></html>",
            Some("a".into()),
        )]),
    );

    let html = body_text(get(&session, "/").await).await;
    assert!(html.contains("custom"));
}

#[tokio::test]
async fn copied_assets_are_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("robots.txt");
    std::fs::write(&source, "User-agent: *").unwrap();

    let session = DevSession::new(options()).unwrap();
    load(
        &session,
        &outputs().with_assets(vec![AssetFile {
            source,
            destination: "robots.txt".to_string(),
        }]),
    );

    let response = get(&session, "/robots.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "User-agent: *");
}

struct Teapot;

#[async_trait]
impl Middleware for Teapot {
    fn name(&self) -> &'static str {
        "teapot"
    }

    async fn handle(&self, request: &mut DevRequest) -> Result<Flow, MiddlewareError> {
        if request.path.starts_with("/api/") {
            return Ok(Flow::Handled(text_response(
                StatusCode::IM_A_TEAPOT,
                "short and stout".to_string(),
            )));
        }
        Ok(Flow::Continue)
    }
}

#[tokio::test]
async fn extension_middleware_runs_after_resources() {
    let session = DevSession::builder(options())
        .extension(Arc::new(Teapot))
        .build()
        .unwrap();
    load(&session, &outputs());

    assert_eq!(
        get(&session, "/api/brew").await.status(),
        StatusCode::IM_A_TEAPOT
    );
    assert_eq!(get(&session, "/styles.css").await.status(), StatusCode::OK);
}

struct ShellRenderer;

#[async_trait]
impl PageRenderer for ShellRenderer {
    async fn render_page(&self, request: RenderRequest) -> Result<RenderedPage, RenderError> {
        if request.route.ends_with("/broken") {
            return Err(RenderError("render crashed".to_string()));
        }
        let chunk = request
            .loader
            .load_bundle("/server/main.mjs")
            .await
            .map_err(|e| RenderError(e.to_string()))?;
        Ok(RenderedPage {
            content: request.document.replace(
                "<!--ssr-->",
                &format!("{} {}", request.route, String::from_utf8_lossy(&chunk)),
            ),
        })
    }
}

#[tokio::test]
async fn ssr_renders_routes_and_falls_back_on_failure() {
    let session = DevSession::builder(options().with_ssr(true))
        .renderer(Arc::new(ShellRenderer))
        .build()
        .unwrap();
    load(&session, &outputs());

    let rendered = body_text(get(&session, "/products/7?ref=home").await).await;
    assert!(rendered.contains("http://127.0.0.1:4200/products/7?ref=home export default 1"));
    assert!(rendered.contains("/__fob_client__.js"));

    // Static-looking paths skip rendering.
    assert_eq!(body_text(get(&session, "/main.js").await).await, "main()");

    // A failed render falls through; nothing else handles the route.
    assert_eq!(
        get(&session, "/broken").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn ssr_without_flag_is_not_installed() {
    let session = DevSession::builder(options())
        .renderer(Arc::new(ShellRenderer))
        .build()
        .unwrap();
    load(&session, &outputs());

    assert_eq!(
        get(&session, "/products/7").await.status(),
        StatusCode::NOT_FOUND
    );
}
