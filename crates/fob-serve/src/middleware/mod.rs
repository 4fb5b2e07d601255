//! Ordered request-handling chain for the dev server.
//!
//! Every request runs through a fixed sequence of [`Middleware`]s. Each one
//! either answers with [`Flow::Handled`] or passes with [`Flow::Continue`];
//! the driver in [`MiddlewareChain::run`] answers `404` when all of them pass
//! and `500` when one fails.
//!
//! The standard order is:
//!
//! 1. [`AssetRewriteMiddleware`] - points copied assets at their disk source
//! 2. [`InMemoryResourceMiddleware`] - serves buffered non-script outputs
//! 3. caller-supplied extension middlewares
//! 4. [`SsrMiddleware`] - renders non-static routes (when enabled)
//! 5. [`IndexHtmlMiddleware`] - serves the index document
//! 6. [`FileFallbackMiddleware`] - disk assets and remaining servable outputs

mod assets;
mod fallback;
mod index;
mod resources;
mod ssr;

pub use assets::AssetRewriteMiddleware;
pub use fallback::FileFallbackMiddleware;
pub use index::{
    CLIENT_SCRIPT_PATH, IndexHtmlMiddleware, IndexHtmlPipeline, IndexTransformer,
    inject_client_script,
};
pub use resources::InMemoryResourceMiddleware;
pub use ssr::{
    BundleLoader, PageRenderer, RenderRequest, RenderedPage, SSR_SHELL_PATH, SsrMiddleware,
    looks_like_static_file,
};

use crate::error::{Error, MiddlewareError, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::Response;
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Request as seen by the middleware chain.
#[derive(Debug, Clone)]
pub struct DevRequest {
    /// HTTP method
    pub method: Method,
    /// Original request URI
    pub uri: Uri,
    /// Percent-decoded request path
    pub path: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Disk file to serve instead of in-memory output, set by asset rewriting
    pub disk_source: Option<PathBuf>,
}

impl DevRequest {
    /// Create a request.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let path = percent_decode_str(uri.path())
            .decode_utf8_lossy()
            .into_owned();
        Self {
            method,
            uri,
            path,
            headers,
            disk_source: None,
        }
    }

    /// Whether the method may read a resource.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }
}

/// Outcome of one middleware.
#[derive(Debug)]
pub enum Flow {
    /// A response was produced; the chain stops
    Handled(Response),
    /// Pass the request to the next middleware
    Continue,
}

/// One request handler in the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Handle or pass the request.
    ///
    /// Handlers may modify the request before continuing.
    async fn handle(&self, request: &mut DevRequest) -> Result<Flow, MiddlewareError>;
}

/// Ordered list of middlewares plus the driver loop.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware.
    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Append several middlewares in order.
    pub fn extend(mut self, middlewares: impl IntoIterator<Item = Arc<dyn Middleware>>) -> Self {
        self.middlewares.extend(middlewares);
        self
    }

    /// Names of the installed middlewares, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    /// Run the request through the chain.
    pub async fn run(&self, mut request: DevRequest) -> Response {
        for middleware in &self.middlewares {
            match middleware.handle(&mut request).await {
                Ok(Flow::Handled(response)) => {
                    tracing::debug!(
                        middleware = middleware.name(),
                        path = %request.path,
                        status = %response.status(),
                        "request handled"
                    );
                    return response;
                }
                Ok(Flow::Continue) => {}
                Err(e) => {
                    tracing::error!(
                        middleware = middleware.name(),
                        path = %request.path,
                        "{}",
                        e
                    );
                    return text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
                }
            }
        }

        text_response(
            StatusCode::NOT_FOUND,
            format!("File not found: {}", request.path),
        )
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middlewares", &self.names())
            .finish()
    }
}

/// Caller-supplied headers added to every served response.
#[derive(Debug, Clone, Default)]
pub struct CustomHeaders {
    headers: HeaderMap,
}

impl CustomHeaders {
    /// Validate configured headers.
    pub fn parse(headers: &BTreeMap<String, String>) -> Result<Self> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| Error::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            map.insert(header_name, header_value);
        }
        Ok(Self { headers: map })
    }

    /// Merge into a response's headers, overriding existing values.
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.insert(name.clone(), value.clone());
        }
    }

    /// Number of configured headers.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Check if no headers are configured.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// `200` response with the uniform dev-server headers.
pub fn asset_response(
    body: impl Into<Body>,
    content_type: &'static str,
    custom: &CustomHeaders,
) -> Response {
    let mut response = Response::new(body.into());
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    custom.apply(headers);
    response
}

/// Plain-text response with the given status.
pub fn text_response(status: StatusCode, body: String) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
