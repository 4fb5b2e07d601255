//! Serves locale-data modules at `/__fob_locale__/<tag>.js`.
//!
//! Tags are resolved with progressive fallback; a tag with no data at all
//! gets an empty module so the page still loads.

use async_trait::async_trait;
use fob_serve::locale::EMPTY_LOCALE_MODULE;
use fob_serve::middleware::{CustomHeaders, asset_response};
use fob_serve::{DevRequest, Flow, LocaleResolver, Middleware, MiddlewareError};

/// Route prefix for locale-data requests.
pub const LOCALE_DATA_ROUTE: &str = "/__fob_locale__/";

const JS_CONTENT_TYPE: &str = "text/javascript; charset=utf-8";

/// Extension middleware answering locale-data requests.
pub struct LocaleDataMiddleware {
    resolver: LocaleResolver,
    headers: CustomHeaders,
}

impl LocaleDataMiddleware {
    pub fn new(resolver: LocaleResolver, headers: CustomHeaders) -> Self {
        Self { resolver, headers }
    }

    fn requested_tag(path: &str) -> Option<&str> {
        let tag = path.strip_prefix(LOCALE_DATA_ROUTE)?.strip_suffix(".js")?;
        (!tag.is_empty() && !tag.contains('/')).then_some(tag)
    }
}

#[async_trait]
impl Middleware for LocaleDataMiddleware {
    fn name(&self) -> &'static str {
        "locale-data"
    }

    async fn handle(&self, request: &mut DevRequest) -> Result<Flow, MiddlewareError> {
        if !request.is_read() {
            return Ok(Flow::Continue);
        }
        let Some(tag) = Self::requested_tag(&request.path) else {
            return Ok(Flow::Continue);
        };

        let result = self.resolver.resolve(tag).await;
        let body = match result.resolved_module_path {
            Some(path) => tokio::fs::read(&path)
                .await
                .map_err(|source| MiddlewareError::AssetRead { path, source })?,
            None => EMPTY_LOCALE_MODULE.as_bytes().to_vec(),
        };

        Ok(Flow::Handled(asset_response(body, JS_CONTENT_TYPE, &self.headers)))
    }
}
