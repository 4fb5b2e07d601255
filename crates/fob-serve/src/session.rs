//! Rebuild session driver.
//!
//! A [`DevSession`] takes [`BuildResult`]s one at a time, reconciles them into
//! the shared state, optionally mirrors them to disk, and decides what to tell
//! connected browsers. The first successful result starts the HTTP server.

use crate::build_result::{AssetFile, BuildResult};
use crate::error::{Error, Result};
use crate::live_update::{ChannelState, LiveUpdateMessage, UpdateBroadcaster};
use crate::loader::OutputModuleLoader;
use crate::middleware::{
    AssetRewriteMiddleware, CustomHeaders, FileFallbackMiddleware, InMemoryResourceMiddleware,
    IndexHtmlMiddleware, IndexHtmlPipeline, IndexTransformer, Middleware, MiddlewareChain,
    PageRenderer, SsrMiddleware,
};
use crate::options::ServeOptions;
use crate::output::{OutputReconciler, ReconcileReport};
use crate::server::{self, ServerHandle};
use crate::state::{DevServerState, SharedState};
use crate::transform::{Transformer, TransformWorkerPool};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// What applying one rebuild did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Reconciliation result; `None` for failed builds
    pub report: Option<ReconcileReport>,
    /// Live-update messages sent to clients
    pub messages: Vec<LiveUpdateMessage>,
}

/// Builder for [`DevSession`].
pub struct DevSessionBuilder {
    options: ServeOptions,
    transformer: Option<Arc<dyn Transformer>>,
    renderer: Option<Arc<dyn PageRenderer>>,
    index_transformer: Option<Arc<dyn IndexTransformer>>,
    extensions: Vec<Arc<dyn Middleware>>,
}

impl DevSessionBuilder {
    /// Replace the built-in transformer used by the worker pool.
    pub fn transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Install a server-side renderer. Only used when `ssr` is enabled.
    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Rewrite served HTML documents.
    pub fn index_transformer(mut self, transformer: Arc<dyn IndexTransformer>) -> Self {
        self.index_transformer = Some(transformer);
        self
    }

    /// Add an extension middleware, run after in-memory resources.
    pub fn extension(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.extensions.push(middleware);
        self
    }

    /// Validate headers and assemble the session.
    pub fn build(self) -> Result<DevSession> {
        let headers = CustomHeaders::parse(&self.options.headers)?;

        let mut reconciler = OutputReconciler::new();
        if let Some(index) = &self.options.index_output {
            reconciler = reconciler.with_index_output(index);
        }

        let pool = match self.transformer {
            Some(transformer) => TransformWorkerPool::with_transformer(
                transformer,
                self.options.transform,
                self.options.pool,
            ),
            None => TransformWorkerPool::new(self.options.transform, self.options.pool),
        };

        if self.options.ssr && self.renderer.is_none() {
            tracing::warn!("Server-side rendering is enabled but no renderer is installed");
        }

        Ok(DevSession {
            broadcaster: UpdateBroadcaster::new(self.options.live_update()),
            state: Arc::new(DevServerState::new(reconciler, headers)),
            pool: Arc::new(pool),
            renderer: self.renderer,
            index_transformer: self.index_transformer,
            extensions: self.extensions,
            server: None,
            rebuilds: 0,
            options: self.options,
        })
    }
}

/// Owns the shared state, worker pool, broadcaster and server for one
/// dev-serve run.
pub struct DevSession {
    options: ServeOptions,
    state: SharedState,
    pool: Arc<TransformWorkerPool>,
    broadcaster: UpdateBroadcaster,
    renderer: Option<Arc<dyn PageRenderer>>,
    index_transformer: Option<Arc<dyn IndexTransformer>>,
    extensions: Vec<Arc<dyn Middleware>>,
    server: Option<ServerHandle>,
    rebuilds: u64,
}

impl DevSession {
    /// Start configuring a session.
    pub fn builder(options: ServeOptions) -> DevSessionBuilder {
        DevSessionBuilder {
            options,
            transformer: None,
            renderer: None,
            index_transformer: None,
            extensions: Vec::new(),
        }
    }

    /// Session with default collaborators.
    pub fn new(options: ServeOptions) -> Result<Self> {
        Self::builder(options).build()
    }

    /// Shared state.
    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Transform worker pool.
    pub fn pool(&self) -> &Arc<TransformWorkerPool> {
        &self.pool
    }

    /// Session options.
    pub fn options(&self) -> &ServeOptions {
        &self.options
    }

    /// Whether live updates reach clients yet.
    pub fn channel_state(&self) -> ChannelState {
        self.broadcaster.state()
    }

    /// Address the server is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(ServerHandle::addr)
    }

    /// Number of results applied so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Router for this session without binding a listener.
    pub fn router(&self) -> Router {
        let base_url = ServeOptions::server_url(self.options.addr);
        server::router(self.state.clone(), self.build_chain(&base_url))
    }

    /// Apply one rebuild result.
    ///
    /// The first successful result binds the listener; a bind failure is
    /// returned and should end the session.
    pub async fn apply(&mut self, result: BuildResult) -> Result<RebuildOutcome> {
        self.rebuilds += 1;
        let started = Instant::now();

        for warning in &result.warnings {
            tracing::warn!("{}", warning);
        }

        if !result.success {
            for error in &result.errors {
                tracing::error!("{}", error);
            }
            let first = result
                .errors
                .first()
                .map(ToString::to_string)
                .unwrap_or_else(|| "Build failed".to_string());
            self.state.fail_build(first);

            let messages = self
                .broadcaster
                .on_failure(&result.errors)
                .await
                .into_iter()
                .collect();
            return Ok(RebuildOutcome {
                report: None,
                messages,
            });
        }

        let report = self.state.reconcile(&result.output_files);
        self.state.replace_assets(&result.asset_files);
        if let Some(metadata) = &result.external_metadata {
            self.state.refill_external_metadata(metadata);
        }

        if let Some(dir) = self.options.write_dir.clone() {
            if let Err(e) = self.mirror(&dir, &report, &result.asset_files).await {
                tracing::error!("Failed to write outputs to {}: {}", dir.display(), e);
            }
        }

        self.state.complete_build(self.rebuilds, report.updated.len());
        tracing::info!(
            rebuild = self.rebuilds,
            updated = report.updated.len(),
            removed = report.removed.len(),
            "Rebuild applied in {}ms",
            started.elapsed().as_millis()
        );

        let messages = if self.server.is_none() {
            self.start_server().await?;
            Vec::new()
        } else {
            self.broadcaster.on_rebuild(&report.updated).await
        };

        Ok(RebuildOutcome {
            report: Some(report),
            messages,
        })
    }

    /// Apply results strictly in order until `shutdown` resolves.
    ///
    /// A closed channel keeps the server running until shutdown. Non-fatal
    /// errors are logged; a bind failure ends the session with an error.
    pub async fn run(
        &mut self,
        mut results: mpsc::Receiver<BuildResult>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                next = results.recv() => match next {
                    Some(result) => {
                        if let Err(e) = self.apply(result).await {
                            if matches!(e, Error::Bind { .. }) {
                                self.shutdown().await?;
                                return Err(e);
                            }
                            tracing::error!("{}", e);
                        }
                    }
                    None => {
                        tracing::debug!("build result channel closed");
                        (&mut shutdown).await;
                        break;
                    }
                },
            }
        }

        self.shutdown().await
    }

    /// Stop the server and close the transform pool.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.pool.close().await;
        self.state.disconnect_all();
        match self.server.take() {
            Some(server) => server.stop().await,
            None => Ok(()),
        }
    }

    async fn start_server(&mut self) -> Result<()> {
        let listener = server::bind(self.options.addr).await?;
        let addr = listener.local_addr()?;
        let base_url = ServeOptions::server_url(addr);

        let router = server::router(self.state.clone(), self.build_chain(&base_url));
        self.server = Some(ServerHandle::spawn(listener, router)?);
        self.broadcaster.connect(self.state.clone());

        tracing::info!("Development server running at {}", base_url);
        Ok(())
    }

    fn build_chain(&self, base_url: &str) -> MiddlewareChain {
        let mut pipeline = IndexHtmlPipeline::new(self.options.injects_client());
        if let Some(transformer) = &self.index_transformer {
            pipeline = pipeline.with_transformer(Arc::clone(transformer));
        }

        let mut chain = MiddlewareChain::new()
            .with(Arc::new(AssetRewriteMiddleware::new(self.state.clone())))
            .with(Arc::new(InMemoryResourceMiddleware::new(self.state.clone())))
            .extend(self.extensions.iter().cloned());

        if let (true, Some(renderer)) = (self.options.ssr, &self.renderer) {
            let loader = Arc::new(OutputModuleLoader::new(
                self.state.clone(),
                Arc::clone(&self.pool),
                self.options.workspace_root.clone(),
            ));
            let ssr = SsrMiddleware::new(
                self.state.clone(),
                Arc::clone(renderer),
                loader,
                pipeline.clone(),
                base_url,
            )
            .with_inline_critical_css(self.options.inline_critical_css);
            chain = chain.with(Arc::new(ssr));
        }

        chain
            .with(Arc::new(IndexHtmlMiddleware::new(
                self.state.clone(),
                pipeline,
            )))
            .with(Arc::new(FileFallbackMiddleware::new(self.state.clone())))
    }

    async fn mirror(&self, dir: &Path, report: &ReconcileReport, assets: &[AssetFile]) -> Result<()> {
        let snapshot = self.state.snapshot();
        for path in report.updated.iter().chain(&report.source_maps) {
            let Some(record) = snapshot.get(path) else {
                continue;
            };
            let target = dir.join(path.trim_start_matches('/'));
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &record.contents).await?;
        }

        for path in &report.removed {
            let target = dir.join(path.trim_start_matches('/'));
            match tokio::fs::remove_file(&target).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        for asset in assets {
            let target = dir.join(asset.destination.trim_start_matches('/'));
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(&asset.source, &target).await?;
        }

        tracing::debug!(dir = %dir.display(), "outputs written to disk");
        Ok(())
    }
}
