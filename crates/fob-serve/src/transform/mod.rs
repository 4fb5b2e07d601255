//! Request-coalescing transform cache over a bounded thread pool.
//!
//! [`TransformWorkerPool`] is an owned resource: it opens its threads lazily
//! on the first dispatch and releases them in [`TransformWorkerPool::close`].
//! Concurrent `transform_file` calls for the same [`TransformKey`] share a
//! single pending result, and successful results stay cached until `close`.

mod worker;

pub use worker::{
    JavaScriptTransformer, TransformJob, Transformer, apply_source_map_policy, is_third_party,
};

use crate::error::TransformError;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Per-request transformation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TransformFlags {
    /// The source is already linked; no linker pass is needed
    pub skip_linker: bool,
    /// The module may have side effects
    pub side_effects: bool,
    /// Instrument the output for coverage collection
    pub instrument_for_coverage: bool,
}

/// Pool-wide transformation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Keep source-map comments
    pub sourcemap: bool,
    /// Keep source-map comments for `node_modules` sources too
    pub third_party_sourcemaps: bool,
    /// Run optimization passes
    pub advanced_optimizations: bool,
}

/// Thread pool sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Upper bound on concurrently running transforms
    pub max_threads: usize,
    /// Idle threads are released after this long
    pub idle_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self {
            max_threads: cpus.saturating_sub(1).max(1),
            idle_timeout: Duration::from_secs(1),
        }
    }
}

/// Cache key for pending and completed file transforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransformKey {
    /// Whether the linker pass is skipped
    pub skip_linker: bool,
    /// Source file
    pub path: PathBuf,
}

type PendingTransform = Shared<BoxFuture<'static, Result<Bytes, TransformError>>>;

/// Owned worker pool with at-most-one in-flight transform per key.
pub struct TransformWorkerPool {
    transformer: Arc<dyn Transformer>,
    options: TransformOptions,
    pool_options: PoolOptions,
    runtime: Mutex<Option<Runtime>>,
    pending: Mutex<FxHashMap<TransformKey, PendingTransform>>,
    dispatched: AtomicUsize,
}

impl TransformWorkerPool {
    /// Create a pool using the built-in [`JavaScriptTransformer`].
    pub fn new(options: TransformOptions, pool_options: PoolOptions) -> Self {
        Self::with_transformer(Arc::new(JavaScriptTransformer), options, pool_options)
    }

    /// Create a pool around a custom transformer.
    pub fn with_transformer(
        transformer: Arc<dyn Transformer>,
        options: TransformOptions,
        pool_options: PoolOptions,
    ) -> Self {
        Self {
            transformer,
            options,
            pool_options,
            runtime: Mutex::new(None),
            pending: Mutex::new(FxHashMap::default()),
            dispatched: AtomicUsize::new(0),
        }
    }

    /// Pool-wide options.
    pub fn options(&self) -> TransformOptions {
        self.options
    }

    /// Whether pool threads are currently allocated.
    pub fn is_open(&self) -> bool {
        self.runtime.lock().is_some()
    }

    /// Number of work units handed to the pool so far.
    pub fn dispatch_count(&self) -> usize {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Number of pending or cached file transforms.
    pub fn cached_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Transform a file from disk.
    ///
    /// Callers racing on the same `(skip_linker, path)` share one dispatch.
    /// A failed transform is evicted so the next call dispatches again.
    pub async fn transform_file(
        &self,
        path: impl Into<PathBuf>,
        flags: TransformFlags,
    ) -> Result<Bytes, TransformError> {
        let path = path.into();
        let key = TransformKey {
            skip_linker: flags.skip_linker,
            path: path.clone(),
        };

        let pending = {
            let mut pending = self.pending.lock();
            match pending.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let shared = self.dispatch(self.job(path, None, flags))?.shared();
                    pending.insert(key.clone(), shared.clone());
                    shared
                }
            }
        };

        let result = pending.clone().await;
        if let Err(e) = &result {
            tracing::debug!(path = %key.path.display(), "evicting failed transform: {}", e);
            let mut cache = self.pending.lock();
            if cache.get(&key).is_some_and(|entry| entry.ptr_eq(&pending)) {
                cache.remove(&key);
            }
        }
        result
    }

    /// Transform in-memory source.
    ///
    /// When no linking, optimization or instrumentation is needed this only
    /// applies the source-map comment policy and never touches the pool.
    pub async fn transform_data(
        &self,
        path: impl Into<PathBuf>,
        data: impl Into<Bytes>,
        flags: TransformFlags,
    ) -> Result<Bytes, TransformError> {
        let path = path.into();
        let data = data.into();

        if flags.skip_linker && !self.options.advanced_optimizations && !flags.instrument_for_coverage
        {
            return Ok(apply_source_map_policy(&path, data, self.options));
        }

        self.dispatch(self.job(path, Some(data), flags))?.await
    }

    /// Clear the cache and release pool threads.
    ///
    /// Safe to call more than once; the pool reopens on the next dispatch.
    pub async fn close(&self) {
        self.pending.lock().clear();

        let runtime = self.runtime.lock().take();
        let Some(runtime) = runtime else {
            return;
        };

        let timeout = self.pool_options.idle_timeout;
        match tokio::task::spawn_blocking(move || runtime.shutdown_timeout(timeout)).await {
            Ok(()) => tracing::debug!("transform pool closed"),
            Err(e) => tracing::warn!("transform pool did not shut down cleanly: {}", e),
        }
    }

    fn job(&self, path: PathBuf, data: Option<Bytes>, flags: TransformFlags) -> TransformJob {
        TransformJob {
            path,
            data,
            flags,
            options: self.options,
        }
    }

    fn dispatch(
        &self,
        job: TransformJob,
    ) -> Result<BoxFuture<'static, Result<Bytes, TransformError>>, TransformError> {
        let mut runtime = self.runtime.lock();
        if runtime.is_none() {
            *runtime = Some(self.open_runtime()?);
        }
        let Some(rt) = runtime.as_ref() else {
            return Err(TransformError::PoolUnavailable(
                "pool closed during dispatch".to_string(),
            ));
        };

        let transformer = Arc::clone(&self.transformer);
        let path = job.path.clone();
        let handle = rt.spawn_blocking(move || transformer.transform(&job));
        self.dispatched.fetch_add(1, Ordering::Relaxed);

        Ok(async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(TransformError::WorkerLost {
                    path,
                    message: e.to_string(),
                }),
            }
        }
        .boxed())
    }

    fn open_runtime(&self) -> Result<Runtime, TransformError> {
        let max_threads = self.pool_options.max_threads.max(1);
        tracing::debug!(max_threads, "opening transform pool");

        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(max_threads)
            .thread_keep_alive(self.pool_options.idle_timeout)
            .thread_name("fob-transform")
            .build()
            .map_err(|e| TransformError::PoolUnavailable(e.to_string()))
    }
}

impl Drop for TransformWorkerPool {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for TransformWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformWorkerPool")
            .field("options", &self.options)
            .field("pool_options", &self.pool_options)
            .field("open", &self.is_open())
            .field("dispatched", &self.dispatch_count())
            .finish()
    }
}
