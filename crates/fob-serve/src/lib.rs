//! # fob-serve
//!
//! Development-time build-and-serve engine.
//!
//! An external bundler produces one [`BuildResult`] per incremental build.
//! A [`DevSession`] applies those results strictly in order:
//!
//! - [`OutputReconciler`] diffs the rebuild's files against the previous
//!   build by `(size, hash)` and evicts stale paths
//! - [`UpdateBroadcaster`] decides between a stylesheet patch, a full reload,
//!   an error overlay, or nothing
//! - the [`MiddlewareChain`] serves the current outputs over HTTP, with
//!   optional server-side rendering
//!
//! Alongside these, [`TransformWorkerPool`] runs CPU-bound source transforms
//! on a bounded thread pool with one in-flight transform per key, and
//! [`LocaleResolver`] maps locale tags to locale-data modules with
//! progressive fallback.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fob_serve::{BuildResult, DevSession, RebuildFile, ServeOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> fob_serve::Result<()> {
//! let options = ServeOptions::new("127.0.0.1:4200".parse().unwrap());
//! let mut session = DevSession::new(options)?;
//!
//! let (tx, rx) = tokio::sync::mpsc::channel(16);
//! tx.send(BuildResult::success(vec![RebuildFile::new(
//!     "main.js",
//!     "console.log('hello')",
//!     Some("a1".to_string()),
//! )]))
//! .await
//! .ok();
//!
//! session.run(rx, std::future::pending::<()>()).await?;
//! # Ok(()) }
//! ```

pub mod build_result;
pub mod error;
pub mod live_update;
pub mod loader;
pub mod locale;
pub mod middleware;
pub mod mime;
pub mod options;
pub mod output;
pub mod server;
pub mod session;
pub mod state;
pub mod transform;

pub use build_result::{
    AssetFile, BuildMessage, BuildResult, ExternalMetadataUpdate, MessageLocation, OutputFileType,
    RebuildFile,
};
pub use error::{
    Error, IndexTransformError, LoadError, MiddlewareError, RenderError, Result, SinkError,
    TransformError,
};
pub use live_update::{
    ChannelState, LiveUpdateMessage, LiveUpdateOptions, LiveUpdateSink, UpdateBroadcaster,
};
pub use loader::OutputModuleLoader;
pub use locale::{
    DirectoryModuleResolver, LocaleMatch, LocaleResolver, ModuleResolver, ResolvedModule,
};
pub use middleware::{
    BundleLoader, DevRequest, Flow, IndexTransformer, Middleware, MiddlewareChain, PageRenderer,
};
pub use options::ServeOptions;
pub use output::{
    AssetMap, ExternalMetadata, OutputReconciler, OutputRecord, OutputSnapshot, ReconcileReport,
};
pub use session::{DevSession, DevSessionBuilder, RebuildOutcome};
pub use state::{BuildStatus, DevServerState, SharedState};
pub use transform::{
    JavaScriptTransformer, PoolOptions, TransformFlags, TransformOptions, TransformWorkerPool,
    Transformer,
};
