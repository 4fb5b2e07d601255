//! Error types for the dev-server engine.
//!
//! Each component owns a focused error enum; [`Error`] is the top-level type
//! returned by session and server operations and converts from the others.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for dev-server operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP listener could not be bound. Fatal at startup.
    #[error("Failed to bind dev server to {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: SocketAddr,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("Server error: {0}")]
    Server(String),

    /// A configured response header is not valid HTTP.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader {
        /// Header name as configured
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Source transformation failed.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// I/O errors from disk mirroring or asset copies.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for dev-server operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the transform worker pool.
///
/// `Clone` because a single pending transform is shared by every caller that
/// requested the same key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransformError {
    /// The source file could not be read by the worker.
    #[error("Failed to read {}: {message}", .path.display())]
    Read {
        /// File that was requested
        path: PathBuf,
        /// I/O error text
        message: String,
    },

    /// The transformer rejected the input.
    #[error("Transform failed for {}: {message}", .path.display())]
    Failed {
        /// File being transformed
        path: PathBuf,
        /// Transformer error text
        message: String,
    },

    /// The worker thread panicked or was cancelled before finishing.
    #[error("Transform worker for {} did not complete: {message}", .path.display())]
    WorkerLost {
        /// File being transformed
        path: PathBuf,
        /// Join error text
        message: String,
    },

    /// The worker pool could not be started.
    #[error("Transform worker pool unavailable: {0}")]
    PoolUnavailable(String),
}

/// Errors raised by request handlers. Forwarded to the chain's error response.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// The index-transform pipeline failed.
    #[error("Index transform failed: {0}")]
    IndexTransform(#[from] IndexTransformError),

    /// Reading a rewritten asset from disk failed.
    #[error("Failed to read asset {}: {source}", .path.display())]
    AssetRead {
        /// Source path on disk
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Extension middleware failure.
    #[error("{0}")]
    Custom(String),
}

/// Error returned by an index HTML transformer.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct IndexTransformError(pub String);

/// Error returned by the server-side render collaborator.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// Errors from the module-loading collaborator used by SSR.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// No output record or workspace file matches the URI.
    #[error("Bundle not found: {0}")]
    NotFound(String),

    /// The file exists but its transformation failed.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Error delivering a live-update message.
#[derive(Debug, Clone, Error)]
#[error("Live update delivery failed: {0}")]
pub struct SinkError(pub String);
