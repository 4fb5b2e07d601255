//! Shared state for the development server.
//!
//! Holds the output reconciler, the asset map, external metadata, the SSE
//! client registry and the last build status. Request handlers only ever see
//! read-only snapshots of the outputs.

use crate::build_result::{AssetFile, ExternalMetadataUpdate, RebuildFile};
use crate::error::SinkError;
use crate::live_update::{LiveUpdateMessage, LiveUpdateSink};
use crate::middleware::CustomHeaders;
use crate::output::{
    AssetMap, ExternalMetadata, OutputReconciler, OutputSnapshot, ReconcileReport,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Build status tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// No rebuild has been applied yet
    NotStarted,
    /// The last rebuild succeeded
    Success {
        /// Rebuild sequence number, starting at 1
        rebuild: u64,
        /// Number of changed outputs
        updated: usize,
    },
    /// The last rebuild failed
    Failed {
        /// First error message
        error: String,
    },
}

impl BuildStatus {
    /// Check if last build succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    /// Get error message if failed.
    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// SSE client tracker: client id to event sender.
pub type ClientRegistry = Arc<RwLock<FxHashMap<usize, mpsc::Sender<String>>>>;

/// Shared development server state.
pub struct DevServerState {
    status: RwLock<BuildStatus>,
    outputs: RwLock<OutputReconciler>,
    assets: RwLock<Arc<AssetMap>>,
    external: Arc<RwLock<ExternalMetadata>>,
    clients: ClientRegistry,
    next_client_id: RwLock<usize>,
    headers: CustomHeaders,
}

impl DevServerState {
    /// Create state around a configured reconciler.
    pub fn new(reconciler: OutputReconciler, headers: CustomHeaders) -> Self {
        Self {
            status: RwLock::new(BuildStatus::NotStarted),
            outputs: RwLock::new(reconciler),
            assets: RwLock::new(Arc::new(AssetMap::new())),
            external: Arc::new(RwLock::new(ExternalMetadata::new())),
            clients: Arc::new(RwLock::new(FxHashMap::default())),
            next_client_id: RwLock::new(0),
            headers,
        }
    }

    /// Apply one rebuild's output files.
    pub fn reconcile(&self, files: &[RebuildFile]) -> ReconcileReport {
        self.outputs.write().reconcile(files)
    }

    /// Read-only view of the current outputs.
    pub fn snapshot(&self) -> OutputSnapshot {
        self.outputs.read().snapshot()
    }

    /// Replace the asset map wholesale.
    pub fn replace_assets(&self, assets: &[AssetFile]) {
        *self.assets.write() = Arc::new(AssetMap::from_assets(assets));
    }

    /// Current asset map.
    pub fn assets(&self) -> Arc<AssetMap> {
        Arc::clone(&*self.assets.read())
    }

    /// Clear and refill the external metadata in place.
    pub fn refill_external_metadata(&self, update: &ExternalMetadataUpdate) {
        self.external.write().refill(update);
    }

    /// Process-lifetime handle to the external metadata.
    pub fn external_metadata(&self) -> Arc<RwLock<ExternalMetadata>> {
        Arc::clone(&self.external)
    }

    /// Headers merged into every served response.
    pub fn headers(&self) -> &CustomHeaders {
        &self.headers
    }

    /// Record a successful rebuild.
    pub fn complete_build(&self, rebuild: u64, updated: usize) {
        *self.status.write() = BuildStatus::Success { rebuild, updated };
    }

    /// Record a failed rebuild.
    pub fn fail_build(&self, error: String) {
        *self.status.write() = BuildStatus::Failed { error };
    }

    /// Get current build status.
    pub fn get_status(&self) -> BuildStatus {
        self.status.read().clone()
    }

    /// Register a new SSE client.
    ///
    /// # Returns
    ///
    /// Client ID and receiver for events
    pub fn register_client(&self) -> (usize, mpsc::Receiver<String>) {
        let id = {
            let mut next_id = self.next_client_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };

        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);

        (id, rx)
    }

    /// Unregister an SSE client.
    pub fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Drop every client sender, ending their event streams.
    pub fn disconnect_all(&self) {
        self.clients.write().clear();
    }

    /// Get number of connected clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send a message to every client, pruning disconnected ones.
    ///
    /// Never waits on a client: a full buffer drops the message for that
    /// client. Returns the number of clients that received it.
    pub async fn broadcast(&self, message: &LiveUpdateMessage) -> Result<usize, SinkError> {
        let json = serde_json::to_string(message).map_err(|e| SinkError(e.to_string()))?;

        let clients: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut failed_ids = Vec::new();
        for (id, tx) in clients {
            match tx.try_send(json.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!(client = id, "client not reading, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => failed_ids.push(id),
            }
        }

        for id in failed_ids {
            tracing::debug!(client = id, "pruning disconnected client");
            self.unregister_client(id);
        }

        Ok(delivered)
    }
}

#[async_trait]
impl LiveUpdateSink for DevServerState {
    async fn send(&self, message: &LiveUpdateMessage) -> Result<usize, SinkError> {
        self.broadcast(message).await
    }
}

/// Shared state handle for passing around the application.
pub type SharedState = Arc<DevServerState>;
