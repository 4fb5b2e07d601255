//! Live-update decisions for connected browsers.
//!
//! [`UpdateBroadcaster`] is a two-state machine. While **Idle** (no server
//! listening yet) it never sends anything. Once [`UpdateBroadcaster::connect`]
//! hands it a sink it is **Connected** for the rest of the process and decides,
//! per rebuild, between a stylesheet patch, a full reload, or nothing.
//!
//! Delivery is best-effort: sink failures are logged and swallowed.

use crate::build_result::{BuildMessage, MessageLocation};
use crate::error::SinkError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Message pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LiveUpdateMessage {
    /// Replace one stylesheet without reloading the page
    StylePatch {
        /// Served stylesheet path
        path: String,
        /// Milliseconds since the Unix epoch, used for cache busting
        timestamp: i64,
    },

    /// Reload the whole page
    FullReload {
        /// Reload scope; always `*`
        path: String,
    },

    /// Show a compile error over the page
    ErrorOverlay {
        /// Error text
        message: String,
        /// Optional stack
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack: Option<String>,
        /// Optional source location
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<MessageLocation>,
    },

    /// Dismiss a previously shown error overlay
    ErrorClear,
}

impl LiveUpdateMessage {
    /// A wildcard full-reload message.
    pub fn full_reload() -> Self {
        LiveUpdateMessage::FullReload {
            path: "*".to_string(),
        }
    }

    /// An overlay for the first build error.
    pub fn error_overlay(error: &BuildMessage) -> Self {
        LiveUpdateMessage::ErrorOverlay {
            message: error.text.clone(),
            stack: None,
            location: error.location.clone(),
        }
    }
}

/// Destination for live-update messages (e.g. the SSE client registry).
#[async_trait]
pub trait LiveUpdateSink: Send + Sync {
    /// Deliver a message to every connected client.
    ///
    /// Returns the number of clients that received it.
    async fn send(&self, message: &LiveUpdateMessage) -> Result<usize, SinkError>;
}

/// Which live-update behaviors are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveUpdateOptions {
    /// Reload the page when non-stylesheet output changes
    pub live_reload: bool,
    /// Patch stylesheets in place when only stylesheets changed
    pub hmr: bool,
}

impl Default for LiveUpdateOptions {
    fn default() -> Self {
        Self {
            live_reload: true,
            hmr: true,
        }
    }
}

/// Broadcaster state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No server listening; nothing is sent
    Idle,
    /// A live channel is open
    Connected,
}

/// Decides and emits live-update messages after each rebuild.
pub struct UpdateBroadcaster {
    options: LiveUpdateOptions,
    sink: Option<Arc<dyn LiveUpdateSink>>,
    had_error: bool,
}

impl UpdateBroadcaster {
    /// Create an idle broadcaster.
    pub fn new(options: LiveUpdateOptions) -> Self {
        Self {
            options,
            sink: None,
            had_error: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> ChannelState {
        if self.sink.is_some() {
            ChannelState::Connected
        } else {
            ChannelState::Idle
        }
    }

    /// Enabled behaviors.
    pub fn options(&self) -> LiveUpdateOptions {
        self.options
    }

    /// Transition to Connected. Later calls are ignored; the first channel
    /// stays open for the process lifetime.
    pub fn connect(&mut self, sink: Arc<dyn LiveUpdateSink>) {
        if self.sink.is_some() {
            tracing::debug!("live update channel already connected");
            return;
        }
        self.sink = Some(sink);
    }

    /// Pure classification of a set of updated paths.
    pub fn classify(&self, updated: &[String]) -> Vec<LiveUpdateMessage> {
        if updated.is_empty() {
            return Vec::new();
        }

        if self.options.hmr && updated.iter().all(|path| path.ends_with(".css")) {
            let timestamp = chrono::Utc::now().timestamp_millis();
            return updated
                .iter()
                .map(|path| LiveUpdateMessage::StylePatch {
                    path: path.clone(),
                    timestamp,
                })
                .collect();
        }

        if self.options.live_reload {
            return vec![LiveUpdateMessage::full_reload()];
        }

        Vec::new()
    }

    /// Handle a successful rebuild.
    ///
    /// Clears a pending error overlay first, then sends the classified update.
    /// Returns the messages that were emitted.
    pub async fn on_rebuild(&mut self, updated: &[String]) -> Vec<LiveUpdateMessage> {
        let Some(sink) = self.sink.clone() else {
            return Vec::new();
        };

        let mut messages = Vec::new();
        if self.had_error {
            self.had_error = false;
            messages.push(LiveUpdateMessage::ErrorClear);
        }

        let updates = self.classify(updated);
        match updates.first() {
            Some(LiveUpdateMessage::StylePatch { .. }) => {
                tracing::info!("Stylesheet update sent to client(s).");
            }
            Some(LiveUpdateMessage::FullReload { .. }) => {
                tracing::info!("Reloading client(s)...");
            }
            _ => {}
        }
        messages.extend(updates);

        for message in &messages {
            deliver(sink.as_ref(), message).await;
        }
        messages
    }

    /// Handle a failed rebuild by showing the first error.
    pub async fn on_failure(&mut self, errors: &[BuildMessage]) -> Option<LiveUpdateMessage> {
        let sink = self.sink.clone()?;
        let first = errors.first()?;

        self.had_error = true;
        let message = LiveUpdateMessage::error_overlay(first);
        deliver(sink.as_ref(), &message).await;
        Some(message)
    }
}

async fn deliver(sink: &dyn LiveUpdateSink, message: &LiveUpdateMessage) {
    match sink.send(message).await {
        Ok(count) => tracing::debug!(clients = count, "live update delivered"),
        Err(e) => tracing::debug!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<LiveUpdateMessage>>,
    }

    #[async_trait]
    impl LiveUpdateSink for RecordingSink {
        async fn send(&self, message: &LiveUpdateMessage) -> Result<usize, SinkError> {
            self.sent.lock().push(message.clone());
            Ok(1)
        }
    }

    struct FailingSink;

    #[async_trait]
    impl LiveUpdateSink for FailingSink {
        async fn send(&self, _message: &LiveUpdateMessage) -> Result<usize, SinkError> {
            Err(SinkError("client gone".to_string()))
        }
    }

    fn paths(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn connected(options: LiveUpdateOptions) -> (UpdateBroadcaster, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let mut broadcaster = UpdateBroadcaster::new(options);
        broadcaster.connect(sink.clone());
        (broadcaster, sink)
    }

    #[test]
    fn test_stylesheet_only_update_is_patched() {
        let broadcaster = UpdateBroadcaster::new(LiveUpdateOptions::default());
        let messages = broadcaster.classify(&paths(&["/styles.css"]));

        assert_eq!(messages.len(), 1);
        assert!(matches!(
            &messages[0],
            LiveUpdateMessage::StylePatch { path, .. } if path == "/styles.css"
        ));
    }

    #[test]
    fn test_script_update_reloads() {
        let broadcaster = UpdateBroadcaster::new(LiveUpdateOptions::default());
        assert_eq!(
            broadcaster.classify(&paths(&["/main.js"])),
            vec![LiveUpdateMessage::full_reload()]
        );
    }

    #[test]
    fn test_mixed_update_never_downgrades_to_patch() {
        let broadcaster = UpdateBroadcaster::new(LiveUpdateOptions::default());
        assert_eq!(
            broadcaster.classify(&paths(&["/main.js", "/styles.css"])),
            vec![LiveUpdateMessage::full_reload()]
        );
    }

    #[test]
    fn test_stylesheet_update_without_hmr_reloads() {
        let broadcaster = UpdateBroadcaster::new(LiveUpdateOptions {
            live_reload: true,
            hmr: false,
        });
        assert_eq!(
            broadcaster.classify(&paths(&["/styles.css"])),
            vec![LiveUpdateMessage::full_reload()]
        );
    }

    #[test]
    fn test_everything_disabled_is_silent() {
        let broadcaster = UpdateBroadcaster::new(LiveUpdateOptions {
            live_reload: false,
            hmr: false,
        });
        assert!(broadcaster.classify(&paths(&["/main.js"])).is_empty());
    }

    #[tokio::test]
    async fn test_idle_broadcaster_sends_nothing() {
        let mut broadcaster = UpdateBroadcaster::new(LiveUpdateOptions::default());
        assert_eq!(broadcaster.state(), ChannelState::Idle);

        assert!(broadcaster.on_rebuild(&paths(&["/main.js"])).await.is_empty());
        assert!(broadcaster
            .on_failure(&[BuildMessage::new("boom")])
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_failure_then_success_clears_overlay_first() {
        let (mut broadcaster, sink) = connected(LiveUpdateOptions::default());
        assert_eq!(broadcaster.state(), ChannelState::Connected);

        let overlay = broadcaster
            .on_failure(&[BuildMessage::new("first"), BuildMessage::new("second")])
            .await;
        assert!(matches!(
            overlay,
            Some(LiveUpdateMessage::ErrorOverlay { ref message, .. }) if message == "first"
        ));

        broadcaster.on_rebuild(&paths(&["/main.js"])).await;

        let sent = sink.sent.lock().clone();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1], LiveUpdateMessage::ErrorClear);
        assert_eq!(sent[2], LiveUpdateMessage::full_reload());
    }

    #[tokio::test]
    async fn test_error_clear_is_sent_once() {
        let (mut broadcaster, sink) = connected(LiveUpdateOptions::default());
        broadcaster.on_failure(&[BuildMessage::new("boom")]).await;

        broadcaster.on_rebuild(&[]).await;
        broadcaster.on_rebuild(&[]).await;

        let sent = sink.sent.lock().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], LiveUpdateMessage::ErrorClear);
    }

    #[tokio::test]
    async fn test_sink_failures_are_swallowed() {
        let mut broadcaster = UpdateBroadcaster::new(LiveUpdateOptions::default());
        broadcaster.connect(Arc::new(FailingSink));

        let messages = broadcaster.on_rebuild(&paths(&["/main.js"])).await;
        assert_eq!(messages, vec![LiveUpdateMessage::full_reload()]);
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_value(LiveUpdateMessage::full_reload()).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "full-reload", "path": "*" }));

        let json = serde_json::to_value(LiveUpdateMessage::ErrorClear).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "error-clear" }));
    }
}
