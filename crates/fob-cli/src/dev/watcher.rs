//! File system watcher for the bundler's output directory.
//!
//! Reports changes under the watched root, skipping hidden entries and
//! configured ignore patterns. [`next_batch`] collapses a burst of events
//! (a bundler writing many files) into one rebuild.

use crate::error::{CliError, Result, ResultExt};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// File was modified
    Modified(PathBuf),
    /// File was created
    Created(PathBuf),
    /// File was removed
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }

    fn from_event(kind: &EventKind, path: PathBuf) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(FileChange::Created(path)),
            EventKind::Modify(_) => Some(FileChange::Modified(path)),
            EventKind::Remove(_) => Some(FileChange::Removed(path)),
            _ => None,
        }
    }
}

/// Recursive watcher over one directory.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`.
    ///
    /// Returns the watcher (keep it alive) and the change receiver.
    pub fn new(
        root: PathBuf,
        ignore_patterns: Vec<String>,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(256);
        // Events carry absolute paths.
        let watch_root = root.canonicalize().with_path(&root)?;
        let filter_root = watch_root.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("File watcher error: {}", e);
                    return;
                }
            };

            for path in event.paths {
                if Self::should_ignore(&path, &filter_root, &ignore_patterns) {
                    continue;
                }
                let Some(change) = FileChange::from_event(&event.kind, path) else {
                    continue;
                };
                // A full channel already guarantees a pending rebuild.
                let _ = tx.try_send(change);
            }
        })?;

        watcher.watch(&watch_root, RecursiveMode::Recursive)?;
        tracing::debug!(root = %root.display(), "watching for changes");

        Ok((
            Self {
                _watcher: watcher,
                root,
            },
            rx,
        ))
    }

    /// Check if a path should be ignored.
    ///
    /// Paths outside `root`, hidden entries, `*.ext` patterns and directory
    /// prefixes are ignored.
    fn should_ignore(path: &Path, root: &Path, ignore_patterns: &[String]) -> bool {
        let Ok(rel_path) = path.strip_prefix(root) else {
            return true;
        };

        let path_str = rel_path.to_string_lossy();
        for pattern in ignore_patterns {
            if let Some(ext) = pattern.strip_prefix('*') {
                if path_str.ends_with(ext) {
                    return true;
                }
            } else if rel_path.starts_with(pattern) {
                return true;
            }
        }

        rel_path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    /// Get the root directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Wait for the next change, then keep collecting until `quiet` passes
/// without another one.
///
/// Returns `None` once the watcher is gone.
pub async fn next_batch(
    changes: &mut mpsc::Receiver<FileChange>,
    quiet: Duration,
) -> Option<Vec<FileChange>> {
    let first = changes.recv().await?;
    let mut batch = vec![first];

    loop {
        match tokio::time::timeout(quiet, changes.recv()).await {
            Ok(Some(change)) => {
                if !batch.contains(&change) {
                    batch.push(change);
                }
            }
            Ok(None) | Err(_) => return Some(batch),
        }
    }
}
