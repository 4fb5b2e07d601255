//! Build output reconciliation.
//!
//! Tracks the served virtual filesystem across rebuilds. Each rebuild's flat
//! file list is diffed against the previous one by `(size, hash)`; unchanged
//! records keep their original buffer, changed or new records are replaced,
//! and paths the rebuild no longer produced are evicted.
//!
//! The map is copy-on-write: an [`OutputSnapshot`] taken before a reconcile
//! keeps seeing the old records.

mod assets;
mod metadata;

pub use assets::AssetMap;
pub use metadata::ExternalMetadata;

use crate::build_result::RebuildFile;
use bytes::Bytes;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Canonical served path of the index document.
pub const INDEX_HTML_PATH: &str = "/index.html";

/// One served virtual file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    /// Served absolute route (e.g. `/main.js`)
    pub path: String,
    /// File contents
    pub contents: Bytes,
    /// Byte length of `contents`
    pub size: usize,
    /// Bundler-supplied fingerprint
    pub hash: Option<String>,
    /// Whether the file may be served as a static asset
    pub servable: bool,
    /// Whether the most recent rebuild changed or added this file
    pub updated: bool,
}

impl OutputRecord {
    fn same_content(&self, file: &RebuildFile) -> bool {
        self.size == file.contents.len() && self.hash.is_some() && self.hash == file.hash
    }
}

/// Read-only view of the output map at one point in time.
#[derive(Debug, Clone, Default)]
pub struct OutputSnapshot {
    files: Arc<FxHashMap<String, Arc<OutputRecord>>>,
}

impl OutputSnapshot {
    /// Look up a record by served path.
    pub fn get(&self, path: &str) -> Option<&Arc<OutputRecord>> {
        self.files.get(path)
    }

    /// Whether a record exists for the served path.
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over all records in arbitrary order.
    pub fn records(&self) -> impl Iterator<Item = &Arc<OutputRecord>> {
        self.files.values()
    }
}

/// Paths affected by one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Changed or new paths, in rebuild order (source maps excluded)
    pub updated: Vec<String>,
    /// Evicted paths, sorted
    pub removed: Vec<String>,
    /// Source maps whose contents were (re)written, in rebuild order
    pub source_maps: Vec<String>,
}

impl ReconcileReport {
    /// Whether anything changed.
    pub fn has_updates(&self) -> bool {
        !self.updated.is_empty()
    }
}

/// Owner of the authoritative served-file map.
#[derive(Debug, Default)]
pub struct OutputReconciler {
    files: Arc<FxHashMap<String, Arc<OutputRecord>>>,
    index_output: Option<String>,
}

impl OutputReconciler {
    /// Create an empty reconciler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remap the given bundler output path to `/index.html`.
    pub fn with_index_output(mut self, index_output: impl AsRef<str>) -> Self {
        self.index_output = Some(normalize_served_path(index_output.as_ref()));
        self
    }

    /// Compute the served route for a bundler output path.
    pub fn served_path(&self, output_path: &str) -> String {
        remap_index(self.index_output.as_deref(), output_path)
    }

    /// Apply one rebuild's file list.
    pub fn reconcile(&mut self, files: &[RebuildFile]) -> ReconcileReport {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        seen.insert(INDEX_HTML_PATH.to_string());
        let mut produced: FxHashSet<String> = FxHashSet::default();

        let mut report = ReconcileReport::default();
        let index_output = self.index_output.as_deref();
        let map = Arc::make_mut(&mut self.files);

        for file in files {
            let path = remap_index(index_output, &file.path);
            if !produced.insert(path.clone()) {
                // First occurrence of a served path wins.
                tracing::debug!(path = %path, output = %file.path, "duplicate served path ignored");
                continue;
            }
            seen.insert(path.clone());
            let servable = file.file_type.is_servable();

            if path.ends_with(".map") {
                if !map.get(&path).is_some_and(|existing| existing.same_content(file)) {
                    report.source_maps.push(path.clone());
                }
                map.insert(
                    path.clone(),
                    Arc::new(OutputRecord {
                        path,
                        contents: file.contents.clone(),
                        size: file.contents.len(),
                        hash: file.hash.clone(),
                        servable,
                        updated: false,
                    }),
                );
                continue;
            }

            if let Some(existing) = map.get_mut(&path) {
                if existing.same_content(file) {
                    if existing.updated {
                        // Keep the previous buffer; only the flag changes.
                        let settled = OutputRecord {
                            updated: false,
                            ..(**existing).clone()
                        };
                        *existing = Arc::new(settled);
                    }
                    continue;
                }
            }

            tracing::debug!(path = %path, size = file.contents.len(), "output updated");
            report.updated.push(path.clone());
            map.insert(
                path.clone(),
                Arc::new(OutputRecord {
                    path,
                    contents: file.contents.clone(),
                    size: file.contents.len(),
                    hash: file.hash.clone(),
                    servable,
                    updated: true,
                }),
            );
        }

        map.retain(|path, _| {
            let keep = seen.contains(path);
            if !keep {
                report.removed.push(path.clone());
            }
            keep
        });
        report.removed.sort();

        report
    }

    /// Cheap read-only snapshot of the current map.
    pub fn snapshot(&self) -> OutputSnapshot {
        OutputSnapshot {
            files: Arc::clone(&self.files),
        }
    }

    /// Look up a record by served path.
    pub fn get(&self, path: &str) -> Option<Arc<OutputRecord>> {
        self.files.get(path).cloned()
    }

    /// Served paths whose records changed in the most recent reconcile, sorted.
    pub fn updated_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .values()
            .filter(|record| record.updated)
            .map(|record| record.path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Number of tracked records.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no records are tracked.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn remap_index(index_output: Option<&str>, output_path: &str) -> String {
    let served = normalize_served_path(output_path);
    match index_output {
        Some(index) if index == served => INDEX_HTML_PATH.to_string(),
        _ => served,
    }
}

/// Normalize an output path into an absolute, forward-slash route.
pub fn normalize_served_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    format!("/{}", normalized.trim_start_matches('/'))
}
