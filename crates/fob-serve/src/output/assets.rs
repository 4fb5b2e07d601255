//! Served path → on-disk source mapping for copied assets.

use super::normalize_served_path;
use crate::build_result::AssetFile;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// Assets copied from disk rather than bundled.
///
/// Replaced wholesale on every rebuild; no diffing is performed since the
/// asset set rarely changes.
#[derive(Debug, Clone, Default)]
pub struct AssetMap {
    sources: FxHashMap<String, PathBuf>,
}

impl AssetMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from a rebuild's asset files.
    pub fn from_assets(assets: &[AssetFile]) -> Self {
        let sources = assets
            .iter()
            .map(|asset| {
                (
                    normalize_served_path(&asset.destination),
                    asset.source.clone(),
                )
            })
            .collect();
        Self { sources }
    }

    /// Source path for a served path, if it is a copied asset.
    pub fn source_for(&self, served_path: &str) -> Option<&Path> {
        self.sources.get(served_path).map(PathBuf::as_path)
    }

    /// Iterate over `(served path, source path)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.sources
            .iter()
            .map(|(served, source)| (served.as_str(), source.as_path()))
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
