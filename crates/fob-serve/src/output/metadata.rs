//! Externalized package names reported by the bundler.

use crate::build_result::ExternalMetadataUpdate;
use serde::Serialize;
use std::collections::BTreeSet;

/// Package names the bundler left external, kept sorted.
///
/// The dev server holds a single instance for the process lifetime and refills
/// it in place on each rebuild, so consumers that cache by reference keep a
/// valid handle. Sorted sets make [`ExternalMetadata::fingerprint`] stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalMetadata {
    /// Implicitly external for the browser build
    pub implicit_browser: BTreeSet<String>,
    /// Implicitly external for the server build
    pub implicit_server: BTreeSet<String>,
    /// Explicitly configured externals
    pub explicit: BTreeSet<String>,
}

impl ExternalMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear and refill from a rebuild's report.
    ///
    /// Absolute URLs are dropped from the implicit sets; they are never
    /// resolvable packages.
    pub fn refill(&mut self, update: &ExternalMetadataUpdate) {
        self.implicit_browser.clear();
        self.implicit_server.clear();
        self.explicit.clear();

        self.implicit_browser.extend(
            update
                .implicit_browser
                .iter()
                .filter(|name| !is_absolute_url(name))
                .cloned(),
        );
        self.implicit_server.extend(
            update
                .implicit_server
                .iter()
                .filter(|name| !is_absolute_url(name))
                .cloned(),
        );
        self.explicit.extend(update.explicit.iter().cloned());
    }

    /// BLAKE3 hex digest over the sorted contents.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for (label, set) in [
            ("implicit-browser", &self.implicit_browser),
            ("implicit-server", &self.implicit_server),
            ("explicit", &self.explicit),
        ] {
            hasher.update(label.as_bytes());
            hasher.update(b"\0");
            for name in set {
                hasher.update(name.as_bytes());
                hasher.update(b"\0");
            }
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Whether no package is external.
    pub fn is_empty(&self) -> bool {
        self.implicit_browser.is_empty() && self.implicit_server.is_empty() && self.explicit.is_empty()
    }
}

fn is_absolute_url(name: &str) -> bool {
    name.starts_with("http://") || name.starts_with("https://") || name.starts_with("//")
}
