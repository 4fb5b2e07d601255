//! Per-rebuild input produced by the external bundler.
//!
//! A [`BuildResult`] is emitted once per incremental build cycle. The
//! reconciler consumes its output files, the asset map is replaced by its asset
//! files, and its errors drive the error overlay.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Classification of a bundler output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFileType {
    /// Browser bundle (scripts, styles, index document)
    Browser,
    /// Media emitted by the bundler (fonts, images)
    Media,
    /// Server application chunk used by SSR
    ServerApplication,
    /// Server root file (server entry, manifests)
    ServerRoot,
    /// Root-level metadata (stats, licenses)
    Root,
}

impl OutputFileType {
    /// Whether files of this type may be served to the browser.
    pub fn is_servable(self) -> bool {
        matches!(self, OutputFileType::Browser | OutputFileType::Media)
    }
}

/// One file produced by a rebuild.
#[derive(Debug, Clone)]
pub struct RebuildFile {
    /// Output path relative to the output root (e.g. `main.js`)
    pub path: String,
    /// File contents
    pub contents: Bytes,
    /// Content fingerprint supplied by the bundler
    pub hash: Option<String>,
    /// Output classification
    pub file_type: OutputFileType,
}

impl RebuildFile {
    /// Create a browser file.
    pub fn new(path: impl Into<String>, contents: impl Into<Bytes>, hash: Option<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
            hash,
            file_type: OutputFileType::Browser,
        }
    }

    /// Set the output classification.
    pub fn with_type(mut self, file_type: OutputFileType) -> Self {
        self.file_type = file_type;
        self
    }
}

/// A file copied verbatim from disk rather than bundled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// Absolute path of the source file
    pub source: PathBuf,
    /// Output path relative to the output root
    pub destination: String,
}

/// Package names the bundler decided not to bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalMetadataUpdate {
    /// Implicitly external for the browser build
    pub implicit_browser: Vec<String>,
    /// Implicitly external for the server build
    pub implicit_server: Vec<String>,
    /// Explicitly configured externals
    pub explicit: Vec<String>,
}

/// Source location attached to a build message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageLocation {
    /// File the message refers to
    pub file: String,
    /// 1-based line
    pub line: u32,
    /// 0-based column
    pub column: u32,
    /// Text of the offending line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_text: Option<String>,
}

/// An error or warning reported by the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMessage {
    /// Human-readable message
    pub text: String,
    /// Where the message originates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<MessageLocation>,
}

impl BuildMessage {
    /// Create a message without a location.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
        }
    }

    /// Attach a location.
    pub fn with_location(mut self, location: MessageLocation) -> Self {
        self.location = Some(location);
        self
    }
}

impl std::fmt::Display for BuildMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}:{}:{}: {}", loc.file, loc.line, loc.column, self.text),
            None => write!(f, "{}", self.text),
        }
    }
}

/// Everything one rebuild produced.
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    /// Whether the build succeeded
    pub success: bool,
    /// Bundled output files
    pub output_files: Vec<RebuildFile>,
    /// Files copied from disk
    pub asset_files: Vec<AssetFile>,
    /// Externalized package names, when the bundler reports them
    pub external_metadata: Option<ExternalMetadataUpdate>,
    /// Errors (non-empty when `success` is false)
    pub errors: Vec<BuildMessage>,
    /// Warnings
    pub warnings: Vec<BuildMessage>,
}

impl BuildResult {
    /// A successful result with the given output files.
    pub fn success(output_files: Vec<RebuildFile>) -> Self {
        Self {
            success: true,
            output_files,
            ..Self::default()
        }
    }

    /// A failed result carrying the compiler errors.
    pub fn failure(errors: Vec<BuildMessage>) -> Self {
        Self {
            success: false,
            errors,
            ..Self::default()
        }
    }

    /// Set the asset files.
    pub fn with_assets(mut self, asset_files: Vec<AssetFile>) -> Self {
        self.asset_files = asset_files;
        self
    }

    /// Set the external metadata.
    pub fn with_external_metadata(mut self, metadata: ExternalMetadataUpdate) -> Self {
        self.external_metadata = Some(metadata);
        self
    }

    /// Set the warnings.
    pub fn with_warnings(mut self, warnings: Vec<BuildMessage>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servable_types() {
        assert!(OutputFileType::Browser.is_servable());
        assert!(OutputFileType::Media.is_servable());
        assert!(!OutputFileType::ServerApplication.is_servable());
        assert!(!OutputFileType::ServerRoot.is_servable());
        assert!(!OutputFileType::Root.is_servable());
    }

    #[test]
    fn test_build_message_display_with_location() {
        let msg = BuildMessage::new("Unexpected token").with_location(MessageLocation {
            file: "src/main.ts".to_string(),
            line: 3,
            column: 7,
            line_text: None,
        });
        assert_eq!(msg.to_string(), "src/main.ts:3:7: Unexpected token");
    }

    #[test]
    fn test_failure_is_not_success() {
        let result = BuildResult::failure(vec![BuildMessage::new("boom")]);
        assert!(!result.success);
        assert!(result.output_files.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
