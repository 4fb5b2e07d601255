//! Turns a bundler's output directory into rebuild results.

use crate::error::{Result, ResultExt};
use fob_serve::{BuildMessage, BuildResult, OutputFileType, RebuildFile};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Written by the bundler next to its outputs when a build fails.
pub const BUILD_ERRORS_FILE: &str = "build-errors.json";

const MEDIA_DIR: &str = "media";
const SERVER_DIR: &str = "server";
const SERVER_SHELL: &str = "index.server.html";

/// Totals for the startup banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub files: usize,
    pub bytes: u64,
}

/// Reads an output directory into a [`BuildResult`].
#[derive(Debug, Clone)]
pub struct OutputDirSource {
    root: PathBuf,
    excluded: Vec<PathBuf>,
}

impl OutputDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded: Vec::new(),
        }
    }

    /// Skip a subdirectory, given relative to the root.
    pub fn with_excluded(mut self, relative: impl Into<PathBuf>) -> Self {
        self.excluded.push(relative.into());
        self
    }

    fn is_excluded(&self, path: &Path) -> bool {
        path.strip_prefix(&self.root).is_ok_and(|relative| {
            self.excluded
                .iter()
                .any(|excluded| relative.starts_with(excluded))
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshot the directory.
    ///
    /// A `build-errors.json` file (an array of build messages) makes the
    /// result a failure. Hidden files and directories are skipped. Every file
    /// is hashed with BLAKE3 so unchanged outputs reconcile as unchanged.
    pub fn snapshot(&self) -> Result<BuildResult> {
        let errors_path = self.root.join(BUILD_ERRORS_FILE);
        if errors_path.is_file() {
            let raw = std::fs::read_to_string(&errors_path).with_path(&errors_path)?;
            let mut errors: Vec<BuildMessage> = serde_json::from_str(&raw)?;
            if errors.is_empty() {
                errors.push(BuildMessage::new("Build failed"));
            }
            return Ok(BuildResult::failure(errors));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !(is_hidden(entry.file_name()) || self.is_excluded(entry.path()))
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(relative) = relative_path(&self.root, entry.path()) else {
                continue;
            };
            let contents = std::fs::read(entry.path()).with_path(entry.path())?;
            let hash = blake3::hash(&contents).to_hex().to_string();

            files.push(
                RebuildFile::new(relative.clone(), contents, Some(hash))
                    .with_type(classify(&relative)),
            );
        }

        tracing::debug!(files = files.len(), root = %self.root.display(), "snapshot taken");
        Ok(BuildResult::success(files))
    }
}

/// Totals for a successful result.
pub fn summarize(result: &BuildResult) -> SnapshotSummary {
    SnapshotSummary {
        files: result.output_files.len(),
        bytes: result
            .output_files
            .iter()
            .map(|file| file.contents.len() as u64)
            .sum(),
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

/// Forward-slash path of `path` below `root`.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

fn classify(relative: &str) -> OutputFileType {
    if relative == SERVER_SHELL {
        OutputFileType::ServerRoot
    } else if relative.starts_with(&format!("{}/", MEDIA_DIR)) {
        OutputFileType::Media
    } else if relative.starts_with(&format!("{}/", SERVER_DIR)) {
        OutputFileType::ServerApplication
    } else {
        OutputFileType::Browser
    }
}
