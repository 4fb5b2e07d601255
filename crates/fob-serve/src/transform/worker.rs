//! Units of transformation work executed on pool threads.

use super::{TransformFlags, TransformOptions};
use crate::error::TransformError;
use bytes::Bytes;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

static SOURCE_MAP_COMMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^//# sourceMappingURL=[^\r\n]*(\r?\n)?").ok());

/// One transformation request handed to a pool thread.
#[derive(Debug, Clone)]
pub struct TransformJob {
    /// Source file path
    pub path: PathBuf,
    /// In-memory source; read from `path` when absent
    pub data: Option<Bytes>,
    /// Per-request flags
    pub flags: TransformFlags,
    /// Pool-wide options
    pub options: TransformOptions,
}

impl TransformJob {
    /// Source bytes, reading the file when no data was supplied.
    pub fn source(&self) -> Result<Bytes, TransformError> {
        match &self.data {
            Some(data) => Ok(data.clone()),
            None => std::fs::read(&self.path)
                .map(Bytes::from)
                .map_err(|e| TransformError::Read {
                    path: self.path.clone(),
                    message: e.to_string(),
                }),
        }
    }

    /// Whether the source belongs to an installed package.
    pub fn is_third_party(&self) -> bool {
        is_third_party(&self.path)
    }
}

/// CPU-bound source transformation.
///
/// Implementations run on blocking pool threads and must not assume an async
/// context.
pub trait Transformer: Send + Sync + 'static {
    /// Transform one job into output bytes.
    fn transform(&self, job: &TransformJob) -> Result<Bytes, TransformError>;
}

/// Built-in transformer: loads the source and applies the source-map comment
/// policy. Linking and optimization passes are provided by other
/// [`Transformer`] implementations.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaScriptTransformer;

impl Transformer for JavaScriptTransformer {
    fn transform(&self, job: &TransformJob) -> Result<Bytes, TransformError> {
        let source = job.source()?;
        Ok(apply_source_map_policy(&job.path, source, job.options))
    }
}

/// Strip inline `sourceMappingURL` comments unless source maps are enabled
/// for this file.
pub fn apply_source_map_policy(path: &Path, source: Bytes, options: TransformOptions) -> Bytes {
    let keep = options.sourcemap && (options.third_party_sourcemaps || !is_third_party(path));
    if keep {
        return source;
    }
    strip_source_map_comments(source)
}

fn strip_source_map_comments(source: Bytes) -> Bytes {
    let Some(pattern) = SOURCE_MAP_COMMENT.as_ref() else {
        return source;
    };
    let Ok(text) = std::str::from_utf8(&source) else {
        return source;
    };
    if !pattern.is_match(text) {
        return source;
    }
    Bytes::from(pattern.replace_all(text, "").into_owned())
}

/// Whether a path lies inside a `node_modules` directory.
pub fn is_third_party(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == "node_modules"))
}
