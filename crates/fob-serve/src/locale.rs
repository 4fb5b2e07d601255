//! Locale-data resolution with progressive fallback.
//!
//! A requested tag is matched against available locale-data modules by
//! dropping trailing subtags until a module resolves. Private-use subtags
//! (`-x-...`) never take part in matching, and `en-US`/`en` are treated as
//! interchangeable exact matches.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

/// Prefix of virtual locale-data module specifiers.
pub const LOCALE_DATA_PREFIX: &str = "fob:locale/data:";

/// Module body used when no locale data matches.
pub const EMPTY_LOCALE_MODULE: &str = "export {};\n";

static PRIVATE_USE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"-[xX](-[a-zA-Z0-9]{1,8})+$").ok());

/// A module found by a [`ModuleResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Location of the module on disk
    pub path: PathBuf,
}

/// Module-resolution collaborator.
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    /// Resolve a specifier, or `None` when no module exists for it.
    async fn resolve(&self, specifier: &str) -> Option<ResolvedModule>;
}

/// Resolves `<root>/<specifier>.mjs`, then `<root>/<specifier>.js`.
#[derive(Debug, Clone)]
pub struct DirectoryModuleResolver {
    root: PathBuf,
}

impl DirectoryModuleResolver {
    /// Create a resolver rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ModuleResolver for DirectoryModuleResolver {
    async fn resolve(&self, specifier: &str) -> Option<ResolvedModule> {
        let relative = Path::new(specifier);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if specifier.is_empty() || escapes {
            return None;
        }

        for ext in ["mjs", "js"] {
            let candidate = self.root.join(format!("{}.{}", specifier, ext));
            match tokio::fs::metadata(&candidate).await {
                Ok(meta) if meta.is_file() => return Some(ResolvedModule { path: candidate }),
                _ => {}
            }
        }
        None
    }
}

/// Outcome of resolving one locale tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleMatch {
    /// Tag as requested, private-use subtags included
    pub requested_locale: String,
    /// Tag whose data was found
    pub matched_locale: Option<String>,
    /// Module providing the data
    pub resolved_module_path: Option<PathBuf>,
    /// Whether the match counts as exact
    pub exact: bool,
    /// Every tag tried, in order
    pub attempts: Vec<String>,
}

impl LocaleMatch {
    /// Whether any locale data was found.
    pub fn is_found(&self) -> bool {
        self.resolved_module_path.is_some()
    }

    /// Diagnostic for fallbacks and misses; `None` for exact matches.
    pub fn warning(&self) -> Option<String> {
        match (&self.matched_locale, self.exact) {
            (Some(_), true) => None,
            (Some(matched), false) => Some(format!(
                "Locale data for '{}' cannot be found. Using locale data for '{}'.",
                self.requested_locale, matched
            )),
            (None, _) => Some(format!(
                "Locale data for '{}' cannot be found. No locale data will be included for this locale.",
                self.requested_locale
            )),
        }
    }
}

/// Maps locale tags to locale-data modules.
#[derive(Clone)]
pub struct LocaleResolver {
    base: String,
    resolver: Arc<dyn ModuleResolver>,
}

impl LocaleResolver {
    /// Create a resolver composing specifiers as `<base>/<tag>`.
    ///
    /// An empty base resolves bare tags.
    pub fn new(base: impl Into<String>, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
            resolver,
        }
    }

    /// Resolve a locale tag, logging a warning for fallbacks and misses.
    pub async fn resolve(&self, locale: &str) -> LocaleMatch {
        let result = self.find(locale).await;
        if let Some(warning) = result.warning() {
            tracing::warn!("{}", warning);
        }
        result
    }

    /// Resolve a `fob:locale/data:<tag>` specifier.
    ///
    /// Returns `None` for specifiers without the locale-data prefix.
    pub async fn resolve_specifier(&self, specifier: &str) -> Option<LocaleMatch> {
        let tag = specifier.strip_prefix(LOCALE_DATA_PREFIX)?;
        Some(self.resolve(tag).await)
    }

    async fn find(&self, locale: &str) -> LocaleMatch {
        let stripped = strip_private_use(locale);
        let requested_en_us = stripped.eq_ignore_ascii_case("en-US");

        let mut result = LocaleMatch {
            requested_locale: locale.to_string(),
            matched_locale: None,
            resolved_module_path: None,
            exact: false,
            attempts: Vec::new(),
        };

        let mut tag = stripped.as_str();
        let mut first = true;
        while !tag.is_empty() {
            result.attempts.push(tag.to_string());
            if let Some(module) = self.resolver.resolve(&self.specifier(tag)).await {
                let en_pair = requested_en_us && tag.eq_ignore_ascii_case("en");
                return LocaleMatch {
                    matched_locale: Some(tag.to_string()),
                    resolved_module_path: Some(module.path),
                    exact: first || en_pair,
                    ..result
                };
            }

            if first && tag.eq_ignore_ascii_case("en") {
                result.attempts.push("en-US".to_string());
                if let Some(module) = self.resolver.resolve(&self.specifier("en-US")).await {
                    return LocaleMatch {
                        matched_locale: Some("en-US".to_string()),
                        resolved_module_path: Some(module.path),
                        exact: true,
                        ..result
                    };
                }
            }

            first = false;
            tag = parent_tag(tag);
        }

        result
    }

    fn specifier(&self, tag: &str) -> String {
        if self.base.is_empty() {
            tag.to_string()
        } else {
            format!("{}/{}", self.base, tag)
        }
    }
}

impl std::fmt::Debug for LocaleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleResolver")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

/// Specifier of the virtual locale-data module for a tag.
pub fn locale_data_specifier(tag: &str) -> String {
    format!("{}{}", LOCALE_DATA_PREFIX, tag)
}

/// Remove a trailing private-use subtag sequence.
pub fn strip_private_use(locale: &str) -> String {
    match PRIVATE_USE.as_ref() {
        Some(pattern) => pattern.replace(locale, "").into_owned(),
        None => locale.to_string(),
    }
}

fn parent_tag(tag: &str) -> &str {
    match tag.rfind('-') {
        Some(idx) => &tag[..idx],
        None => "",
    }
}
