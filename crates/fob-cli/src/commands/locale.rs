//! `fob locale` implementation.

use crate::cli::LocaleArgs;
use crate::error::{CliError, ConfigError, Result};
use crate::ui;
use fob_serve::{DirectoryModuleResolver, LocaleMatch, LocaleResolver};
use std::sync::Arc;

/// Resolve every tag and print one line per result.
///
/// Fallbacks and misses are also reported as warnings on stderr. With
/// `--strict`, any miss fails the command.
pub async fn execute(args: LocaleArgs) -> Result<()> {
    let results = resolve_all(&args).await?;
    ui::print_locale_table(&results);

    let missing: Vec<&str> = results
        .iter()
        .filter(|result| !result.is_found())
        .map(|result| result.requested_locale.as_str())
        .collect();
    if args.strict && !missing.is_empty() {
        return Err(CliError::Custom(format!(
            "No locale data for: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Resolve the requested tags in order.
pub async fn resolve_all(args: &LocaleArgs) -> Result<Vec<LocaleMatch>> {
    if !args.data_dir.is_dir() {
        return Err(ConfigError::InvalidValue {
            field: "data-dir".to_string(),
            value: args.data_dir.display().to_string(),
            hint: "Locale data directory does not exist".to_string(),
        }
        .into());
    }

    let resolver = LocaleResolver::new(
        args.base.clone(),
        Arc::new(DirectoryModuleResolver::new(&args.data_dir)),
    );

    let mut results = Vec::with_capacity(args.tags.len());
    for tag in &args.tags {
        results.push(resolver.resolve(tag).await);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn args(dir: &Path, tags: &[&str]) -> LocaleArgs {
        LocaleArgs {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            data_dir: dir.to_path_buf(),
            base: String::new(),
            strict: false,
        }
    }

    fn catalog() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for tag in ["en", "en-GB", "fr"] {
            std::fs::write(dir.path().join(format!("{}.mjs", tag)), "export {};").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_resolve_all_keeps_order() {
        let dir = catalog();

        let results = resolve_all(&args(dir.path(), &["en-GB", "fr-CA", "de"]))
            .await
            .unwrap();

        assert!(results[0].exact);
        assert_eq!(results[1].matched_locale.as_deref(), Some("fr"));
        assert!(!results[1].exact);
        assert!(!results[2].is_found());
    }

    #[tokio::test]
    async fn test_strict_fails_on_missing() {
        let dir = catalog();
        let strict = LocaleArgs {
            strict: true,
            ..args(dir.path(), &["en", "de"])
        };

        let err = execute(strict).await.unwrap_err();
        assert!(err.to_string().contains("de"));
    }

    #[tokio::test]
    async fn test_missing_data_dir() {
        let result = resolve_all(&args(Path::new("/definitely/not/here"), &["en"])).await;
        assert!(result.is_err());
    }
}
