//! `fob serve` implementation.
//!
//! Snapshots the output directory, hands the snapshot to a `DevSession`,
//! then re-snapshots after every burst of changes until Ctrl+C.

use crate::cli::ServeArgs;
use crate::config::{ServeConfig, find_available_port};
use crate::dev::watcher::next_batch;
use crate::dev::{FileChange, FileWatcher, LocaleDataMiddleware, OutputDirSource, summarize};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use fob_serve::middleware::CustomHeaders;
use fob_serve::{BuildResult, DevSession, DirectoryModuleResolver, LocaleResolver, ServeOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Quiet period that ends a burst of output writes.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Execute the serve command.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = ServeConfig::load(&args)?;
    config.validate()?;

    let addr = find_available_port(&config.host, config.port)?;
    let session = build_session(&config, config.serve_options(addr))?;

    let source = output_source(&config);
    let initial = source.snapshot()?;
    let summary = summarize(&initial);

    let (watcher, changes) = FileWatcher::new(config.output_dir.clone(), ignore_patterns(&config))
        .context("Failed to watch the output directory")?;
    let (results_tx, results_rx) = mpsc::channel(8);
    results_tx
        .send(initial)
        .await
        .map_err(|_| CliError::Custom("Build result channel closed".to_string()))?;
    let feeder = tokio::spawn(feed_rebuilds(source, changes, results_tx));

    ui::print_serve_banner(
        &ServeOptions::server_url(addr),
        watcher.root(),
        summary.files,
        summary.bytes,
    );
    ui::info("Press Ctrl+C to stop");

    let outcome = run(session, results_rx).await;
    feeder.abort();
    drop(watcher);
    outcome?;

    ui::success("Development server stopped");
    Ok(())
}

fn build_session(config: &ServeConfig, options: ServeOptions) -> Result<DevSession> {
    let mut builder = DevSession::builder(options);

    if let Some(dir) = &config.locale_data_dir {
        let resolver = LocaleResolver::new("", Arc::new(DirectoryModuleResolver::new(dir)));
        let headers = CustomHeaders::parse(&config.headers)?;
        builder = builder.extension(Arc::new(LocaleDataMiddleware::new(resolver, headers)));
    }

    Ok(builder.build()?)
}

async fn run(mut session: DevSession, results: mpsc::Receiver<BuildResult>) -> Result<()> {
    session
        .run(results, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            ui::info("Shutting down development server...");
        })
        .await?;
    Ok(())
}

fn output_source(config: &ServeConfig) -> OutputDirSource {
    let source = OutputDirSource::new(config.output_dir.clone());
    match nested_write_dir(config) {
        Some(nested) => source.with_excluded(nested),
        None => source,
    }
}

/// The mirror directory relative to the output directory, when nested in it.
///
/// Neither watched nor snapshotted, or every rebuild would mirror the
/// previous mirror.
fn nested_write_dir(config: &ServeConfig) -> Option<PathBuf> {
    let write = config.write.as_ref()?;
    if let Ok(nested) = write.strip_prefix(&config.output_dir) {
        return Some(nested.to_path_buf());
    }
    let output_dir = config.output_dir.canonicalize().ok()?;
    let write = match write.canonicalize() {
        Ok(write) => write,
        Err(_) => std::path::absolute(write).ok()?,
    };
    write.strip_prefix(output_dir).ok().map(Path::to_path_buf)
}

/// Patterns the watcher skips: editor temp files and a nested mirror
/// directory.
fn ignore_patterns(config: &ServeConfig) -> Vec<String> {
    let mut patterns = vec!["*.tmp".to_string(), "*.swp".to_string(), "*~".to_string()];
    if let Some(nested) = nested_write_dir(config) {
        patterns.push(nested.to_string_lossy().into_owned());
    }
    patterns
}

/// Re-snapshot the output directory after each burst of changes.
async fn feed_rebuilds(
    source: OutputDirSource,
    mut changes: mpsc::Receiver<FileChange>,
    results: mpsc::Sender<BuildResult>,
) {
    while let Some(batch) = next_batch(&mut changes, DEBOUNCE).await {
        tracing::debug!(changes = batch.len(), "output directory changed");

        let snapshot_source = source.clone();
        let snapshot = match tokio::task::spawn_blocking(move || snapshot_source.snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Snapshot task failed: {}", e);
                continue;
            }
        };

        match snapshot {
            Ok(result) => {
                if results.send(result).await.is_err() {
                    break;
                }
            }
            Err(e) => ui::error(&format!(
                "Failed to read {}: {}",
                source.root().display(),
                e
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_write_dir_is_ignored() {
        let config = ServeConfig {
            output_dir: PathBuf::from("dist"),
            write: Some(PathBuf::from("dist/mirror")),
            ..ServeConfig::default()
        };
        assert!(ignore_patterns(&config).contains(&"mirror".to_string()));

        let outside = ServeConfig {
            write: Some(PathBuf::from("public")),
            ..config
        };
        assert_eq!(ignore_patterns(&outside).len(), 3);
    }

    #[tokio::test]
    async fn test_nested_write_dir_is_not_mirrored_again() {
        let out = tempfile::tempdir().unwrap();
        std::fs::write(out.path().join("main.js"), "main()").unwrap();
        let mirror = out.path().join("mirror");
        let config = ServeConfig {
            output_dir: out.path().to_path_buf(),
            write: Some(mirror.clone()),
            ..ServeConfig::default()
        };

        let source = output_source(&config);
        let mut session = DevSession::new(
            ServeOptions::new("127.0.0.1:0".parse().unwrap()).with_write_dir(&mirror),
        )
        .unwrap();
        for _ in 0..3 {
            session.apply(source.snapshot().unwrap()).await.unwrap();
        }

        let snapshot = session.state().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(mirror.join("main.js").exists());
        assert!(!mirror.join("mirror").exists());
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_feed_rebuilds_snapshots_each_batch() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.js"), "a").unwrap();

        let (change_tx, change_rx) = mpsc::channel(8);
        let (result_tx, mut result_rx) = mpsc::channel(8);
        let feeder = tokio::spawn(feed_rebuilds(
            OutputDirSource::new(dir.path()),
            change_rx,
            result_tx,
        ));

        change_tx
            .send(FileChange::Modified(dir.path().join("main.js")))
            .await
            .unwrap();
        let result = result_rx.recv().await.unwrap();
        assert!(result.success);
        assert_eq!(result.output_files[0].path, "main.js");

        drop(change_tx);
        feeder.await.unwrap();
        assert!(result_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_locale_extension_is_installed() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let data = tempfile::tempdir().unwrap();
        std::fs::write(data.path().join("fr.mjs"), "export const fr = 1;").unwrap();
        let config = ServeConfig {
            locale_data_dir: Some(data.path().to_path_buf()),
            ..ServeConfig::default()
        };

        let session = build_session(&config, ServeOptions::default()).unwrap();
        let response = session
            .router()
            .oneshot(
                Request::builder()
                    .uri("/__fob_locale__/fr-CA.js")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"export const fr = 1;");
    }
}
