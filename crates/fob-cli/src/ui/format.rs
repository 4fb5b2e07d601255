//! Formatting for sizes, durations, the serve banner and locale results.

use super::colors_enabled;
use console::Term;
use fob_serve::LocaleMatch;
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Duration;

/// Format a byte count with the largest fitting unit.
///
/// # Examples
///
/// ```
/// use fob_cli::ui::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

/// Format a duration as `ms`, fractional seconds, or `Xm Ys`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use fob_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    match duration.as_millis() {
        ms if ms < 1000 => format!("{}ms", ms),
        ms if ms < 60_000 => format!("{:.2}s", duration.as_secs_f64()),
        _ => {
            let secs = duration.as_secs();
            format!("{}m {}s", secs / 60, secs % 60)
        }
    }
}

/// Print the startup banner to stderr.
pub fn print_serve_banner(url: &str, output_dir: &Path, files: usize, bytes: u64) {
    let width = Term::stderr().size().1 as usize;
    let rule = "─".repeat(width.clamp(20, 60));
    let summary = format!("{} files, {}", files, format_size(bytes));

    if colors_enabled() {
        eprintln!("\n{}", "fob dev server".bold().underline());
        eprintln!("{}", rule.dimmed());
        eprintln!("  {} {}", "Local:".bold(), url.cyan());
        eprintln!("  {} {}", "Serving:".bold(), output_dir.display());
        eprintln!("  {} {}", "Outputs:".bold(), summary.dimmed());
        eprintln!("{}", rule.dimmed());
    } else {
        eprintln!("\nfob dev server");
        eprintln!("{}", rule);
        eprintln!("  Local: {}", url);
        eprintln!("  Serving: {}", output_dir.display());
        eprintln!("  Outputs: {}", summary);
        eprintln!("{}", rule);
    }
}

/// One line per resolution, as printed by `fob locale`.
pub fn locale_line(result: &LocaleMatch) -> String {
    match (&result.matched_locale, &result.resolved_module_path) {
        (Some(matched), Some(path)) if result.exact => {
            format!("{}\texact\t{}\t{}", result.requested_locale, matched, path.display())
        }
        (Some(matched), Some(path)) => {
            format!("{}\tfallback\t{}\t{}", result.requested_locale, matched, path.display())
        }
        _ => format!("{}\tmissing", result.requested_locale),
    }
}

/// Print locale resolutions to stdout.
pub fn print_locale_table(results: &[LocaleMatch]) {
    for result in results {
        println!("{}", locale_line(result));
    }
}
