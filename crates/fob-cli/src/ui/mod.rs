//! Terminal output for the fob CLI.
//!
//! Status lines go to stderr so stdout stays free for command output such as
//! `fob locale` results.
//!
//! # Examples
//!
//! ```no_run
//! use fob_cli::ui;
//!
//! ui::init_colors(false);
//! ui::success("Serving dist/");
//! ui::warning("Port 4200 is busy, using port 4201 instead");
//! ```

mod format;
mod messages;

pub use format::{format_duration, format_size, print_locale_table, print_serve_banner};
pub use messages::{error, info, success, warning};

use std::sync::atomic::{AtomicBool, Ordering};

static COLORS: AtomicBool = AtomicBool::new(true);

/// Check if color output should be enabled.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` enables them even without a
/// terminal; otherwise stderr must be attended.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Decide once whether status output is colored.
pub fn init_colors(no_color: bool) {
    let enabled = !no_color && should_use_color();
    COLORS.store(enabled, Ordering::Relaxed);
    console::set_colors_enabled_stderr(enabled);
}

/// Whether status output is colored.
pub fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}
