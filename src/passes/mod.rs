pub mod check;
pub mod sync;

pub use check::{run_check, CheckReport};
pub use sync::{run_sync, SyncReport};

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner ticked once per visited file. Hidden when `visible` is false.
pub fn spinner(visible: bool, message: &'static str) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} {pos} files") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
