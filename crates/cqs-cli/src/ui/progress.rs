//! Progress indicators for long-running CLI operations.
//!
//! Spinners are shown only on an interactive TTY and never in quiet or JSON
//! mode, so machine-readable output stays clean.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::color::ColorMode;

/// Progress feedback mode based on output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Interactive TTY: show animated spinners
    Interactive,
    /// Non-TTY or quiet: suppress progress, show only final results
    Quiet,
    /// Machine-readable: no progress at all (for --json)
    Silent,
}

impl ProgressMode {
    /// Detect the appropriate mode from flags and environment.
    pub fn detect(quiet: bool, json: bool, color_mode: ColorMode) -> Self {
        if json {
            Self::Silent
        } else if quiet || !std::io::stdout().is_terminal() {
            Self::Quiet
        } else if color_mode.is_enabled() || std::io::stdout().is_terminal() {
            Self::Interactive
        } else {
            Self::Quiet
        }
    }

    /// Check if progress should be shown.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

/// Spinner tick characters (Braille-based).
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// A spinner for indeterminate operations.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    /// Create a spinner with a message.
    ///
    /// ```ignore
    /// let progress = Progress::spinner("Indexing repository...", mode);
    /// // ... do work ...
    /// progress.finish_and_clear();
    /// ```
    pub fn spinner(message: &str, mode: ProgressMode) -> Self {
        let bar = if mode.is_interactive() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .tick_chars(SPINNER_CHARS)
                    .template("{spinner} {msg}")
                    .expect("static template is valid"),
            );
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };

        Self { bar }
    }

    /// Update the spinner message.
    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Stop the spinner and remove it from the terminal.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mode_is_silent() {
        let mode = ProgressMode::detect(false, true, ColorMode::Always);
        assert_eq!(mode, ProgressMode::Silent);
    }

    #[test]
    fn test_quiet_flag_suppresses_progress() {
        let mode = ProgressMode::detect(true, false, ColorMode::Always);
        assert!(!mode.is_interactive() || mode == ProgressMode::Quiet);
    }

    #[test]
    fn test_hidden_spinner_is_safe() {
        let progress = Progress::spinner("working", ProgressMode::Quiet);
        progress.set_message("still working");
        progress.finish_and_clear();
    }
}
