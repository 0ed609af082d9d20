//! Progress indicators and status lines for the hdrplot CLI
//!
//! Provides spinners and progress bars using indicatif, with automatic
//! TTY detection and verbose/quiet mode support. Everything goes to stderr.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

// --- Global State ---

static VERBOSE: AtomicBool = AtomicBool::new(false);
static QUIET: AtomicBool = AtomicBool::new(false);

/// Set global verbose mode (shows raw command output)
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Set global quiet mode (minimal output)
pub fn set_quiet(q: bool) {
    QUIET.store(q, Ordering::SeqCst);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::SeqCst)
}

/// Check if we're running in a TTY (interactive terminal)
pub fn is_tty() -> bool {
    std::io::stderr().is_terminal()
}

fn animated() -> bool {
    is_tty() && !is_verbose() && !is_quiet()
}

// --- Spinner ---

/// A spinner for long-running external steps with elapsed time
pub struct Spinner {
    bar: ProgressBar,
    message: String,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let bar = if animated() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg} [{elapsed}]")
                    .expect("Invalid spinner template")
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
            pb.set_message(message.to_string());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            if !is_quiet() {
                eprintln!("  {} {}...", "→".cyan(), message);
            }
            ProgressBar::hidden()
        };

        Self {
            bar,
            message: message.to_string(),
        }
    }

    pub fn finish_success(&self) {
        let line = format!(
            "{} {} [{}]",
            "\u{2713}".green(),
            self.message,
            format_duration(self.bar.elapsed())
        );
        if animated() {
            self.bar.finish_with_message(line);
        } else if !is_quiet() {
            eprintln!("  {}", line);
        }
    }

    pub fn finish_error(&self, err_msg: Option<&str>) {
        let msg = match err_msg {
            Some(e) => format!("{} - {}", self.message, e),
            None => self.message.clone(),
        };
        let line = format!("{} {}", "\u{2717}".red(), msg);
        if animated() {
            self.bar.finish_with_message(line);
        } else if !is_quiet() {
            eprintln!("  {}", line);
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

// --- Progress Bar ---

/// A progress bar for frame measurement. Falls back to a spinner-style
/// counter when the frame count is unknown.
pub struct Progress {
    bar: ProgressBar,
}

impl Progress {
    pub fn new(total: Option<u64>, message: &str) -> Self {
        let bar = if !animated() {
            ProgressBar::hidden()
        } else if let Some(total) = total {
            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "  {spinner:.cyan} {msg} [{bar:30.cyan/dim}] {pos}/{len} {per_sec} ({eta})",
                    )
                    .expect("Invalid progress template")
                    .progress_chars("━━─"),
            );
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner:.cyan} {msg} {pos} frames {per_sec} [{elapsed}]")
                    .expect("Invalid progress template"),
            );
            pb
        };
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

// --- Step Printer ---

/// Print a step header (for major pipeline stages)
pub fn print_step(step: u8, total: u8, message: &str) {
    if !is_quiet() {
        eprintln!(
            "\n{} {}",
            format!("[{}/{}]", step, total).cyan().bold(),
            message
        );
    }
}

pub fn print_info(message: &str) {
    if !is_quiet() {
        eprintln!("  {} {}", "i".blue(), message);
    }
}

pub fn print_warn(message: &str) {
    if !is_quiet() {
        eprintln!("  {} {}", "!".yellow(), message.yellow());
    }
}

/// Printed even in quiet mode: it names the file the user asked for.
pub fn print_success(message: &str) {
    eprintln!("{} {}", "\u{2713}".green().bold(), message.green());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "\u{2717}".red().bold(), message.red());
}

// --- Helpers ---

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
