//! Logging system configuration and initialization
//!
//! Output routing:
//! - console: events of exactly INFO level go to stdout, WARN and above to
//!   stderr, both as bare messages
//! - log file: INFO and above, timestamped
//! - debug file: whatever the `log_level` setting (or `RUST_LOG`) accepts,
//!   timestamped and with the level name
//!
//! Files are written through non-blocking appenders; the returned
//! [`LogGuards`] must stay alive until the program exits so they get flushed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Level, error, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::{EnvFilter, LevelFilter, filter_fn};
use tracing_subscriber::fmt::{self, time::FormatTime};
use tracing_subscriber::{Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::{APP_NAME, Settings};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const ERROR_MARKER: &str = "*** ";
const WARNING_HEADER: &str = "* Warning: ";
const ERROR_DETAILS_HEADING: &str = "Additional information about the error:";
const ERROR_DETAILS_PREAMBLE: &str = "┃ ";
const ERROR_DETAILS_TAIL: &str = "┗";

/// Keeps the file writers alive; dropping it flushes pending lines.
#[must_use]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
    pub log_file: PathBuf,
    pub debug_file: PathBuf,
}

/// Local time with milliseconds
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Names of the log and debug files for a run started at `timestamp`.
pub fn log_file_names(timestamp: &str) -> (String, String) {
    (
        format!("{APP_NAME}_log_{timestamp}.txt"),
        format!("{APP_NAME}_debug_{timestamp}.txt"),
    )
}

fn is_own_event(target: &str) -> bool {
    target.starts_with(APP_NAME)
}

/// Install the global subscriber.
pub fn init_logging(settings: &Settings) -> Result<LogGuards> {
    init_logging_in(&settings.log_dir, &settings.log_level)
}

pub fn init_logging_in(log_dir: &Path, log_level: &str) -> Result<LogGuards> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
    let (log_name, debug_name) = log_file_names(&timestamp);

    let debug_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .with_context(|| format!("Invalid log level «{log_level}»"))?;

    let (log_writer, log_guard) = non_blocking(rolling::never(log_dir, &log_name));
    let (debug_writer, debug_guard) = non_blocking(rolling::never(log_dir, &debug_name));

    let stdout_layer = fmt::Layer::new()
        .with_writer(std::io::stdout)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_filter(filter_fn(|meta| {
            *meta.level() == Level::INFO && is_own_event(meta.target())
        }));

    let stderr_layer = fmt::Layer::new()
        .with_writer(std::io::stderr)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    let log_layer = fmt::Layer::new()
        .with_writer(log_writer)
        .with_timer(LocalTimeFormatter)
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_filter(filter_fn(|meta| {
            *meta.level() <= Level::INFO && is_own_event(meta.target())
        }));

    let debug_layer = fmt::Layer::new()
        .with_writer(debug_writer)
        .with_timer(LocalTimeFormatter)
        .with_target(false)
        .with_ansi(false)
        .with_filter(debug_filter);

    Registry::default()
        .with(stdout_layer)
        .with(stderr_layer)
        .with(log_layer)
        .with(debug_layer)
        .try_init()
        .context("Failed to install the logging subscriber")?;

    tracing::debug!("Debug log started.");
    Ok(LogGuards {
        _guards: vec![log_guard, debug_guard],
        log_file: log_dir.join(log_name),
        debug_file: log_dir.join(debug_name),
    })
}

/// Lines of an operator-facing error report.
pub fn format_error_report(message: &str, details: Option<&str>) -> Vec<String> {
    let indent = " ".repeat(ERROR_MARKER.len());
    let mut lines = vec![String::new(), format!("{ERROR_MARKER}Error in {APP_NAME}.")];
    lines.extend(message.lines().map(|line| format!("{indent}{line}")));
    if let Some(details) = details.map(str::trim).filter(|d| !d.is_empty()) {
        lines.push(String::new());
        lines.push(format!("{indent}{ERROR_DETAILS_HEADING}"));
        lines.extend(
            details
                .lines()
                .map(|line| format!("{indent}{ERROR_DETAILS_PREAMBLE}{line}")),
        );
        lines.push(format!("{indent}{ERROR_DETAILS_TAIL}"));
    }
    lines
}

pub fn report_error(message: &str, details: Option<&str>) {
    for line in format_error_report(message, details) {
        error!("{line}");
    }
}

/// Single warning line, message starting in lower case.
pub fn format_warning(message: &str) -> String {
    let mut chars = message.chars();
    let message: String = match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{WARNING_HEADER}{message}")
}

pub fn report_warning(message: &str) {
    warn!("{}", format_warning(message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_names() {
        let (log, debug) = log_file_names("20240131_235959");
        assert_eq!(log, "sacamantecas_log_20240131_235959.txt");
        assert_eq!(debug, "sacamantecas_debug_20240131_235959.txt");
    }

    #[test]
    fn test_error_report_layout() {
        let lines = format_error_report("Something failed.", Some("first\nsecond\n"));
        assert_eq!(
            lines,
            vec![
                "",
                "*** Error in sacamantecas.",
                "    Something failed.",
                "",
                "    Additional information about the error:",
                "    ┃ first",
                "    ┃ second",
                "    ┗",
            ]
        );
    }

    #[test]
    fn test_error_report_without_details() {
        let lines = format_error_report("Only a message.", Some("  "));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "    Only a message.");
    }

    #[test]
    fn test_warning_lowercases_first_letter() {
        assert_eq!(
            format_warning("No metadata was obtained."),
            "* Warning: no metadata was obtained."
        );
        assert_eq!(format_warning(""), "* Warning: ");
    }
}
