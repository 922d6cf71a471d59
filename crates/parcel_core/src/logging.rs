//! Process-wide logging bootstrap for the parcel tracker.
//!
//! # Responsibility
//! - Start a size-rotated file logger once per process.
//! - Capture panics into the log with a sanitized payload.
//!
//! # Invariants
//! - Repeating `init_logging` with the same settings is a no-op.
//! - Conflicting re-initialization is rejected, never silently applied.
//! - Initialization never panics.
//! - Log events carry metadata only; parcel addresses are never logged.

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_FILE_BASENAME: &str = "parcel_tracker";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static ACTIVE_LOGGER: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Validated logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: &'static str,
    log_dir: PathBuf,
}

impl LogSettings {
    fn parse(level: &str, log_dir: &str) -> Result<Self, String> {
        Ok(Self {
            level: parse_level(level)?,
            log_dir: parse_log_dir(log_dir)?,
        })
    }

    fn ensure_matches(&self, active: &LogSettings) -> Result<(), String> {
        if active.log_dir != self.log_dir {
            return Err(format!(
                "logging already writes to `{}`; refusing to switch to `{}`",
                active.log_dir.display(),
                self.log_dir.display()
            ));
        }
        if active.level != self.level {
            return Err(format!(
                "logging already runs at level `{}`; refusing to switch to `{}`",
                active.level, self.level
            ));
        }
        Ok(())
    }
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - Unsupported level, or empty / relative `log_dir`.
/// - Directory creation or logger backend failure.
/// - Logging already active with a different level or directory.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let requested = LogSettings::parse(level, log_dir)?;

    if let Some(active) = ACTIVE_LOGGER.get() {
        return requested.ensure_matches(&active.settings);
    }

    let active = ACTIVE_LOGGER.get_or_try_init(|| start_logger(requested.clone()))?;
    requested.ensure_matches(&active.settings)
}

/// Returns `(level, log_dir)` of the active logger, if any.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE_LOGGER
        .get()
        .map(|active| (active.settings.level, active.settings.log_dir.clone()))
}

/// Default level: `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(settings: LogSettings) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&settings.log_dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            settings.log_dir.display()
        )
    })?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", settings.level))?
        .log_to_file(
            FileSpec::default()
                .directory(settings.log_dir.as_path())
                .basename(LOG_FILE_BASENAME),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook();

    info!(
        "event=logging_start module=core status=ok version={} level={} log_dir={}",
        env!("CARGO_PKG_VERSION"),
        settings.level,
        settings.log_dir.display()
    );

    Ok(ActiveLogger {
        settings,
        _handle: handle,
    })
}

fn parse_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn parse_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(format!("log_dir must be an absolute path, got `{trimmed}`"));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            single_line(&payload, MAX_PANIC_PAYLOAD_CHARS)
        );
        previous_hook(panic_info);
    }));
}

/// Flattens newlines and caps length so one event stays on one log line.
fn single_line(value: &str, max_chars: usize) -> String {
    let flattened = value.replace(['\n', '\r'], " ");
    let mut capped = flattened.chars().take(max_chars).collect::<String>();
    if flattened.chars().count() > max_chars {
        capped.push_str("...");
    }
    capped
}

#[cfg(test)]
mod tests {
    use super::{init_logging, logging_status, parse_level, parse_log_dir, single_line};

    #[test]
    fn parse_level_normalizes_case_and_aliases() {
        assert_eq!(parse_level("INFO").unwrap(), "info");
        assert_eq!(parse_level(" warning ").unwrap(), "warn");
        assert!(parse_level("verbose").unwrap_err().contains("unsupported"));
    }

    #[test]
    fn parse_log_dir_rejects_relative_and_empty_paths() {
        assert!(parse_log_dir("logs/dev").unwrap_err().contains("absolute"));
        assert!(parse_log_dir("   ").unwrap_err().contains("empty"));
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        let flattened = single_line("line1\nline2\rline3", 8);
        assert_eq!(flattened, "line1 li...");
        assert_eq!(single_line("short", 8), "short");
    }

    #[test]
    fn init_logging_is_idempotent_and_rejects_conflicts() {
        // The logger is process-wide; its directory must outlive this test.
        let dir = tempfile::tempdir().unwrap().into_path();
        let other = tempfile::tempdir().unwrap();
        let dir_str = dir.to_str().unwrap();
        let other_str = other.path().to_str().unwrap();

        init_logging("info", dir_str).unwrap();
        init_logging("INFO", dir_str).unwrap();

        let level_err = init_logging("debug", dir_str).unwrap_err();
        assert!(level_err.contains("refusing to switch"));
        let dir_err = init_logging("info", other_str).unwrap_err();
        assert!(dir_err.contains("refusing to switch"));

        let (level, active_dir) = logging_status().unwrap();
        assert_eq!(level, "info");
        assert_eq!(active_dir, dir);
        assert!(active_dir.is_dir());
    }
}
