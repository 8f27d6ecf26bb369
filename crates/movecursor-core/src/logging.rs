//! Logging setup: console output plus an optional log file.
//!
//! ## Filter priority
//!
//! 1. **`MOVE_CURSOR_LOG`** - a bare level (`debug`) applies to the movecursor
//!    crates; anything with `=`, `,` or `:` is used as a full filter directive
//! 2. **`RUST_LOG`** - standard tracing environment variable
//! 3. **`log_level`** from the config file
//!
//! Console lines are formatted as `HH:MM:SS LEVEL message`. The file layer, when
//! configured, writes the same events without ANSI colors through a
//! non-blocking writer.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{Config, LogRotation};

const TIME_FORMAT: &str = "%H:%M:%S";
const CRATES: &[&str] = &["movecursor", "movecursor_core"];

/// Logging options resolved from [`Config`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    pub rotation: LogRotation,
    pub max_files: usize,
}

impl From<&Config> for LogConfig {
    fn from(config: &Config) -> Self {
        Self {
            level: config.log_level.clone(),
            file: config.resolved_log_file(),
            rotation: config.log_rotation,
            max_files: config.log_max_files,
        }
    }
}

/// Returned from [`init`]; must be held alive to keep the file writer flushing.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
    pub log_file: Option<PathBuf>,
}

/// Installs the global tracing subscriber.
///
/// Fails if the level is not a valid filter, the log directory cannot be
/// created, or a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<LogGuard> {
    let console_layer = fmt::layer()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(false)
        .with_filter(create_filter(&config.level)?);

    let (file_layer, file_guard) = match &config.file {
        Some(path) => {
            let appender = file_appender(path, config.rotation, config.max_files)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(create_filter(&config.level)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("install tracing subscriber")?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: config.file.clone(),
    })
}

/// Initialize logging for tests. Safe to call from every test.
pub fn test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

fn file_appender(path: &Path, rotation: LogRotation, max_files: usize) -> Result<RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let filename = path
        .file_name()
        .with_context(|| format!("log file has no file name: {}", path.display()))?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let rotation = match rotation {
        LogRotation::Never => Rotation::NEVER,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(filename.to_string_lossy().into_owned());
    if max_files > 0 {
        builder = builder.max_log_files(max_files);
    }

    builder
        .build(dir)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Builds the [`EnvFilter`] following the priority in the module docs.
fn create_filter(configured_level: &str) -> Result<EnvFilter> {
    if let Ok(value) = env::var("MOVE_CURSOR_LOG") {
        return parse_filter(&expand_level(&value));
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return parse_filter(&rust_log);
    }

    parse_filter(&expand_level(configured_level))
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives).with_context(|| format!("invalid log filter '{directives}'"))
}

/// Expands a bare level into `warn,<crate>=<level>,...`.
///
/// Values that already look like directives are returned unchanged.
fn expand_level(value: &str) -> String {
    let value = value.trim();
    if value.contains('=') || value.contains(':') || value.contains(',') {
        return value.to_string();
    }

    let level = normalize_level(value);
    let mut directives = String::from("warn");
    for krate in CRATES {
        directives.push(',');
        directives.push_str(krate);
        directives.push('=');
        directives.push_str(level);
    }
    directives
}

/// Maps level names accepted in config files to tracing levels.
fn normalize_level(value: &str) -> &str {
    match value.to_ascii_lowercase().as_str() {
        "warning" => "warn",
        "critical" | "fatal" => "error",
        "" => "info",
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_bare_level() {
        assert_eq!(
            expand_level("debug"),
            "warn,movecursor=debug,movecursor_core=debug"
        );
    }

    #[test]
    fn test_expand_keeps_directives() {
        assert_eq!(
            expand_level("movecursor_core::controller=trace"),
            "movecursor_core::controller=trace"
        );
        assert_eq!(expand_level("info,evdev=warn"), "info,evdev=warn");
    }

    #[test]
    fn test_python_style_level_names() {
        assert_eq!(
            expand_level("WARNING"),
            "warn,movecursor=warn,movecursor_core=warn"
        );
        assert_eq!(
            expand_level("critical"),
            "warn,movecursor=error,movecursor_core=error"
        );
        assert_eq!(
            expand_level(""),
            "warn,movecursor=info,movecursor_core=info"
        );
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        assert!(parse_filter(&expand_level("loud")).is_err());
    }

    #[test]
    fn test_log_config_from_config() {
        let config = Config {
            log_level: "debug".to_string(),
            log_rotation: LogRotation::Daily,
            log_max_files: 3,
            ..Config::default()
        };
        let log_config = LogConfig::from(&config);
        assert_eq!(log_config.level, "debug");
        assert_eq!(log_config.file, None);
        assert_eq!(log_config.rotation, LogRotation::Daily);
        assert_eq!(log_config.max_files, 3);
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("move-cursor.log");

        let appender = file_appender(&path, LogRotation::Never, 0);
        assert!(appender.is_ok());
        assert!(dir.path().join("nested").is_dir());
    }
}
