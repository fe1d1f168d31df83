//! Logging setup for Tandem hosts, with file output and optional stdout.
//!
//! Logs always go to a file at `warn` level (or lower if a filter variable is set).
//! Stdout logging is enabled when `TANDEM_LOG` or `RUST_LOG` is set, or in debug builds.
//!
//! ## Environment Variables
//!
//! 1. **`TANDEM_LOG`** (highest priority) - Tandem-specific logging control
//! 2. **`RUST_LOG`** - Standard tracing environment variable
//! 3. **Default** - `warn` globally, `info` for tandem crates
//!
//! ```bash
//! # Debug level for every tandem crate
//! TANDEM_LOG=debug
//!
//! # Key flow tracing for the input pipeline only
//! TANDEM_LOG=tandem::bridge=trace
//! ```
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/tandem/logs/tandem-<pid>.log`
//! - macOS: `~/Library/Application Support/tandem/logs/tandem-12345.log`
//! - Linux: `~/.local/share/tandem/logs/tandem-12345.log`

use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Crates whose level follows a bare `TANDEM_LOG=<level>`.
const TANDEM_CRATES: &[&str] = &["tandem", "tandem_log"];

/// Returned from [`init`]; must be held alive to ensure log file flushing.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Default)]
pub struct LogConfig {
    /// File or directory override. A path with an extension is treated as a file.
    pub log_file_path: Option<PathBuf>,
}

/// Initialize logging.
///
/// Respects the priority described in the module docs:
/// `TANDEM_LOG` > `RUST_LOG` > default settings.
///
/// The returned [`LogGuard`] must be held for the lifetime of the host plugin --
/// dropping it flushes and stops the background file writer.
pub fn init(config: LogConfig) -> Result<LogGuard, BoxError> {
    let (log_dir, filename) = resolve_log_path(config.log_file_path);

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_file_filter());

    let stdout_enabled =
        env::var("TANDEM_LOG").is_ok() || env::var("RUST_LOG").is_ok() || cfg!(debug_assertions);

    let stdout_layer = if stdout_enabled {
        Some(fmt::layer().with_filter(create_filter()))
    } else {
        None
    };

    Registry::default()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Initialize logging for tests.
///
/// Stdout-only, through the test writer so output is captured per test.
/// Will not crash if called multiple times or if another test got there first.
#[allow(clippy::let_unit_value)]
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter())
        .with_test_writer()
        .try_init();
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("tandem-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir.to_path_buf(), name);
        }
        return (path, filename);
    }

    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tandem")
        .join("logs");

    (dir, filename)
}

/// File filter: uses the user-specified level if set, otherwise `warn`.
fn create_file_filter() -> EnvFilter {
    if env::var("TANDEM_LOG").is_ok() || env::var("RUST_LOG").is_ok() {
        return create_filter();
    }
    EnvFilter::new("warn")
}

fn create_filter() -> EnvFilter {
    if let Ok(tandem_log) = env::var("TANDEM_LOG") {
        return expand_tandem_log(&tandem_log);
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }

    EnvFilter::new(filter_directives("info"))
}

/// Expand `TANDEM_LOG` values into full tracing filter strings.
///
/// - `TANDEM_LOG=debug` becomes `warn,tandem=debug,tandem_log=debug`
/// - `TANDEM_LOG=tandem::bridge=trace` is used as-is (advanced syntax)
fn expand_tandem_log(tandem_log: &str) -> EnvFilter {
    if is_directive_syntax(tandem_log) {
        return EnvFilter::new(tandem_log);
    }
    EnvFilter::new(filter_directives(tandem_log))
}

fn is_directive_syntax(value: &str) -> bool {
    value.contains('=') || value.contains(':') || value.contains(',')
}

fn filter_directives(level: &str) -> String {
    let mut directives = String::from("warn");
    for krate in TANDEM_CRATES {
        directives.push_str(&format!(",{krate}={level}"));
    }
    directives
}
