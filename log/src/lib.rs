//! Logging setup for marten with file output and optional stdout.
//!
//! Logs always go to a file at `warn` level (or higher if a filter is set).
//! Stdout logging is enabled when `MARTEN_LOG` or `RUST_LOG` is set, or in
//! debug builds.
//!
//! ## Environment Variables
//!
//! 1. **`MARTEN_LOG`** (highest priority) - marten-specific logging control
//! 2. **`RUST_LOG`** - Standard tracing environment variable
//! 3. **Default** - `warn` globally, `info` for marten crates
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/marten/logs/marten-<pid>.log`
//! - macOS: `~/Library/Application Support/marten/logs/marten-12345.log`
//! - Linux: `~/.local/share/marten/logs/marten-12345.log`
//!
//! Override with `--log-file <path>` or a [`LogConfig`] path.

use std::{env, path::PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// Returned from [`init`]; must be held alive to ensure log file flushing.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Default)]
pub struct LogConfig {
    pub log_file_path: Option<PathBuf>,
}

/// Initialize logging.
///
/// This function respects the environment variable priority described in the
/// module docs: `MARTEN_LOG` > `RUST_LOG` > default settings.
///
/// The returned [`LogGuard`] must be held for the lifetime of the program --
/// dropping it flushes and stops the background file writer.
pub fn init(config: LogConfig) -> Result<LogGuard, Box<dyn std::error::Error + Send + Sync>> {
    let (log_dir, filename) = resolve_log_path(config.log_file_path);

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_filter = create_file_filter();
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(file_filter);

    let stdout_enabled =
        env::var("MARTEN_LOG").is_ok() || env::var("RUST_LOG").is_ok() || cfg!(debug_assertions);

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
/// Identical to [`init`] but stdout-only (no file output). Will not crash if
/// called multiple times or if logging is already initialized by another
/// test.
pub fn test() {
    let _ = test_init();
}

fn test_init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = create_filter();
    fmt().with_env_filter(filter).try_init()?;
    Ok(())
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("marten-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
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
        .join("marten")
        .join("logs");

    (dir, filename)
}

/// File filter: uses the user-specified level if set, otherwise defaults to
/// `warn`.
fn create_file_filter() -> EnvFilter {
    if env::var("MARTEN_LOG").is_ok() || env::var("RUST_LOG").is_ok() {
        return create_filter();
    }
    EnvFilter::new("warn")
}

/// Create the appropriate [`EnvFilter`] based on environment variables.
///
/// Implements the priority system: `MARTEN_LOG` > `RUST_LOG` > defaults.
fn create_filter() -> EnvFilter {
    if let Ok(marten_log) = env::var("MARTEN_LOG") {
        return expand_marten_log(&marten_log);
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }

    // Default: warn globally, info for marten crates
    EnvFilter::new("warn,marten_core=info,marten_bin=info")
}

/// Expand `MARTEN_LOG` values into full tracing filter strings.
///
/// This function provides the user-friendly experience where:
/// - `MARTEN_LOG=debug` becomes `warn,marten_core=debug,marten_bin=debug`
/// - `MARTEN_LOG=marten_core=trace` is used as-is (advanced syntax)
fn expand_marten_log(marten_log: &str) -> EnvFilter {
    // Module-specific syntax passes through untouched, so advanced usage like
    // MARTEN_LOG=marten_core=debug,marten_bin=trace keeps working.
    if marten_log.contains('=') || marten_log.contains(':') || marten_log.contains(',') {
        return EnvFilter::new(marten_log);
    }

    EnvFilter::new(format!(
        "warn,marten_core={marten_log},marten_bin={marten_log}"
    ))
}
