//! Logging setup for Quill with file output and optional stdout.
//!
//! Logs always go to a file at `warn` level (or whatever `QUILL_LOG`/`RUST_LOG` asks for).
//! Stdout logging is enabled when `QUILL_LOG` or `RUST_LOG` is set, or in debug builds.
//!
//! ## Environment Variables
//!
//! 1. **`QUILL_LOG`** (highest priority) - Quill-specific logging control
//! 2. **`RUST_LOG`** - Standard tracing environment variable
//! 3. **Default** - `warn` globally, `info` for quill crates
//!
//! `QUILL_LOG=debug` expands to every quill crate. Anything containing `=`, `:` or `,`
//! is passed to [`EnvFilter`] untouched, e.g. `QUILL_LOG=quill::session=trace`.
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/quill/logs/quill-<pid>.log`
//! - macOS: `~/Library/Application Support/quill/logs/quill-12345.log`
//! - Linux: `~/.local/share/quill/logs/quill-12345.log`
//!
//! Override with `--log-file <path>` or `QUILL_LOG_FILE`.

use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

const QUILL_CRATES: &[&str] = &[
    "quill",
    "quill_bin",
    "quill_client",
    "quill_setup_assistant",
];

type InitError = Box<dyn std::error::Error + Send + Sync>;

/// Returned from [`init`]; must be held alive to ensure log file flushing.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Default)]
pub struct LogConfig {
    pub log_file_path: Option<PathBuf>,
}

/// Initialize logging.
///
/// The returned [`LogGuard`] must be held for the lifetime of the program --
/// dropping it flushes and stops the background file writer.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: LogConfig) -> Result<LogGuard, InitError> {
    let override_path = config
        .log_file_path
        .or_else(|| env::var_os("QUILL_LOG_FILE").map(PathBuf::from));
    let (log_dir, filename) = resolve_log_path(override_path);

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_file_filter());

    let stdout_layer = stdout_enabled().then(|| fmt::layer().with_filter(create_filter()));

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
/// Stdout-only, no file output. Safe to call from every test; later calls
/// are ignored once a subscriber is installed.
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter())
        .with_test_writer()
        .try_init();
}

fn stdout_enabled() -> bool {
    env::var("QUILL_LOG").is_ok() || env::var("RUST_LOG").is_ok() || cfg!(debug_assertions)
}

/// Split an optional override into `(directory, file name)`.
///
/// A path with an extension names the log file itself; anything else is
/// treated as the directory to place `quill-<pid>.log` in.
fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("quill-{}.log", std::process::id());

    match override_path {
        Some(path) if path.extension().is_some() => {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            (dir, name)
        },
        Some(dir) => (dir, filename),
        None => {
            let dir = dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quill")
                .join("logs");
            (dir, filename)
        },
    }
}

/// File filter: uses the user-specified level if set, otherwise `warn`.
fn create_file_filter() -> EnvFilter {
    if env::var("QUILL_LOG").is_ok() || env::var("RUST_LOG").is_ok() {
        return create_filter();
    }
    EnvFilter::new("warn")
}

/// `QUILL_LOG` > `RUST_LOG` > defaults.
fn create_filter() -> EnvFilter {
    if let Ok(quill_log) = env::var("QUILL_LOG") {
        return EnvFilter::new(expand_quill_log(&quill_log));
    }

    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }

    EnvFilter::new(expand_quill_log("info"))
}

/// Expand a `QUILL_LOG` value into a full directive string.
fn expand_quill_log(value: &str) -> String {
    if value.contains('=') || value.contains(':') || value.contains(',') {
        return value.to_string();
    }

    let mut directives = vec!["warn".to_string()];
    directives.extend(QUILL_CRATES.iter().map(|krate| format!("{krate}={value}")));
    directives.join(",")
}
