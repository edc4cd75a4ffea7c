//! Shared observability helpers for the binary and integration tests.
//!
//! CI runners read stderr, so the default sink is a stderr `fmt` layer. A
//! daily rolling file sink is added only when a log directory is configured
//! (explicitly or through `DEPLOYLINK_LOG_DIR`). Call [`init_logging`] once
//! near process start; later callers are no-ops and get back the resolved
//! file path, if any.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Local;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_INIT: OnceLock<Option<PathBuf>> = OnceLock::new();

const LOG_DIR_ENV: &str = "DEPLOYLINK_LOG_DIR";

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical name of the component (used for file names).
    pub app_name: &'static str,
    /// Optional directory for a rolling file sink. If `None`, we consult
    /// `DEPLOYLINK_LOG_DIR`; without either, only stderr is used.
    pub log_dir: Option<PathBuf>,
    /// Whether to emit events to `stderr`.
    pub emit_stderr: bool,
    /// Preferred log encoding.
    pub format: LogFormat,
    /// Default filter applied when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "deploylink",
            log_dir: None,
            emit_stderr: true,
            format: LogFormat::Text,
            default_filter: "info".into(),
        }
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Returns the log file path for the current day when a file sink is active.
pub fn init_logging(config: LogConfig) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = LOG_INIT.get() {
        return Ok(path.clone());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut full_path = None;

    if let Some(dir) = resolve_log_dir(config.log_dir.as_deref()) {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

        let log_filename = format!("{}.log", config.app_name);
        let today = Local::now().format("%Y-%m-%d").to_string();
        full_path = Some(dir.join(format!("{log_filename}.{today}")));

        let appender = rolling::daily(&dir, log_filename);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);

        layers.push(match config.format {
            LogFormat::Text => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
        });
    }

    if config.emit_stderr {
        layers.push(match config.format {
            LogFormat::Text => fmt::layer().with_writer(std::io::stderr).boxed(),
            LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let _ = LOG_INIT.set(full_path.clone());
    Ok(full_path)
}

fn resolve_log_dir(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = explicit {
        return Some(expand_home(dir));
    }

    match std::env::var(LOG_DIR_ENV) {
        Ok(env_dir) if !env_dir.trim().is_empty() => Some(expand_home(Path::new(&env_dir))),
        _ => None,
    }
}

fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}
