//! Centralized file-based logging system
//!
//! Writes logs under the configured directory, separated by log type:
//! - main/ - All engine logs, JSON
//! - error/ - Error and warning logs only
//! - oracle/ - Oracle reconciliation and divergence logs
//! - engine/ - Swap, recenter and governance logs

use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::config::LoggingConfig;

const LOG_TYPES: [&str; 4] = ["main", "error", "oracle", "engine"];

/// Initialize centralized file logging
///
/// Creates the log directory tree and sets up file appenders for each log
/// type. The returned guards must be kept alive for the duration of the
/// program or buffered lines are lost.
pub fn init_logging(config: &LoggingConfig) -> std::io::Result<Vec<WorkerGuard>> {
    if config.directory.as_os_str().is_empty() {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(console_layer())
            .init();
        return Ok(Vec::new());
    }

    let logs_dir = config.directory.as_path();
    for log_type in LOG_TYPES {
        fs::create_dir_all(logs_dir.join(log_type))?;
    }

    let mut guards = Vec::new();

    // Main log - all logs
    let (main_appender, main_guard) = create_appender(logs_dir, "main");
    guards.push(main_guard);

    // Error log - ERROR and WARN only
    let (error_appender, error_guard) = create_appender(logs_dir, "error");
    guards.push(error_guard);

    let (oracle_appender, oracle_guard) = create_appender(logs_dir, "oracle");
    guards.push(oracle_guard);

    let (engine_appender, engine_guard) = create_appender(logs_dir, "engine");
    guards.push(engine_guard);

    let main_layer = tracing_subscriber::fmt::layer()
        .with_writer(main_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .json();

    let error_layer = tracing_subscriber::fmt::layer()
        .with_writer(error_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::LevelFilter::WARN);

    let oracle_layer = tracing_subscriber::fmt::layer()
        .with_writer(oracle_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target().contains("oracle") || metadata.target().contains("feed")
        }));

    let engine_layer = tracing_subscriber::fmt::layer()
        .with_writer(engine_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            metadata.target().contains("engine") || metadata.target().contains("recenter")
        }));

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(main_layer)
        .with(error_layer)
        .with(oracle_layer)
        .with(engine_layer)
        .with(console_layer())
        .init();

    tracing::info!(directory = %logs_dir.display(), "Logging system initialized");

    Ok(guards)
}

/// Console output on stderr; stdout carries replay output
fn console_layer<S>() -> impl Layer<S>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span> + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
}

/// RUST_LOG wins over the configured directive
fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter))
}

/// Create a daily rolling file appender
fn create_appender(logs_dir: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, logs_dir.join(name), name);
    tracing_appender::non_blocking(appender)
}

/// Log macro helpers for specific log types
#[macro_export]
macro_rules! log_oracle {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "oracle", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_engine {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "engine", $level, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_recenter {
    ($level:expr, $($arg:tt)+) => {
        tracing::event!(target: "recenter", $level, $($arg)+)
    };
}
