//! File-based logging
//!
//! Writes logs to files in the configured directory, separated by log type:
//! - main/ - All events, JSON
//! - error/ - Error and warning logs only
//! - udp/ - Socket, receiver and request scheduler
//! - nodes/ - Decoding, registry updates, aggregates and sink writes

use super::config::LoggingConfig;
use std::fs;
use std::io;
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log file types, one subdirectory each
const LOG_TYPES: [&str; 4] = ["main", "error", "udp", "nodes"];

/// Initialize logging
///
/// Always logs to the console. With `files` enabled, also creates the log
/// directory tree and rolling file appenders. The returned guards must be kept
/// alive for the duration of the program.
pub fn init_logging(config: &LoggingConfig) -> io::Result<Vec<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    if !config.files {
        tracing_subscriber::registry()
            .with(filter)
            .with(console_layer())
            .init();
        return Ok(Vec::new());
    }

    create_log_dirs(&config.directory)?;

    let mut guards = Vec::new();

    let (main_appender, main_guard) = create_appender(&config.directory, "main");
    guards.push(main_guard);

    let (error_appender, error_guard) = create_appender(&config.directory, "error");
    guards.push(error_guard);

    let (udp_appender, udp_guard) = create_appender(&config.directory, "udp");
    guards.push(udp_guard);

    let (nodes_appender, nodes_guard) = create_appender(&config.directory, "nodes");
    guards.push(nodes_guard);

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

    let udp_layer = tracing_subscriber::fmt::layer()
        .with_writer(udp_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            is_udp_target(metadata.target())
        }));

    let nodes_layer = tracing_subscriber::fmt::layer()
        .with_writer(nodes_appender)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
            is_nodes_target(metadata.target())
        }));

    tracing_subscriber::registry()
        .with(filter)
        .with(main_layer)
        .with(error_layer)
        .with(udp_layer)
        .with(nodes_layer)
        .with(console_layer())
        .init();

    tracing::info!(
        "Logging initialized. Log files in {}",
        config.directory.display()
    );

    Ok(guards)
}

/// Console output, built per subscriber stack
fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
}

fn create_log_dirs(root: &Path) -> io::Result<()> {
    for log_type in &LOG_TYPES {
        fs::create_dir_all(root.join(log_type))?;
    }
    Ok(())
}

/// Create a daily rolling file appender
fn create_appender(root: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, root.join(name), name);
    tracing_appender::non_blocking(appender)
}

fn is_udp_target(target: &str) -> bool {
    target.contains("udp")
}

fn is_nodes_target(target: &str) -> bool {
    target.contains("pipeline")
        || target.contains("registry")
        || target.contains("aggregator")
        || target.contains("sink")
}
