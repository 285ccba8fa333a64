//! Logging Infrastructure
//!
//! `RUST_LOG` wins over the configured level. With a log directory the
//! output goes to a daily rolling file instead of stdout. A missing
//! directory is created; if that fails the logger stays on stdout and says so.

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::core::config::LogConfig;

/// Initialize the global subscriber.
///
/// Keep the returned guard alive for the life of the process when file
/// output is enabled, or buffered lines are lost.
pub fn init_logger(config: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    match &config.dir {
        Some(dir) if prepare_log_dir(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "order-server");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            if config.json {
                builder.json().init();
            } else {
                builder.init();
            }
            Some(guard)
        }
        _ => {
            if config.json {
                builder.json().init();
            } else {
                builder.init();
            }
            None
        }
    }
}

/// Make sure `dir` exists. Runs before the subscriber, so failures go to stderr.
fn prepare_log_dir(dir: &Path) -> bool {
    if dir.is_dir() {
        return true;
    }
    match fs::create_dir_all(dir) {
        Ok(()) => {
            eprintln!("Created log directory {}", dir.display());
            true
        }
        Err(e) => {
            eprintln!(
                "WARN: cannot create log directory {} ({}), logging to stdout",
                dir.display(),
                e
            );
            false
        }
    }
}
