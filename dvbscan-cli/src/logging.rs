//! Console and daily rotated file logging.
//!
//! The library logs through the `log` facade; `tracing-log` bridges those
//! records into the tracing subscriber set up here. Console output goes to
//! stderr so that a channel list written to stdout stays clean.

use std::fs;
use std::io;
use std::path::Path;

use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogSettings;
use crate::error::CliError;

const LOG_FILE_NAME: &str = "dvbscan.log";

/// Initialize console and file logging. Keep the returned guard alive until
/// exit, it flushes the file writer on drop.
pub(crate) fn init_logging(settings: &LogSettings) -> Result<WorkerGuard, CliError> {
    fs::create_dir_all(&settings.log_dir)?;
    clean_old_logs(&settings.log_dir, settings.retention_days)?;

    let file_appender = tracing_appender::rolling::daily(&settings.log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if settings.verbose {
        "debug"
    } else {
        settings.level.as_deref().unwrap_or("info")
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_level(true)
                .with_timer(LocalTimeTimer),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_level(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_timer(LocalTimeTimer),
        );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CliError::Logging(format!("Failed to set default subscriber: {}", e)))?;
    tracing_log::LogTracer::init()
        .map_err(|e| CliError::Logging(format!("Failed to initialize LogTracer: {}", e)))?;

    Ok(guard)
}

/// Remove log files older than `retention_days`.
fn clean_old_logs(log_dir: &Path, retention_days: u64) -> io::Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }

    let cutoff = Local::now() - chrono::Duration::days(retention_days as i64);

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with(LOG_FILE_NAME));
        if !path.is_file() || !is_log {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => chrono::DateTime::<Local>::from(modified),
            Err(_) => continue,
        };
        if modified < cutoff {
            if let Err(e) = fs::remove_file(&path) {
                eprintln!("Failed to remove old log file {:?}: {}", path, e);
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct LocalTimeTimer;

impl fmt::time::FormatTime for LocalTimeTimer {
    fn format_time(&self, w: &mut fmt::format::Writer) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%dT%H:%M:%S%.6f"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_old_logs_keeps_recent_and_foreign_files() {
        let dir = std::env::temp_dir().join(format!("dvbscan-log-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let log = dir.join("dvbscan.log.2026-10-17");
        let other = dir.join("notes.txt");
        fs::write(&log, b"x").unwrap();
        fs::write(&other, b"x").unwrap();

        // just written, so younger than any cutoff
        clean_old_logs(&dir, 7).unwrap();
        assert!(log.exists());
        assert!(other.exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_dir_is_ok() {
        let dir = std::env::temp_dir().join("dvbscan-log-test-does-not-exist");
        assert!(clean_old_logs(&dir, 1).is_ok());
    }
}
