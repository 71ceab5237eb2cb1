//! Tracing subscriber setup

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::schema::LoggingConfig;

/// Prefix of the daily rolling log files (`spine.log.YYYY-MM-DD`)
const LOG_FILE_PREFIX: &str = "spine.log";

/// Days a rolled log file is kept
const LOG_RETENTION_DAYS: u64 = 7;

/// Initialize the logging system
///
/// `RUST_LOG` and `LOG_FORMAT` take precedence over the configured level
/// and format. The returned guard flushes the file writer when dropped and
/// must be held for the life of the program.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let filter = build_filter(config);
    let is_json = is_json_format(config);

    let file_appender = tracing_appender::rolling::daily(&config.dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The format is chosen at runtime, so both layers are boxed.
    let stdout_layer = if is_json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    };

    let file_layer = if is_json {
        fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Err(e) = cleanup_old_logs(Path::new(&config.dir), LOG_RETENTION_DAYS) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    guard
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    for (module, level) in &config.overrides {
        if let Ok(directive) = format!("{}={}", module, level).parse() {
            filter = filter.add_directive(directive);
        } else {
            eprintln!("Invalid log directive: {}={}", module, level);
        }
    }

    filter
}

fn is_json_format(config: &LoggingConfig) -> bool {
    std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| config.format.clone())
        .eq_ignore_ascii_case("json")
}

/// Remove rolled log files older than `days` days
fn cleanup_old_logs(dir: &Path, days: u64) -> std::io::Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let threshold = Duration::from_secs(days * 24 * 3600);
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > threshold) {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert_eq!(cleanup_old_logs(&missing, 7).unwrap(), 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("spine.log.2024-05-01"), "fresh").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "other").unwrap();

        assert_eq!(cleanup_old_logs(temp_dir.path(), 7).unwrap(), 0);
        assert!(temp_dir.path().join("spine.log.2024-05-01").exists());
    }

    #[test]
    fn test_cleanup_zero_retention_removes_only_logs() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("spine.log.2024-05-01"), "old").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "other").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        assert_eq!(cleanup_old_logs(temp_dir.path(), 0).unwrap(), 1);
        assert!(!temp_dir.path().join("spine.log.2024-05-01").exists());
        assert!(temp_dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_filter_accepts_overrides() {
        let mut config = LoggingConfig::default();
        config
            .overrides
            .insert("spine_core::heartbeat".to_string(), "debug".to_string());

        let filter = build_filter(&config).to_string();
        assert!(filter.contains("spine_core::heartbeat=debug"));
    }
}
