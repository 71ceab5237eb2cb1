//! Configuration validation rules.

use super::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 2] = ["text", "json"];

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.heartbeat.period_ms == 0 {
        errors.push("heartbeat.period_ms must be > 0".to_string());
    }
    if config.heartbeat.timeout_ms == 0 {
        errors.push("heartbeat.timeout_ms must be > 0".to_string());
    }
    if config.heartbeat.timeout_ms < config.heartbeat.period_ms {
        errors.push("heartbeat.timeout_ms must be >= heartbeat.period_ms".to_string());
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(format!(
            "logging.level must be one of {}",
            LOG_LEVELS.join(", ")
        ));
    }
    let format = config.logging.format.to_ascii_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(format!(
            "logging.format must be one of {}",
            LOG_FORMATS.join(", ")
        ));
    }
    if config.logging.dir.trim().is_empty() {
        errors.push("logging.dir must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
