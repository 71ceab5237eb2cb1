//! Configuration loading and management

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Prefix of environment variables overriding single config keys,
/// e.g. `SPINE__HEARTBEAT__PERIOD_MS=500`
const ENV_PREFIX: &str = "SPINE__";

/// Configuration loader
pub struct ConfigLoader {
    config_dir: PathBuf,
}

impl ConfigLoader {
    /// Create a new config loader with the default config directory
    pub fn new() -> Self {
        let config_dir = dirs::home_dir()
            .map(|h| h.join(".spine"))
            .unwrap_or_else(|| PathBuf::from(".spine"));

        Self { config_dir }
    }

    /// Create a new config loader with a custom config directory
    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Load configuration from file and environment
    pub fn load(&self) -> crate::Result<Config> {
        let config_path = self.config_path();
        let mut merged = serde_json::to_value(Config::default())?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let file_value: Value = serde_json::from_str(&content)?;
            if !file_value.is_object() {
                return Err(crate::Error::Config(format!(
                    "{} must contain a JSON object",
                    config_path.display()
                )));
            }
            merge_values(&mut merged, file_value);
        }

        apply_alias_overrides(&mut merged);
        apply_path_overrides(&mut merged);

        let config: Config = serde_json::from_value(merged)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &Config) -> crate::Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(self.config_path(), content)?;
        Ok(())
    }

    /// Get the config directory path
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the config file inside the config directory
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Deep-merge `overlay` into `base`; non-object values replace
fn merge_values(base: &mut Value, overlay: Value) {
    let Value::Object(overlay_map) = overlay else {
        *base = overlay;
        return;
    };
    let Value::Object(base_map) = base else {
        *base = Value::Object(overlay_map);
        return;
    };

    for (key, value) in overlay_map {
        match base_map.get_mut(&key) {
            Some(existing) => merge_values(existing, value),
            None => {
                base_map.insert(key, value);
            }
        }
    }
}

/// Interpret an env value as JSON when possible, else as a plain string
fn parse_env_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return Value::Bool(trimmed.eq_ignore_ascii_case("true"));
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Set `value` at `path`, creating (or replacing non-object) parents
fn set_path_value(root: &mut Value, path: &[&str], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *root = value;
        return;
    };
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    if let Value::Object(map) = root {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        set_path_value(child, rest, value);
    }
}

fn apply_alias_overrides(config: &mut Value) {
    const ALIASES: [(&str, &[&str]); 2] = [
        ("SPINE_LOG_LEVEL", &["logging", "level"]),
        ("SPINE_LOG_DIR", &["logging", "dir"]),
    ];

    for (env_key, path) in ALIASES {
        if let Ok(value) = std::env::var(env_key) {
            set_path_value(config, path, Value::String(value));
        }
    }
}

fn apply_path_overrides(config: &mut Value) {
    for (key, value) in std::env::vars() {
        let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let segments: Vec<String> = suffix
            .split("__")
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        if segments.is_empty() {
            continue;
        }
        let path: Vec<&str> = segments.iter().map(String::as_str).collect();
        set_path_value(config, &path, parse_env_value(&value));
    }
}
