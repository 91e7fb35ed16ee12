//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::PairchatSettings;

const SETTINGS_FILE_NAME: &str = "settings.json";

/// Default data directory (`~/.pairchat`).
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".pairchat")
}

/// Resolve the path to the settings file (`~/.pairchat/settings.json`).
pub fn settings_path() -> PathBuf {
    default_data_dir().join(SETTINGS_FILE_NAME)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<PairchatSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PairchatSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<PairchatSettings> {
    let defaults = serde_json::to_value(PairchatSettings::default())?;
    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };
    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PAIRCHAT_*` environment overrides.
pub fn apply_env_overrides(settings: &mut PairchatSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`. Empty and out-of-range values are
/// ignored with a warning.
pub fn apply_overrides_from<F>(settings: &mut PairchatSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = read("PAIRCHAT_HTTP_URL") {
        settings.server.http_url = v;
    }
    if let Some(v) = read("PAIRCHAT_WS_URL") {
        settings.server.ws_url = v;
    }
    if let Some(v) = read("PAIRCHAT_CONNECT_TIMEOUT_MS") {
        match parse_u64_range(&v, 100, 120_000) {
            Some(n) => settings.client.connect_timeout_ms = n,
            None => warn!(
                key = "PAIRCHAT_CONNECT_TIMEOUT_MS",
                value = %v,
                "invalid env var, ignoring"
            ),
        }
    }
    if let Some(v) = read("PAIRCHAT_OUTBOUND_BUFFER") {
        match parse_usize_range(&v, 1, 65_536) {
            Some(n) => settings.client.outbound_buffer = n,
            None => warn!(
                key = "PAIRCHAT_OUTBOUND_BUFFER",
                value = %v,
                "invalid env var, ignoring"
            ),
        }
    }
    if let Some(v) = read("PAIRCHAT_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("PAIRCHAT_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => warn!(key = "PAIRCHAT_LOG_JSON", value = %v, "invalid env var, ignoring"),
        }
    }
    if let Some(v) = read("PAIRCHAT_DATA_DIR") {
        settings.data_dir = Some(PathBuf::from(v));
    }
}

/// Parse a string as a boolean (`true`/`1`/`yes`/`on`, `false`/`0`/`no`/`off`).
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `usize` within an inclusive range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
