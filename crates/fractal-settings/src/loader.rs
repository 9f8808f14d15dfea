//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`FractalSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::FractalSettings;

/// Resolve the path to the settings file (`~/.fractal/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".fractal").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<FractalSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<FractalSettings> {
    let defaults = serde_json::to_value(FractalSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: FractalSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Integers must parse and fall within the stated range; invalid values are
/// ignored with a warning (fall back to file/default).
pub fn apply_env_overrides(settings: &mut FractalSettings) {
    if let Some(v) = read_env_string("FRACTAL_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read_env_string("FRACTAL_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("FRACTAL_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("FRACTAL_DEVICE_A_URL") {
        settings.agents.device_a_url = v;
    }
    if let Some(v) = read_env_string("FRACTAL_DEVICE_B_URL") {
        settings.agents.device_b_url = v;
    }
    if let Some(v) = read_env_u64("FRACTAL_AGENT_TIMEOUT_MS", 1_000, 3_600_000) {
        settings.agents.request_timeout_ms = v;
    }
    if let Some(v) = read_env_usize("FRACTAL_RECENT_MESSAGES", 1, 1_000) {
        settings.context.recent_messages = v;
    }
    if let Some(v) = read_env_string("FRACTAL_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"b": 3});
        assert_eq!(deep_merge(target, source), serde_json::json!({"a": 1, "b": 3}));
    }

    #[test]
    fn merge_nested_objects() {
        let target = serde_json::json!({"server": {"host": "127.0.0.1", "port": 8400}});
        let source = serde_json::json!({"server": {"port": 9000}});
        assert_eq!(
            deep_merge(target, source),
            serde_json::json!({"server": {"host": "127.0.0.1", "port": 9000}})
        );
    }

    #[test]
    fn merge_skips_nulls() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"a": null});
        assert_eq!(deep_merge(target, source), serde_json::json!({"a": 1}));
    }

    #[test]
    fn merge_replaces_arrays() {
        let target = serde_json::json!({"a": [1, 2, 3]});
        let source = serde_json::json!({"a": [4]});
        assert_eq!(deep_merge(target, source), serde_json::json!({"a": [4]}));
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8400", 1, 65535), Some(8400));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("notaport", 1, 65535), None);
        assert_eq!(parse_u64_range("5000", 1000, 10_000), Some(5000));
        assert_eq!(parse_u64_range("500", 1000, 10_000), None);
        assert_eq!(parse_usize_range("10", 1, 100), Some(10));
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let settings =
            load_settings_from_path(Path::new("/nonexistent/fractal-settings.json")).unwrap();
        assert_eq!(settings.server.port, 8400);
        assert_eq!(settings.context.recent_messages, 10);
    }

    #[test]
    fn partial_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"agents": {{"deviceBUrl": "http://gpu-box:11434"}}, "server": {{"port": 9000}}}}"#
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.agents.device_b_url, "http://gpu-box:11434");
        // Untouched sections keep their defaults.
        assert_eq!(settings.agents.device_a_url, "http://localhost:11434");
        assert_eq!(settings.database.path, "fractal.db");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load_settings_from_path(&path).is_err());
    }
}
