//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`QuillSettings::default()`]
//! 2. If `~/.quill/settings.json` exists, deep-merge user values over defaults
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
use crate::types::QuillSettings;

/// Resolve the path to the settings file (`~/.quill/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".quill").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<QuillSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<QuillSettings> {
    let defaults = serde_json::to_value(QuillSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: QuillSettings = serde_json::from_value(merged)?;
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
/// Each env var has strict parsing rules: integers must be valid and
/// within the specified range, and invalid values are silently ignored
/// (fall back to file/default).
pub fn apply_env_overrides(settings: &mut QuillSettings) {
    if let Some(v) = read_env_string("QUILL_VAULT_ROOT") {
        settings.vault_root = v;
    }

    // ── Timing ──────────────────────────────────────────────────────
    if let Some(v) = read_env_u64("QUILL_DEBOUNCE_SECONDS", 1, 3600) {
        settings.timing.debounce_seconds = v;
    }
    if let Some(v) = read_env_u64("QUILL_POLL_SECONDS", 1, 300) {
        settings.timing.poll_seconds = v;
    }
    if let Some(v) = read_env_u64("QUILL_LOCK_TIMEOUT_SECONDS", 1, 600) {
        settings.timing.lock_timeout_seconds = v;
    }

    // ── Timeline / retention ────────────────────────────────────────
    if let Some(v) = read_env_usize("QUILL_TIMELINE_MAX_ENTRIES", 1, 10_000) {
        settings.timeline.max_entries = v;
    }
    if let Some(v) = read_env_u64("QUILL_QUEUE_KEEP_DAYS", 1, 3650) {
        settings.retention.queue_keep_days = v;
    }
    if let Some(v) = read_env_u64("QUILL_STATE_KEEP_DAYS", 1, 3650) {
        settings.retention.state_keep_days = v;
    }

    // ── Synthesis ───────────────────────────────────────────────────
    if let Some(v) = read_env_string("QUILL_SYNTHESIS_MODE") {
        if let Ok(mode) = serde_json::from_value(Value::String(v.to_lowercase())) {
            settings.synthesis.mode = mode;
        } else {
            tracing::warn!(value = %v, "invalid QUILL_SYNTHESIS_MODE, ignoring");
        }
    }
    if let Some(v) = read_env_u64("QUILL_SYNTHESIS_TIMEOUT_SECONDS", 1, 3600) {
        settings.synthesis.timeout_seconds = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

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
    use crate::errors::SettingsError;
    use crate::types::SynthesisMode;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": 10});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 10);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({
            "timing": {"debounceSeconds": 15, "pollSeconds": 2}
        });
        let source = serde_json::json!({
            "timing": {"debounceSeconds": 60}
        });
        let merged = deep_merge(target, source);
        assert_eq!(merged["timing"]["debounceSeconds"], 60);
        assert_eq!(merged["timing"]["pollSeconds"], 2);
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"recursionMarkers": [".quill", ".scratch"]});
        let source = serde_json::json!({"recursionMarkers": [".private"]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["recursionMarkers"], serde_json::json!([".private"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_new_keys_added() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"b": 2});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/settings.json");
        let settings = load_settings_from_path(path).unwrap();
        let defaults = QuillSettings::default();
        assert_eq!(settings.version, defaults.version);
        assert_eq!(
            settings.timing.debounce_seconds,
            defaults.timing.debounce_seconds
        );
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"vaultRoot": "/data/vault", "timeline": {"maxEntries": 40}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.vault_root, "/data/vault");
        assert_eq!(settings.timeline.max_entries, 40);
        assert_eq!(settings.timing.debounce_seconds, 15);
        assert_eq!(settings.synthesis.mode, SynthesisMode::Log);
    }

    #[test]
    fn load_synthesis_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"synthesis": {"mode": "full", "command": ["distill", "--json"]}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.synthesis.mode, SynthesisMode::Full);
        assert_eq!(settings.synthesis.command, vec!["distill", "--json"]);
        assert_eq!(settings.synthesis.timeout_seconds, 120);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    // ── parse helpers ───────────────────────────────────────────────

    #[test]
    fn parse_u64_valid() {
        assert_eq!(parse_u64_range("30", 1, 3600), Some(30));
        assert_eq!(parse_u64_range("1", 1, 3600), Some(1));
        assert_eq!(parse_u64_range("3600", 1, 3600), Some(3600));
    }

    #[test]
    fn parse_u64_out_of_range() {
        assert_eq!(parse_u64_range("0", 1, 3600), None);
        assert_eq!(parse_u64_range("5000", 1, 3600), None);
    }

    #[test]
    fn parse_u64_invalid() {
        assert_eq!(parse_u64_range("abc", 1, 3600), None);
        assert_eq!(parse_u64_range("", 1, 3600), None);
    }

    #[test]
    fn parse_usize_valid() {
        assert_eq!(parse_usize_range("50", 1, 10_000), Some(50));
    }

    #[test]
    fn parse_usize_out_of_range() {
        assert_eq!(parse_usize_range("0", 1, 10_000), None);
        assert_eq!(parse_usize_range("20000", 1, 10_000), None);
    }
}
