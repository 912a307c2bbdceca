//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`ChatgateSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use chatgate_core::ProviderSelection;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::ChatgateSettings;

/// Resolve the default settings file path (`~/.chatgate/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".chatgate").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<ChatgateSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid final value is
/// an error.
pub fn load_settings_from_path(path: &Path) -> Result<ChatgateSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(settings)
}

/// Defaults deep-merged with the file at `path`, without env overrides.
pub fn load_file_layer(path: &Path) -> Result<ChatgateSettings> {
    let defaults = serde_json::to_value(ChatgateSettings::default())?;

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

/// Apply environment overrides, reading variables through `lookup`.
///
/// Empty values are treated as unset. Unparseable values are ignored with a
/// warning so a typo never prevents startup.
pub fn apply_env_overrides<F>(settings: &mut ChatgateSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    // ── Providers ───────────────────────────────────────────────────
    if let Some(v) = read("MODEL_PROVIDER") {
        match v.parse::<ProviderSelection>() {
            Ok(p) => settings.providers.default_provider = p,
            Err(e) => warn!(key = "MODEL_PROVIDER", value = %v, error = %e, "invalid provider env var, ignoring"),
        }
    }
    if let Some(v) = read("OPENAI_API_KEY") {
        settings.providers.openai.api_key = Some(v);
    }
    if let Some(v) = read("MODEL_NAME") {
        settings.providers.openai.model = v;
    }
    if let Some(v) = read("OPENAI_BASE_URL") {
        settings.providers.openai.base_url = v;
    }
    if let Some(v) = read_u64(&read, "OPENAI_TIMEOUT_MS", 1_000, 3_600_000) {
        settings.providers.openai.timeout_ms = v;
    }
    if let Some(v) = read("OLLAMA_MODEL") {
        settings.providers.ollama.model = v;
    }
    if let Some(v) = read("OLLAMA_URL") {
        settings.providers.ollama.base_url = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = read("CHATGATE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("CHATGATE_PORT") {
        match parse_u16_range(&v, 0, 65535) {
            Some(port) => settings.server.port = port,
            None => warn!(key = "CHATGATE_PORT", value = %v, "invalid u16 env var, ignoring"),
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("CHATGATE_LOG") {
        settings.logging.level = v;
    }
}

fn read_u64<R>(read: &R, name: &str, min: u64, max: u64) -> Option<u64>
where
    R: Fn(&str) -> Option<String>,
{
    let val = read(name)?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::errors::SettingsError;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn deep_merge_objects_recursively() {
        let merged = deep_merge(
            json!({"a": {"x": 1, "y": 2}, "b": 3}),
            json!({"a": {"y": 20}, "c": 4}),
        );
        assert_eq!(merged, json!({"a": {"x": 1, "y": 20}, "b": 3, "c": 4}));
    }

    #[test]
    fn deep_merge_skips_null_and_replaces_arrays() {
        let merged = deep_merge(json!({"a": 1, "l": [1, 2]}), json!({"a": null, "l": [3]}));
        assert_eq!(merged, json!({"a": 1, "l": [3]}));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_file_layer(&dir.path().join("nope.json")).unwrap();
        assert_eq!(s.server.port, 8000);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server":{"port":9100},"providers":{"defaultProvider":"ollama","openai":{"apiKey":"sk-file"}}}"#,
        )
        .unwrap();

        let s = load_file_layer(&path).unwrap();
        assert_eq!(s.server.port, 9100);
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.providers.default_provider, ProviderSelection::LocalFallback);
        assert_eq!(s.providers.openai.api_key.as_deref(), Some("sk-file"));
        assert_eq!(s.providers.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_file_layer(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn env_overrides_apply() {
        let mut s = ChatgateSettings::default();
        apply_env_overrides(
            &mut s,
            env(&[
                ("MODEL_PROVIDER", "OLLAMA"),
                ("OPENAI_API_KEY", "sk-env"),
                ("MODEL_NAME", "gpt-4o"),
                ("OLLAMA_MODEL", "mistral"),
                ("OLLAMA_URL", "http://localhost:11434"),
                ("CHATGATE_PORT", "9000"),
                ("OPENAI_TIMEOUT_MS", "30000"),
            ]),
        );
        assert_eq!(s.providers.default_provider, ProviderSelection::LocalFallback);
        assert_eq!(s.providers.openai.api_key.as_deref(), Some("sk-env"));
        assert_eq!(s.providers.openai.model, "gpt-4o");
        assert_eq!(s.providers.openai.timeout_ms, 30_000);
        assert_eq!(s.providers.ollama.model, "mistral");
        assert_eq!(s.providers.ollama.base_url, "http://localhost:11434");
        assert_eq!(s.server.port, 9000);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut s = ChatgateSettings::default();
        apply_env_overrides(
            &mut s,
            env(&[
                ("MODEL_PROVIDER", "bogus"),
                ("CHATGATE_PORT", "99999"),
                ("OPENAI_TIMEOUT_MS", "soon"),
            ]),
        );
        assert_eq!(s.providers.default_provider, ProviderSelection::PrimaryHosted);
        assert_eq!(s.server.port, 8000);
        assert_eq!(s.providers.openai.timeout_ms, 120_000);
    }

    #[test]
    fn empty_api_key_means_unconfigured() {
        let mut s = ChatgateSettings::default();
        apply_env_overrides(&mut s, env(&[("OPENAI_API_KEY", "  ")]));
        assert!(s.providers.openai.api_key.is_none());
    }

    #[test]
    fn range_parsers() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u64_range(" 500 ", 1, 1000), Some(500));
        assert_eq!(parse_u64_range("abc", 1, 1000), None);
    }
}
