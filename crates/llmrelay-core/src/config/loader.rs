//! Config loader — reads `~/.llmrelay/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.llmrelay/config.json`
//! 3. Environment variables `LLMRELAY_<SECTION>__<FIELD>` (override JSON)
//! 4. `OPENROUTER_API_KEY` / `GROQ_API_KEY` when no key is configured yet

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::{Config, FallbackConfig};

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be parsed.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    apply_env_overrides(read_config_file(&config_path))
}

/// Parse the JSON file alone, without env overrides.
fn read_config_file(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return Config::default();
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return Config::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    }
}

/// Save configuration to disk (pretty-printed JSON with camelCase keys).
pub fn save_config(config: &Config, path: Option<&Path>) -> std::io::Result<()> {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config).map_err(std::io::Error::other)?;

    std::fs::write(&config_path, json)?;
    debug!("Config saved to {}", config_path.display());
    Ok(())
}

/// Apply environment variable overrides on top of a loaded config.
///
/// Supported overrides:
/// - `LLMRELAY_COMPLETION__API_KEY` / `__API_BASE` / `__MODEL` / `__TIMEOUT_SECS`
/// - `LLMRELAY_COMPLETION__RETRY_ENABLED` (`true`/`1`)
/// - `LLMRELAY_COMPLETION__FALLBACK_MODEL`
/// - `LLMRELAY_TRANSCRIPTION__API_KEY` / `__API_BASE` / `__MODEL` / `__LANGUAGE`
/// - `LLMRELAY_TRANSCRIPTION__TIMEOUT_SECS` / `__MAX_UPLOAD_BYTES` / `__FFMPEG_PATH`
fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Apply overrides read through `lookup` (the process environment in production).
fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    let completion = &mut config.completion;
    if let Some(val) = lookup("LLMRELAY_COMPLETION__API_KEY") {
        completion.api_key = val;
    }
    if let Some(val) = lookup("LLMRELAY_COMPLETION__API_BASE") {
        completion.api_base = val;
    }
    if let Some(val) = lookup("LLMRELAY_COMPLETION__MODEL") {
        completion.model = val;
    }
    if let Some(n) = parse_override::<u64>(&lookup, "LLMRELAY_COMPLETION__TIMEOUT_SECS") {
        completion.timeout_secs = n;
    }
    if let Some(val) = lookup("LLMRELAY_COMPLETION__RETRY_ENABLED") {
        completion.retry_enabled = val == "true" || val == "1";
    }
    if let Some(val) = lookup("LLMRELAY_COMPLETION__FALLBACK_MODEL") {
        match completion.fallback.as_mut() {
            Some(fallback) => fallback.model = val,
            None => {
                completion.fallback = Some(FallbackConfig {
                    model: val,
                    reasoning: None,
                })
            }
        }
    }
    if completion.api_key.is_empty() {
        if let Some(val) = lookup("OPENROUTER_API_KEY") {
            completion.api_key = val;
        }
    }

    let transcription = &mut config.transcription;
    if let Some(val) = lookup("LLMRELAY_TRANSCRIPTION__API_KEY") {
        transcription.api_key = val;
    }
    if let Some(val) = lookup("LLMRELAY_TRANSCRIPTION__API_BASE") {
        transcription.api_base = val;
    }
    if let Some(val) = lookup("LLMRELAY_TRANSCRIPTION__MODEL") {
        transcription.model = val;
    }
    if let Some(val) = lookup("LLMRELAY_TRANSCRIPTION__LANGUAGE") {
        transcription.language = Some(val);
    }
    if let Some(n) = parse_override::<u64>(&lookup, "LLMRELAY_TRANSCRIPTION__TIMEOUT_SECS") {
        transcription.timeout_secs = n;
    }
    if let Some(n) =
        parse_override::<u64>(&lookup, "LLMRELAY_TRANSCRIPTION__MAX_UPLOAD_BYTES")
    {
        transcription.max_upload_bytes = n;
    }
    if let Some(val) = lookup("LLMRELAY_TRANSCRIPTION__FFMPEG_PATH") {
        transcription.ffmpeg_path = val;
    }
    if transcription.api_key.is_empty() {
        if let Some(val) = lookup("GROQ_API_KEY") {
            transcription.api_key = val;
        }
    }

    config
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Override lookup backed by a fixed map instead of the process environment.
    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn write_temp_json(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_missing_file() {
        let config = read_config_file(Path::new("/nonexistent/path/config.json"));
        assert_eq!(config.completion.timeout_secs, 15);
        assert_eq!(config.transcription.timeout_secs, 30);
    }

    #[test]
    fn test_load_valid_json() {
        let file = write_temp_json(
            r#"{
            "completion": {
                "model": "openai/gpt-4o",
                "fallback": { "model": "openai/gpt-4o-mini" }
            }
        }"#,
        );

        let config = read_config_file(file.path());
        assert_eq!(config.completion.model, "openai/gpt-4o");
        assert_eq!(
            config.completion.fallback.as_ref().map(|f| f.model.as_str()),
            Some("openai/gpt-4o-mini")
        );
        // Default preserved
        assert!(config.completion.retry_enabled);
    }

    #[test]
    fn test_load_invalid_json_returns_defaults() {
        let file = write_temp_json("not valid json {{{");
        let config = read_config_file(file.path());
        assert_eq!(config.completion.timeout_secs, 15);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.completion.model = "deepseek/deepseek-chat".to_string();
        config.transcription.language = Some("nl".to_string());

        save_config(&config, Some(&path)).unwrap();

        let reloaded = read_config_file(&path);
        assert_eq!(reloaded.completion.model, "deepseek/deepseek-chat");
        assert_eq!(reloaded.transcription.language.as_deref(), Some("nl"));
    }

    #[test]
    fn test_saved_json_uses_camel_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&Config::default(), Some(&path)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let raw: serde_json::Value = serde_json::from_str(&content).unwrap();

        assert!(raw["transcription"].get("ffmpegPath").is_some());
        assert!(raw["transcription"].get("ffmpeg_path").is_none());
    }

    #[test]
    fn test_env_override_fallback_model() {
        let config = apply_overrides(
            Config::default(),
            vars(&[("LLMRELAY_COMPLETION__FALLBACK_MODEL", "env-fallback")]),
        );
        assert_eq!(
            config.completion.fallback.map(|f| f.model),
            Some("env-fallback".to_string())
        );
    }

    #[test]
    fn test_env_override_replaces_file_fallback_model() {
        let file = write_temp_json(
            r#"{ "completion": { "fallback": { "model": "openai/gpt-4o-mini", "reasoning": { "effort": "low" } } } }"#,
        );
        let config = apply_overrides(
            read_config_file(file.path()),
            vars(&[("LLMRELAY_COMPLETION__FALLBACK_MODEL", "env-fallback")]),
        );
        let fallback = config.completion.fallback.unwrap();
        assert_eq!(fallback.model, "env-fallback");
        assert!(fallback.reasoning.is_some());
    }

    #[test]
    fn test_no_overrides_keeps_file_values() {
        let file = write_temp_json(
            r#"{ "completion": { "fallback": { "model": "openai/gpt-4o-mini" } } }"#,
        );
        let config = apply_overrides(read_config_file(file.path()), vars(&[]));
        assert_eq!(
            config.completion.fallback.map(|f| f.model),
            Some("openai/gpt-4o-mini".to_string())
        );
    }

    #[test]
    fn test_env_override_upload_limit() {
        let config = apply_overrides(
            Config::default(),
            vars(&[("LLMRELAY_TRANSCRIPTION__MAX_UPLOAD_BYTES", "1024")]),
        );
        assert_eq!(config.transcription.max_upload_bytes, 1024);
    }

    #[test]
    fn test_env_override_ignores_garbage() {
        let config = apply_overrides(
            Config::default(),
            vars(&[("LLMRELAY_COMPLETION__TIMEOUT_SECS", "soon")]),
        );
        assert_eq!(config.completion.timeout_secs, 15);
    }

    #[test]
    fn test_conventional_key_fills_empty_key() {
        let config = apply_overrides(Config::default(), vars(&[("GROQ_API_KEY", "gsk-env")]));
        assert_eq!(config.transcription.api_key, "gsk-env");
    }

    #[test]
    fn test_configured_key_wins_over_conventional_env() {
        let mut config = Config::default();
        config.transcription.api_key = "from-file".to_string();
        let config = apply_overrides(config, vars(&[("GROQ_API_KEY", "gsk-env")]));
        assert_eq!(config.transcription.api_key, "from-file");
    }
}
