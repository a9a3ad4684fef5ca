//! Configuration schema.
//!
//! Hierarchy: `Config` → `CompletionConfig`, `TranscriptionConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};

use crate::audio::DEFAULT_UPLOAD_LIMIT_BYTES;
use crate::types::ReasoningConfig;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.llmrelay/config.json` + env vars.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub completion: CompletionConfig,
    pub transcription: TranscriptionConfig,
}

// ─────────────────────────────────────────────
// Completion
// ─────────────────────────────────────────────

/// Chat completion endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionConfig {
    /// API key for Bearer authentication.
    pub api_key: String,
    /// Base URL; `/chat/completions` is appended.
    pub api_base: String,
    /// Model used when the caller doesn't name one.
    pub model: String,
    /// Deadline for a whole call, fallback attempts included.
    pub timeout_secs: u64,
    /// Enables fallback substitution on transient failures.
    pub retry_enabled: bool,
    /// Model substituted on transient failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackConfig>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-2.5-flash".to_string(),
            timeout_secs: 15,
            retry_enabled: true,
            fallback: None,
        }
    }
}

impl CompletionConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// Secondary model and the reasoning settings to use with it.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackConfig {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningConfig>,
}

// ─────────────────────────────────────────────
// Transcription
// ─────────────────────────────────────────────

/// Speech-to-text endpoint settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionConfig {
    pub api_key: String,
    /// Base URL; `/audio/transcriptions` is appended.
    pub api_base: String,
    /// Whisper model name.
    pub model: String,
    /// Spoken language; the endpoint is sent `"en"` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Deadline for each transcription call (retries included).
    pub timeout_secs: u64,
    /// Segments are sized to stay under this upload size.
    pub max_upload_bytes: u64,
    /// Path or name of the ffmpeg binary.
    pub ffmpeg_path: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.groq.com/openai/v1".to_string(),
            model: "whisper-large-v3-turbo".to_string(),
            language: None,
            timeout_secs: 30,
            max_upload_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl TranscriptionConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
