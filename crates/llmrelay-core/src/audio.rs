//! Audio transcription jobs and their results.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

/// Upload limit used when the job doesn't specify one (20 MiB).
pub const DEFAULT_UPLOAD_LIMIT_BYTES: u64 = 20 * 1024 * 1024;

/// Where the audio comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioSource {
    /// Raw audio bytes in any container the segmenting tool can read.
    Bytes(Vec<u8>),
    /// A URL the transcription endpoint fetches itself.
    Url(String),
}

/// A transcription request.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioJob {
    pub source: AudioSource,
    /// Segments are sized to stay under this many bytes.
    pub upload_limit_bytes: u64,
    /// Model override (client default otherwise).
    pub model: Option<String>,
    /// Spoken language (ISO-639-1); the endpoint assumes `"en"` when unset.
    pub language: Option<String>,
    /// Per-call timeout override.
    pub timeout: Option<Duration>,
}

impl AudioJob {
    pub fn builder() -> AudioJobBuilder {
        AudioJobBuilder::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::with_source(AudioSource::Bytes(bytes))
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::with_source(AudioSource::Url(url.into()))
    }

    fn with_source(source: AudioSource) -> Self {
        AudioJob {
            source,
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
            model: None,
            language: None,
            timeout: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Validates that exactly one of bytes / URL was supplied.
#[derive(Clone, Debug, Default)]
pub struct AudioJobBuilder {
    bytes: Option<Vec<u8>>,
    url: Option<String>,
    upload_limit_bytes: Option<u64>,
    model: Option<String>,
    language: Option<String>,
    timeout: Option<Duration>,
}

impl AudioJobBuilder {
    pub fn bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn upload_limit_bytes(mut self, limit: u64) -> Self {
        self.upload_limit_bytes = Some(limit);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<AudioJob> {
        let source = match (self.bytes, self.url) {
            (Some(_), Some(_)) => {
                return Err(RelayError::validation(
                    "either use audio URL or audio bytes but not both",
                ))
            }
            (None, None) => {
                return Err(RelayError::validation(
                    "either audio URL or audio bytes must be provided",
                ))
            }
            (Some(bytes), None) => AudioSource::Bytes(bytes),
            (None, Some(url)) => AudioSource::Url(url),
        };

        let upload_limit_bytes = self.upload_limit_bytes.unwrap_or(DEFAULT_UPLOAD_LIMIT_BYTES);
        if upload_limit_bytes == 0 {
            return Err(RelayError::validation("upload limit must be positive"));
        }

        Ok(AudioJob {
            source,
            upload_limit_bytes,
            model: self.model,
            language: self.language,
            timeout: self.timeout,
        })
    }
}

/// One time-bounded segment of a split audio file.
///
/// `path` lives inside the temporary directory of the segment set that
/// produced it and is only valid while that set is alive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranscriptChunk {
    /// Zero-based position of the segment in the original audio.
    pub index: usize,
    pub path: PathBuf,
}

/// Transcribed text and audio duration in seconds.
///
/// Also the shape of a single `verbose_json` transcription response.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TranscriptResult {
    pub text: String,
    #[serde(default)]
    pub duration: f64,
}

impl TranscriptResult {
    /// Append the next segment's result.
    pub fn push(&mut self, next: TranscriptResult) {
        self.text.push_str(&next.text);
        self.duration += next.duration;
    }
}
