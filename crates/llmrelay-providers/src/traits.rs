//! Provider traits — the seams the CLI and downstream callers program against.
//!
//! `CompletionClient` and `GroqTranscriber` are the shipped implementations;
//! anything speaking the same OpenAI-compatible wire format can stand in.

use async_trait::async_trait;

use llmrelay_core::types::GenerationResponse;
use llmrelay_core::{AudioJob, GenerationRequest, Result, TranscriptResult};

/// Chat completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one generation request, applying fallback substitution on
    /// transient failures when enabled.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

/// Speech-to-text backend.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe a job, splitting oversized audio into segments first.
    async fn transcribe(&self, job: &AudioJob) -> Result<TranscriptResult>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
