//! Provider layer for llmrelay — completion and transcription clients.
//!
//! # Architecture
//!
//! - [`transport`] — `HttpTransport` trait + reqwest implementation
//! - [`request_body`] — `GenerationRequest` → `/chat/completions` JSON
//! - [`retry`] — bounded exponential-backoff `RetryPolicy`
//! - [`completion::CompletionClient`] — dispatch with fallback-model substitution
//! - [`chunker`] — ffmpeg-backed audio segmentation
//! - [`aggregate`] — sequential per-segment transcription and merge
//! - [`transcription::GroqTranscriber`] — Whisper transcription client

pub mod aggregate;
pub mod chunker;
pub mod completion;
pub mod request_body;
pub mod retry;
pub mod transcription;
pub mod traits;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use chunker::{AudioSegmenter, FfmpegSegmenter, SegmentSet};
pub use completion::CompletionClient;
pub use request_body::build_request_body;
pub use retry::RetryPolicy;
pub use traits::{CompletionProvider, TranscriptionProvider};
pub use transcription::GroqTranscriber;
pub use transport::{HttpTransport, ReqwestTransport};
