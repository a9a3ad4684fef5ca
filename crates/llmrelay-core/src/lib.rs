//! Core types for llmrelay — request/response model, audio jobs, errors, config.
//!
//! # Modules
//!
//! - [`types`] — messages, tool schemas, structured-output schemas, responses
//! - [`request`] — `GenerationRequest` and its validating builder
//! - [`audio`] — `AudioJob`, `TranscriptChunk`, `TranscriptResult`
//! - [`error`] — the `RelayError` taxonomy shared by every crate
//! - [`config`] — JSON config + env var overrides

pub mod audio;
pub mod config;
pub mod error;
pub mod request;
pub mod types;
pub mod utils;

pub use audio::{AudioJob, AudioSource, TranscriptChunk, TranscriptResult};
pub use error::{RelayError, Result};
pub use request::{GenerationMode, GenerationRequest, GenerationRequestBuilder, MessageInput};
