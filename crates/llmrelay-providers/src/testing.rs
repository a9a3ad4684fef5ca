//! In-memory transport and segmenter doubles for exercising dispatch,
//! retry sequencing, and segment handling without network or ffmpeg.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use llmrelay_core::{RelayError, Result};

use crate::chunker::AudioSegmenter;
use crate::transport::{HttpTransport, OutboundRequest, RawResponse};

/// Replays queued outcomes in order and records every request it receives.
///
/// Once the script runs dry every further call fails with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse>>>,
    requests: Mutex<Vec<(OutboundRequest, Instant)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.push(Ok(RawResponse::new(status, body)))
    }

    pub fn fail(self, msg: &str) -> Self {
        self.push(Err(RelayError::transport(msg)))
    }

    fn push(self, outcome: Result<RawResponse>) -> Self {
        self.script.lock().unwrap().push_back(outcome);
        self
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.clone())
            .collect()
    }

    pub fn deadlines(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(_, d)| *d).collect()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// JSON bodies of every recorded request.
    pub fn json_bodies(&self) -> Vec<serde_json::Value> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r.payload {
                crate::transport::Payload::Json(body) => serde_json::from_slice(&body).ok(),
                crate::transport::Payload::Multipart(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post(&self, request: &OutboundRequest, deadline: Instant) -> Result<RawResponse> {
        self.requests
            .lock()
            .unwrap()
            .push((request.clone(), deadline));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(RelayError::transport("script exhausted")))
    }
}

/// Writes pre-named segment files instead of decoding anything.
pub struct FakeSegmenter {
    files: Vec<(&'static str, &'static str)>,
    fail: bool,
    seen_dir: Mutex<Option<PathBuf>>,
}

impl FakeSegmenter {
    /// Each file's content is its own name.
    pub fn writing(names: Vec<&'static str>) -> Self {
        Self::with_contents(names.into_iter().map(|n| (n, n)).collect())
    }

    pub fn with_contents(files: Vec<(&'static str, &'static str)>) -> Self {
        FakeSegmenter {
            files,
            fail: false,
            seen_dir: Mutex::new(None),
        }
    }

    /// Writes one segment, then fails like a decoder rejecting its input.
    pub fn failing() -> Self {
        FakeSegmenter {
            fail: true,
            ..Self::writing(vec!["chunk_000.wav"])
        }
    }

    /// Output directory of the last run.
    pub fn seen_dir(&self) -> PathBuf {
        self.seen_dir.lock().unwrap().clone().unwrap()
    }
}

#[async_trait]
impl AudioSegmenter for FakeSegmenter {
    async fn segment(&self, _input: &Path, output_dir: &Path, _secs: u64) -> Result<()> {
        *self.seen_dir.lock().unwrap() = Some(output_dir.to_path_buf());
        for (name, content) in &self.files {
            std::fs::write(output_dir.join(name), content.as_bytes())?;
        }
        if self.fail {
            return Err(RelayError::Decode(
                "Invalid data found when processing input".into(),
            ));
        }
        Ok(())
    }
}
