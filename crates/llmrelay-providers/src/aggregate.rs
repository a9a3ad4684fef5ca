//! Sequential transcription of a split recording.
//!
//! Segments are transcribed strictly one after another in sequence order, so
//! merging is a plain append. The first segment that fails aborts the job and
//! no partial transcript is returned. The [`SegmentSet`] is consumed, so its
//! temporary directory goes away on every exit path, cancellation included.

use std::future::Future;

use tracing::{debug, info, warn};

use llmrelay_core::{Result, TranscriptResult};

use crate::chunker::SegmentSet;

/// Transcribe every segment in order with `transcribe(index, bytes)` and
/// merge the results: texts concatenated, durations summed.
pub async fn aggregate<F, Fut>(segments: SegmentSet, mut transcribe: F) -> Result<TranscriptResult>
where
    F: FnMut(usize, Vec<u8>) -> Fut,
    Fut: Future<Output = Result<TranscriptResult>>,
{
    let total = segments.len();
    let mut merged = TranscriptResult::default();

    for chunk in segments.chunks() {
        let audio = tokio::fs::read(&chunk.path).await?;
        debug!(segment = chunk.index, total, bytes = audio.len(), "transcribing segment");

        let part = transcribe(chunk.index, audio).await.map_err(|e| {
            warn!(segment = chunk.index, total, error = %e, "segment failed, aborting job");
            e
        })?;
        merged.push(part);
    }

    if let Err(e) = segments.close() {
        warn!(error = %e, "failed to remove segment directory");
    }

    info!(
        segments = total,
        chars = merged.text.len(),
        duration = merged.duration,
        "transcription merged"
    );
    Ok(merged)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
