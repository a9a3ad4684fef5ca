//! Audio segmentation — splits oversized audio into upload-sized pieces.
//!
//! The heavy lifting is delegated to an external tool (ffmpeg) invoked once
//! per job. It resamples to 16 kHz mono 16-bit PCM and writes fixed-length
//! `chunk_NNN.wav` files into a temporary directory owned by the returned
//! [`SegmentSet`]. Dropping the set removes the directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;
use tracing::{debug, info, warn};

use llmrelay_core::utils::truncate_string;
use llmrelay_core::{RelayError, Result, TranscriptChunk};

/// 16 kHz × 1 channel × 2 bytes per sample.
pub const BYTES_PER_SECOND: u64 = 16_000 * 2;

/// Headroom so container overhead never pushes a segment over the limit.
const SIZE_MARGIN: f64 = 0.95;

const SEGMENT_PREFIX: &str = "chunk_";
const SEGMENT_EXTENSION: &str = "wav";

/// Segment length in whole seconds for an upload limit. Never below 1.
pub fn segment_seconds(threshold_bytes: u64) -> u64 {
    let secs = (SIZE_MARGIN * threshold_bytes as f64 / BYTES_PER_SECOND as f64).floor() as u64;
    secs.max(1)
}

/// Arguments for one ffmpeg segmenting run.
pub fn ffmpeg_args(input: &Path, output_dir: &Path, segment_seconds: u64) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-i",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.push(input.as_os_str().to_owned());
    args.extend(
        [
            "-map",
            "0:a:0",
            "-c:a",
            "pcm_s16le",
            "-ar",
            "16000",
            "-ac",
            "1",
            "-f",
            "segment",
            "-segment_time",
        ]
        .iter()
        .map(OsString::from),
    );
    args.push(segment_seconds.to_string().into());
    args.push("-reset_timestamps".into());
    args.push("1".into());
    args.push(
        output_dir
            .join(format!("{SEGMENT_PREFIX}%03d.{SEGMENT_EXTENSION}"))
            .into_os_string(),
    );
    args
}

// ─────────────────────────────────────────────
// Segmenter trait + ffmpeg implementation
// ─────────────────────────────────────────────

/// Splits an audio file into sequentially numbered `chunk_NNN.wav` files.
#[async_trait]
pub trait AudioSegmenter: Send + Sync {
    async fn segment(&self, input: &Path, output_dir: &Path, segment_seconds: u64) -> Result<()>;
}

/// [`AudioSegmenter`] backed by the ffmpeg binary.
#[derive(Clone, Debug)]
pub struct FfmpegSegmenter {
    binary: PathBuf,
}

impl FfmpegSegmenter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        FfmpegSegmenter {
            binary: binary.into(),
        }
    }
}

impl Default for FfmpegSegmenter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl AudioSegmenter for FfmpegSegmenter {
    async fn segment(&self, input: &Path, output_dir: &Path, segment_seconds: u64) -> Result<()> {
        debug!(
            binary = %self.binary.display(),
            input = %input.display(),
            segment_seconds,
            "running audio segmenter"
        );

        let child = Command::new(&self.binary)
            .args(ffmpeg_args(input, output_dir, segment_seconds))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RelayError::Decode(format!("failed to start {}: {e}", self.binary.display()))
            })?;

        let output = child.wait_with_output().await.map_err(|e| {
            RelayError::Decode(format!("failed waiting for {}: {e}", self.binary.display()))
        })?;

        if !output.status.success() {
            let diagnostics = segmenter_diagnostics(&output.stderr, &output.stdout);
            warn!(
                status = %output.status,
                output = %truncate_string(&diagnostics, 300),
                "audio segmenter failed"
            );
            return Err(RelayError::Decode(format!(
                "{}. Output: {}",
                output.status, diagnostics
            )));
        }

        Ok(())
    }
}

/// Stderr then stdout, one per line, surrounding whitespace trimmed.
fn segmenter_diagnostics(stderr: &[u8], stdout: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);
    format!("{}\n{}", stderr.trim(), stdout.trim())
        .trim()
        .to_string()
}

// ─────────────────────────────────────────────
// SegmentSet
// ─────────────────────────────────────────────

/// Ordered segments plus the temporary directory that stores them.
#[derive(Debug)]
pub struct SegmentSet {
    dir: TempDir,
    chunks: Vec<TranscriptChunk>,
}

impl SegmentSet {
    pub fn chunks(&self) -> &[TranscriptChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the temporary directory now, reporting any failure.
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        debug!(dir = %path.display(), "removed segment directory");
        Ok(())
    }
}

/// Sequence number of a `chunk_NNN.wav` file name.
fn segment_number(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_EXTENSION)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

fn list_segments(dir: &Path) -> Result<Vec<TranscriptChunk>> {
    let mut numbered = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        match segment_number(&name.to_string_lossy()) {
            Some(n) => numbered.push((n, entry.path())),
            None => debug!(file = ?name, "ignoring non-segment file"),
        }
    }
    numbered.sort_by_key(|(n, _)| *n);

    Ok(numbered
        .into_iter()
        .enumerate()
        .map(|(index, (_, path))| TranscriptChunk { index, path })
        .collect())
}

/// Split the audio file at `input` into segments sized for `threshold_bytes`.
///
/// Nothing is returned on failure; the temporary directory is removed.
pub async fn split_audio(
    segmenter: &dyn AudioSegmenter,
    input: &Path,
    threshold_bytes: u64,
) -> Result<SegmentSet> {
    let dir = tempfile::Builder::new().prefix("audio-chunks").tempdir()?;
    let secs = segment_seconds(threshold_bytes);

    segmenter.segment(input, dir.path(), secs).await?;

    let chunks = list_segments(dir.path())?;
    if chunks.is_empty() {
        return Err(RelayError::Decode(
            "segmenting produced no audio segments".to_string(),
        ));
    }

    info!(
        segments = chunks.len(),
        segment_seconds = secs,
        "audio split into segments"
    );
    Ok(SegmentSet { dir, chunks })
}

/// Stage in-memory audio in a temporary file, then split it.
pub async fn split_audio_bytes(
    segmenter: &dyn AudioSegmenter,
    audio: &[u8],
    threshold_bytes: u64,
) -> Result<SegmentSet> {
    let staged = NamedTempFile::new()?;
    tokio::fs::write(staged.path(), audio).await?;
    debug!(bytes = audio.len(), path = %staged.path().display(), "staged audio input");

    split_audio(segmenter, staged.path(), threshold_bytes).await
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
