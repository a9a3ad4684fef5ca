//! Voice transcription via Groq's Whisper API.
//!
//! Any OpenAI-compatible `/audio/transcriptions` endpoint will work. Byte
//! sources are always split into upload-sized segments and transcribed one
//! by one; URL sources are fetched by the endpoint itself in a single call.
//! Every call gets its own deadline and up to 5 attempts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info};

use llmrelay_core::config::TranscriptionConfig;
use llmrelay_core::utils::expand_home;
use llmrelay_core::{AudioJob, AudioSource, Result, TranscriptResult};

use crate::aggregate::aggregate;
use crate::chunker::{split_audio_bytes, AudioSegmenter, FfmpegSegmenter};
use crate::retry::RetryPolicy;
use crate::traits::TranscriptionProvider;
use crate::transport::{HttpTransport, MultipartForm, OutboundRequest, ReqwestTransport};

pub const DEFAULT_TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_TRANSCRIPTION_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-large-v3-turbo";

/// Sent when neither the job nor the client names a language.
const DEFAULT_LANGUAGE: &str = "en";
/// Name of the multipart file part; segments are always WAV.
const UPLOAD_FILE_NAME: &str = "file.wav";

// ─────────────────────────────────────────────
// Groq Whisper
// ─────────────────────────────────────────────

/// Groq-based transcription using their Whisper API.
pub struct GroqTranscriber {
    transport: Arc<dyn HttpTransport>,
    segmenter: Arc<dyn AudioSegmenter>,
    api_key: String,
    api_base: String,
    model: String,
    language: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for GroqTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqTranscriber")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("language", &self.language)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GroqTranscriber {
    pub fn new(api_key: impl Into<String>) -> Self {
        GroqTranscriber {
            transport: Arc::new(ReqwestTransport::new()),
            segmenter: Arc::new(FfmpegSegmenter::default()),
            api_key: api_key.into(),
            api_base: DEFAULT_TRANSCRIPTION_API_BASE.to_string(),
            model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            language: None,
            timeout: DEFAULT_TRANSCRIPTION_TIMEOUT,
        }
    }

    pub fn from_config(config: &TranscriptionConfig) -> Self {
        debug!(
            api_base = %config.api_base,
            model = %config.model,
            ffmpeg = %config.ffmpeg_path,
            "Creating transcription client"
        );

        GroqTranscriber {
            segmenter: Arc::new(FfmpegSegmenter::new(expand_home(&config.ffmpeg_path))),
            api_base: config.api_base.clone(),
            model: config.model.clone(),
            language: config.language.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            ..Self::new(config.api_key.clone())
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn AudioSegmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Use another OpenAI-compatible endpoint.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the transcriber is configured (has an API key).
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn transcriptions_url(&self) -> String {
        format!("{}/audio/transcriptions", self.api_base.trim_end_matches('/'))
    }

    /// Text fields shared by every call of a job.
    fn base_form(&self, job: &AudioJob) -> MultipartForm {
        let model = job.model.as_deref().unwrap_or(&self.model);
        let language = job
            .language
            .as_deref()
            .or(self.language.as_deref())
            .unwrap_or(DEFAULT_LANGUAGE);

        MultipartForm::new()
            .text("model", model)
            .text("language", language)
            .text("response_format", "verbose_json")
    }

    /// One transcription call with its own deadline and retry budget.
    async fn transcribe_call(&self, job: &AudioJob, form: MultipartForm) -> Result<TranscriptResult> {
        let deadline = Instant::now() + job.timeout.unwrap_or(self.timeout);
        let outbound = OutboundRequest::multipart(self.transcriptions_url(), self.api_key.clone(), form);

        let transport = &self.transport;
        let outbound = &outbound;
        let response = RetryPolicy::transcription()
            .run(move |attempt| {
                debug!(attempt, "transcription attempt");
                transport.post(outbound, deadline)
            })
            .await?;

        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[async_trait]
impl TranscriptionProvider for GroqTranscriber {
    async fn transcribe(&self, job: &AudioJob) -> Result<TranscriptResult> {
        match &job.source {
            AudioSource::Url(url) => {
                debug!(url = %url, "transcribing remote audio");
                let form = self.base_form(job).text("url", url.as_str());
                self.transcribe_call(job, form).await
            }
            AudioSource::Bytes(audio) => {
                debug!(
                    bytes = audio.len(),
                    limit = job.upload_limit_bytes,
                    "splitting audio for transcription"
                );
                let segments =
                    split_audio_bytes(self.segmenter.as_ref(), audio, job.upload_limit_bytes).await?;

                let result = aggregate(segments, |_, segment| {
                    let form = self.base_form(job).file("file", UPLOAD_FILE_NAME, segment);
                    self.transcribe_call(job, form)
                })
                .await?;

                info!(
                    chars = result.text.len(),
                    duration = result.duration,
                    "transcription complete"
                );
                Ok(result)
            }
        }
    }

    fn display_name(&self) -> &str {
        "Groq Whisper"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeSegmenter, ScriptedTransport};
    use crate::transport::Payload;
    use llmrelay_core::RelayError;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn segment_body(text: &str, duration: f64) -> String {
        serde_json::json!({ "text": text, "duration": duration, "language": "english" }).to_string()
    }

    fn abc_segmenter() -> Arc<FakeSegmenter> {
        Arc::new(FakeSegmenter::with_contents(vec![
            ("chunk_000.wav", "audio-a"),
            ("chunk_001.wav", "audio-b"),
            ("chunk_002.wav", "audio-c"),
        ]))
    }

    fn transcriber(transport: &Arc<ScriptedTransport>, segmenter: Arc<FakeSegmenter>) -> GroqTranscriber {
        GroqTranscriber::new("groq-key")
            .with_transport(transport.clone())
            .with_segmenter(segmenter)
    }

    fn forms(transport: &ScriptedTransport) -> Vec<MultipartForm> {
        transport
            .requests()
            .into_iter()
            .map(|r| match r.payload {
                Payload::Multipart(form) => form,
                Payload::Json(_) => panic!("expected multipart payload"),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_bytes_job_transcribes_segments_in_order() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, segment_body("A", 1.0))
                .respond(200, segment_body("B", 2.0))
                .respond(200, segment_body("C", 3.0)),
        );
        let segmenter = abc_segmenter();
        let result = transcriber(&transport, segmenter.clone())
            .transcribe(&AudioJob::from_bytes(b"RIFF....".to_vec()))
            .await
            .unwrap();

        assert_eq!(result.text, "ABC");
        assert_eq!(result.duration, 6.0);
        assert!(!segmenter.seen_dir().exists());

        let forms = forms(&transport);
        let uploads: Vec<&[u8]> = forms
            .iter()
            .map(|f| f.file.as_ref().unwrap().bytes.as_slice())
            .collect();
        assert_eq!(uploads, vec![&b"audio-a"[..], &b"audio-b"[..], &b"audio-c"[..]]);

        for form in &forms {
            assert_eq!(form.field("model"), Some(DEFAULT_TRANSCRIPTION_MODEL));
            assert_eq!(form.field("language"), Some("en"));
            assert_eq!(form.field("response_format"), Some("verbose_json"));
            assert_eq!(form.field("url"), None);
            assert_eq!(form.file.as_ref().unwrap().file_name, "file.wav");
        }

        let sent = &transport.requests()[0];
        assert_eq!(sent.url, "https://api.groq.com/openai/v1/audio/transcriptions");
        assert_eq!(sent.api_key, "groq-key");
    }

    #[tokio::test]
    async fn test_url_job_is_a_single_call_without_splitting() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, segment_body("hello", 4.5)));
        // Any attempt to split would fail the job.
        let segmenter = Arc::new(FakeSegmenter::failing());

        let result = transcriber(&transport, segmenter)
            .transcribe(&AudioJob::from_url("https://cdn.example.com/a.mp3").language("nl"))
            .await
            .unwrap();

        assert_eq!(result.text, "hello");
        assert_eq!(result.duration, 4.5);

        let forms = forms(&transport);
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].field("url"), Some("https://cdn.example.com/a.mp3"));
        assert_eq!(forms[0].field("language"), Some("nl"));
        assert!(forms[0].file.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_segment_is_retried_until_success() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, segment_body("A", 1.0))
                .respond(500, "internal")
                .fail("connection reset")
                .respond(200, segment_body("B", 2.0))
                .respond(200, segment_body("C", 3.0)),
        );
        let started = Instant::now();
        let result = transcriber(&transport, abc_segmenter())
            .transcribe(&AudioJob::from_bytes(vec![0; 16]))
            .await
            .unwrap();

        assert_eq!(result.text, "ABC");
        assert_eq!(transport.calls(), 5);
        assert_eq!(started.elapsed(), Duration::from_millis(300));

        let uploads: Vec<Vec<u8>> = forms(&transport)
            .into_iter()
            .map(|f| f.file.unwrap().bytes)
            .collect();
        assert_eq!(uploads[1], uploads[2]);
        assert_eq!(uploads[2], uploads[3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_retried() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(400, "bad request")
                .respond(200, segment_body("A", 1.0))
                .respond(200, segment_body("B", 1.0))
                .respond(200, segment_body("C", 1.0)),
        );
        let started = Instant::now();
        let result = transcriber(&transport, abc_segmenter())
            .transcribe(&AudioJob::from_bytes(vec![0; 16]))
            .await
            .unwrap();

        assert_eq!(result.text, "ABC");
        assert_eq!(transport.calls(), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_segment_fails_whole_job() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, segment_body("A", 1.0))
                .respond(500, "e1")
                .respond(429, "e2")
                .respond(502, "e3")
                .respond(500, "e4")
                .respond(503, "still failing"),
        );
        let segmenter = abc_segmenter();
        let err = transcriber(&transport, segmenter.clone())
            .transcribe(&AudioJob::from_bytes(vec![0; 16]))
            .await
            .unwrap_err();

        match err {
            RelayError::RetryExhausted {
                attempts,
                status,
                body,
            } => {
                assert_eq!(attempts, 5);
                assert_eq!(status, 503);
                assert_eq!(body, "still failing");
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
        assert_eq!(transport.calls(), 6);
        assert!(!segmenter.seen_dir().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_call_gets_its_own_deadline() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(500, "retry me")
                .respond(200, segment_body("A", 1.0))
                .respond(200, segment_body("B", 1.0))
                .respond(200, segment_body("C", 1.0)),
        );
        let job = AudioJob::builder()
            .bytes(vec![0; 16])
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let started = Instant::now();

        transcriber(&transport, abc_segmenter())
            .transcribe(&job)
            .await
            .unwrap();

        let deadlines = transport.deadlines();
        let first_call = started + Duration::from_secs(5);
        // Retries share their call's deadline; later segments start fresh.
        assert_eq!(deadlines[0], first_call);
        assert_eq!(deadlines[1], first_call);
        assert_eq!(deadlines[2], first_call + Duration::from_millis(100));
        assert_eq!(deadlines[3], first_call + Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_deadline_is_thirty_seconds() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, segment_body("x", 1.0)));
        let started = Instant::now();

        transcriber(&transport, abc_segmenter())
            .transcribe(&AudioJob::from_url("https://cdn.example.com/a.mp3"))
            .await
            .unwrap();

        assert_eq!(transport.deadlines()[0], started + Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_decode_failure_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let segmenter = Arc::new(FakeSegmenter::failing());
        let err = transcriber(&transport, segmenter.clone())
            .transcribe(&AudioJob::from_bytes(vec![1, 2, 3]))
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::Decode(_)));
        assert_eq!(transport.calls(), 0);
        assert!(!segmenter.seen_dir().exists());
    }

    #[tokio::test]
    async fn test_job_overrides_model_and_language() {
        let transport = Arc::new(ScriptedTransport::new().respond(200, segment_body("x", 1.0)));
        let job = AudioJob::builder()
            .url("https://cdn.example.com/a.mp3")
            .model("whisper-large-v3")
            .language("fr")
            .build()
            .unwrap();

        transcriber(&transport, abc_segmenter())
            .transcribe(&job)
            .await
            .unwrap();

        let form = &forms(&transport)[0];
        assert_eq!(form.field("model"), Some("whisper-large-v3"));
        assert_eq!(form.field("language"), Some("fr"));
    }

    #[test]
    fn test_from_config() {
        let config = TranscriptionConfig {
            api_key: "k".into(),
            api_base: "https://whisper.local/v1/".into(),
            language: Some("de".into()),
            ..Default::default()
        };
        let t = GroqTranscriber::from_config(&config);

        assert!(t.is_configured());
        assert_eq!(t.transcriptions_url(), "https://whisper.local/v1/audio/transcriptions");
        assert_eq!(t.timeout, Duration::from_secs(30));
        assert_eq!(t.display_name(), "Groq Whisper");
        let form = t.base_form(&AudioJob::from_url("u"));
        assert_eq!(form.field("language"), Some("de"));
    }

    #[test]
    fn test_not_configured_without_key() {
        assert!(!GroqTranscriber::new("").is_configured());
    }

    // ── End-to-end with mock server ──

    #[tokio::test]
    async fn test_url_transcription_over_http() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("Authorization", "Bearer groq-key"))
            .and(body_string_contains("name=\"url\""))
            .and(body_string_contains("https://cdn.example.com/talk.ogg"))
            .and(body_string_contains("verbose_json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(segment_body("Hi there.", 2.5)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let t = GroqTranscriber::new("groq-key").with_api_base(mock_server.uri());
        let result = t
            .transcribe(&AudioJob::from_url("https://cdn.example.com/talk.ogg"))
            .await
            .unwrap();

        assert_eq!(result.text, "Hi there.");
        assert_eq!(result.duration, 2.5);
    }
}
