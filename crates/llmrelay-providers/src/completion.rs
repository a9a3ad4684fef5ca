//! Completion client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! One call owns one deadline. The first attempt goes out with the caller's
//! model; a transient status (408, 429, 502) hands the call to the fallback
//! model when one is configured and retry is enabled. Fallback attempts run
//! through a bounded [`RetryPolicy`] and share the parent deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use llmrelay_core::config::{CompletionConfig, FallbackConfig};
use llmrelay_core::error::is_transient_status;
use llmrelay_core::types::{
    GenerationResponse, Message, StructuredOutputSchema, ToolCall, ToolSchema,
};
use llmrelay_core::utils::truncate_string;
use llmrelay_core::{GenerationRequest, RelayError, Result};

use crate::request_body::build_request_body;
use crate::retry::RetryPolicy;
use crate::traits::CompletionProvider;
use crate::transport::{HttpTransport, OutboundRequest, RawResponse, ReqwestTransport};

/// Deadline applied when neither the request nor the client sets one.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(15);

pub const DEFAULT_COMPLETION_API_BASE: &str = "https://openrouter.ai/api/v1";

// ─────────────────────────────────────────────
// CompletionClient
// ─────────────────────────────────────────────

/// Immutable after construction; safe to share between independent calls.
pub struct CompletionClient {
    transport: Arc<dyn HttpTransport>,
    api_key: String,
    api_base: String,
    default_model: String,
    default_timeout: Duration,
    retry_enabled: bool,
    fallback: Option<FallbackConfig>,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .field("retry_enabled", &self.retry_enabled)
            .field("fallback", &self.fallback.as_ref().map(|f| &f.model))
            .finish()
    }
}

impl CompletionClient {
    pub fn new(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        CompletionClient {
            transport: Arc::new(ReqwestTransport::new()),
            api_key: api_key.into(),
            api_base: DEFAULT_COMPLETION_API_BASE.to_string(),
            default_model: default_model.into(),
            default_timeout: DEFAULT_COMPLETION_TIMEOUT,
            retry_enabled: true,
            fallback: None,
        }
    }

    pub fn from_config(config: &CompletionConfig) -> Self {
        debug!(
            api_base = %config.api_base,
            model = %config.model,
            fallback = config.fallback.as_ref().map(|f| f.model.as_str()).unwrap_or("none"),
            "Creating completion client"
        );

        CompletionClient {
            api_base: config.api_base.clone(),
            default_timeout: Duration::from_secs(config.timeout_secs),
            retry_enabled: config.retry_enabled,
            fallback: config.fallback.clone(),
            ..Self::new(config.api_key.clone(), config.model.clone())
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_fallback(mut self, fallback: FallbackConfig) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_retry_enabled(mut self, enabled: bool) -> Self {
        self.retry_enabled = enabled;
        self
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// The fallback in effect: configured and retry enabled.
    pub fn active_fallback(&self) -> Option<&FallbackConfig> {
        self.fallback.as_ref().filter(|_| self.retry_enabled)
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    /// Dispatch one generation request.
    ///
    /// Validation happens before anything is sent. Transport failures on the
    /// first attempt are returned as-is; non-transient statuses (or transient
    /// ones without an active fallback) become [`RelayError::HttpStatus`].
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let body = build_request_body(request)?;
        let deadline = Instant::now() + request.timeout.unwrap_or(self.default_timeout);

        debug!(
            model = %request.model,
            mode = request.mode.name(),
            messages = request.input.len(),
            "Calling completion endpoint"
        );

        let outbound = OutboundRequest::json(self.completions_url(), self.api_key.clone(), body);
        let response = self.transport.post(&outbound, deadline).await.map_err(|e| {
            error!(model = %request.model, error = %e, "HTTP request failed");
            e
        })?;

        if response.is_success() {
            return parse_response(&response);
        }

        if is_transient_status(response.status) {
            if let Some(fallback) = self.active_fallback() {
                warn!(
                    model = %request.model,
                    fallback = %fallback.model,
                    status = response.status,
                    "Transient failure, switching to fallback model"
                );
                return self.generate_with_fallback(request, fallback, deadline).await;
            }
        }

        let body = response.body_text();
        error!(
            model = %request.model,
            status = response.status,
            body = %truncate_string(&body, 200),
            "API error"
        );
        Err(RelayError::HttpStatus {
            status: response.status,
            body,
        })
    }

    async fn generate_with_fallback(
        &self,
        request: &GenerationRequest,
        fallback: &FallbackConfig,
        deadline: Instant,
    ) -> Result<GenerationResponse> {
        let fallback_request = request.with_fallback_model(&fallback.model, fallback.reasoning.clone());
        let body = build_request_body(&fallback_request)?;
        let outbound = OutboundRequest::json(self.completions_url(), self.api_key.clone(), body);

        let transport = &self.transport;
        let outbound = &outbound;
        let response = RetryPolicy::completion_fallback()
            .run(move |attempt| {
                debug!(model = %fallback_request.model, attempt, "Fallback attempt");
                transport.post(outbound, deadline)
            })
            .await?;

        info!(model = %fallback.model, "Fallback model succeeded");
        parse_response(&response)
    }

    // ── Convenience entry points ──

    /// Plain text generation with the default model. Returns the first
    /// choice's content (empty when the model returned none).
    pub async fn generate_text(&self, messages: Vec<Message>) -> Result<String> {
        let request = GenerationRequest::builder(&self.default_model)
            .messages(messages)
            .build()?;
        let response = self.generate(&request).await?;
        Ok(response.content().unwrap_or_default().to_string())
    }

    /// Tool-calling generation with the default model; the model is forced
    /// to call at least one tool.
    pub async fn generate_tools(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolSchema>,
    ) -> Result<Vec<ToolCall>> {
        let request = GenerationRequest::builder(&self.default_model)
            .messages(messages)
            .tools(tools)
            .build()?;
        let response = self.generate(&request).await?;
        Ok(response.tool_calls().to_vec())
    }

    /// Structured-output generation with the default model, deserializing
    /// the returned JSON content into `T`.
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        messages: Vec<Message>,
        schema: StructuredOutputSchema,
    ) -> Result<T> {
        let request = GenerationRequest::builder(&self.default_model)
            .messages(messages)
            .schema(schema)
            .build()?;
        let response = self.generate(&request).await?;
        Ok(serde_json::from_str(response.content().unwrap_or_default())?)
    }
}

fn parse_response(response: &RawResponse) -> Result<GenerationResponse> {
    let parsed: GenerationResponse = serde_json::from_slice(&response.body).map_err(|e| {
        error!(error = %e, "Failed to parse completion response");
        e
    })?;

    debug!(
        provider = %parsed.provider,
        model = %parsed.model,
        choices = parsed.choices.len(),
        total_tokens = parsed.usage.total_tokens,
        "Completion response received"
    );
    Ok(parsed)
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        CompletionClient::generate(self, request).await
    }

    fn display_name(&self) -> &str {
        "OpenAI-compatible completions"
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
