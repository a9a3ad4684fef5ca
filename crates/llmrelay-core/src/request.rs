//! Generation requests.
//!
//! [`GenerationRequest`] cannot represent the invalid states (both message
//! kinds, or tools together with a schema): the exclusive pairs are sum
//! types. [`GenerationRequestBuilder`] is the boundary where loosely-typed
//! caller input is checked and rejected with [`RelayError::Validation`].

use std::time::Duration;

use crate::error::{RelayError, Result};
use crate::types::{
    Message, PartMessage, ProviderPreference, ReasoningConfig, StructuredOutputSchema, ToolSchema,
};

/// Temperature used when the caller leaves it unset.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// `max_tokens` used when the caller leaves it unset.
pub const DEFAULT_MAX_TOKENS: u32 = 32_000;

/// The conversation sent to the model: plain text or multi-part messages.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageInput {
    Text(Vec<Message>),
    Parts(Vec<PartMessage>),
}

impl MessageInput {
    pub fn len(&self) -> usize {
        match self {
            MessageInput::Text(m) => m.len(),
            MessageInput::Parts(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How the model is asked to answer.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum GenerationMode {
    /// Free-form text.
    #[default]
    Plain,
    /// The model must call one of these tools.
    Tools(Vec<ToolSchema>),
    /// The answer must match this schema.
    Schema(StructuredOutputSchema),
}

impl GenerationMode {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationMode::Plain => "plain",
            GenerationMode::Tools(_) => "tools",
            GenerationMode::Schema(_) => "schema",
        }
    }
}

/// A validated generation intent.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub input: MessageInput,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Overrides the client's default deadline.
    pub timeout: Option<Duration>,
    pub reasoning: Option<ReasoningConfig>,
    pub provider: Option<ProviderPreference>,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    /// Start building a request for `model`.
    pub fn builder(model: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(model)
    }

    /// Plain-text request with every optional field unset.
    pub fn text(model: impl Into<String>, messages: Vec<Message>) -> Self {
        GenerationRequest {
            input: MessageInput::Text(messages),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            timeout: None,
            reasoning: None,
            provider: None,
            mode: GenerationMode::Plain,
        }
    }

    /// Temperature to send, falling back to [`DEFAULT_TEMPERATURE`].
    pub fn effective_temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Max tokens to send, falling back to [`DEFAULT_MAX_TOKENS`].
    pub fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Copy of this request targeting a different model.
    ///
    /// Messages and mode (tools/schema) are kept; reasoning is replaced and
    /// the provider preference is dropped, since it was chosen for the
    /// original model.
    pub fn with_fallback_model(&self, model: &str, reasoning: Option<ReasoningConfig>) -> Self {
        GenerationRequest {
            model: model.to_string(),
            reasoning,
            provider: None,
            ..self.clone()
        }
    }
}

/// Collects loosely-typed request fields and validates them in [`build`](Self::build).
#[derive(Clone, Debug, Default)]
pub struct GenerationRequestBuilder {
    model: String,
    messages: Option<Vec<Message>>,
    message_parts: Option<Vec<PartMessage>>,
    tools: Option<Vec<ToolSchema>>,
    schema: Option<StructuredOutputSchema>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    reasoning: Option<ReasoningConfig>,
    provider: Option<ProviderPreference>,
}

impl GenerationRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        GenerationRequestBuilder {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn message_parts(mut self, parts: Vec<PartMessage>) -> Self {
        self.message_parts = Some(parts);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn schema(mut self, schema: StructuredOutputSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn reasoning(mut self, reasoning: ReasoningConfig) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub fn provider(mut self, provider: ProviderPreference) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Validate mode exclusivity and produce the request.
    pub fn build(self) -> Result<GenerationRequest> {
        let messages = self.messages.filter(|m| !m.is_empty());
        let parts = self.message_parts.filter(|p| !p.is_empty());

        let input = match (messages, parts) {
            (Some(_), Some(_)) => {
                return Err(RelayError::validation(
                    "cannot send both messages and message parts",
                ))
            }
            (None, None) => {
                return Err(RelayError::validation(
                    "must send either messages or message parts",
                ))
            }
            (Some(m), None) => MessageInput::Text(m),
            (None, Some(p)) => MessageInput::Parts(p),
        };

        let mode = match (self.tools, self.schema) {
            (Some(_), Some(_)) => {
                return Err(RelayError::validation(
                    "cannot request structured output and tool calls at the same time",
                ))
            }
            (Some(tools), None) => GenerationMode::Tools(tools),
            (None, Some(schema)) => GenerationMode::Schema(schema),
            (None, None) => GenerationMode::Plain,
        };

        Ok(GenerationRequest {
            input,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
            reasoning: self.reasoning,
            provider: self.provider,
            mode,
        })
    }
}
