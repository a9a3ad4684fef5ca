//! Request body construction for `/chat/completions`.
//!
//! Turns a [`GenerationRequest`] into the JSON payload. Defaults are applied
//! for temperature and max tokens; every other optional field is omitted
//! entirely when unset rather than sent as `null`.

use serde::Serialize;

use llmrelay_core::request::GenerationMode;
use llmrelay_core::types::{
    Message, PartMessage, ProviderPreference, ReasoningConfig, StructuredOutputSchema, ToolSchema,
};
use llmrelay_core::{GenerationRequest, MessageInput, RelayError, Result};

/// Tools mode always forces a tool call; the model may not answer in text.
pub const TOOL_CHOICE_REQUIRED: &str = "required";

/// Wire shape of a chat completion request.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: WireMessages<'a>,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<&'a ReasoningConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<&'a ProviderPreference>,
}

/// Both message kinds serialize under the same `messages` key.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WireMessages<'a> {
    Text(&'a [Message]),
    Parts(&'a [PartMessage]),
}

/// `{"type": "function", "function": {...}}`
#[derive(Debug, Serialize)]
pub struct ToolDefinition<'a> {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: &'a ToolSchema,
}

/// `{"type": "json_schema", "json_schema": {name, strict, schema}}`
#[derive(Debug, Serialize)]
pub struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    pub format_type: &'static str,
    pub json_schema: &'a StructuredOutputSchema,
}

/// Build the wire request, rejecting requests that can't be sent.
pub fn build_request(request: &GenerationRequest) -> Result<ChatCompletionRequest<'_>> {
    if request.model.trim().is_empty() {
        return Err(RelayError::validation("model must not be empty"));
    }

    let messages = match &request.input {
        MessageInput::Text(m) => WireMessages::Text(m),
        MessageInput::Parts(p) => WireMessages::Parts(p),
    };

    let mut body = ChatCompletionRequest {
        model: &request.model,
        messages,
        temperature: request.effective_temperature(),
        max_tokens: request.effective_max_tokens(),
        response_format: None,
        tools: None,
        tool_choice: None,
        reasoning: request.reasoning.as_ref(),
        provider: request.provider.as_ref(),
    };

    match &request.mode {
        GenerationMode::Plain => {}
        GenerationMode::Tools(tools) => {
            if tools.is_empty() {
                return Err(RelayError::validation(
                    "tools mode requires at least one tool schema",
                ));
            }
            body.tools = Some(
                tools
                    .iter()
                    .map(|function| ToolDefinition {
                        tool_type: "function",
                        function,
                    })
                    .collect(),
            );
            body.tool_choice = Some(TOOL_CHOICE_REQUIRED);
        }
        GenerationMode::Schema(schema) => {
            body.response_format = Some(ResponseFormat {
                format_type: "json_schema",
                json_schema: schema,
            });
        }
    }

    Ok(body)
}

/// Build and serialize the request body.
pub fn build_request_body(request: &GenerationRequest) -> Result<Vec<u8>> {
    let body = build_request(request)?;
    Ok(serde_json::to_vec(&body)?)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
