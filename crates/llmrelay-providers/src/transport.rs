//! HTTP transport — the leaf that puts a single request on the wire.
//!
//! A transport never interprets status codes: any response, 200 or not, comes
//! back as a [`RawResponse`]. An `Err` means no status was obtained
//! (connection failure, cancellation, or the deadline passing first).

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tokio::time::Instant;
use tracing::debug;

use llmrelay_core::{RelayError, Result};

// ─────────────────────────────────────────────
// Request / response descriptors
// ─────────────────────────────────────────────

/// Body of an outbound request.
///
/// Kept as plain data so a retry loop can re-send the same request.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// Serialized JSON, sent as `application/json`.
    Json(Vec<u8>),
    /// `multipart/form-data` fields.
    Multipart(MultipartForm),
}

/// A `multipart/form-data` body: text fields plus at most one file part.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.file = Some(FilePart {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        });
        self
    }

    /// Value of a text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn to_reqwest(&self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        if let Some(file) = &self.file {
            let part = reqwest::multipart::Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str("application/octet-stream")
                .map_err(|e| RelayError::transport(format!("invalid file part: {e}")))?;
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}

/// A POST request: target URL, Bearer key, and body.
#[derive(Clone, Debug, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub api_key: String,
    pub payload: Payload,
}

impl OutboundRequest {
    pub fn json(url: impl Into<String>, api_key: impl Into<String>, body: Vec<u8>) -> Self {
        OutboundRequest {
            url: url.into(),
            api_key: api_key.into(),
            payload: Payload::Json(body),
        }
    }

    pub fn multipart(url: impl Into<String>, api_key: impl Into<String>, form: MultipartForm) -> Self {
        OutboundRequest {
            url: url.into(),
            api_key: api_key.into(),
            payload: Payload::Multipart(form),
        }
    }
}

/// Status code and body bytes of a completed request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        RawResponse {
            status,
            body: body.into(),
        }
    }

    /// Only 200 counts as success; any other status is a failure even with a body.
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

// ─────────────────────────────────────────────
// Trait + reqwest implementation
// ─────────────────────────────────────────────

/// Executes one POST request, giving up when `deadline` passes.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(&self, request: &OutboundRequest, deadline: Instant) -> Result<RawResponse>;
}

/// [`HttpTransport`] backed by a shared, connection-pooled `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: &OutboundRequest, deadline: Instant) -> Result<RawResponse> {
        let builder = self
            .client
            .post(&request.url)
            .bearer_auth(&request.api_key);

        let builder = match &request.payload {
            Payload::Json(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone()),
            Payload::Multipart(form) => builder.multipart(form.to_reqwest()?),
        };

        let response = tokio::time::timeout_at(deadline, builder.send())
            .await
            .map_err(|_| RelayError::transport("deadline exceeded before a response arrived"))?
            .map_err(|e| RelayError::transport(e.to_string()))?;

        let status = response.status().as_u16();

        let body = tokio::time::timeout_at(deadline, response.bytes())
            .await
            .map_err(|_| RelayError::transport("deadline exceeded while reading the response"))?
            .map_err(|e| RelayError::transport(format!("failed to read response body: {e}")))?;

        debug!(url = %request.url, status, bytes = body.len(), "HTTP response received");

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
