//! GeminiApiClient - Direct REST API client for Gemini.
//!
//! Implements both upstream ports: `generateContent` for answers and the
//! model listing used by the resolver. One request per call, no retries.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use sommelier_core::generation::{
    GenerationBackend, GenerationRequest, ModelCatalog, ModelDescriptor,
};
use sommelier_core::{Result, SommelierError};
use std::time::Duration;
use tracing::debug;

/// Largest page the listing endpoint accepts; one page covers every model.
const LIST_PAGE_SIZE: u32 = 1000;

/// Client that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiApiClient {
    /// Creates a client for `base_url` (e.g. `https://generativelanguage.googleapis.com/v1beta`).
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SommelierError::config(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent?key={api_key}",
            self.base_url,
            api_key = self.api_key
        )
    }

    fn list_url(&self) -> String {
        format!(
            "{}/models?pageSize={LIST_PAGE_SIZE}&key={api_key}",
            self.base_url,
            api_key = self.api_key
        )
    }

    async fn read_success(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body_text = response
            .text()
            .await
            .unwrap_or_else(|_| format!("Failed to read Gemini {what} error body"));
        Err(map_http_error(status, body_text))
    }
}

#[async_trait]
impl GenerationBackend for GeminiApiClient {
    async fn generate(&self, model: &str, request: &GenerationRequest) -> Result<String> {
        let body = GenerateContentRequest::from(request);
        debug!(model, prompt_len = request.prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(self.generate_url(model))
            .json(&body)
            .send()
            .await
            .map_err(|err| transport_error("Gemini API request failed", err))?;

        let response = Self::read_success(response, "generation").await?;

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            SommelierError::upstream(None, format!("Failed to parse Gemini response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl ModelCatalog for GeminiApiClient {
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>> {
        let response = self
            .client
            .get(self.list_url())
            .send()
            .await
            .map_err(|err| transport_error("Gemini model listing failed", err))?;

        let response = Self::read_success(response, "listing").await?;

        let parsed: ListModelsResponse = response.json().await.map_err(|err| {
            SommelierError::upstream(None, format!("Failed to parse Gemini model listing: {err}"))
        })?;

        Ok(parsed.models)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl From<&GenerationRequest> for GenerateContentRequest {
    fn from(request: &GenerationRequest) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_output_tokens,
            },
        }
    }
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
        .ok_or_else(|| {
            SommelierError::upstream(None, "Gemini API returned no text in the response candidates")
        })
}

fn map_http_error(status: StatusCode, body: String) -> SommelierError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    SommelierError::upstream(Some(status.as_u16()), message)
}

/// Transport failures carry reqwest's message, which may embed the URL.
fn transport_error(context: &str, err: reqwest::Error) -> SommelierError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "transport error"
    };
    SommelierError::upstream(err.status().map(|s| s.as_u16()), format!("{context}: {kind}"))
}
