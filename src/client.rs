use crate::models::{
    ChatRequest, ChatResponse, Error, ErrorEnvelope, ModelList, Result,
};
use crate::transport::{RawResponse, Transport};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const KEY_PREFIX: &str = "sk-";

const COMMUNICATION_FAILURE: &str = "Failed to communicate with OpenAI API";

/// Local credential check; no request is made for a credential that fails it.
pub fn validate_credential(credential: &str) -> Result<()> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(Error::Validation("API key is required".to_string()));
    }
    if !credential.starts_with(KEY_PREFIX) {
        return Err(Error::Validation(
            "Invalid API key format. OpenAI API keys start with 'sk-'".to_string(),
        ));
    }
    Ok(())
}

pub struct OpenAiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_base_url(transport, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { transport, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends one chat completion. Returns the parsed body on 2xx; the caller
    /// decides what an empty `choices` list means.
    pub async fn chat_completion(&self, credential: &str, request: &ChatRequest) -> Result<ChatResponse> {
        validate_credential(credential)?;

        let body = serde_json::to_value(request)
            .map_err(|e| Error::Api(format!("Could not encode request: {}", e)))?;

        debug!(model = %request.model, turns = request.messages.len(), "sending chat completion");
        let response = self
            .transport
            .post_json(&self.url("/v1/chat/completions"), credential.trim(), &body)
            .await
            .map_err(|e| {
                warn!(error = %e, "chat completion transport failure");
                Error::Network(COMMUNICATION_FAILURE.to_string())
            })?;

        let response = ensure_success(response)?;
        serde_json::from_str::<ChatResponse>(&response.body).map_err(|e| {
            warn!(error = %e, "chat completion body did not parse");
            Error::Network(COMMUNICATION_FAILURE.to_string())
        })
    }

    /// Single read-only call against the model list; yields the status code
    /// untouched so the status monitor can classify it.
    pub async fn probe(&self, credential: &str) -> Result<u16> {
        let response = self
            .transport
            .get(&self.url("/v1/models"), credential.trim())
            .await
            .map_err(|e| {
                warn!(error = %e, "status probe transport failure");
                Error::Network("Network error".to_string())
            })?;
        Ok(response.status)
    }

    pub async fn list_models(&self, credential: &str) -> Result<Vec<String>> {
        validate_credential(credential)?;

        let response = self
            .transport
            .get(&self.url("/v1/models"), credential.trim())
            .await
            .map_err(|_| Error::Network(COMMUNICATION_FAILURE.to_string()))?;
        let response = ensure_success(response)?;

        let list: ModelList = serde_json::from_str(&response.body)
            .map_err(|e| Error::Api(format!("Unexpected model list: {}", e)))?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }
}

/// Maps a non-2xx response to `Error::Api`, preferring the structured message.
fn ensure_success(response: RawResponse) -> Result<RawResponse> {
    if response.is_success() {
        return Ok(response);
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(&response.body) {
        warn!(status = response.status, "API returned an error body");
        return Err(Error::Api(envelope.error.message));
    }

    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown Status");
    warn!(status = response.status, "API returned an unstructured error");
    Err(Error::Api(format!("HTTP {} {}", response.status, reason)))
}
