//! Chat session state machine.
//!
//! One `ChatSession` backs one chat widget. The transcript always starts with
//! a single system greeting; user and assistant turns are appended as sends
//! complete. State lives behind a mutex so a send can be attempted while an
//! earlier one is still awaiting the network; that attempt is refused instead
//! of issuing a second request.

use crate::catalog::{self, ModelCatalog, ModelListing};
use crate::client::{validate_credential, OpenAiClient};
use crate::models::{ChatMessage, ChatRequest, ModelOption};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub const DEFAULT_GREETING: &str = "Hello! Ask me anything powered by OpenAI.";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const NO_RESPONSE: &str = "No response from OpenAI";
const GENERIC_FAILURE: &str = "Failed to get response from OpenAI";

/// What happens to the optimistic user turn when a send fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    #[default]
    KeepUserMessage,
    RevertTranscript,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub greeting: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Refuse to send until `validate_key` has succeeded for the current key.
    pub require_validated_key: bool,
    pub rollback: RollbackPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            require_validated_key: false,
            rollback: RollbackPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BlankInput,
    NoCredential,
    KeyNotValidated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Ignored(IgnoreReason),
    Busy,
    Replied(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidateOutcome {
    Valid,
    Invalid(String),
    Busy,
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub credential: String,
    pub selected_model: String,
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub busy: bool,
    pub validating: bool,
    pub error: Option<String>,
    pub model_options: Vec<ModelOption>,
    pub key_validated: bool,
    pub models_loaded: bool,
}

struct SessionState {
    credential: String,
    selected_model: String,
    messages: Vec<ChatMessage>,
    input: String,
    busy: bool,
    validating: bool,
    error: Option<String>,
    catalog: ModelCatalog,
    key_validated: bool,
}

impl SessionState {
    fn in_flight(&self) -> bool {
        self.busy || self.validating || self.catalog.loading
    }
}

pub struct ChatSession {
    client: Arc<OpenAiClient>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl ChatSession {
    pub fn new(client: Arc<OpenAiClient>, config: SessionConfig, credential: impl Into<String>) -> Self {
        let state = SessionState {
            credential: credential.into(),
            selected_model: config.model.clone(),
            messages: vec![ChatMessage::system(config.greeting.clone())],
            input: String::new(),
            busy: false,
            validating: false,
            error: None,
            catalog: ModelCatalog::default(),
            key_validated: false,
        };
        Self {
            client,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().expect("session lock poisoned")
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            credential: state.credential.clone(),
            selected_model: state.selected_model.clone(),
            messages: state.messages.clone(),
            input: state.input.clone(),
            busy: state.busy,
            validating: state.validating,
            error: state.error.clone(),
            model_options: state.catalog.options().to_vec(),
            key_validated: state.key_validated,
            models_loaded: state.catalog.loaded,
        }
    }

    pub fn set_input(&self, input: impl Into<String>) {
        self.lock().input = input.into();
    }

    /// A new key must be validated again before gated sends go through.
    pub fn set_credential(&self, credential: impl Into<String>) {
        let mut state = self.lock();
        state.credential = credential.into();
        state.key_validated = false;
        state.error = None;
    }

    pub fn select_model(&self, value: &str) -> bool {
        let mut state = self.lock();
        if !state.catalog.contains(value) {
            return false;
        }
        state.selected_model = value.to_string();
        true
    }

    /// Truncates to the greeting and clears input and error. A send already in
    /// flight is not cancelled.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.messages = vec![ChatMessage::system(self.config.greeting.clone())];
        state.input.clear();
        state.error = None;
        debug!("transcript cleared");
    }

    pub async fn send_message(&self, text: impl Into<String>) -> SendOutcome {
        self.set_input(text);
        self.send().await
    }

    /// Sends the pending input as the next user turn.
    pub async fn send(&self) -> SendOutcome {
        let (credential, request, optimistic_at) = {
            let mut state = self.lock();
            let input = state.input.trim().to_string();
            if input.is_empty() {
                return SendOutcome::Ignored(IgnoreReason::BlankInput);
            }
            if state.credential.trim().is_empty() {
                return SendOutcome::Ignored(IgnoreReason::NoCredential);
            }
            if self.config.require_validated_key && !state.key_validated {
                return SendOutcome::Ignored(IgnoreReason::KeyNotValidated);
            }
            if state.in_flight() {
                debug!("send refused: request already in flight");
                return SendOutcome::Busy;
            }

            let optimistic_at = state.messages.len();
            state.messages.push(ChatMessage::user(input));
            state.input.clear();
            state.busy = true;
            state.error = None;

            let request = ChatRequest {
                model: state.selected_model.clone(),
                messages: state.messages.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                stream: false,
            };
            (state.credential.clone(), request, optimistic_at)
        };

        let result = self.client.chat_completion(&credential, &request).await;

        let mut state = self.lock();
        state.busy = false;
        let message = match result {
            Ok(response) => match (response.error, response.choices.into_iter().next()) {
                (Some(api_error), _) => api_error.message,
                (None, Some(choice)) => {
                    let content = choice.message.content;
                    state.messages.push(ChatMessage::assistant(content.clone()));
                    info!(model = %request.model, "assistant replied");
                    return SendOutcome::Replied(content);
                }
                (None, None) => NO_RESPONSE.to_string(),
            },
            Err(e) => {
                let text = e.to_string();
                if text.is_empty() {
                    GENERIC_FAILURE.to_string()
                } else {
                    text
                }
            }
        };

        warn!(error = %message, "send failed");
        if self.config.rollback == RollbackPolicy::RevertTranscript {
            revert_optimistic(&mut state.messages, optimistic_at, &request);
        }
        state.error = Some(message.clone());
        SendOutcome::Failed(message)
    }

    /// Checks the key locally, then lists models with it. Success marks the
    /// key validated and refreshes the model options from the same listing.
    pub async fn validate_key(&self) -> ValidateOutcome {
        let credential = {
            let mut state = self.lock();
            if let Err(e) = validate_credential(&state.credential) {
                let message = e.to_string();
                state.key_validated = false;
                state.error = Some(message.clone());
                return ValidateOutcome::Invalid(message);
            }
            if state.in_flight() {
                return ValidateOutcome::Busy;
            }
            state.validating = true;
            state.error = None;
            state.credential.clone()
        };

        let result = self.client.list_models(&credential).await;

        let mut state = self.lock();
        state.validating = false;
        match result {
            Ok(ids) => {
                state.key_validated = true;
                let options = catalog::select_options(ids);
                let listing = if options.is_empty() {
                    ModelListing::KeepPrevious("no chat models in listing".to_string())
                } else {
                    ModelListing::Fetched(options)
                };
                state.catalog.apply(listing);
                info!("api key validated");
                ValidateOutcome::Valid
            }
            Err(e) => {
                let message = e.to_string();
                state.key_validated = false;
                state.error = Some(message.clone());
                ValidateOutcome::Invalid(message)
            }
        }
    }

    /// Best-effort refresh of the model options. Never sets a user-visible
    /// error; the typed listing is returned for callers that care.
    pub async fn refresh_models(&self) -> Option<ModelListing> {
        let credential = {
            let mut state = self.lock();
            if !state.key_validated || state.in_flight() {
                return None;
            }
            state.catalog.loading = true;
            state.credential.clone()
        };

        let listing = catalog::fetch(&self.client, &credential).await;
        self.lock().catalog.apply(listing.clone());
        Some(listing)
    }
}

/// Removes the optimistic user turn if it is still where the send left it.
fn revert_optimistic(messages: &mut Vec<ChatMessage>, at: usize, request: &ChatRequest) {
    let sent = request.messages.last();
    if messages.len() == at + 1 && messages.get(at) == sent {
        messages.truncate(at);
    }
}
