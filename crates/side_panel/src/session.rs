use chat_service::{
    CompletionRequest, Credential, CredentialStore, ModelDescriptor, ServiceError,
    API_KEY_SETTING,
};
use tracing::{debug, info, warn};

use crate::events::{Notification, PanelEvent, RenderPlan};
use crate::message::{ChatMessage, MessageClock, Role};
use crate::prompt::{build_enriched_prompt, EditorContext};

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    NoCredential,
    Ready,
    AwaitingResponse { request_id: RequestId },
}

/// Side effects the session needs from whoever hosts it.
pub trait SessionHost {
    /// Fetches the model catalog. Blocks until the remote answers.
    fn list_models(&mut self, credential: &Credential)
        -> Result<Vec<ModelDescriptor>, ServiceError>;

    /// Starts a completion in the background; the outcome comes back through
    /// [`ChatSession::on_completion_succeeded`] or [`ChatSession::on_completion_failed`].
    fn start_completion(
        &mut self,
        credential: Credential,
        request: CompletionRequest,
    ) -> Result<RequestId, String>;

    /// Signals cancellation for a request whose outcome will be ignored.
    fn abandon_completion(&mut self, request_id: RequestId);

    fn emit(&mut self, event: PanelEvent);
}

pub const COMPLETION_FAILED_MESSAGE: &str =
    "The assistant could not answer. Check your connection and try again.";
pub const NO_CREDENTIAL_MESSAGE: &str = "Set an API key before sending messages.";
pub const BUSY_MESSAGE: &str = "Wait for the current reply before sending another message.";
pub const NO_MODEL_MESSAGE: &str = "No model is available for this API key.";
pub const ABANDONED_MESSAGE: &str = "The pending request was abandoned because the panel reloaded.";

/// Conversation state for one panel instance.
#[derive(Debug, Clone)]
pub struct ChatSession {
    mode: Mode,
    history: Vec<ChatMessage>,
    models: Vec<ModelDescriptor>,
    credential: Option<Credential>,
    rendered: bool,
    clock: MessageClock,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: Mode::NoCredential,
            history: Vec::new(),
            models: Vec::new(),
            credential: None,
            rendered: false,
            clock: MessageClock::default(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Model catalog fetched by the last successful initialization.
    #[must_use]
    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    #[must_use]
    pub fn default_model(&self) -> Option<&str> {
        self.models.first().map(|model| model.model.as_str())
    }

    /// Re-evaluates the session from scratch for `raw_credential`.
    pub fn initialize(
        &mut self,
        raw_credential: Option<&str>,
        host: &mut dyn SessionHost,
    ) -> RenderPlan {
        self.abandon_in_flight(host);

        let Some(credential) = Credential::from_raw(raw_credential) else {
            self.credential = None;
            self.models.clear();
            self.set_mode(Mode::NoCredential);
            return self.render(RenderPlan::Onboarding, host);
        };

        match host.list_models(&credential) {
            Ok(models) => {
                info!(count = models.len(), "model list refreshed");
                let default_model = models.first().map(|model| model.model.clone());
                self.models = models.clone();
                self.credential = Some(credential);
                self.set_mode(Mode::Ready);
                self.render(
                    RenderPlan::Chat {
                        models,
                        default_model,
                    },
                    host,
                )
            }
            Err(error) if error.is_credential_invalid() => {
                warn!(%error, "credential rejected while listing models");
                self.credential = None;
                self.models.clear();
                self.set_mode(Mode::NoCredential);
                let plan = self.render(RenderPlan::Onboarding, host);
                host.emit(PanelEvent::Notify(Notification::CredentialInvalid));
                plan
            }
            Err(error) => {
                // The previous credential and catalog stay paired; the new
                // credential is never used with a catalog it did not fetch.
                warn!(%error, "model list refresh failed");
                let message = error.message().to_string();
                let plan = if self.rendered {
                    RenderPlan::Unchanged
                } else {
                    RenderPlan::Onboarding
                };
                let plan = self.render(plan, host);
                host.emit(PanelEvent::Notify(Notification::InitializationFailed {
                    message,
                }));
                plan
            }
        }
    }

    /// Reads the stored credential and initializes with it.
    pub fn initialize_from_store(
        &mut self,
        store: &dyn CredentialStore,
        host: &mut dyn SessionHost,
    ) -> RenderPlan {
        let stored = read_stored_credential(store);
        self.initialize(stored.as_deref(), host)
    }

    /// Persists `secret` (empty removes it) and re-initializes from the store.
    pub fn set_credential(
        &mut self,
        secret: &str,
        store: &dyn CredentialStore,
        host: &mut dyn SessionHost,
    ) -> RenderPlan {
        if let Err(error) = store.set(API_KEY_SETTING, secret.trim()) {
            warn!(%error, "failed to persist credential");
            host.emit(PanelEvent::Notify(Notification::CredentialSaveFailed {
                message: error.message().to_string(),
            }));
        }

        self.initialize_from_store(store, host)
    }

    pub fn submit(
        &mut self,
        text: &str,
        model: &str,
        context: &EditorContext,
        host: &mut dyn SessionHost,
    ) {
        if text.trim().is_empty() {
            debug!("ignoring blank submission");
            return;
        }

        let rejection = match &self.mode {
            Mode::Ready => None,
            Mode::NoCredential => Some(NO_CREDENTIAL_MESSAGE),
            Mode::AwaitingResponse { .. } => Some(BUSY_MESSAGE),
        };
        if let Some(message) = rejection {
            debug!(mode = ?self.mode, "submission rejected");
            host.emit(PanelEvent::Error {
                message: message.to_string(),
            });
            return;
        }

        let Some(credential) = self.credential.clone() else {
            host.emit(PanelEvent::Error {
                message: NO_CREDENTIAL_MESSAGE.to_string(),
            });
            return;
        };

        let model = match model.trim() {
            "" => match self.default_model() {
                Some(default_model) => default_model.to_string(),
                None => {
                    host.emit(PanelEvent::Error {
                        message: NO_MODEL_MESSAGE.to_string(),
                    });
                    return;
                }
            },
            chosen => chosen.to_string(),
        };

        let prompt = build_enriched_prompt(text, context);
        let user_message = self.push_message(Role::User, text);
        host.emit(PanelEvent::AppendMessages(vec![user_message]));
        host.emit(PanelEvent::ProcessingStarted);

        match host.start_completion(credential, CompletionRequest { prompt, model }) {
            Ok(request_id) => {
                debug!(request_id, "completion dispatched");
                self.set_mode(Mode::AwaitingResponse { request_id });
            }
            Err(error) => {
                warn!(%error, "completion dispatch failed");
                self.finish_with_error(host);
            }
        }
    }

    pub fn on_completion_succeeded(
        &mut self,
        request_id: RequestId,
        content: String,
        host: &mut dyn SessionHost,
    ) {
        if !self.is_awaiting(request_id) {
            debug!(request_id, "ignoring reply for stale request");
            return;
        }

        let reply = self.push_message(Role::Assistant, content);
        host.emit(PanelEvent::AppendMessages(vec![reply]));
        host.emit(PanelEvent::ProcessingEnded);
        self.set_mode(Mode::Ready);
    }

    pub fn on_completion_failed(
        &mut self,
        request_id: RequestId,
        error: &ServiceError,
        host: &mut dyn SessionHost,
    ) {
        if !self.is_awaiting(request_id) {
            debug!(request_id, %error, "ignoring failure for stale request");
            return;
        }

        warn!(request_id, %error, "completion failed");
        self.finish_with_error(host);
    }

    /// Empties history. Mode is left alone, so a pending reply still lands.
    pub fn clear_history(&mut self, host: &mut dyn SessionHost) {
        self.history.clear();
        host.emit(PanelEvent::HistoryCleared);
    }

    fn finish_with_error(&mut self, host: &mut dyn SessionHost) {
        host.emit(PanelEvent::Error {
            message: COMPLETION_FAILED_MESSAGE.to_string(),
        });
        host.emit(PanelEvent::ProcessingEnded);
        self.set_mode(Mode::Ready);
    }

    fn abandon_in_flight(&mut self, host: &mut dyn SessionHost) {
        let Mode::AwaitingResponse { request_id } = self.mode else {
            return;
        };

        info!(request_id, "abandoning in-flight request");
        host.abandon_completion(request_id);
        self.set_mode(Mode::Ready);
        host.emit(PanelEvent::Error {
            message: ABANDONED_MESSAGE.to_string(),
        });
        host.emit(PanelEvent::ProcessingEnded);
    }

    fn is_awaiting(&self, request_id: RequestId) -> bool {
        matches!(self.mode, Mode::AwaitingResponse { request_id: current } if current == request_id)
    }

    fn push_message(&mut self, role: Role, content: impl Into<String>) -> ChatMessage {
        let message = ChatMessage::new(role, content, self.clock.now());
        self.history.push(message.clone());
        message
    }

    fn render(&mut self, plan: RenderPlan, host: &mut dyn SessionHost) -> RenderPlan {
        if plan != RenderPlan::Unchanged {
            self.rendered = true;
        }
        host.emit(PanelEvent::Render(plan.clone()));
        plan
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            info!(from = ?self.mode, to = ?mode, "session mode changed");
            self.mode = mode;
        }
    }
}

fn read_stored_credential(store: &dyn CredentialStore) -> Option<String> {
    match store.get(API_KEY_SETTING) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "failed to read stored credential");
            None
        }
    }
}
