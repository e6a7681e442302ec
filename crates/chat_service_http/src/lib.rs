//! HTTP-backed implementation of the shared `chat_service` contract.
//!
//! This adapter drives `chat_api` futures to completion on a private
//! current-thread tokio runtime and folds transport errors into the
//! service-level error taxonomy the session controller understands.

use std::sync::Arc;
use std::time::Duration;

use chat_api::{ChatApiClient, ChatApiConfig, ChatApiError, ChatRequest, ModelInfo};
use chat_service::{
    CancelSignal, ChatService, CompletionRequest, Credential, ModelDescriptor, ServiceError,
    ServiceInitError,
};
use tracing::{debug, warn};

/// Stable service identifier used by startup selection.
pub const HTTP_SERVICE_ID: &str = "http";

/// Runtime configuration for the HTTP chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpChatServiceConfig {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
}

impl HttpChatServiceConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn into_chat_api_config(self) -> Result<ChatApiConfig, ServiceInitError> {
        let mut config = ChatApiConfig::default();

        if let Some(base_url) = self.base_url {
            validate_base_url(&base_url)?;
            config = config.with_base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }

        Ok(config)
    }
}

impl Default for HttpChatServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

trait BlockingClient: Send + Sync {
    fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, ChatApiError>;

    fn chat(
        &self,
        api_key: &str,
        request: &ChatRequest,
        cancel: &CancelSignal,
    ) -> Result<String, ChatApiError>;
}

#[derive(Debug)]
struct DefaultBlockingClient {
    client: ChatApiClient,
}

impl DefaultBlockingClient {
    fn runtime() -> Result<tokio::runtime::Runtime, ChatApiError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                ChatApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })
    }
}

impl BlockingClient for DefaultBlockingClient {
    fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, ChatApiError> {
        Self::runtime()?.block_on(self.client.list_models(api_key, None))
    }

    fn chat(
        &self,
        api_key: &str,
        request: &ChatRequest,
        cancel: &CancelSignal,
    ) -> Result<String, ChatApiError> {
        let reply = Self::runtime()?.block_on(self.client.chat(api_key, request, Some(cancel)))?;
        Ok(reply.content)
    }
}

/// `ChatService` adapter backed by `chat_api` transport primitives.
pub struct HttpChatService {
    client: Arc<dyn BlockingClient>,
}

impl HttpChatService {
    /// Creates a service using real HTTP transport.
    pub fn new(config: HttpChatServiceConfig) -> Result<Self, ServiceInitError> {
        let client = ChatApiClient::new(config.into_chat_api_config()?).map_err(map_init_error)?;

        Ok(Self {
            client: Arc::new(DefaultBlockingClient { client }),
        })
    }

    #[cfg(test)]
    fn with_client_for_tests(client: Arc<dyn BlockingClient>) -> Self {
        Self { client }
    }
}

impl ChatService for HttpChatService {
    fn service_id(&self) -> &str {
        HTTP_SERVICE_ID
    }

    fn list_models(&self, credential: &Credential) -> Result<Vec<ModelDescriptor>, ServiceError> {
        let models = self
            .client
            .list_models(credential.expose())
            .map_err(map_transport_error)?;
        debug!(count = models.len(), "model catalog fetched");

        Ok(models.into_iter().map(into_descriptor).collect())
    }

    fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
        cancel: CancelSignal,
    ) -> Result<String, ServiceError> {
        let payload = ChatRequest::new(request.prompt.clone(), request.model.clone());
        debug!(model = %request.model, prompt_len = request.prompt.len(), "sending chat request");

        self.client
            .chat(credential.expose(), &payload, &cancel)
            .map_err(map_transport_error)
    }
}

fn into_descriptor(info: ModelInfo) -> ModelDescriptor {
    ModelDescriptor::new(
        info.model,
        info.pricing.input,
        info.pricing.output,
        info.pricing.units,
    )
}

fn map_transport_error(error: ChatApiError) -> ServiceError {
    match error {
        ChatApiError::Cancelled => ServiceError::Cancelled,
        ChatApiError::MissingApiKey => ServiceError::CredentialInvalid(error.to_string()),
        error if error.is_unauthorized() => {
            warn!("chat API rejected the credential");
            ServiceError::CredentialInvalid(error.to_string())
        }
        ChatApiError::MalformedBody { .. } => {
            warn!(%error, "chat API returned an unexpected body");
            ServiceError::MalformedResponse(error.to_string())
        }
        error => {
            warn!(%error, "chat API request failed");
            ServiceError::Transient(error.to_string())
        }
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ServiceInitError> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    let parsed = url::Url::parse(trimmed)
        .map_err(|error| ServiceInitError::new(format!("invalid base URL '{trimmed}': {error}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ServiceInitError::new(format!(
            "unsupported base URL scheme '{scheme}' (expected http or https)"
        ))),
    }
}

fn map_init_error(error: ChatApiError) -> ServiceInitError {
    ServiceInitError::new(format!("Failed to initialize http chat service: {error}"))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{Mutex, MutexGuard};

    use assert_matches::assert_matches;
    use chat_api::{ModelPricing, StatusCode};

    use super::*;

    enum FakeOutcome {
        Models(Vec<ModelInfo>),
        Reply(String),
        Error(ChatApiError),
    }

    struct FakeClient {
        observed: Mutex<Vec<(String, Option<ChatRequest>)>>,
        outcome: Mutex<Option<FakeOutcome>>,
    }

    impl FakeClient {
        fn with(outcome: FakeOutcome) -> Arc<Self> {
            Arc::new(Self {
                observed: Mutex::new(Vec::new()),
                outcome: Mutex::new(Some(outcome)),
            })
        }

        fn observed(&self) -> Vec<(String, Option<ChatRequest>)> {
            lock_unpoisoned(&self.observed).clone()
        }

        fn take(&self) -> FakeOutcome {
            match lock_unpoisoned(&self.outcome).take() {
                Some(outcome) => outcome,
                None => panic!("fake outcome should be consumed exactly once"),
            }
        }
    }

    impl BlockingClient for FakeClient {
        fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, ChatApiError> {
            lock_unpoisoned(&self.observed).push((api_key.to_string(), None));
            match self.take() {
                FakeOutcome::Models(models) => Ok(models),
                FakeOutcome::Reply(_) => panic!("unexpected reply outcome for list_models"),
                FakeOutcome::Error(error) => Err(error),
            }
        }

        fn chat(
            &self,
            api_key: &str,
            request: &ChatRequest,
            _cancel: &CancelSignal,
        ) -> Result<String, ChatApiError> {
            lock_unpoisoned(&self.observed).push((api_key.to_string(), Some(request.clone())));
            match self.take() {
                FakeOutcome::Reply(content) => Ok(content),
                FakeOutcome::Models(_) => panic!("unexpected models outcome for chat"),
                FakeOutcome::Error(error) => Err(error),
            }
        }
    }

    fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn credential() -> Credential {
        Credential::from_raw(Some("validkey")).expect("credential")
    }

    fn cancel() -> CancelSignal {
        Arc::new(AtomicBool::new(false))
    }

    fn complete_with(error: ChatApiError) -> ServiceError {
        let service = HttpChatService::with_client_for_tests(FakeClient::with(FakeOutcome::Error(
            error,
        )));
        let request = CompletionRequest {
            prompt: "hi".to_string(),
            model: "gpt-x".to_string(),
        };

        service
            .complete(&credential(), &request, cancel())
            .expect_err("fake error should surface")
    }

    #[test]
    fn list_models_maps_catalog_entries_and_passes_api_key() {
        let client = FakeClient::with(FakeOutcome::Models(vec![ModelInfo {
            model: "gpt-x".to_string(),
            pricing: ModelPricing {
                input: 0.5,
                output: 1.5,
                units: "per 1M tokens".to_string(),
            },
        }]));
        let service = HttpChatService::with_client_for_tests(Arc::clone(&client) as Arc<dyn BlockingClient>);

        let models = service.list_models(&credential()).expect("catalog");

        assert_eq!(
            models,
            vec![ModelDescriptor::new("gpt-x", 0.5, 1.5, "per 1M tokens")]
        );
        assert_eq!(client.observed(), vec![("validkey".to_string(), None)]);
    }

    #[test]
    fn complete_sends_non_streaming_request_and_returns_content() {
        let client = FakeClient::with(FakeOutcome::Reply("A qubit is...".to_string()));
        let service = HttpChatService::with_client_for_tests(Arc::clone(&client) as Arc<dyn BlockingClient>);
        let request = CompletionRequest {
            prompt: "enriched prompt".to_string(),
            model: "gpt-x".to_string(),
        };

        let reply = service
            .complete(&credential(), &request, cancel())
            .expect("reply");

        assert_eq!(reply, "A qubit is...");
        assert_eq!(
            client.observed(),
            vec![(
                "validkey".to_string(),
                Some(ChatRequest::new("enriched prompt", "gpt-x"))
            )]
        );
    }

    #[test]
    fn unauthorized_status_maps_to_credential_invalid() {
        let error = complete_with(ChatApiError::Status(
            StatusCode::UNAUTHORIZED,
            "expired".to_string(),
        ));
        assert_matches!(error, ServiceError::CredentialInvalid(message) if message.contains("expired"));
    }

    #[test]
    fn other_status_maps_to_transient_failure() {
        let error = complete_with(ChatApiError::Status(
            StatusCode::BAD_GATEWAY,
            "upstream".to_string(),
        ));
        assert_matches!(error, ServiceError::Transient(message) if message.contains("502"));
    }

    #[test]
    fn malformed_body_maps_to_malformed_response() {
        let error = complete_with(ChatApiError::MalformedBody {
            endpoint: "chat",
            message: "missing field `content`".to_string(),
        });
        assert_matches!(error, ServiceError::MalformedResponse(_));
    }

    #[test]
    fn cancelled_transport_maps_to_cancelled() {
        assert_eq!(complete_with(ChatApiError::Cancelled), ServiceError::Cancelled);
    }

    #[test]
    fn invalid_base_url_is_rejected_at_construction() {
        let error = match HttpChatService::new(
            HttpChatServiceConfig::new().with_base_url("ftp://example.test"),
        ) {
            Ok(_) => panic!("ftp base URL should be rejected"),
            Err(error) => error,
        };
        assert!(error.message().contains("unsupported base URL scheme 'ftp'"));

        let error = match HttpChatService::new(
            HttpChatServiceConfig::new().with_base_url("not a url"),
        ) {
            Ok(_) => panic!("garbage base URL should be rejected"),
            Err(error) => error,
        };
        assert!(error.message().contains("invalid base URL"));
    }

    #[test]
    fn service_reports_http_identifier() {
        let service = HttpChatService::new(
            HttpChatServiceConfig::new()
                .with_base_url("https://example.test/v1")
                .with_timeout(Duration::from_secs(5)),
        )
        .expect("valid config");
        assert_eq!(service.service_id(), HTTP_SERVICE_ID);
    }
}
