use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::config::ChatApiConfig;
use crate::error::{parse_error_message, ChatApiError};
use crate::headers::build_headers;
use crate::payload::{ChatRequest, ChatResponse, ModelInfo};
use crate::url::{chat_endpoint, models_endpoint};

/// Optional cancellation signal shared with an in-flight request.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ChatApiConfig) -> Result<Self, ChatApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ChatApiError::from)?;
        Ok(Self { http, config })
    }

    pub fn models_endpoint(&self) -> String {
        models_endpoint(&self.config.base_url)
    }

    pub fn chat_endpoint(&self) -> String {
        chat_endpoint(&self.config.base_url)
    }

    pub fn build_headers(
        &self,
        api_key: &str,
        user_agent: Option<&str>,
    ) -> Result<HeaderMap, ChatApiError> {
        let headers = build_headers(&self.config, api_key, user_agent)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| ChatApiError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    ChatApiError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_models_request(&self, api_key: &str) -> Result<RequestBuilder, ChatApiError> {
        let headers = self.build_headers(api_key, self.config.user_agent.as_deref())?;
        Ok(self.http.get(self.models_endpoint()).headers(headers))
    }

    pub fn build_chat_request(
        &self,
        api_key: &str,
        request: &ChatRequest,
    ) -> Result<RequestBuilder, ChatApiError> {
        let headers = self.build_headers(api_key, self.config.user_agent.as_deref())?;
        let mut payload = request.clone();
        payload.stream = false;
        Ok(self
            .http
            .post(self.chat_endpoint())
            .headers(headers)
            .json(&payload))
    }

    /// Fetches the model catalog.
    pub async fn list_models(
        &self,
        api_key: &str,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Vec<ModelInfo>, ChatApiError> {
        let request = self.build_models_request(api_key)?;
        let body = send_for_body(request, cancellation).await?;
        decode_body("models", &body)
    }

    /// Runs one non-streaming chat completion.
    pub async fn chat(
        &self,
        api_key: &str,
        request: &ChatRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ChatResponse, ChatApiError> {
        let request = self.build_chat_request(api_key, request)?;
        let body = send_for_body(request, cancellation).await?;
        decode_body("chat", &body)
    }
}

async fn send_for_body(
    request: RequestBuilder,
    cancellation: Option<&CancellationSignal>,
) -> Result<String, ChatApiError> {
    if is_cancelled(cancellation) {
        return Err(ChatApiError::Cancelled);
    }

    let response = await_or_cancel(request.send(), cancellation)
        .await?
        .map_err(ChatApiError::from)?;
    let status = response.status();

    if status.is_success() {
        return await_or_cancel(response.text(), cancellation)
            .await?
            .map_err(ChatApiError::from);
    }

    let body = await_or_cancel(response.text(), cancellation)
        .await?
        .unwrap_or_default();
    Err(ChatApiError::Status(status, parse_error_message(status, &body)))
}

fn decode_body<T>(endpoint: &'static str, body: &str) -> Result<T, ChatApiError>
where
    T: DeserializeOwned,
{
    serde_json::from_str(body).map_err(|error| ChatApiError::MalformedBody {
        endpoint,
        message: error.to_string(),
    })
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, ChatApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ChatApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ChatApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
