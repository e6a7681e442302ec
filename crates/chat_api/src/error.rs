use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug)]
pub enum ChatApiError {
    MissingApiKey,
    InvalidHeader(String),
    Request(reqwest::Error),
    Status(StatusCode, String),
    MalformedBody {
        endpoint: &'static str,
        message: String,
    },
    Cancelled,
    Unknown(String),
}

impl ChatApiError {
    /// Returns true when the remote rejected the API key.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(StatusCode::UNAUTHORIZED, _))
    }

    /// Returns true when the request hit the client-side timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(error) if error.is_timeout())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorPayload {
    Nested { error: ErrorPayloadFields },
    Flat(ErrorPayloadFields),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorPayloadFields {
    pub message: Option<String>,
}

impl ErrorPayload {
    fn message(&self) -> Option<&str> {
        let fields = match self {
            Self::Nested { error } => error,
            Self::Flat(fields) => fields,
        };
        fields
            .message
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

impl fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key is required"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Request(error) if error.is_timeout() => write!(f, "request timed out: {error}"),
            Self::Request(error) => write!(f, "request error: {error}"),
            Self::Status(status, message) => write!(f, "HTTP {status} {message}"),
            Self::MalformedBody { endpoint, message } => {
                write!(f, "malformed {endpoint} response: {message}")
            }
            Self::Cancelled => write!(f, "request was cancelled"),
            Self::Unknown(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ChatApiError {}

impl From<reqwest::Error> for ChatApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error)
    }
}

/// Extracts a readable message from a non-2xx response body.
///
/// JSON bodies shaped `{"error":{"message":..}}` or `{"message":..}` yield their
/// message; other non-empty bodies are returned verbatim; empty bodies fall back
/// to the status reason phrase.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) {
        if let Some(message) = payload.message() {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
