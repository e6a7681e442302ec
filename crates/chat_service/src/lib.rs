//! Minimal service-agnostic contract for a one-shot remote chat backend.
//!
//! This crate defines the model catalog, completion request and error taxonomy
//! shared by the session controller and its backends, plus the host-provided
//! credential store contract. It excludes transport details and UI concerns.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use serde::{Deserialize, Serialize};

/// Shared cancellation flag for one remote call.
pub type CancelSignal = Arc<AtomicBool>;

/// Settings key under which the panel keeps its API credential.
pub const API_KEY_SETTING: &str = "sidechat.apiKey";

/// Error returned while constructing a service before any call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInitError {
    message: String,
}

impl ServiceInitError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ServiceInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ServiceInitError {}

impl From<String> for ServiceInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ServiceInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Opaque API secret attached to outgoing requests.
///
/// `Debug` output is redacted so credentials never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Returns a credential when `raw` holds anything besides whitespace.
    #[must_use]
    pub fn from_raw(raw: Option<&str>) -> Option<Self> {
        raw.map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
    }

    /// Returns the secret value for request signing.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Per-token pricing reported by the remote model catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
    pub units: String,
}

/// One entry of the remote model catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub model: String,
    pub pricing: Pricing,
}

impl ModelDescriptor {
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        input: f64,
        output: f64,
        units: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            pricing: Pricing {
                input,
                output,
                units: units.into(),
            },
        }
    }

    /// Short pricing summary for model pickers, e.g. `0.5 / 1.5 per 1M tokens`.
    #[must_use]
    pub fn pricing_label(&self) -> String {
        let units = self.pricing.units.trim();
        let rates = format!("{} / {}", self.pricing.input, self.pricing.output);
        if units.is_empty() {
            rates
        } else {
            format!("{rates} {units}")
        }
    }
}

/// Input required for one chat completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
}

/// Failure reported by a chat backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The remote rejected the credential.
    CredentialInvalid(String),
    /// Network, timeout or non-auth HTTP failure.
    Transient(String),
    /// The remote answered with an unexpected body shape.
    MalformedResponse(String),
    /// The call was abandoned through its cancel signal.
    Cancelled,
}

impl ServiceError {
    #[must_use]
    pub fn is_credential_invalid(&self) -> bool {
        matches!(self, Self::CredentialInvalid(_))
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::CredentialInvalid(message)
            | Self::Transient(message)
            | Self::MalformedResponse(message) => message,
            Self::Cancelled => "request was cancelled",
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialInvalid(message) => write!(f, "credential rejected: {message}"),
            Self::Transient(message) => write!(f, "request failed: {message}"),
            Self::MalformedResponse(message) => write!(f, "malformed response: {message}"),
            Self::Cancelled => f.write_str("request was cancelled"),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Error returned by a credential store read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    message: String,
}

impl StoreError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<String> for StoreError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Host-provided persistent key/value settings.
pub trait CredentialStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Persists `value`; an empty value removes the key.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Remote chat backend. Calls block the calling thread until they resolve.
pub trait ChatService: Send + Sync + 'static {
    /// Stable backend identifier used in logs and startup selection.
    fn service_id(&self) -> &str;

    fn list_models(&self, credential: &Credential) -> Result<Vec<ModelDescriptor>, ServiceError>;

    /// Runs one non-streaming completion and returns the reply text.
    fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
        cancel: CancelSignal,
    ) -> Result<String, ServiceError>;
}
