use serde::{Deserialize, Serialize};

/// Request body for `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub model: String,
    /// Always sent as `false`; the client overrides any other value.
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            stream: false,
        }
    }
}

/// Success body of `POST /chat`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    pub content: String,
}

/// Pricing object nested in each `GET /models` entry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
    pub units: String,
}

/// One element of the `GET /models` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelInfo {
    pub model: String,
    pub pricing: ModelPricing,
}
