//! Transport-only client primitives for the hosted chat API.
//!
//! This crate owns request building, response decoding and error mapping for
//! the `GET /models` and `POST /chat` endpoints only. It contains no credential
//! persistence and no session or UI coupling.
//!
//! Every call is one-shot: chat requests are always sent with `stream: false`
//! and the reply body is decoded as a single JSON document.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod payload;
pub mod url;

pub use client::{CancellationSignal, ChatApiClient};
pub use config::ChatApiConfig;
pub use error::ChatApiError;
pub use payload::{ChatRequest, ChatResponse, ModelInfo, ModelPricing};
pub use url::{chat_endpoint, models_endpoint, normalize_base_url};
pub use reqwest::StatusCode;
