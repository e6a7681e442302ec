//! Editor side-panel chat client.
//!
//! ## Layers
//!
//! - [`session::ChatSession`] owns history and mode and turns panel actions
//!   into [`events::PanelEvent`]s. It never blocks on a completion; it hands
//!   dispatch to a [`session::SessionHost`].
//! - [`runtime::PanelRuntime`] is the production host: one worker thread per
//!   completion, outcomes queued and applied by
//!   [`runtime::PanelRuntime::flush_pending`] on the host thread.
//! - [`prompt`] builds the enriched prompt sent to the remote service.
//!
//! ## Environment
//!
//! - `SIDECHAT_BASE_URL`: remote API base URL (default `https://api.sidechat.dev/v1`)
//! - `SIDECHAT_TIMEOUT_SEC`: per-request timeout in seconds, must be > 0 (default `120`)
//! - `SIDECHAT_SETTINGS_PATH`: settings file holding `sidechat.apiKey`
//! - `SIDECHAT_PROVIDER`: `http` or `mock` (default `http`)
//! - `SIDECHAT_LOG`: tracing filter directive (default `warn`)
//!
//! Blank values count as unset.

pub mod cli;
pub mod commands;
pub mod config;
pub mod events;
pub mod message;
pub mod prompt;
pub mod runtime;
pub mod services;
pub mod session;
