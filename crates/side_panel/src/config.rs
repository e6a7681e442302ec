//! Environment configuration for the `sidechat` host.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chat_service_http::HTTP_SERVICE_ID;
use chat_service_mock::MOCK_SERVICE_ID;
use credential_store::{CredentialStoreError, FileCredentialStore, SETTINGS_PATH_ENV_VAR};
use thiserror::Error;

pub const BASE_URL_ENV_VAR: &str = "SIDECHAT_BASE_URL";
pub const TIMEOUT_ENV_VAR: &str = "SIDECHAT_TIMEOUT_SEC";
pub const PROVIDER_ENV_VAR: &str = "SIDECHAT_PROVIDER";
pub const LOG_ENV_VAR: &str = "SIDECHAT_LOG";

pub const DEFAULT_BASE_URL: &str = "https://api.sidechat.dev/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SIDECHAT_TIMEOUT_SEC must be a whole number of seconds greater than 0, got '{value}'")]
    InvalidTimeout { value: String },

    #[error("unsupported SIDECHAT_PROVIDER '{value}'; expected 'http' or 'mock'")]
    UnknownProvider { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Http,
    Mock,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim() {
            HTTP_SERVICE_ID => Ok(Self::Http),
            MOCK_SERVICE_ID => Ok(Self::Mock),
            other => Err(ConfigError::UnknownProvider {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Explicit settings file; `None` defers to the credential store's lookup.
    pub settings_path: Option<PathBuf>,
    pub provider: ProviderKind,
    pub log_filter: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            settings_path: None,
            provider: ProviderKind::Http,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl PanelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(base_url) = value(BASE_URL_ENV_VAR) {
            config.base_url = base_url;
        }

        if let Some(raw) = value(TIMEOUT_ENV_VAR) {
            config.timeout = parse_timeout(&raw)?;
        }

        config.settings_path = value(SETTINGS_PATH_ENV_VAR).map(PathBuf::from);

        if let Some(provider) = value(PROVIDER_ENV_VAR) {
            config.provider = ProviderKind::parse(&provider)?;
        }

        if let Some(filter) = value(LOG_ENV_VAR) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    /// Opens the settings-file credential store this config points at.
    pub fn credential_store(&self) -> Result<FileCredentialStore, CredentialStoreError> {
        match &self.settings_path {
            Some(path) => Ok(FileCredentialStore::new(path)),
            None => FileCredentialStore::from_env(),
        }
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidTimeout {
            value: raw.to_string(),
        }),
    }
}
