use std::path::PathBuf;

use chat_service::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialStoreError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings JSON at {path}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings file {path} must contain a JSON object")]
    NotAnObject { path: PathBuf },

    #[error("setting '{key}' in {path} must be a string")]
    NonStringValue { path: PathBuf, key: String },

    #[error("failed to serialize settings for {path}: {source}")]
    JsonSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no settings location: set {env_var} or HOME")]
    NoSettingsLocation { env_var: &'static str },
}

impl CredentialStoreError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<CredentialStoreError> for StoreError {
    fn from(error: CredentialStoreError) -> Self {
        StoreError::new(error.to_string())
    }
}
