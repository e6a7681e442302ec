mod error;
mod paths;
mod store;

pub use error::CredentialStoreError;
pub use paths::{default_settings_path, settings_path_from, SETTINGS_FILE_NAME, SETTINGS_PATH_ENV_VAR};
pub use store::FileCredentialStore;
