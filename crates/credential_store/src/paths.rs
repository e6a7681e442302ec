use std::path::PathBuf;

use crate::error::CredentialStoreError;

pub const SETTINGS_PATH_ENV_VAR: &str = "SIDECHAT_SETTINGS_PATH";
pub const SETTINGS_DIR: &str = "sidechat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Resolves the settings file from the process environment.
pub fn default_settings_path() -> Result<PathBuf, CredentialStoreError> {
    settings_path_from(|key| std::env::var(key).ok())
}

/// Resolves the settings file using `lookup` for environment values.
///
/// Order: explicit override, then `$XDG_CONFIG_HOME/sidechat`, then
/// `$HOME/.config/sidechat`. Blank values count as unset.
pub fn settings_path_from(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<PathBuf, CredentialStoreError> {
    let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(explicit) = non_blank(SETTINGS_PATH_ENV_VAR) {
        return Ok(PathBuf::from(explicit.trim()));
    }

    if let Some(config_home) = non_blank("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home.trim())
            .join(SETTINGS_DIR)
            .join(SETTINGS_FILE_NAME));
    }

    if let Some(home) = non_blank("HOME") {
        return Ok(PathBuf::from(home.trim())
            .join(".config")
            .join(SETTINGS_DIR)
            .join(SETTINGS_FILE_NAME));
    }

    Err(CredentialStoreError::NoSettingsLocation {
        env_var: SETTINGS_PATH_ENV_VAR,
    })
}
