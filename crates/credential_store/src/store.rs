use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chat_service::{CredentialStore, StoreError};
use serde_json::{Map, Value};

use crate::error::CredentialStoreError;
use crate::paths::default_settings_path;

/// Settings-file backed [`CredentialStore`].
///
/// The file holds one JSON object of string settings. Unknown keys written by
/// other tools are preserved on every write.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Opens the store at the location resolved from the environment.
    pub fn from_env() -> Result<Self, CredentialStoreError> {
        Ok(Self::new(default_settings_path()?))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_value(&self, key: &str) -> Result<Option<String>, CredentialStoreError> {
        let settings = self.load()?;
        match settings.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(CredentialStoreError::NonStringValue {
                path: self.path.clone(),
                key: key.to_string(),
            }),
        }
    }

    /// Writes `value` under `key`; an empty value removes the key.
    pub fn write_value(&self, key: &str, value: &str) -> Result<(), CredentialStoreError> {
        let _guard = lock_unpoisoned(&self.write_lock);
        let mut settings = self.load()?;

        if value.is_empty() {
            if settings.remove(key).is_none() {
                return Ok(());
            }
        } else {
            settings.insert(key.to_string(), Value::String(value.to_string()));
        }

        self.persist(&settings)
    }

    fn load(&self) -> Result<Map<String, Value>, CredentialStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(CredentialStoreError::io(
                    "reading settings file",
                    &self.path,
                    source,
                ))
            }
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        let parsed: Value =
            serde_json::from_str(&raw).map_err(|source| CredentialStoreError::JsonParse {
                path: self.path.clone(),
                source,
            })?;

        match parsed {
            Value::Object(settings) => Ok(settings),
            _ => Err(CredentialStoreError::NotAnObject {
                path: self.path.clone(),
            }),
        }
    }

    fn persist(&self, settings: &Map<String, Value>) -> Result<(), CredentialStoreError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|source| {
                CredentialStoreError::io("creating settings directory", parent, source)
            })?;
        }

        let mut rendered = serde_json::to_string_pretty(settings).map_err(|source| {
            CredentialStoreError::JsonSerialize {
                path: self.path.clone(),
                source,
            }
        })?;
        rendered.push('\n');

        let temp_path = temp_path_for(&self.path);
        let mut file = File::create(&temp_path).map_err(|source| {
            CredentialStoreError::io("creating temporary settings file", &temp_path, source)
        })?;
        restrict_permissions(&file, &temp_path)?;
        file.write_all(rendered.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|source| {
                CredentialStoreError::io("writing temporary settings file", &temp_path, source)
            })?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            CredentialStoreError::io("replacing settings file", &self.path, source)
        })?;

        tracing::debug!(path = %self.path.display(), "settings file updated");
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read_value(key).map_err(StoreError::from)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.write_value(key, value).map_err(StoreError::from)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(unix)]
fn restrict_permissions(file: &File, path: &Path) -> Result<(), CredentialStoreError> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(|source| CredentialStoreError::io("restricting settings file mode", path, source))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File, _path: &Path) -> Result<(), CredentialStoreError> {
    Ok(())
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::temp_path_for;

    #[test]
    fn temp_path_sits_next_to_target() {
        assert_eq!(
            temp_path_for(Path::new("/cfg/sidechat/settings.json")),
            Path::new("/cfg/sidechat/settings.json.tmp")
        );
    }
}
