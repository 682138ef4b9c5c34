//! Persisted API settings.
//!
//! Stores settings as a flat JSON object in the platform-specific config
//! directory:
//! - Linux: ~/.config/walletlink/settings.json
//! - macOS: ~/Library/Application Support/walletlink/settings.json
//! - Windows: %APPDATA%/walletlink/settings.json

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use walletlink_application::ports::{SettingsError, SettingsStore};

use crate::serialization::{SerializationError, from_json_bytes, to_json_stable_bytes};

type SettingsMap = BTreeMap<String, String>;

fn serialization(error: SerializationError) -> SettingsError {
    SettingsError::Serialization(error.to_string())
}

/// File-backed settings store.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    /// Creates a store at the default location.
    ///
    /// # Errors
    ///
    /// Returns `NoConfigDir` if the platform has no config directory.
    pub fn new() -> Result<Self, SettingsError> {
        Self::default_path()
            .map(Self::at)
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Creates a store backed by an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the default settings file path, if available.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("walletlink").join("settings.json"))
    }

    /// Returns the file this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<SettingsMap, SettingsError> {
        match fs::read(&self.path).await {
            Ok(content) if content.iter().all(u8::is_ascii_whitespace) => Ok(SettingsMap::new()),
            Ok(content) => from_json_bytes(&content).map_err(serialization),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, settings: &SettingsMap) -> Result<(), SettingsError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }

        let content = to_json_stable_bytes(settings).map_err(serialization)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn modify(&self, change: impl FnOnce(&mut SettingsMap) -> bool) -> Result<(), SettingsError> {
        let _guard = self.write_lock.lock().await;
        let mut settings = self.load().await?;
        if change(&mut settings) {
            self.save(&settings).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.modify(|settings| {
            settings.insert(key.to_string(), value.to_string()).as_deref() != Some(value)
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), SettingsError> {
        self.modify(|settings| settings.remove(key).is_some()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use walletlink_domain::settings_keys;

    fn store(dir: &tempfile::TempDir) -> FileSettingsStore {
        FileSettingsStore::at(dir.path().join("nested").join("settings.json"))
    }

    #[test]
    fn default_path_is_under_walletlink() {
        if let Some(path) = FileSettingsStore::default_path() {
            assert!(path.ends_with("walletlink/settings.json"));
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);

        assert_eq!(store.get(settings_keys::BASE_URL).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_persists_stable_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);

        store.set(settings_keys::USE_MOCK, "true").await.unwrap();
        store.set(settings_keys::BASE_URL, "https://wallet.test/api").await.unwrap();

        let written = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            written,
            "{\n  \"api.baseUrl\": \"https://wallet.test/api\",\n  \"api.useMock\": \"true\"\n}\n"
        );

        let reopened = FileSettingsStore::at(store.path());
        assert_eq!(
            reopened.get(settings_keys::BASE_URL).await.unwrap().as_deref(),
            Some("https://wallet.test/api")
        );
    }

    #[tokio::test]
    async fn remove_and_alias_lookup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = store(&dir);
        store.set(settings_keys::LEGACY_API_KEY, "old").await.unwrap();
        store.set(settings_keys::API_KEY, "new").await.unwrap();

        store.remove(settings_keys::API_KEY).await.unwrap();
        store.remove("never.set").await.unwrap();

        let key = store
            .get_with_alias(settings_keys::API_KEY, settings_keys::LEGACY_API_KEY)
            .await
            .unwrap();
        assert_eq!(key.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ broken").unwrap();

        let result = FileSettingsStore::at(&path).get(settings_keys::BASE_URL).await;

        assert!(matches!(result, Err(SettingsError::Serialization(_))));
    }
}
