//! Best-effort storage of the form's last-used values.
//!
//! Nothing here reports failure: a missing, unreadable or corrupt file just
//! means no saved preferences, and a failed write is only logged.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PREFS_FILE_NAME: &str = "flamingo-attendance-user-prefs.json";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub name: String,
    pub email: String,
    pub preferred_batch: String,
}

#[derive(Clone, Debug)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the standard file name under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(PREFS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Option<UserPreferences> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "no saved preferences");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(prefs) => Some(prefs),
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "ignoring unreadable preferences"
                );
                None
            }
        }
    }

    pub async fn save(&self, prefs: &UserPreferences) {
        let body = match serde_json::to_vec_pretty(prefs) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "could not encode preferences");
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.path, body).await {
            tracing::debug!(path = %self.path.display(), error = %e, "could not save preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn prefs() -> UserPreferences {
        UserPreferences {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            preferred_batch: "women".into(),
        }
    }

    #[tokio::test]
    async fn saved_preferences_load_back() {
        let dir = tempdir().expect("tempdir");
        let store = PreferenceStore::in_dir(dir.path());
        assert_eq!(store.load().await, None);
        store.save(&prefs()).await;
        assert_eq!(store.load().await, Some(prefs()));
    }

    #[tokio::test]
    async fn file_uses_camel_case_keys() {
        let dir = tempdir().expect("tempdir");
        let store = PreferenceStore::in_dir(dir.path());
        store.save(&prefs()).await;
        let raw = std::fs::read_to_string(store.path()).expect("read");
        assert!(raw.contains("\"preferredBatch\""));
    }

    #[tokio::test]
    async fn corrupt_file_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let store = PreferenceStore::in_dir(dir.path());
        std::fs::write(store.path(), "{not json").expect("write");
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn partial_file_fills_defaults() {
        let dir = tempdir().expect("tempdir");
        let store = PreferenceStore::in_dir(dir.path());
        std::fs::write(store.path(), r#"{"name":"Ravi"}"#).expect("write");
        let loaded = store.load().await.expect("prefs");
        assert_eq!(loaded.name, "Ravi");
        assert_eq!(loaded.preferred_batch, "");
    }

    #[tokio::test]
    async fn failed_save_is_swallowed() {
        let dir = tempdir().expect("tempdir");
        let store = PreferenceStore::in_dir(dir.path().join("missing").join("nested"));
        store.save(&prefs()).await;
        assert_eq!(store.load().await, None);
    }
}
