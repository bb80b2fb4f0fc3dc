// wallet-core/src/storage/mod.rs
//
// - `secret_store`: mnemonics and private keys
// - `preferences`: non-secret key/value settings
// - `registry`: the wallet list and the active-wallet pointer

pub mod preferences;
pub mod registry;
pub mod secret_store;

pub use preferences::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use registry::{WalletInfo, WalletRegistry};
pub use secret_store::{
    open_secret_store, KeychainStore, MemoryStore, PlaintextFileStore, SecretPurpose, SecretStore,
};

use crate::error::{WalletError, WalletResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// A string map persisted as one JSON object. Each mutation rewrites the
/// file through a temporary sibling and a rename.
#[derive(Debug)]
pub(crate) struct JsonFileMap {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileMap {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> WalletResult<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                WalletError::storage(format!("{} is corrupted: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(WalletError::storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn persist(&self, map: &BTreeMap<String, String>) -> WalletResult<()> {
        let io_err = |e: std::io::Error| {
            WalletError::storage(format!("Failed to write {}: {}", self.path.display(), e))
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let body = serde_json::to_vec_pretty(map)
            .map_err(|e| WalletError::storage(format!("Failed to encode store: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)
    }

    pub(crate) async fn get(&self, key: &str) -> WalletResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    pub(crate) async fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value.to_string());
        self.persist(&map).await
    }

    pub(crate) async fn remove(&self, key: &str) -> WalletResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.persist(&map).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_json_file_map_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let map = JsonFileMap::new(&path);
        assert_eq!(map.get("a").await.unwrap(), None);
        map.set("a", "1").await.unwrap();
        map.set("b", "2").await.unwrap();
        map.remove("a").await.unwrap();
        map.remove("missing").await.unwrap();

        let reopened = JsonFileMap::new(&path);
        assert_eq!(reopened.get("a").await.unwrap(), None);
        assert_eq!(reopened.get("b").await.unwrap().as_deref(), Some("2"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupted_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileMap::new(&path).get("a").await.unwrap_err();
        assert!(matches!(err, WalletError::Storage(_)));
    }
}
