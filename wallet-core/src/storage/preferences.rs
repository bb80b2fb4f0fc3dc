// wallet-core/src/storage/preferences.rs

use crate::error::{WalletError, WalletResult};
use crate::storage::JsonFileMap;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

pub const WALLETS_LIST: &str = "wallets_list";
pub const ACTIVE_WALLET_ID: &str = "active_wallet_id";
pub const BIOMETRIC_ENABLED: &str = "biometric_enabled";

/// Non-secret settings. Values are strings; callers own the encoding.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> WalletResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> WalletResult<()>;

    async fn remove(&self, key: &str) -> WalletResult<()>;
}

#[derive(Debug)]
pub struct FilePreferences {
    file: JsonFileMap,
}

impl FilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFileMap::new(path),
        }
    }
}

#[async_trait]
impl PreferenceStore for FilePreferences {
    async fn get(&self, key: &str) -> WalletResult<Option<String>> {
        self.file.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        self.file.set(key, value).await
    }

    async fn remove(&self, key: &str) -> WalletResult<()> {
        self.file.remove(key).await
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> WalletResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| WalletError::storage("preferences lock poisoned"))
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferences {
    async fn get(&self, key: &str) -> WalletResult<Option<String>> {
        Ok(self.values()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        self.values()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> WalletResult<()> {
        self.values()?.remove(key);
        Ok(())
    }
}
