// wallet-core/src/storage/secret_store.rs
//
// Secret persistence. Entries are named `{purpose}_{wallet_id}`; the bare
// purpose name is the legacy single-wallet slot.

use crate::config::{SecretBackend, StorageConfig};
use crate::error::{WalletError, WalletResult};
use crate::storage::JsonFileMap;
use async_trait::async_trait;
use keyring::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretPurpose {
    Mnemonic,
    EthereumKey,
    SolanaKey,
}

impl SecretPurpose {
    pub const ALL: [SecretPurpose; 3] = [
        SecretPurpose::Mnemonic,
        SecretPurpose::EthereumKey,
        SecretPurpose::SolanaKey,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SecretPurpose::Mnemonic => "wallet_mnemonic",
            SecretPurpose::EthereumKey => "eth_private_key",
            SecretPurpose::SolanaKey => "sol_private_key",
        }
    }

    pub fn scoped_key(self, wallet_id: &str) -> String {
        format!("{}_{}", self.as_str(), wallet_id)
    }

    /// Unscoped slot used before multi-wallet support.
    pub fn legacy_key(self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for SecretPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> WalletResult<()>;

    async fn get(&self, key: &str) -> WalletResult<Option<Zeroizing<String>>>;

    /// Deleting a missing entry succeeds.
    async fn delete(&self, key: &str) -> WalletResult<()>;

    /// False when values sit in plain text on disk.
    fn is_confidential(&self) -> bool;
}

// =============================================================================
// OS KEYCHAIN
// =============================================================================

/// macOS Keychain, Windows Credential Manager or Secret Service, one entry
/// per key under a fixed service name.
#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
}

impl KeychainStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Whether the platform store answers at all. A missing probe entry
    /// counts as working.
    pub fn probe(&self) -> bool {
        match Entry::new(&self.service, "__probe__").and_then(|e| e.get_password()) {
            Ok(_) | Err(keyring::Error::NoEntry) => true,
            Err(e) => {
                info!("OS keychain not accessible: {}", e);
                false
            }
        }
    }

    async fn blocking<T, F>(&self, key: &str, op: F) -> WalletResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service.clone();
        let user = key.to_string();
        tokio::task::spawn_blocking(move || Entry::new(&service, &user).and_then(op))
            .await
            .map_err(|e| WalletError::storage(format!("Keychain task failed: {}", e)))?
            .map_err(|e| WalletError::storage(format!("Keychain error for {}: {}", key, e)))
    }
}

#[async_trait]
impl SecretStore for KeychainStore {
    async fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        let value = Zeroizing::new(value.to_string());
        self.blocking(key, move |entry| entry.set_password(&value)).await
    }

    async fn get(&self, key: &str) -> WalletResult<Option<Zeroizing<String>>> {
        self.blocking(key, |entry| match entry.get_password() {
            Ok(v) => Ok(Some(Zeroizing::new(v))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        self.blocking(key, |entry| match entry.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }

    fn is_confidential(&self) -> bool {
        true
    }
}

// =============================================================================
// PLAINTEXT FILE
// =============================================================================

/// JSON file in the data directory. For development and platforms without
/// a credential store; anything with file access can read it.
#[derive(Debug)]
pub struct PlaintextFileStore {
    file: JsonFileMap,
}

impl PlaintextFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFileMap::new(path),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }
}

#[async_trait]
impl SecretStore for PlaintextFileStore {
    async fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        self.file.set(key, value).await
    }

    async fn get(&self, key: &str) -> WalletResult<Option<Zeroizing<String>>> {
        Ok(self.file.get(key).await?.map(Zeroizing::new))
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        self.file.remove(key).await
    }

    fn is_confidential(&self) -> bool {
        false
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// Process-local store; nothing outlives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Zeroizing<String>>>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> WalletResult<std::sync::MutexGuard<'_, HashMap<String, Zeroizing<String>>>> {
        self.entries
            .lock()
            .map_err(|_| WalletError::storage("memory store lock poisoned"))
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        self.entries()?
            .insert(key.to_string(), Zeroizing::new(value.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> WalletResult<Option<Zeroizing<String>>> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn is_confidential(&self) -> bool {
        true
    }
}

/// Backend selected by `storage.secret_backend`. An unreachable keychain
/// falls back to the plaintext file, which `is_confidential` reports.
pub fn open_secret_store(config: &StorageConfig) -> Arc<dyn SecretStore> {
    let file_path = config.resolved_data_dir().join("secrets.json");
    match config.secret_backend {
        SecretBackend::Keychain => {
            let keychain = KeychainStore::new(&config.keychain_service);
            if keychain.probe() {
                Arc::new(keychain)
            } else {
                warn!(path = %file_path.display(), "keychain unavailable, storing secrets in plaintext file");
                Arc::new(PlaintextFileStore::new(file_path))
            }
        }
        SecretBackend::PlaintextFile => {
            warn!(path = %file_path.display(), "plaintext secret storage selected");
            Arc::new(PlaintextFileStore::new(file_path))
        }
    }
}
