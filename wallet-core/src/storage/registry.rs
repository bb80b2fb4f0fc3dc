// wallet-core/src/storage/registry.rs
//
// Wallet list and active pointer, persisted in preferences as a JSON array
// under `wallets_list` and a plain id under `active_wallet_id`.

use crate::error::{WalletError, WalletResult};
use crate::storage::preferences::{PreferenceStore, ACTIVE_WALLET_ID, WALLETS_LIST};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Public wallet record. Holds no secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    pub id: String,
    pub name: String,
    pub ethereum_address: String,
    pub solana_address: String,
    /// Unix milliseconds
    pub created_at: i64,
    pub is_imported: bool,
}

/// Every mutation is one read-modify-write under `write`, so concurrent
/// renames and deletes cannot lose each other's updates.
pub struct WalletRegistry {
    prefs: Arc<dyn PreferenceStore>,
    write: Mutex<()>,
}

impl std::fmt::Debug for WalletRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletRegistry").finish_non_exhaustive()
    }
}

impl WalletRegistry {
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self {
            prefs,
            write: Mutex::new(()),
        }
    }

    /// `wallet_{unix ms}_{9 base36 chars}`
    pub fn generate_id() -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..9)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        format!("wallet_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
    }

    async fn load(&self) -> WalletResult<Vec<WalletInfo>> {
        match self.prefs.get(WALLETS_LIST).await? {
            Some(json) => serde_json::from_str(&json)
                .map_err(|e| WalletError::storage(format!("Wallet list is corrupted: {}", e))),
            None => Ok(Vec::new()),
        }
    }

    async fn store(&self, wallets: &[WalletInfo]) -> WalletResult<()> {
        let json = serde_json::to_string(wallets)
            .map_err(|e| WalletError::storage(format!("Failed to encode wallet list: {}", e)))?;
        self.prefs.set(WALLETS_LIST, &json).await
    }

    fn upsert(wallets: &mut Vec<WalletInfo>, info: WalletInfo) {
        match wallets.iter_mut().find(|w| w.id == info.id) {
            Some(existing) => *existing = info,
            None => wallets.push(info),
        }
    }

    /// Puts the previous list back after a failed pointer write, so the
    /// list and the pointer never disagree.
    async fn restore(&self, previous: &[WalletInfo], err: WalletError) -> WalletError {
        if let Err(e) = self.store(previous).await {
            warn!("wallet list could not be restored: {}", e);
        }
        err
    }

    /// Insert or replace by id. The first wallet saved into an empty
    /// registry becomes active.
    pub async fn save(&self, info: WalletInfo) -> WalletResult<()> {
        let _guard = self.write.lock().await;
        let previous = self.load().await?;
        let first = previous.is_empty();
        let id = info.id.clone();

        let mut wallets = previous.clone();
        Self::upsert(&mut wallets, info);
        self.store(&wallets).await?;
        if first {
            if let Err(e) = self.prefs.set(ACTIVE_WALLET_ID, &id).await {
                return Err(self.restore(&previous, e).await);
            }
            debug!(wallet_id = %id, "first wallet activated");
        }
        Ok(())
    }

    /// `save` followed by `set_active` as one unit. An empty name becomes
    /// "Wallet N", numbered under the same lock. Returns the stored record.
    pub async fn save_and_activate(&self, mut info: WalletInfo) -> WalletResult<WalletInfo> {
        let _guard = self.write.lock().await;
        let previous = self.load().await?;
        if info.name.trim().is_empty() {
            info.name = Self::default_name(&previous);
        }

        let mut wallets = previous.clone();
        Self::upsert(&mut wallets, info.clone());
        self.store(&wallets).await?;
        if let Err(e) = self.prefs.set(ACTIVE_WALLET_ID, &info.id).await {
            return Err(self.restore(&previous, e).await);
        }
        Ok(info)
    }

    pub async fn list_all(&self) -> WalletResult<Vec<WalletInfo>> {
        self.load().await
    }

    pub async fn get_by_id(&self, id: &str) -> WalletResult<Option<WalletInfo>> {
        Ok(self.load().await?.into_iter().find(|w| w.id == id))
    }

    /// Removes the record. When it was active, the first remaining wallet
    /// takes over, or the pointer is cleared if none remain.
    pub async fn delete(&self, id: &str) -> WalletResult<Option<WalletInfo>> {
        let _guard = self.write.lock().await;
        let previous = self.load().await?;
        let Some(pos) = previous.iter().position(|w| w.id == id) else {
            return Ok(None);
        };
        let mut wallets = previous.clone();
        let removed = wallets.remove(pos);
        let was_active = self.prefs.get(ACTIVE_WALLET_ID).await?.as_deref() == Some(id);
        self.store(&wallets).await?;

        if was_active {
            let moved = match wallets.first() {
                Some(next) => self.prefs.set(ACTIVE_WALLET_ID, &next.id).await,
                None => self.prefs.remove(ACTIVE_WALLET_ID).await,
            };
            if let Err(e) = moved {
                return Err(self.restore(&previous, e).await);
            }
            if let Some(next) = wallets.first() {
                info!(wallet_id = %next.id, "active wallet reassigned");
            }
        }
        Ok(Some(removed))
    }

    pub async fn set_active(&self, id: &str) -> WalletResult<()> {
        let _guard = self.write.lock().await;
        if !self.load().await?.iter().any(|w| w.id == id) {
            return Err(WalletError::WalletNotFound(id.to_string()));
        }
        self.prefs.set(ACTIVE_WALLET_ID, id).await
    }

    pub async fn get_active_id(&self) -> WalletResult<Option<String>> {
        self.prefs.get(ACTIVE_WALLET_ID).await
    }

    pub async fn get_active(&self) -> WalletResult<Option<WalletInfo>> {
        match self.get_active_id().await? {
            Some(id) => self.get_by_id(&id).await,
            None => Ok(None),
        }
    }

    /// Returns false, changing nothing, when `id` is unknown.
    pub async fn rename(&self, id: &str, name: &str) -> WalletResult<bool> {
        let _guard = self.write.lock().await;
        let mut wallets = self.load().await?;
        let Some(wallet) = wallets.iter_mut().find(|w| w.id == id) else {
            return Ok(false);
        };
        wallet.name = name.to_string();
        self.store(&wallets).await?;
        Ok(true)
    }

    /// "Wallet N" where N is one past the current count.
    fn default_name(wallets: &[WalletInfo]) -> String {
        format!("Wallet {}", wallets.len() + 1)
    }
}
