// wallet-core/src/api/service.rs
//
// The surface the UI calls: wallet lifecycle on top of the registry and
// secret store, and chain operations routed to the matching ChainClient.

use crate::auth::{AuthGate, Authenticator, NoAuthenticator};
use crate::chains::amount::parse_units;
use crate::chains::evm::EvmClient;
use crate::chains::solana::SolanaClient;
use crate::config::WalletConfig;
use crate::crypto::{KeyDeriver, SolanaDerivation, WalletMnemonic};
use crate::error::{WalletError, WalletResult};
use crate::locks::KeyedLocks;
use crate::network::models::{
    AddressValidation, Balance, Chain, FeeEstimate, Portfolio, TokenBalance, TokenInfo,
    Transaction, TransactionReceipt, TransactionStatus, TransferKind,
};
use crate::network::traits::ChainClient;
use crate::storage::{
    open_secret_store, FilePreferences, MemoryPreferences, MemoryStore, PreferenceStore,
    SecretPurpose, SecretStore, WalletInfo, WalletRegistry,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use zeroize::Zeroizing;

const AUTH_PROMPT_SECRET: &str = "Authenticate to access wallet";
const AUTH_PROMPT_TRANSFER: &str = "Authenticate to send";

/// Everything produced by create/import. Handed out once; afterwards the
/// secrets are only reachable through `get_private_material`.
pub struct WalletData {
    pub wallet: WalletInfo,
    pub mnemonic: Zeroizing<String>,
    pub ethereum_private_key: Zeroizing<String>,
    pub solana_private_key: Zeroizing<String>,
}

impl std::fmt::Debug for WalletData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletData")
            .field("wallet", &self.wallet)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletAddresses {
    pub ethereum: String,
    pub solana: String,
}

// =============================================================================
// BUILDER
// =============================================================================

/// Stores default to in-memory and authentication to none; both chain
/// clients are required.
#[derive(Default)]
pub struct WalletServiceBuilder {
    secrets: Option<Arc<dyn SecretStore>>,
    prefs: Option<Arc<dyn PreferenceStore>>,
    authenticator: Option<Arc<dyn Authenticator>>,
    ethereum: Option<Arc<dyn ChainClient>>,
    solana: Option<Arc<dyn ChainClient>>,
    solana_derivation: SolanaDerivation,
    legacy_unscoped_copy: bool,
}

impl WalletServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secret_store(mut self, store: Arc<dyn SecretStore>) -> Self {
        self.secrets = Some(store);
        self
    }

    pub fn preferences(mut self, prefs: Arc<dyn PreferenceStore>) -> Self {
        self.prefs = Some(prefs);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn ethereum_client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.ethereum = Some(client);
        self
    }

    pub fn solana_client(mut self, client: Arc<dyn ChainClient>) -> Self {
        self.solana = Some(client);
        self
    }

    pub fn solana_derivation(mut self, scheme: SolanaDerivation) -> Self {
        self.solana_derivation = scheme;
        self
    }

    pub fn legacy_unscoped_copy(mut self, enabled: bool) -> Self {
        self.legacy_unscoped_copy = enabled;
        self
    }

    pub fn build(self) -> WalletResult<WalletService> {
        let ethereum = self
            .ethereum
            .ok_or_else(|| WalletError::Config("Ethereum client not configured".to_string()))?;
        let solana = self
            .solana
            .ok_or_else(|| WalletError::Config("Solana client not configured".to_string()))?;
        if ethereum.chain() != Chain::Ethereum || solana.chain() != Chain::Solana {
            return Err(WalletError::Config("Chain clients registered for the wrong chain".to_string()));
        }

        let secrets = self.secrets.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let prefs = self.prefs.unwrap_or_else(|| Arc::new(MemoryPreferences::new()));
        let authenticator = self.authenticator.unwrap_or_else(|| Arc::new(NoAuthenticator));

        if !secrets.is_confidential() {
            warn!("secret store is not confidential; keys are stored in plain text");
        }

        Ok(WalletService {
            registry: WalletRegistry::new(prefs.clone()),
            auth: AuthGate::new(authenticator, prefs),
            secrets,
            ethereum,
            solana,
            solana_derivation: self.solana_derivation,
            legacy_unscoped_copy: self.legacy_unscoped_copy,
            wallet_locks: KeyedLocks::new(),
            signer_locks: KeyedLocks::new(),
        })
    }
}

// =============================================================================
// SERVICE
// =============================================================================

pub struct WalletService {
    secrets: Arc<dyn SecretStore>,
    registry: WalletRegistry,
    auth: AuthGate,
    ethereum: Arc<dyn ChainClient>,
    solana: Arc<dyn ChainClient>,
    solana_derivation: SolanaDerivation,
    legacy_unscoped_copy: bool,
    /// switch / rename / delete, keyed by wallet id
    wallet_locks: KeyedLocks,
    /// sign + broadcast + confirm, keyed by chain and sending address
    signer_locks: KeyedLocks,
}

impl std::fmt::Debug for WalletService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletService")
            .field("solana_derivation", &self.solana_derivation)
            .field("legacy_unscoped_copy", &self.legacy_unscoped_copy)
            .finish_non_exhaustive()
    }
}

impl WalletService {
    pub fn builder() -> WalletServiceBuilder {
        WalletServiceBuilder::new()
    }

    /// HTTP chain clients, the configured secret backend and file-backed
    /// preferences in the data directory.
    pub fn from_config(config: &WalletConfig) -> WalletResult<Self> {
        let data_dir = config.storage.resolved_data_dir();
        let solana_chain = config.solana_chain();
        let derivation = solana_chain.derivation;

        let ethereum = Arc::new(EvmClient::new(config.ethereum_chain(), &config.timeouts)?);
        let solana = Arc::new(SolanaClient::new(solana_chain, &config.timeouts)?);
        info!(network = ?config.network, data_dir = %data_dir.display(), "wallet service configured");

        Self::builder()
            .secret_store(open_secret_store(&config.storage))
            .preferences(Arc::new(FilePreferences::new(data_dir.join("preferences.json"))))
            .ethereum_client(ethereum)
            .solana_client(solana)
            .solana_derivation(derivation)
            .legacy_unscoped_copy(config.storage.legacy_unscoped_copy)
            .build()
    }

    fn client(&self, chain: Chain) -> &dyn ChainClient {
        match chain {
            Chain::Ethereum => self.ethereum.as_ref(),
            Chain::Solana => self.solana.as_ref(),
        }
    }

    // =========================================================================
    // WALLET LIFECYCLE
    // =========================================================================

    /// New 12-word wallet. It becomes the active wallet.
    pub async fn create_wallet(&self, name: Option<&str>) -> WalletResult<WalletData> {
        let mnemonic = WalletMnemonic::generate()?;
        self.persist_wallet(&mnemonic, name, false).await
    }

    /// Fails with `InvalidMnemonic` before anything is written.
    pub async fn import_wallet(&self, phrase: &str, name: Option<&str>) -> WalletResult<WalletData> {
        let mnemonic = WalletMnemonic::from_phrase(phrase)?;
        self.persist_wallet(&mnemonic, name, true).await
    }

    /// Derive, write the scoped secrets, then commit the registry entry.
    /// A failure at either write leaves no trace of the wallet.
    async fn persist_wallet(
        &self,
        mnemonic: &WalletMnemonic,
        name: Option<&str>,
        is_imported: bool,
    ) -> WalletResult<WalletData> {
        let seed = mnemonic.to_seed()?;
        let ethereum = KeyDeriver::ethereum(&*seed)?;
        let solana = KeyDeriver::solana(&*seed, self.solana_derivation)?;

        let id = WalletRegistry::generate_id();
        let wallet = WalletInfo {
            id: id.clone(),
            // empty: the registry numbers it while holding its write lock
            name: name.map(str::trim).unwrap_or_default().to_string(),
            ethereum_address: ethereum.address.clone(),
            solana_address: solana.address.clone(),
            created_at: chrono::Utc::now().timestamp_millis(),
            is_imported,
        };

        let mnemonic = Zeroizing::new(mnemonic.phrase().to_string());
        let ethereum_private_key = ethereum.private_key_hex();
        let solana_private_key = solana.private_key_hex();
        let entries = [
            (SecretPurpose::Mnemonic, &mnemonic),
            (SecretPurpose::EthereumKey, &ethereum_private_key),
            (SecretPurpose::SolanaKey, &solana_private_key),
        ];

        for (i, (purpose, value)) in entries.iter().enumerate() {
            if let Err(e) = self.secrets.set(&purpose.scoped_key(&id), value).await {
                warn!(wallet_id = %id, "secret write failed, rolling back: {}", e);
                self.remove_scoped_secrets(&id, &SecretPurpose::ALL[..i]).await;
                return Err(e);
            }
        }

        let wallet = match self.registry.save_and_activate(wallet).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!(wallet_id = %id, "registry write failed, rolling back: {}", e);
                self.remove_scoped_secrets(&id, &SecretPurpose::ALL).await;
                return Err(e);
            }
        };

        if self.legacy_unscoped_copy {
            for (purpose, value) in &entries {
                if let Err(e) = self.secrets.set(purpose.legacy_key(), value).await {
                    warn!(wallet_id = %id, "legacy {} copy not written: {}", purpose, e);
                }
            }
        }

        let data = WalletData {
            wallet,
            mnemonic,
            ethereum_private_key,
            solana_private_key,
        };
        info!(
            wallet_id = %id,
            ethereum = %data.wallet.ethereum_address,
            solana = %data.wallet.solana_address,
            is_imported,
            "wallet stored"
        );
        Ok(data)
    }

    /// Best effort; on rollback paths the triggering error is what gets returned.
    async fn remove_scoped_secrets(&self, id: &str, purposes: &[SecretPurpose]) {
        for purpose in purposes {
            if let Err(e) = self.secrets.delete(&purpose.scoped_key(id)).await {
                warn!(wallet_id = %id, "could not remove {}: {}", purpose, e);
            }
        }
    }

    pub async fn list_wallets(&self) -> WalletResult<Vec<WalletInfo>> {
        self.registry.list_all().await
    }

    pub async fn active_wallet(&self) -> WalletResult<Option<WalletInfo>> {
        self.registry.get_active().await
    }

    pub async fn has_wallet(&self) -> WalletResult<bool> {
        Ok(!self.registry.list_all().await?.is_empty())
    }

    pub async fn wallet_addresses(&self) -> WalletResult<Option<WalletAddresses>> {
        Ok(self.active_wallet().await?.map(|w| WalletAddresses {
            ethereum: w.ethereum_address,
            solana: w.solana_address,
        }))
    }

    pub async fn switch_wallet(&self, id: &str) -> WalletResult<()> {
        let _guard = self.wallet_locks.lock(id).await;
        self.registry.set_active(id).await?;
        info!(wallet_id = %id, "active wallet switched");
        Ok(())
    }

    /// Returns false when `id` is unknown.
    pub async fn rename_wallet(&self, id: &str, name: &str) -> WalletResult<bool> {
        let _guard = self.wallet_locks.lock(id).await;
        self.registry.rename(id, name.trim()).await
    }

    /// Removes the three scoped secrets, then the registry entry.
    pub async fn delete_wallet(&self, id: &str) -> WalletResult<()> {
        let _guard = self.wallet_locks.lock(id).await;
        if self.registry.get_by_id(id).await?.is_none() {
            return Err(WalletError::WalletNotFound(id.to_string()));
        }

        // The legacy slot belongs to this wallet if it holds the same key.
        let scoped_eth = self
            .secrets
            .get(&SecretPurpose::EthereumKey.scoped_key(id))
            .await?;
        let legacy_eth = self
            .secrets
            .get(SecretPurpose::EthereumKey.legacy_key())
            .await?;
        let owns_legacy = scoped_eth.is_some() && scoped_eth == legacy_eth;

        for purpose in SecretPurpose::ALL {
            self.secrets.delete(&purpose.scoped_key(id)).await?;
        }
        if owns_legacy {
            self.clear_legacy_secrets().await?;
        }

        self.registry.delete(id).await?;
        info!(wallet_id = %id, "wallet deleted");
        Ok(())
    }

    /// Mnemonic or private key of a wallet, behind the authentication gate.
    pub async fn get_private_material(
        &self,
        kind: SecretPurpose,
        wallet_id: &str,
    ) -> WalletResult<Zeroizing<String>> {
        if self.registry.get_by_id(wallet_id).await?.is_none() {
            return Err(WalletError::WalletNotFound(wallet_id.to_string()));
        }
        self.auth.authorize(AUTH_PROMPT_SECRET).await?;
        self.scoped_secret(kind, wallet_id).await
    }

    async fn scoped_secret(&self, purpose: SecretPurpose, wallet_id: &str) -> WalletResult<Zeroizing<String>> {
        self.secrets
            .get(&purpose.scoped_key(wallet_id))
            .await?
            .ok_or_else(|| WalletError::KeyNotFound {
                wallet_id: wallet_id.to_string(),
                purpose: purpose.to_string(),
            })
    }

    async fn clear_legacy_secrets(&self) -> WalletResult<()> {
        for purpose in SecretPurpose::ALL {
            self.secrets.delete(purpose.legacy_key()).await?;
        }
        Ok(())
    }

    /// Registers a wallet that exists only in the unscoped legacy slots.
    /// Returns the new record, or `None` when there is nothing to migrate.
    pub async fn migrate_legacy_wallet(&self) -> WalletResult<Option<WalletInfo>> {
        let Some(phrase) = self.secrets.get(SecretPurpose::Mnemonic.legacy_key()).await? else {
            return Ok(None);
        };
        let mnemonic = WalletMnemonic::from_phrase(&phrase)?;
        let seed = mnemonic.to_seed()?;
        let address = KeyDeriver::ethereum(&*seed)?.address;

        let known = self
            .registry
            .list_all()
            .await?
            .iter()
            .any(|w| w.ethereum_address == address);

        let migrated = if known {
            None
        } else {
            let data = self.persist_wallet(&mnemonic, None, true).await?;
            info!(wallet_id = %data.wallet.id, "legacy wallet migrated");
            Some(data.wallet.clone())
        };

        if !self.legacy_unscoped_copy {
            self.clear_legacy_secrets().await?;
        }
        Ok(migrated)
    }

    // =========================================================================
    // SECURITY SETTINGS
    // =========================================================================

    pub async fn set_biometric_enabled(&self, enabled: bool) -> WalletResult<()> {
        self.auth.set_enabled(enabled).await
    }

    pub async fn is_biometric_enabled(&self) -> WalletResult<bool> {
        self.auth.is_enabled().await
    }

    pub async fn is_biometric_available(&self) -> bool {
        self.auth.is_available().await
    }

    /// Message for the UI when secrets are not kept in a confidential store.
    pub fn storage_warning(&self) -> Option<String> {
        (!self.secrets.is_confidential()).then(|| {
            "Secrets are stored unencrypted on disk. Use this store for development only.".to_string()
        })
    }

    // =========================================================================
    // CHAIN OPERATIONS
    // =========================================================================

    pub fn validate_address(&self, chain: Chain, address: &str) -> AddressValidation {
        self.client(chain).validate_address(address)
    }

    pub async fn get_balance(&self, chain: Chain, address: &str) -> WalletResult<Balance> {
        self.client(chain).get_native_balance(address).await
    }

    pub async fn get_token_balances(&self, chain: Chain, address: &str) -> WalletResult<Vec<TokenBalance>> {
        self.client(chain).get_token_balances(address).await
    }

    /// Native and token balances fetched concurrently. Nothing is returned
    /// if both do not finish within `timeout`.
    pub async fn get_portfolio(
        &self,
        chain: Chain,
        address: &str,
        timeout: Duration,
    ) -> WalletResult<Portfolio> {
        let client = self.client(chain);
        let fetch = async {
            futures::try_join!(
                client.get_native_balance(address),
                client.get_token_balances(address)
            )
        };
        let (native, tokens) = tokio::time::timeout(timeout, fetch).await.map_err(|_| {
            WalletError::provider(format!("{} portfolio read timed out after {:?}", chain, timeout))
        })??;

        Ok(Portfolio {
            chain,
            address: address.to_string(),
            native,
            tokens,
        })
    }

    pub async fn estimate_fee(&self, chain: Chain, kind: TransferKind) -> WalletResult<FeeEstimate> {
        self.client(chain).estimate_fee(kind).await
    }

    /// Sends `amount` (decimal, in ETH or SOL) from the active wallet.
    pub async fn send_native(&self, chain: Chain, to: &str, amount: &str) -> WalletResult<TransactionReceipt> {
        let client = self.client(chain);
        self.check_recipient(client, to)?;
        let base_units = positive_units(amount, chain.native_decimals())?;

        let wallet = self.require_active().await?;
        let from = wallet_address(&wallet, chain);
        let _guard = self.signer_locks.lock(&format!("{}:{}", chain, from)).await;

        self.auth.authorize(AUTH_PROMPT_TRANSFER).await?;
        let key = self.signing_key(client, &wallet).await?;

        info!(%chain, wallet_id = %wallet.id, %from, %to, "submitting native transfer");
        client.send_native(&key, to, base_units).await
    }

    /// Sends `amount` (decimal, scaled by `token.decimals`) of `token` from
    /// the active wallet.
    pub async fn send_token(
        &self,
        chain: Chain,
        token: &TokenInfo,
        to: &str,
        amount: &str,
    ) -> WalletResult<TransactionReceipt> {
        let client = self.client(chain);
        self.check_recipient(client, to)?;
        if !client.validate_address(&token.address).is_valid {
            return Err(WalletError::InvalidAddress(format!("token {}", token.address)));
        }
        positive_units(amount, token.decimals)?;

        let wallet = self.require_active().await?;
        let from = wallet_address(&wallet, chain);
        let _guard = self.signer_locks.lock(&format!("{}:{}", chain, from)).await;

        self.auth.authorize(AUTH_PROMPT_TRANSFER).await?;
        let key = self.signing_key(client, &wallet).await?;

        info!(%chain, wallet_id = %wallet.id, %from, %to, token = %token.address, "submitting token transfer");
        client
            .send_token(&key, &token.address, to, amount, token.decimals)
            .await
    }

    pub async fn get_transaction_history(
        &self,
        chain: Chain,
        address: &str,
        limit: usize,
    ) -> WalletResult<Vec<Transaction>> {
        self.client(chain).get_transaction_history(address, limit).await
    }

    pub async fn get_transaction_status(&self, chain: Chain, hash: &str) -> WalletResult<TransactionStatus> {
        self.client(chain).get_transaction_status(hash).await
    }

    fn check_recipient(&self, client: &dyn ChainClient, to: &str) -> WalletResult<()> {
        let validation = client.validate_address(to);
        if validation.is_valid {
            Ok(())
        } else {
            Err(WalletError::InvalidAddress(format!(
                "{} ({})",
                to,
                validation.error.unwrap_or_default()
            )))
        }
    }

    async fn require_active(&self) -> WalletResult<WalletInfo> {
        self.registry
            .get_active()
            .await?
            .ok_or_else(|| WalletError::WalletNotFound("no active wallet".to_string()))
    }

    /// Stored key for `client`'s chain, checked against the recorded address.
    async fn signing_key(&self, client: &dyn ChainClient, wallet: &WalletInfo) -> WalletResult<Zeroizing<String>> {
        let chain = client.chain();
        let purpose = match chain {
            Chain::Ethereum => SecretPurpose::EthereumKey,
            Chain::Solana => SecretPurpose::SolanaKey,
        };
        let key = self.scoped_secret(purpose, &wallet.id).await?;

        if client.address_for_key(&key)? != wallet_address(wallet, chain) {
            return Err(WalletError::storage(format!(
                "Stored {} does not match the address of wallet '{}'",
                purpose, wallet.id
            )));
        }
        Ok(key)
    }
}

fn wallet_address(wallet: &WalletInfo, chain: Chain) -> &str {
    match chain {
        Chain::Ethereum => &wallet.ethereum_address,
        Chain::Solana => &wallet.solana_address,
    }
}

fn positive_units(amount: &str, decimals: u8) -> WalletResult<u128> {
    match parse_units(amount, decimals)? {
        0 => Err(WalletError::InvalidAmount("Amount must be greater than zero".to_string())),
        units => Ok(units),
    }
}
