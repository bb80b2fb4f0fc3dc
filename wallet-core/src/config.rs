// wallet-core/src/config.rs

use crate::chains::{EvmChainConfig, SolanaChainConfig};
use crate::crypto::SolanaDerivation;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

/// Where secrets live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackend {
    /// OS credential store (Keychain, Credential Manager, Secret Service).
    #[default]
    Keychain,
    /// JSON file in `data_dir`. Not confidential.
    PlaintextFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Defaults to `<platform data dir>/duochain-wallet`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub secret_backend: SecretBackend,
    #[serde(default = "default_keychain_service")]
    pub keychain_service: String,
    /// Also write `wallet_mnemonic` / `eth_private_key` / `sol_private_key`
    /// without the wallet id suffix for the last created wallet.
    #[serde(default)]
    pub legacy_unscoped_copy: bool,
}

fn default_keychain_service() -> String {
    "duochain-wallet".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            secret_backend: SecretBackend::default(),
            keychain_service: default_keychain_service(),
            legacy_unscoped_copy: false,
        }
    }
}

impl StorageConfig {
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("duochain-wallet")
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
    #[serde(default = "default_confirmation_secs")]
    pub confirmation_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_request_secs() -> u64 {
    20
}

fn default_confirmation_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    1500
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: default_request_secs(),
            confirmation_secs: default_confirmation_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn confirmation(&self) -> Duration {
        Duration::from_secs(self.confirmation_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Root configuration.
///
/// `ethereum` / `solana` override the presets chosen by `network`.
/// `solana_derivation` applies on top of either, so the derivation can be
/// switched alone (`WALLET_SOLANA_DERIVATION=slip10`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default)]
    pub network: Network,
    #[serde(default = "default_api_key")]
    pub alchemy_api_key: String,
    #[serde(default)]
    pub ethereum: Option<EvmChainConfig>,
    #[serde(default)]
    pub solana: Option<SolanaChainConfig>,
    #[serde(default)]
    pub solana_derivation: Option<SolanaDerivation>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

fn default_api_key() -> String {
    "demo".to_string()
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::for_network(Network::Mainnet, &default_api_key())
    }
}

impl WalletConfig {
    /// Load configuration from files and environment variables.
    ///
    /// Sources, later wins: `config/default`, `config/local`, then `WALLET_*`
    /// variables with `__` between sections, e.g. `WALLET_NETWORK=testnet`,
    /// `WALLET_STORAGE__SECRET_BACKEND=plaintext_file`.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("WALLET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Presets only, no files or environment.
    pub fn for_network(network: Network, alchemy_api_key: &str) -> Self {
        Self {
            network,
            alchemy_api_key: alchemy_api_key.to_string(),
            ethereum: None,
            solana: None,
            solana_derivation: None,
            storage: StorageConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }

    pub fn ethereum_chain(&self) -> EvmChainConfig {
        match (&self.ethereum, self.network) {
            (Some(custom), _) => custom.clone(),
            (None, Network::Mainnet) => EvmChainConfig::mainnet(&self.alchemy_api_key),
            (None, Network::Testnet) => EvmChainConfig::sepolia(&self.alchemy_api_key),
        }
    }

    pub fn solana_chain(&self) -> SolanaChainConfig {
        let mut chain = match (&self.solana, self.network) {
            (Some(custom), _) => custom.clone(),
            (None, Network::Mainnet) => SolanaChainConfig::mainnet(),
            (None, Network::Testnet) => SolanaChainConfig::devnet(),
        };
        if let Some(derivation) = self.solana_derivation {
            chain.derivation = derivation;
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mainnet_demo() {
        let cfg = WalletConfig::default();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.ethereum_chain().chain_id, 1);
        assert!(cfg.ethereum_chain().rpc_url.ends_with("/demo"));
        assert_eq!(cfg.solana_chain().derivation, SolanaDerivation::SeedPrefix);
        assert!(!cfg.storage.legacy_unscoped_copy);
        assert_eq!(cfg.timeouts.request(), Duration::from_secs(20));
    }

    #[test]
    fn test_testnet_presets() {
        let cfg = WalletConfig::for_network(Network::Testnet, "abc");
        assert_eq!(cfg.ethereum_chain().chain_id, 11155111);
        assert!(cfg.solana_chain().rpc_url.contains("devnet"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let raw = r#"
            network = "testnet"

            [storage]
            secret_backend = "plaintext_file"
            legacy_unscoped_copy = true

            [timeouts]
            confirmation_secs = 30
        "#;
        let cfg: WalletConfig = Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.alchemy_api_key, "demo");
        assert_eq!(cfg.storage.secret_backend, SecretBackend::PlaintextFile);
        assert!(cfg.storage.legacy_unscoped_copy);
        assert_eq!(cfg.storage.keychain_service, "duochain-wallet");
        assert_eq!(cfg.timeouts.confirmation_secs, 30);
        assert_eq!(cfg.timeouts.poll_interval_ms, 1500);
    }

    #[test]
    fn test_solana_override_selects_slip10() {
        let raw = r#"
            [solana]
            rpc_url = "http://localhost:8899"
            name = "Local"
            symbol = "SOL"
            decimals = 9
            explorer_url = "https://explorer.solana.com"
            derivation = "slip10"
        "#;
        let cfg: WalletConfig = Config::builder()
            .add_source(File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.solana_chain().derivation, SolanaDerivation::Slip10);
        assert_eq!(cfg.solana_chain().rpc_url, "http://localhost:8899");
    }

    #[test]
    fn test_derivation_switch_keeps_presets() {
        let cfg: WalletConfig = Config::builder()
            .set_override("network", "testnet")
            .unwrap()
            .set_override("solana_derivation", "slip10")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(cfg.solana.is_none());
        let chain = cfg.solana_chain();
        assert_eq!(chain.derivation, SolanaDerivation::Slip10);
        assert_eq!(chain.rpc_url, SolanaChainConfig::devnet().rpc_url);
    }
}
