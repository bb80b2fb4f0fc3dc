// wallet-core/src/chains/mod.rs

pub mod amount;
pub mod evm;
pub mod solana;

use crate::crypto::SolanaDerivation;
use serde::{Deserialize, Serialize};

/// Endpoints and metadata for the Ethereum network in use.
///
/// `indexer_url` serves the `alchemy_*` enhanced methods; with Alchemy it is
/// the same endpoint as `rpc_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub indexer_url: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub explorer_url: String,
}

impl EvmChainConfig {
    pub fn mainnet(api_key: &str) -> Self {
        let url = format!("https://eth-mainnet.g.alchemy.com/v2/{}", api_key);
        Self {
            chain_id: 1,
            rpc_url: url.clone(),
            indexer_url: url,
            name: "Ethereum Mainnet".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
            explorer_url: "https://etherscan.io".to_string(),
        }
    }

    pub fn sepolia(api_key: &str) -> Self {
        let url = format!("https://eth-sepolia.g.alchemy.com/v2/{}", api_key);
        Self {
            chain_id: 11155111,
            rpc_url: url.clone(),
            indexer_url: url,
            name: "Ethereum Sepolia".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
            explorer_url: "https://sepolia.etherscan.io".to_string(),
        }
    }

    pub fn tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolanaChainConfig {
    pub rpc_url: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub explorer_url: String,
    /// Cluster query string appended to explorer links, e.g. `?cluster=devnet`.
    #[serde(default)]
    pub explorer_suffix: String,
    #[serde(default)]
    pub derivation: SolanaDerivation,
}

impl SolanaChainConfig {
    pub fn mainnet() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            name: "Solana Mainnet".to_string(),
            symbol: "SOL".to_string(),
            decimals: 9,
            explorer_url: "https://explorer.solana.com".to_string(),
            explorer_suffix: String::new(),
            derivation: SolanaDerivation::SeedPrefix,
        }
    }

    pub fn devnet() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            name: "Solana Devnet".to_string(),
            explorer_suffix: "?cluster=devnet".to_string(),
            ..Self::mainnet()
        }
    }

    pub fn tx_url(&self, signature: &str) -> String {
        format!(
            "{}/tx/{}{}",
            self.explorer_url.trim_end_matches('/'),
            signature,
            self.explorer_suffix
        )
    }
}
