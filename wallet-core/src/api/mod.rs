// wallet-core/src/api/mod.rs
//
// Entry points for the host application. Stateful work goes through
// `WalletService`; the free functions here need no stores or network.

pub mod service;

pub use service::{WalletAddresses, WalletData, WalletService, WalletServiceBuilder};

use crate::config::WalletConfig;
use crate::crypto::{KeyDeriver, SolanaDerivation, WalletMnemonic};
use crate::error::{WalletError, WalletResult};
use crate::logging;

// Core Initialization
pub fn init_core() -> WalletResult<WalletConfig> {
    logging::init_logging();
    let config = WalletConfig::load().map_err(|e| WalletError::Config(e.to_string()))?;
    tracing::info!(network = ?config.network, "wallet core initialised");
    Ok(config)
}

// --- Key Management ---

pub fn validate_mnemonic(phrase: &str) -> bool {
    WalletMnemonic::validate(phrase)
}

pub fn is_valid_mnemonic_word(word: &str) -> bool {
    WalletMnemonic::is_valid_word(word)
}

/// Addresses a phrase would restore to, without storing anything.
pub fn derive_addresses(phrase: &str, solana: SolanaDerivation) -> WalletResult<WalletAddresses> {
    let mnemonic = WalletMnemonic::from_phrase(phrase)?;
    let seed = mnemonic.to_seed()?;
    Ok(WalletAddresses {
        ethereum: KeyDeriver::ethereum(&*seed)?.address,
        solana: KeyDeriver::solana(&*seed, solana)?.address,
    })
}
