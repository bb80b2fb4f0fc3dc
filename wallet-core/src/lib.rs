// wallet-core/src/lib.rs

//! Non-custodial wallet core for Ethereum and Solana.
//!
//! One BIP-39 phrase per wallet yields an Ethereum and a Solana account.
//! Secrets stay in a [`storage::SecretStore`]; the wallet list and active
//! pointer live in preferences; chain access goes through
//! [`network::ChainClient`]. [`WalletService`] ties them together.

pub mod api;
pub mod auth;
pub mod chains;
pub mod config;
pub mod crypto;
pub mod error;
pub mod locks;
pub mod logging;
pub mod network;
pub mod storage;

pub use api::{init_core, WalletAddresses, WalletData, WalletService, WalletServiceBuilder};
pub use config::WalletConfig;
pub use error::{CryptoError, MnemonicError, WalletError, WalletResult};
pub use network::{Chain, ChainClient};
pub use storage::{SecretPurpose, WalletInfo};
