// wallet-core/src/chains/evm/mod.rs

//! Ethereum support.
//!
//! - **Address**: derivation, EIP-55 checksum and validation via [`EvmAddress`].
//! - **Signing**: EIP-1559 transactions via [`EvmSigner`].
//! - **Client**: balances, fees, transfers and history over JSON-RPC via [`EvmClient`].

pub mod address;
pub mod client;
pub mod erc20;
pub mod fee;
pub mod signer;

pub use address::EvmAddress;
pub use client::EvmClient;
pub use fee::{FeeParams, FixedGasEstimator, GasEstimator};
pub use signer::{EvmSigner, SignedEvmTransaction};
