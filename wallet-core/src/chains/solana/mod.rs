// wallet-core/src/chains/solana/mod.rs

//! Solana support.
//!
//! - **Address**: base58 keys, PDA and associated token account derivation via [`SolanaAddress`].
//! - **Signing**: ed25519 via [`SolanaSigner`].
//! - **Transactions**: legacy message compilation in [`transaction`].
//! - **Client**: balances, fees, transfers and history over JSON-RPC via [`SolanaClient`].

pub mod address;
pub mod client;
pub mod signer;
pub mod tokens;
pub mod transaction;

pub use address::{programs, Pubkey, SolanaAddress};
pub use client::SolanaClient;
pub use signer::SolanaSigner;
