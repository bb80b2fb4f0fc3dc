// wallet-core/src/crypto/mod.rs

//! Core Cryptography Module
//!
//! - **Mnemonic**: BIP-39 generation, validation and seed derivation via [`WalletMnemonic`].
//! - **Key Derivation**: Ethereum (BIP-32 secp256k1) and Solana (ed25519) keypairs via [`KeyDeriver`].
//! - **Derivation Paths**: BIP-44 / SLIP-0010 path builders via [`DerivationPaths`].

pub mod key_deriver;
pub mod mnemonic;
pub mod paths;

pub use key_deriver::{ChainKeyPair, KeyDeriver, SolanaDerivation};
pub use mnemonic::{WalletMnemonic, WordCount};
pub use paths::DerivationPaths;
