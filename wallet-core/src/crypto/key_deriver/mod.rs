// wallet-core/src/crypto/key_deriver/mod.rs
//
// Key derivation for the two supported chains.
//
//   Seed (64 bytes, BIP-39)
//     ├─ secp256k1, BIP-32 m/44'/60'/0'/0/0  -> Ethereum
//     └─ ed25519
//          ├─ seed[0..32]                       -> Solana (default)
//          └─ SLIP-0010 m/44'/501'/n'/0'        -> Solana (opt-in)

pub mod ed25519;
pub mod secp256k1;

pub use ed25519::Ed25519Deriver;
pub use secp256k1::Secp256k1Deriver;

use crate::chains::evm::EvmAddress;
use crate::chains::solana::SolanaAddress;
use crate::crypto::paths::DerivationPaths;
use crate::error::{CryptoError, WalletError, WalletResult};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// How the Solana keypair is obtained from the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolanaDerivation {
    /// First 32 seed bytes. Recovers the addresses of existing wallets.
    #[default]
    SeedPrefix,
    /// SLIP-0010 `m/44'/501'/0'/0'`, the path most Solana wallets use.
    Slip10,
}

/// Address plus the private key material for one chain.
///
/// `private_key` layout:
/// - Ethereum: 32-byte secp256k1 scalar
/// - Solana: 64 bytes, ed25519 secret seed followed by the public key
pub struct ChainKeyPair {
    pub address: String,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for ChainKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainKeyPair")
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

impl ChainKeyPair {
    /// Hex form persisted in the secret store. Ethereum keys carry a `0x`
    /// prefix, Solana keys do not.
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        if self.private_key.len() == 32 {
            Zeroizing::new(format!("0x{}", hex::encode(&*self.private_key)))
        } else {
            Zeroizing::new(hex::encode(&*self.private_key))
        }
    }
}

/// Pure functions of the seed: the same seed always yields the same pair.
pub struct KeyDeriver;

impl KeyDeriver {
    pub fn ethereum(seed: &[u8]) -> WalletResult<ChainKeyPair> {
        Self::validate_seed(seed)?;
        let key = Secp256k1Deriver::derive(seed, DerivationPaths::EVM_0)?;
        let address = EvmAddress::derive_from_slice(&*key)?;
        Ok(ChainKeyPair {
            address,
            private_key: Zeroizing::new(key.to_vec()),
        })
    }

    pub fn solana(seed: &[u8], scheme: SolanaDerivation) -> WalletResult<ChainKeyPair> {
        Self::validate_seed(seed)?;
        let secret = match scheme {
            SolanaDerivation::SeedPrefix => Ed25519Deriver::from_seed_prefix(seed)?,
            SolanaDerivation::Slip10 => Ed25519Deriver::derive(seed, DerivationPaths::SOLANA_0)?,
        };

        let signing_key = ed25519_dalek::SigningKey::from_bytes(&secret);
        let public = signing_key.verifying_key().to_bytes();

        let mut keypair_bytes = Zeroizing::new(Vec::with_capacity(64));
        keypair_bytes.extend_from_slice(&*secret);
        keypair_bytes.extend_from_slice(&public);

        Ok(ChainKeyPair {
            address: SolanaAddress::from_bytes(&public),
            private_key: keypair_bytes,
        })
    }

    fn validate_seed(seed: &[u8]) -> WalletResult<()> {
        if seed.len() != 64 {
            return Err(WalletError::Crypto(CryptoError::DerivationFailed(format!(
                "Seed must be 64 bytes, got {}",
                seed.len()
            ))));
        }
        Ok(())
    }
}
