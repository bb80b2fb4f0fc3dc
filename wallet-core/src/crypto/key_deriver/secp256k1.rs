// wallet-core/src/crypto/key_deriver/secp256k1.rs
//
// secp256k1 Key Derivation: BIP-32 / BIP-44
// Reference: https://github.com/bitcoin/bips/blob/master/bip-0032.mediawiki

use crate::error::{CryptoError, WalletError, WalletResult};
use bip32::{DerivationPath, XPrv};
use std::str::FromStr;
use zeroize::Zeroizing;

/// BIP-32 deriver. Iterates the path from the master key, keeping no
/// intermediate keys around after it returns.
pub struct Secp256k1Deriver;

impl Secp256k1Deriver {
    /// Derives the 32-byte private key at `path` (e.g. `m/44'/60'/0'/0/0`).
    pub fn derive(seed: &[u8], path: &str) -> WalletResult<Zeroizing<[u8; 32]>> {
        let root_xprv = XPrv::new(seed).map_err(|e| {
            WalletError::Crypto(CryptoError::DerivationFailed(format!(
                "Failed to create master key: {}",
                e
            )))
        })?;

        let derivation_path = DerivationPath::from_str(path).map_err(|e| {
            WalletError::Crypto(CryptoError::DerivationFailed(format!(
                "Invalid path '{}': {}",
                path, e
            )))
        })?;

        let mut child = root_xprv;
        for child_num in derivation_path {
            child = child.derive_child(child_num).map_err(|e| {
                WalletError::Crypto(CryptoError::DerivationFailed(format!(
                    "Child derivation failed: {}",
                    e
                )))
            })?;
        }

        let key_bytes: [u8; 32] = child.private_key().to_bytes().into();
        Ok(Zeroizing::new(key_bytes))
    }

    #[inline]
    pub fn is_valid_path(path: &str) -> bool {
        DerivationPath::from_str(path).is_ok()
    }
}
