// wallet-core/src/crypto/key_deriver/ed25519.rs
//
// Ed25519 key material for Solana.
//
// Two schemes:
// - seed prefix: the first 32 bytes of the BIP-39 seed are the ed25519 secret
//   (what `Keypair.fromSeed(seed[0..32])` produces; the wallet default).
// - SLIP-0010: HMAC-SHA512 chain keyed with "ed25519 seed", hardened only.
//   Reference: https://github.com/satoshilabs/slips/blob/master/slip-0010.md

use crate::error::{CryptoError, WalletError, WalletResult};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

type HmacSha512 = Hmac<Sha512>;

const HARDENED_OFFSET: u32 = 0x8000_0000;

pub struct Ed25519Deriver;

impl Ed25519Deriver {
    const MASTER_SECRET: &'static [u8] = b"ed25519 seed";

    /// Secret = `seed[0..32]`. Not interoperable with SLIP-0010 wallets, kept
    /// so existing users recover the same Solana address.
    pub fn from_seed_prefix(seed: &[u8]) -> WalletResult<Zeroizing<[u8; 32]>> {
        if seed.len() < 32 {
            return Err(WalletError::Crypto(CryptoError::DerivationFailed(format!(
                "Seed too short for ed25519: {} bytes",
                seed.len()
            ))));
        }
        let mut key = Zeroizing::new([0u8; 32]);
        key.copy_from_slice(&seed[..32]);
        Ok(key)
    }

    /// SLIP-0010 derivation; every path segment must be hardened,
    /// e.g. `m/44'/501'/0'/0'`.
    pub fn derive(seed: &[u8], path: &str) -> WalletResult<Zeroizing<[u8; 32]>> {
        let indices = Self::parse_path(path)?;

        let (mut key, mut chain_code) = Self::hmac_split(Self::MASTER_SECRET, &[seed])?;

        for index in indices {
            let hardened = (index | HARDENED_OFFSET).to_be_bytes();
            let (child_key, child_chain) =
                Self::hmac_split(&chain_code, &[&[0x00], &key[..], &hardened])?;
            key.zeroize();
            chain_code.zeroize();
            key = child_key;
            chain_code = child_chain;
        }

        chain_code.zeroize();
        Ok(Zeroizing::new(key))
    }

    /// I = HMAC-SHA512(hmac_key, parts...); returns (IL, IR).
    fn hmac_split(hmac_key: &[u8], parts: &[&[u8]]) -> WalletResult<([u8; 32], [u8; 32])> {
        let mut mac = HmacSha512::new_from_slice(hmac_key).map_err(|e| {
            WalletError::Crypto(CryptoError::DerivationFailed(format!(
                "HMAC init failed: {}",
                e
            )))
        })?;
        for part in parts {
            mac.update(part);
        }

        let mut buf = [0u8; 64];
        buf.copy_from_slice(&mac.finalize().into_bytes());

        let mut left = [0u8; 32];
        let mut right = [0u8; 32];
        left.copy_from_slice(&buf[..32]);
        right.copy_from_slice(&buf[32..]);
        buf.zeroize();

        Ok((left, right))
    }

    /// `"m/44'/501'/0'/0'"` -> `[44, 501, 0, 0]`
    fn parse_path(path: &str) -> WalletResult<Vec<u32>> {
        let invalid = |msg: String| WalletError::Crypto(CryptoError::DerivationFailed(msg));

        let segments = path
            .trim()
            .strip_prefix("m/")
            .ok_or_else(|| invalid(format!("Path must start with 'm/': {}", path)))?;

        let mut indices = Vec::new();
        for segment in segments.split('/').map(str::trim).filter(|s| !s.is_empty()) {
            let num_str = segment
                .strip_suffix('\'')
                .or_else(|| segment.strip_suffix('h'))
                .ok_or_else(|| {
                    invalid(format!(
                        "Ed25519 SLIP-0010 requires ALL levels to be hardened. Invalid segment: '{}'",
                        segment
                    ))
                })?;
            let index: u32 = num_str
                .parse()
                .map_err(|e| invalid(format!("Invalid index '{}': {}", num_str, e)))?;
            if index >= HARDENED_OFFSET {
                return Err(invalid(format!("Index out of range: {}", index)));
            }
            indices.push(index);
        }

        if indices.is_empty() {
            return Err(invalid("Empty derivation path".to_string()));
        }
        Ok(indices)
    }

    pub fn is_valid_path(path: &str) -> bool {
        Self::parse_path(path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::paths::DerivationPaths;

    const TEST_SEED: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";

    #[test]
    fn test_seed_prefix_takes_first_32_bytes() {
        let seed = hex::decode(TEST_SEED).unwrap();
        let key = Ed25519Deriver::from_seed_prefix(&seed).unwrap();
        assert_eq!(hex::encode(&*key), &TEST_SEED[..64]);
        assert!(Ed25519Deriver::from_seed_prefix(&seed[..16]).is_err());
    }

    #[test]
    fn test_slip10_consistency_and_accounts() {
        let seed = hex::decode(TEST_SEED).unwrap();
        let k1 = Ed25519Deriver::derive(&seed, DerivationPaths::SOLANA_0).unwrap();
        let k2 = Ed25519Deriver::derive(&seed, DerivationPaths::SOLANA_0).unwrap();
        let other = Ed25519Deriver::derive(&seed, &DerivationPaths::solana(1)).unwrap();
        assert_eq!(&*k1, &*k2);
        assert_ne!(&*k1, &*other);
        assert_ne!(&*k1, &*Ed25519Deriver::from_seed_prefix(&seed).unwrap());
    }

    #[test]
    fn test_non_hardened_path_rejected() {
        let seed = hex::decode(TEST_SEED).unwrap();
        let err = Ed25519Deriver::derive(&seed, "m/44'/501'/0'/0").unwrap_err();
        assert!(err.to_string().contains("hardened"));
        assert!(Ed25519Deriver::derive(&seed, "44'/501'/0'").is_err());
        assert!(!Ed25519Deriver::is_valid_path("m/"));
    }

    // SLIP-0010 test vector 1 for ed25519, seed 000102030405060708090a0b0c0d0e0f
    #[test]
    fn test_slip0010_vector_chain_m_0h() {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let key = Ed25519Deriver::derive(&seed, "m/0'").unwrap();
        assert_eq!(
            hex::encode(&*key),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }
}
