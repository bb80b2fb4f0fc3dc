// wallet-core/src/chains/evm/address.rs
//
// Ethereum addresses: derivation from a secp256k1 key, EIP-55 checksum,
// validation of user input.

use crate::error::{CryptoError, WalletError, WalletResult};
use crate::network::models::AddressValidation;
use alloy::primitives::Address;
use k256::{elliptic_curve::sec1::ToEncodedPoint, SecretKey};
use tiny_keccak::{Hasher, Keccak};
use zeroize::{Zeroize, Zeroizing};

/// # Flow:  Private Key (32B) -> Public Key (64B) -> Keccak256 -> Address (20B)
///
/// Holds no key material; intermediates are zeroized before returning.
pub struct EvmAddress;

impl EvmAddress {
    /// 1. `priv_key` (32B) -> secp256k1 -> uncompressed public key (65B)
    /// 2. drop the 0x04 prefix (64B)
    /// 3. Keccak-256 -> 32B
    /// 4. last 20 bytes
    pub fn derive_bytes_from_slice(priv_key: &[u8]) -> WalletResult<[u8; 20]> {
        let secret_key = SecretKey::from_slice(priv_key).map_err(|e| {
            WalletError::Crypto(CryptoError::InvalidKeyFormat(format!(
                "Invalid secp256k1 private key: {}",
                e
            )))
        })?;

        let encoded = Zeroizing::new(secret_key.public_key().to_encoded_point(false));
        let pub_key_raw = &encoded.as_bytes()[1..];

        let mut hasher = Keccak::v256();
        let mut hash = [0u8; 32];
        hasher.update(pub_key_raw);
        hasher.finalize(&mut hash);

        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        hash.zeroize();

        Ok(address)
    }

    /// `"0x9858EfFD232B4033E47d90003D41EC34EcaEda94"` (EIP-55 mixed case)
    #[inline]
    pub fn derive_from_slice(priv_key: &[u8]) -> WalletResult<String> {
        let bytes = Self::derive_bytes_from_slice(priv_key)?;
        Ok(Address::from_slice(&bytes).to_checksum(None))
    }

    /// Accepts a stored key as hex, with or without `0x`.
    pub fn derive_from_hex(priv_key_hex: &str) -> WalletResult<String> {
        let bytes = Self::decode_key_hex(priv_key_hex)?;
        Self::derive_from_slice(&bytes)
    }

    pub(crate) fn decode_key_hex(priv_key_hex: &str) -> WalletResult<Zeroizing<Vec<u8>>> {
        let trimmed = priv_key_hex.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = Zeroizing::new(hex::decode(stripped).map_err(|_| {
            WalletError::Crypto(CryptoError::InvalidKeyFormat(
                "Ethereum private key is not hex".to_string(),
            ))
        })?);
        if bytes.len() != 32 {
            return Err(WalletError::Crypto(CryptoError::InvalidKeyFormat(format!(
                "Ethereum private key must be 32 bytes, got {}",
                bytes.len()
            ))));
        }
        Ok(bytes)
    }

    /// `0x` + 40 hex chars. Mixed-case input must carry a valid EIP-55
    /// checksum; all-lower or all-upper input is accepted as is.
    pub fn parse(address: &str) -> WalletResult<Address> {
        let address = address.trim();
        let body = address
            .strip_prefix("0x")
            .ok_or_else(|| WalletError::InvalidAddress(format!("{} (missing 0x prefix)", address)))?;

        if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WalletError::InvalidAddress(format!(
                "{} (expected 40 hex characters)",
                address
            )));
        }

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            Address::parse_checksummed(address, None)
                .map_err(|_| WalletError::InvalidAddress(format!("{} (bad EIP-55 checksum)", address)))
        } else {
            address
                .parse::<Address>()
                .map_err(|e| WalletError::InvalidAddress(format!("{} ({})", address, e)))
        }
    }

    #[inline]
    pub fn is_valid(address: &str) -> bool {
        Self::parse(address).is_ok()
    }

    pub fn validate(address: &str) -> AddressValidation {
        match Self::parse(address) {
            Ok(addr) => AddressValidation::valid(addr.to_checksum(None)),
            Err(e) => AddressValidation::invalid(e.to_string()),
        }
    }

    /// `"0xabcd..."` -> `"0xAbCd..."`
    pub fn to_checksum(address: &str) -> WalletResult<String> {
        Ok(Self::parse(address)?.to_checksum(None))
    }

    /// Byte comparison, case-insensitive.
    #[inline]
    pub fn equals(addr1: &str, addr2: &str) -> bool {
        match (addr1.parse::<Address>(), addr2.parse::<Address>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}
