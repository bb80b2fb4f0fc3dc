// wallet-core/src/chains/solana/address.rs
//
// Solana public keys: base58 text form, curve check, program derived
// addresses and associated token accounts.

use crate::error::{CryptoError, WalletError, WalletResult};
use crate::network::models::AddressValidation;
use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// 32-byte ed25519 public key or program address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Pubkey(pub [u8; 32]);

impl Pubkey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether the bytes decompress to an ed25519 point. Wallet keys are on
    /// the curve; PDAs never are.
    pub fn is_on_curve(&self) -> bool {
        CompressedEdwardsY(self.0).decompress().is_some()
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({})", self)
    }
}

impl FromStr for Pubkey {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.len() > 44 {
            return Err(WalletError::InvalidAddress(format!("{} (not a Solana address)", s)));
        }
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| WalletError::InvalidAddress(format!("{} ({})", s, e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            WalletError::InvalidAddress(format!("{} (decodes to {} bytes, expected 32)", s, v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl From<Pubkey> for String {
    fn from(key: Pubkey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for Pubkey {
    type Error = WalletError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Well-known program ids.
pub mod programs {
    use super::Pubkey;

    pub const SYSTEM: &str = "11111111111111111111111111111111";
    pub const TOKEN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
    pub const TOKEN_2022: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";
    pub const ASSOCIATED_TOKEN: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

    pub fn system() -> Pubkey {
        Pubkey([0u8; 32])
    }

    pub fn id(constant: &str) -> crate::error::WalletResult<Pubkey> {
        constant.parse()
    }
}

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

pub struct SolanaAddress;

impl SolanaAddress {
    pub fn from_bytes(bytes: &[u8; 32]) -> String {
        Pubkey(*bytes).to_string()
    }

    pub fn parse(address: &str) -> WalletResult<Pubkey> {
        address.parse()
    }

    #[inline]
    pub fn is_valid(address: &str) -> bool {
        Self::parse(address).is_ok()
    }

    pub fn validate(address: &str) -> AddressValidation {
        match Self::parse(address) {
            Ok(key) => AddressValidation::valid(key.to_string()),
            Err(e) => AddressValidation::invalid(e.to_string()),
        }
    }

    /// sha256(seeds || bump || program_id || "ProgramDerivedAddress"), with
    /// the bump counting down from 255 until the hash is off the curve.
    pub fn find_program_address(seeds: &[&[u8]], program_id: &Pubkey) -> WalletResult<(Pubkey, u8)> {
        for bump in (0..=u8::MAX).rev() {
            let mut hasher = Sha256::new();
            for seed in seeds {
                hasher.update(seed);
            }
            hasher.update([bump]);
            hasher.update(program_id.0);
            hasher.update(PDA_MARKER);

            let candidate = Pubkey(hasher.finalize().into());
            if !candidate.is_on_curve() {
                return Ok((candidate, bump));
            }
        }
        Err(WalletError::Crypto(CryptoError::DerivationFailed(
            "No viable program address bump".to_string(),
        )))
    }

    /// Associated token account of `owner` for `mint` under `token_program`.
    pub fn associated_token_address(
        owner: &Pubkey,
        mint: &Pubkey,
        token_program: &Pubkey,
    ) -> WalletResult<Pubkey> {
        let (ata, _) = Self::find_program_address(
            &[&owner.0, &token_program.0, &mint.0],
            &programs::id(programs::ASSOCIATED_TOKEN)?,
        )?;
        Ok(ata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    #[test]
    fn test_program_constants_parse() {
        assert_eq!(programs::id(programs::SYSTEM).unwrap(), programs::system());
        for id in [programs::TOKEN, programs::TOKEN_2022, programs::ASSOCIATED_TOKEN] {
            let key: Pubkey = id.parse().unwrap();
            assert_eq!(key.to_string(), id);
        }
    }

    #[test]
    fn test_parse_and_validate() {
        assert!(SolanaAddress::is_valid(USDC_MINT));
        assert!(SolanaAddress::is_valid(programs::SYSTEM));

        // 0, O, I and l are outside the base58 alphabet
        assert!(!SolanaAddress::is_valid("0OIl"));
        assert!(!SolanaAddress::is_valid(""));
        // valid base58 but not 32 bytes
        assert!(!SolanaAddress::is_valid("3yZe7d"));
        assert!(!SolanaAddress::is_valid("0x9858EfFD232B4033E47d90003D41EC34EcaEda94"));

        let v = SolanaAddress::validate(USDC_MINT);
        assert!(v.is_valid);
        assert_eq!(v.normalized.as_deref(), Some(USDC_MINT));
    }

    #[test]
    fn test_wallet_key_is_on_curve() {
        let signing = ed25519_dalek::SigningKey::from_bytes(&[7u8; 32]);
        let key = Pubkey(signing.verifying_key().to_bytes());
        assert!(key.is_on_curve());
    }

    #[test]
    fn test_associated_token_address_is_pda() {
        let owner = Pubkey(ed25519_dalek::SigningKey::from_bytes(&[1u8; 32]).verifying_key().to_bytes());
        let mint: Pubkey = USDC_MINT.parse().unwrap();
        let token = programs::id(programs::TOKEN).unwrap();

        let ata = SolanaAddress::associated_token_address(&owner, &mint, &token).unwrap();
        assert!(!ata.is_on_curve());
        assert_eq!(ata, SolanaAddress::associated_token_address(&owner, &mint, &token).unwrap());

        let other_program = programs::id(programs::TOKEN_2022).unwrap();
        assert_ne!(ata, SolanaAddress::associated_token_address(&owner, &mint, &other_program).unwrap());
    }

    #[test]
    fn test_find_program_address_recomputes() {
        let program = programs::id(programs::ASSOCIATED_TOKEN).unwrap();
        let (pda, bump) = SolanaAddress::find_program_address(&[b"seed"], &program).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(b"seed");
        hasher.update([bump]);
        hasher.update(program.0);
        hasher.update(PDA_MARKER);
        assert_eq!(pda.0, <[u8; 32]>::from(hasher.finalize()));
    }

    #[test]
    fn test_serde_as_base58() {
        let key: Pubkey = USDC_MINT.parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", USDC_MINT));
        let back: Pubkey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
