// wallet-core/src/chains/solana/signer.rs

use crate::chains::solana::address::Pubkey;
use crate::error::{CryptoError, WalletError, WalletResult};
use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

/// ed25519 signer for Solana messages.
///
/// The key zeroizes on drop and `Debug` shows only the public key.
pub struct SolanaSigner {
    signing_key: SigningKey,
    pubkey: Pubkey,
}

impl std::fmt::Debug for SolanaSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaSigner")
            .field("pubkey", &self.pubkey)
            .finish_non_exhaustive()
    }
}

impl SolanaSigner {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let pubkey = Pubkey(signing_key.verifying_key().to_bytes());
        Self { signing_key, pubkey }
    }

    /// Stored form: hex of the 64-byte keypair (secret || public). A bare
    /// 32-byte secret is accepted as well.
    pub fn from_hex(key_hex: &str) -> WalletResult<Self> {
        let invalid = |msg: String| WalletError::Crypto(CryptoError::InvalidKeyFormat(msg));

        let bytes = Zeroizing::new(
            hex::decode(key_hex.trim()).map_err(|_| invalid("Solana private key is not hex".into()))?,
        );

        match bytes.len() {
            32 | 64 => {
                let mut secret = Zeroizing::new([0u8; 32]);
                secret.copy_from_slice(&bytes[..32]);
                let signer = Self::from_secret(&secret);
                if bytes.len() == 64 && bytes[32..] != signer.pubkey.0 {
                    return Err(invalid("Solana keypair public half does not match secret".into()));
                }
                Ok(signer)
            }
            n => Err(invalid(format!("Solana private key must be 32 or 64 bytes, got {}", n))),
        }
    }

    #[inline]
    pub fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    fn keypair_hex(secret: [u8; 32]) -> String {
        let public = SigningKey::from_bytes(&secret).verifying_key().to_bytes();
        format!("{}{}", hex::encode(secret), hex::encode(public))
    }

    #[test]
    fn test_from_keypair_hex_and_sign() {
        let signer = SolanaSigner::from_hex(&keypair_hex([9u8; 32])).unwrap();
        let sig = signer.sign(b"message");

        let verifying = ed25519_dalek::VerifyingKey::from_bytes(&signer.pubkey().0).unwrap();
        assert!(verifying.verify(b"message", &Signature::from_bytes(&sig)).is_ok());
    }

    #[test]
    fn test_bare_secret_accepted() {
        let a = SolanaSigner::from_hex(&hex::encode([9u8; 32])).unwrap();
        let b = SolanaSigner::from_hex(&keypair_hex([9u8; 32])).unwrap();
        assert_eq!(a.pubkey(), b.pubkey());
    }

    #[test]
    fn test_mismatched_public_half_rejected() {
        let mut bad = keypair_hex([9u8; 32]);
        bad.replace_range(64..66, "00");
        if bad == keypair_hex([9u8; 32]) {
            bad.replace_range(64..66, "01");
        }
        assert!(SolanaSigner::from_hex(&bad).is_err());
        assert!(SolanaSigner::from_hex("abcd").is_err());
        assert!(SolanaSigner::from_hex("not hex").is_err());
    }

    #[test]
    fn test_debug_shows_only_pubkey() {
        let secret_hex = hex::encode([9u8; 32]);
        let out = format!("{:?}", SolanaSigner::from_hex(&secret_hex).unwrap());
        assert!(out.contains("SolanaSigner"));
        assert!(!out.contains(&secret_hex));
    }
}
