// wallet-core/src/crypto/mnemonic.rs
//
// BIP-39 mnemonic codec: generation, validation, seed derivation
// (PBKDF2-HMAC-SHA512, 2048 rounds, empty passphrase by default).

use crate::error::{CryptoError, MnemonicError, WalletError, WalletResult};
use bip39::Mnemonic;
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Supported phrase lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCount {
    /// 12 words (128-bit entropy)
    Twelve = 12,
    /// 24 words (256-bit entropy)
    TwentyFour = 24,
}

impl WordCount {
    #[inline]
    pub const fn entropy_bytes(self) -> usize {
        match self {
            WordCount::Twelve => 16,
            WordCount::TwentyFour => 32,
        }
    }

    fn from_len(len: usize) -> Option<Self> {
        match len {
            12 => Some(WordCount::Twelve),
            24 => Some(WordCount::TwentyFour),
            _ => None,
        }
    }
}

/// A checksum-valid BIP-39 English mnemonic.
///
/// # Security
/// - The phrase is zeroized on drop.
/// - Entropy comes only from `OsRng` (the OS CSPRNG).
/// - `Debug` never prints the words.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct WalletMnemonic {
    phrase: String,
    word_count: usize,
}

impl std::fmt::Debug for WalletMnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletMnemonic")
            .field("word_count", &self.word_count)
            .field("phrase", &"[REDACTED]")
            .finish()
    }
}

impl WalletMnemonic {
    /// Generates a fresh 12-word mnemonic.
    pub fn generate() -> WalletResult<Self> {
        Self::generate_with(WordCount::Twelve)
    }

    /// Generates a mnemonic of the requested length from OS entropy.
    pub fn generate_with(word_count: WordCount) -> WalletResult<Self> {
        let entropy_size = word_count.entropy_bytes();

        let mut entropy = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut entropy[..entropy_size])
            .map_err(|e| WalletError::Crypto(CryptoError::EntropyUnavailable(e.to_string())))?;

        let mnemonic = Mnemonic::from_entropy(&entropy[..entropy_size])
            .map_err(|e| WalletError::InvalidMnemonic(MnemonicError::Bip39Error(e.to_string())));
        entropy.zeroize();
        let mnemonic = mnemonic?;

        Ok(Self {
            phrase: mnemonic.to_string(),
            word_count: word_count as usize,
        })
    }

    /// Parses a user-supplied phrase.
    ///
    /// Input is trimmed, lowercased and whitespace-collapsed before the
    /// word-count, word-list and checksum checks run.
    pub fn from_phrase(phrase: &str) -> WalletResult<Self> {
        let normalized = Self::normalize(phrase);
        let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
        let count = words.len();

        if WordCount::from_len(count).is_none() {
            return Err(MnemonicError::InvalidWordCount(count).into());
        }

        Mnemonic::parse_normalized(&normalized).map_err(|e| match e {
            bip39::Error::UnknownWord(idx) => MnemonicError::UnknownWord(
                words.get(idx).map(|w| w.to_string()).unwrap_or_default(),
            ),
            bip39::Error::InvalidChecksum => MnemonicError::ChecksumFailed,
            bip39::Error::BadWordCount(n) => MnemonicError::InvalidWordCount(n),
            other => MnemonicError::Bip39Error(other.to_string()),
        })?;

        Ok(Self {
            phrase: normalized.to_string(),
            word_count: count,
        })
    }

    /// Fail-closed validity check; only a fully parsed phrase is valid.
    #[inline]
    pub fn validate(phrase: &str) -> bool {
        Self::from_phrase(phrase).is_ok()
    }

    /// Whether `word` is in the BIP-39 English word list.
    pub fn is_valid_word(word: &str) -> bool {
        let word = word.trim().to_lowercase();
        bip39::Language::English.find_word(&word).is_some()
    }

    fn normalize(phrase: &str) -> Zeroizing<String> {
        let lowered = Zeroizing::new(phrase.trim().to_lowercase());
        Zeroizing::new(lowered.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    /// The phrase. Never log this value.
    #[inline]
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    #[inline]
    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn words(&self) -> Vec<&str> {
        self.phrase.split_whitespace().collect()
    }

    /// BIP-39 seed with an empty passphrase.
    pub fn to_seed(&self) -> WalletResult<Zeroizing<[u8; 64]>> {
        self.to_seed_with_passphrase("")
    }

    pub fn to_seed_with_passphrase(&self, passphrase: &str) -> WalletResult<Zeroizing<[u8; 64]>> {
        let mnemonic = Mnemonic::parse_normalized(&self.phrase)
            .map_err(|e| WalletError::InvalidMnemonic(MnemonicError::Bip39Error(e.to_string())))?;
        Ok(Zeroizing::new(mnemonic.to_seed(passphrase)))
    }
}
