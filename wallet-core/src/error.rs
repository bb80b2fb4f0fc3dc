use thiserror::Error;

pub type WalletResult<T> = std::result::Result<T, WalletError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("Invalid seed phrase: {0}")]
    InvalidMnemonic(#[from] MnemonicError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("No {purpose} stored for wallet '{wallet_id}'")]
    KeyNotFound { wallet_id: String, purpose: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Gas estimation failed: {0}")]
    GasEstimationFailed(String),

    #[error("Transaction submission failed: {0}")]
    SubmissionFailed(String),

    /// Transaction was broadcast but confirmation was not observed in time.
    #[error("Transaction {hash} broadcast but not confirmed before timeout")]
    ConfirmationTimeout { hash: String },

    /// The broadcast request failed in transit, so the node may hold the
    /// transaction. Query `hash` before sending again.
    #[error("Broadcast of {hash} not acknowledged: {reason}")]
    BroadcastUnknown { hash: String, reason: String },

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cryptography Error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Storage Error: {0}")]
    Storage(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

impl WalletError {
    /// Whether the caller may retry the same call unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::ProviderUnavailable(_) | WalletError::ConfirmationTimeout { .. }
        )
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        WalletError::Storage(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        WalletError::ProviderUnavailable(msg.into())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("Invalid word count: {0}. Expected 12 or 24 words.")]
    InvalidWordCount(usize),

    #[error("Word '{0}' not found in the BIP39 wordlist.")]
    UnknownWord(String),

    #[error("Checksum validation failed.")]
    ChecksumFailed,

    #[error("BIP39 internal error: {0}")]
    Bip39Error(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Entropy source failed: {0}")]
    EntropyUnavailable(String),
}
