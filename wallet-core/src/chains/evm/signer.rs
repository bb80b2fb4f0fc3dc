// wallet-core/src/chains/evm/signer.rs
//
// Offline transaction signing (EIP-155 replay protection, EIP-1559 / EIP-2718
// typed envelopes).

use crate::chains::evm::address::EvmAddress;
use crate::error::{CryptoError, WalletError, WalletResult};
use alloy::{
    eips::eip2718::Encodable2718,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{keccak256, Address, B256},
    rpc::types::eth::TransactionRequest,
    signers::local::LocalSigner,
};
use k256::ecdsa::SigningKey;

/// A signed, encoded transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEvmTransaction {
    pub raw: Vec<u8>,
    /// keccak256 of `raw`, i.e. the hash the network will report
    pub hash: B256,
}

impl SignedEvmTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

/// # Security
/// - `SigningKey` zeroizes itself on drop
/// - chain id is mandatory so every signature is replay protected
/// - `Debug` never shows the key
pub struct EvmSigner {
    signer: LocalSigner<SigningKey>,
    address: Address,
    chain_id: u64,
}

impl std::fmt::Debug for EvmSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmSigner")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

impl EvmSigner {
    pub fn new(priv_key: &[u8], chain_id: u64) -> WalletResult<Self> {
        let signing_key = SigningKey::from_slice(priv_key).map_err(|e| {
            WalletError::Crypto(CryptoError::InvalidKeyFormat(format!(
                "Invalid private key (must be 32 bytes): {}",
                e
            )))
        })?;

        let signer = LocalSigner::from_signing_key(signing_key);
        let address = signer.address();

        Ok(Self {
            signer,
            address,
            chain_id,
        })
    }

    /// Key as stored by the wallet: hex, optional `0x`.
    pub fn from_hex(priv_key_hex: &str, chain_id: u64) -> WalletResult<Self> {
        let bytes = EvmAddress::decode_key_hex(priv_key_hex)?;
        Self::new(&bytes, chain_id)
    }

    #[inline]
    pub fn address(&self) -> Address {
        self.address
    }

    #[inline]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Fills `from` and `chain_id`, signs, and returns the 2718 envelope.
    ///
    /// The request must already carry nonce, gas limit and fee fields.
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> WalletResult<SignedEvmTransaction> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let tx = tx.with_from(self.address).with_chain_id(self.chain_id);

        let envelope = tx
            .build(&wallet)
            .await
            .map_err(|e| WalletError::Crypto(CryptoError::SigningFailed(e.to_string())))?;

        let raw = envelope.encoded_2718();
        let hash = keccak256(&raw);
        Ok(SignedEvmTransaction { raw, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::TxEnvelope;
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::U256;

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const TEST_CHAIN_ID: u64 = 31337;

    fn create_test_signer() -> EvmSigner {
        EvmSigner::from_hex(&format!("0x{}", TEST_PRIVATE_KEY), TEST_CHAIN_ID).expect("Create signer")
    }

    fn transfer_request() -> TransactionRequest {
        TransactionRequest::default()
            .with_to("0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap())
            .with_value(U256::from(1_000_000_000_000_000_000u128))
            .with_nonce(0)
            .with_gas_limit(21000)
            .with_max_fee_per_gas(30_000_000_000)
            .with_max_priority_fee_per_gas(1_000_000_000)
    }

    #[test]
    fn test_address_derivation() {
        let signer = create_test_signer();
        assert_eq!(signer.address(), TEST_ADDRESS.parse::<Address>().unwrap());
    }

    #[tokio::test]
    async fn test_sign_eip1559_transfer() {
        let signer = create_test_signer();
        let signed = signer.sign_transaction(transfer_request()).await.expect("Sign tx");

        // EIP-1559 typed envelope
        assert_eq!(signed.raw[0], 0x02);
        assert_eq!(signed.hash, keccak256(&signed.raw));
        assert!(signed.raw_hex().starts_with("0x02"));

        let decoded = TxEnvelope::decode_2718(&mut signed.raw.as_slice()).unwrap();
        assert_eq!(*decoded.tx_hash(), signed.hash);
    }

    #[tokio::test]
    async fn test_signing_is_deterministic() {
        let signer = create_test_signer();
        let a = signer.sign_transaction(transfer_request()).await.unwrap();
        let b = signer.sign_transaction(transfer_request()).await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_private_key() {
        assert!(EvmSigner::new(&[0u8; 31], 1).is_err());
        assert!(EvmSigner::from_hex("0xnothex", 1).is_err());
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let debug_output = format!("{:?}", create_test_signer());
        assert!(!debug_output.contains(TEST_PRIVATE_KEY));
        assert!(debug_output.contains("EvmSigner"));
    }
}
