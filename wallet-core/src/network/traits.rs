// wallet-core/src/network/traits.rs
//
// The capability every chain client provides. Ethereum and Solana each
// implement it with their own encoding; the service only sees this trait.

use crate::error::WalletResult;
use crate::network::models::{
    AddressValidation, Balance, Chain, FeeEstimate, TokenBalance, Transaction, TransactionReceipt,
    TransactionStatus, TransferKind,
};
use async_trait::async_trait;

/// Read and transfer operations for one chain.
///
/// # Contract
/// - Read paths return `ProviderUnavailable` on transport failure. They never
///   substitute a zero or stale value.
/// - Write paths sign with the given key, broadcast, then wait for one
///   confirmation. A wait that runs out yields `ConfirmationTimeout` carrying
///   the hash; the transaction itself is not cancelled.
/// - Amount sufficiency is the caller's concern.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain(&self) -> Chain;

    fn validate_address(&self, address: &str) -> AddressValidation;

    /// Derives the address controlled by a stored private key.
    fn address_for_key(&self, private_key_hex: &str) -> WalletResult<String>;

    async fn get_native_balance(&self, address: &str) -> WalletResult<Balance>;

    /// Non-zero token holdings only.
    async fn get_token_balances(&self, address: &str) -> WalletResult<Vec<TokenBalance>>;

    async fn estimate_fee(&self, kind: TransferKind) -> WalletResult<FeeEstimate>;

    /// `amount` is in base units (wei / lamports).
    async fn send_native(
        &self,
        private_key_hex: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<TransactionReceipt>;

    /// `amount` is a decimal string scaled by `decimals` before encoding.
    async fn send_token(
        &self,
        private_key_hex: &str,
        token: &str,
        to: &str,
        amount: &str,
        decimals: u8,
    ) -> WalletResult<TransactionReceipt>;

    /// Newest first.
    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> WalletResult<Vec<Transaction>>;

    async fn get_transaction_status(&self, hash: &str) -> WalletResult<TransactionStatus>;
}
