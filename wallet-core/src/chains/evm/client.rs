// wallet-core/src/chains/evm/client.rs
//
// Ethereum ChainClient over JSON-RPC. Token enumeration and history use the
// Alchemy enhanced methods on the indexer endpoint.

use crate::chains::amount::{format_units, parse_units};
use crate::chains::evm::erc20::transfer_calldata;
use crate::chains::evm::fee::{FeeParams, FixedGasEstimator, GasEstimator, DEFAULT_PRIORITY_FEE_WEI};
use crate::chains::evm::{EvmAddress, EvmSigner};
use crate::chains::EvmChainConfig;
use crate::config::TimeoutConfig;
use crate::error::{WalletError, WalletResult};
use crate::network::models::{
    AddressValidation, Balance, Chain, FeeEstimate, TokenBalance, TokenInfo, Transaction,
    TransactionReceipt, TransactionStatus, TransactionType, TransferKind,
};
use crate::network::rpc::{HttpTransport, RpcError, RpcTransport};
use crate::network::traits::ChainClient;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::eth::TransactionRequest;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const TRANSFER_CATEGORIES: [&str; 4] = ["external", "erc20", "erc721", "erc1155"];

pub struct EvmClient {
    config: EvmChainConfig,
    rpc: Arc<dyn RpcTransport>,
    indexer: Arc<dyn RpcTransport>,
    gas: Arc<dyn GasEstimator>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for EvmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmClient")
            .field("chain_id", &self.config.chain_id)
            .field("name", &self.config.name)
            .field("gas", &self.gas)
            .finish_non_exhaustive()
    }
}

impl EvmClient {
    pub fn new(config: EvmChainConfig, timeouts: &TimeoutConfig) -> WalletResult<Self> {
        let rpc: Arc<dyn RpcTransport> =
            Arc::new(HttpTransport::new(config.rpc_url.clone(), timeouts.request())?);
        let indexer: Arc<dyn RpcTransport> = if config.indexer_url == config.rpc_url {
            rpc.clone()
        } else {
            Arc::new(HttpTransport::new(config.indexer_url.clone(), timeouts.request())?)
        };

        Ok(Self::with_transports(config, rpc, indexer)
            .with_confirmation(timeouts.confirmation(), timeouts.poll_interval()))
    }

    pub fn with_transports(
        config: EvmChainConfig,
        rpc: Arc<dyn RpcTransport>,
        indexer: Arc<dyn RpcTransport>,
    ) -> Self {
        let timeouts = TimeoutConfig::default();
        Self {
            config,
            rpc,
            indexer,
            gas: Arc::new(FixedGasEstimator::default()),
            confirmation_timeout: timeouts.confirmation(),
            poll_interval: timeouts.poll_interval(),
        }
    }

    pub fn with_gas_estimator(mut self, gas: Arc<dyn GasEstimator>) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_confirmation(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn config(&self) -> &EvmChainConfig {
        &self.config
    }

    // =========================================================================
    // FEES
    // =========================================================================

    /// EIP-1559 parameters from the latest block, or the legacy gas price
    /// when the block carries no base fee.
    pub async fn fee_params(&self) -> Result<FeeParams, RpcError> {
        let block = self
            .rpc
            .call("eth_getBlockByNumber", json!(["latest", false]))
            .await?;

        match block.get("baseFeePerGas") {
            Some(base) if !base.is_null() => {
                let base_fee = quantity_u128(base)?;
                let priority = match self.rpc.call("eth_maxPriorityFeePerGas", json!([])).await {
                    Ok(v) => quantity_u128(&v)?,
                    Err(RpcError::Transport(e)) => return Err(RpcError::Transport(e)),
                    Err(e) => {
                        debug!("eth_maxPriorityFeePerGas unavailable ({}), using default", e);
                        DEFAULT_PRIORITY_FEE_WEI
                    }
                };
                Ok(FeeParams::from_base_fee(base_fee, priority))
            }
            _ => {
                let price = self.rpc.call("eth_gasPrice", json!([])).await?;
                Ok(FeeParams::Legacy {
                    gas_price: quantity_u128(&price)?,
                })
            }
        }
    }

    // =========================================================================
    // SUBMISSION
    // =========================================================================

    async fn submit(
        &self,
        signer: &EvmSigner,
        tx: TransactionRequest,
        kind: TransferKind,
    ) -> WalletResult<TransactionReceipt> {
        let from = signer.address();

        let nonce = self
            .rpc
            .call(
                "eth_getTransactionCount",
                json!([from.to_checksum(None), "pending"]),
            )
            .await
            .and_then(|v| quantity_u128(&v))
            .map_err(classify_write_error)?;
        let nonce = u64::try_from(nonce)
            .map_err(|_| WalletError::SubmissionFailed(format!("Nonce out of range: {}", nonce)))?;

        let fee = self.fee_params().await.map_err(classify_fee_error)?;
        let gas_limit = self.gas.gas_limit(kind);

        let tx = tx.with_nonce(nonce).with_gas_limit(gas_limit);
        let tx = match fee {
            FeeParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => tx
                .with_max_fee_per_gas(max_fee_per_gas)
                .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
            FeeParams::Legacy { gas_price } => tx.with_gas_price(gas_price),
        };

        let signed = signer.sign_transaction(tx).await?;
        let hash = format!("0x{}", hex::encode(signed.hash));

        match self
            .rpc
            .call("eth_sendRawTransaction", json!([signed.raw_hex()]))
            .await
        {
            Ok(returned) => {
                if returned.as_str().map(|h| !h.eq_ignore_ascii_case(&hash)).unwrap_or(false) {
                    warn!(%hash, node_hash = ?returned, "node reported a different transaction hash");
                }
            }
            Err(e) => {
                error!(from = %from, nonce, "eth_sendRawTransaction failed: {}", e);
                return Err(classify_broadcast_error(e, &hash));
            }
        }
        info!(%hash, from = %from, nonce, "transaction broadcast");

        self.wait_for_confirmation(&hash).await
    }

    /// Polls for the receipt until `confirmation_timeout`.
    pub async fn wait_for_confirmation(&self, hash: &str) -> WalletResult<TransactionReceipt> {
        let poll = async {
            loop {
                match self.rpc.call("eth_getTransactionReceipt", json!([hash])).await {
                    Ok(receipt) if !receipt.is_null() => return receipt,
                    Ok(_) => {}
                    Err(e) => debug!(%hash, "receipt poll failed: {}", e),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let receipt = tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| {
                warn!(%hash, "confirmation wait timed out");
                WalletError::ConfirmationTimeout {
                    hash: hash.to_string(),
                }
            })?;

        let block_number = receipt
            .get("blockNumber")
            .and_then(|v| quantity_u128(v).ok())
            .and_then(|n| u64::try_from(n).ok());

        match receipt_status(&receipt) {
            TransactionStatus::Failed => {
                error!(%hash, "transaction reverted");
                Err(WalletError::SubmissionFailed(format!(
                    "Transaction {} reverted on-chain",
                    hash
                )))
            }
            status => {
                info!(%hash, ?block_number, "transaction confirmed");
                Ok(TransactionReceipt {
                    hash: hash.to_string(),
                    chain: Chain::Ethereum,
                    status,
                    block_number,
                    explorer_url: Some(self.config.tx_url(hash)),
                })
            }
        }
    }

    async fn token_metadata(&self, contract: &str) -> Result<Value, RpcError> {
        self.indexer
            .call("alchemy_getTokenMetadata", json!([contract]))
            .await
    }

    async fn asset_transfers(&self, direction: &str, address: &str, limit: usize) -> WalletResult<Vec<Value>> {
        let result = self
            .indexer
            .call(
                "alchemy_getAssetTransfers",
                json!([{
                    direction: address,
                    "category": TRANSFER_CATEGORIES,
                    "maxCount": format!("0x{:x}", limit),
                    "order": "desc",
                    "withMetadata": true,
                }]),
            )
            .await?;

        Ok(result
            .get("transfers")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    fn history_entry(&self, owner: &Address, transfer: &Value) -> Option<Transaction> {
        let hash = transfer.get("hash")?.as_str()?.to_string();
        let from = transfer.get("from").and_then(Value::as_str).map(str::to_string);
        let to = transfer.get("to").and_then(Value::as_str).map(str::to_string);

        let tx_type = match from.as_deref().map(|f| EvmAddress::equals(f, &owner.to_string())) {
            Some(true) => TransactionType::Send,
            Some(false) => TransactionType::Receive,
            None => TransactionType::Unknown,
        };

        let timestamp = transfer
            .pointer("/metadata/blockTimestamp")
            .and_then(Value::as_str)
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.timestamp());

        Some(Transaction {
            explorer_url: Some(self.config.tx_url(&hash)),
            hash,
            chain: Chain::Ethereum,
            from,
            to,
            value: transfer.get("value").filter(|v| !v.is_null()).map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
            symbol: transfer.get("asset").and_then(Value::as_str).map(str::to_string),
            tx_type,
            status: TransactionStatus::Confirmed,
            block_number: transfer
                .get("blockNum")
                .and_then(|v| quantity_u128(v).ok())
                .and_then(|n| u64::try_from(n).ok()),
            timestamp,
        })
    }
}

#[async_trait]
impl ChainClient for EvmClient {
    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    fn validate_address(&self, address: &str) -> AddressValidation {
        EvmAddress::validate(address)
    }

    fn address_for_key(&self, private_key_hex: &str) -> WalletResult<String> {
        EvmAddress::derive_from_hex(private_key_hex)
    }

    async fn get_native_balance(&self, address: &str) -> WalletResult<Balance> {
        let address = EvmAddress::parse(address)?;
        let result = self
            .rpc
            .call("eth_getBalance", json!([address.to_checksum(None), "latest"]))
            .await?;
        let wei = quantity_u256(&result)?;
        Ok(Balance::new(wei.to_string(), self.config.decimals, &self.config.symbol))
    }

    async fn get_token_balances(&self, address: &str) -> WalletResult<Vec<TokenBalance>> {
        let address = EvmAddress::parse(address)?;
        let result = self
            .indexer
            .call(
                "alchemy_getTokenBalances",
                json!([address.to_checksum(None), "erc20"]),
            )
            .await?;

        let held: Vec<(String, U256)> = result
            .get("tokenBalances")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let contract = entry.get("contractAddress")?.as_str()?.to_string();
                        let amount = quantity_u256(entry.get("tokenBalance")?).ok()?;
                        (!amount.is_zero()).then_some((contract, amount))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let metadata = join_all(held.iter().map(|(contract, _)| self.token_metadata(contract))).await;

        let mut tokens = Vec::with_capacity(held.len());
        for ((contract, amount), meta) in held.into_iter().zip(metadata) {
            let meta = match meta {
                Ok(m) => m,
                Err(e) => {
                    warn!(%contract, "skipping token, metadata lookup failed: {}", e);
                    continue;
                }
            };
            let Some(decimals) = meta
                .get("decimals")
                .and_then(Value::as_u64)
                .and_then(|d| u8::try_from(d).ok())
            else {
                warn!(%contract, "skipping token without decimals");
                continue;
            };

            let symbol = non_empty_str(&meta, "symbol");
            tokens.push(TokenBalance {
                balance: Balance::new(amount.to_string(), decimals, symbol.clone().unwrap_or_default()),
                token: TokenInfo {
                    address: contract,
                    symbol,
                    name: non_empty_str(&meta, "name"),
                    decimals,
                    logo_url: non_empty_str(&meta, "logo"),
                    verified: false,
                },
            });
        }
        Ok(tokens)
    }

    async fn estimate_fee(&self, kind: TransferKind) -> WalletResult<FeeEstimate> {
        let fee = self.fee_params().await.map_err(classify_fee_error)?;
        let gas_limit = self.gas.gas_limit(kind);
        let cost = fee.max_cost(gas_limit).to_string();

        let (max_fee, priority) = match fee {
            FeeParams::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => (max_fee_per_gas, Some(max_priority_fee_per_gas.to_string())),
            FeeParams::Legacy { gas_price } => (gas_price, None),
        };

        Ok(FeeEstimate {
            chain: Chain::Ethereum,
            kind,
            fee_formatted: format_units(&cost, self.config.decimals),
            fee_raw: cost,
            fee_symbol: self.config.symbol.clone(),
            gas_limit: Some(gas_limit),
            max_fee_per_gas: Some(max_fee.to_string()),
            max_priority_fee: priority,
        })
    }

    async fn send_native(
        &self,
        private_key_hex: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<TransactionReceipt> {
        let to = EvmAddress::parse(to)?;
        let signer = EvmSigner::from_hex(private_key_hex, self.config.chain_id)?;

        let tx = TransactionRequest::default()
            .with_to(to)
            .with_value(U256::from(amount));
        self.submit(&signer, tx, TransferKind::Native).await
    }

    async fn send_token(
        &self,
        private_key_hex: &str,
        token: &str,
        to: &str,
        amount: &str,
        decimals: u8,
    ) -> WalletResult<TransactionReceipt> {
        let token = EvmAddress::parse(token)
            .map_err(|e| WalletError::InvalidAddress(format!("token contract: {}", e)))?;
        let to = EvmAddress::parse(to)?;
        let amount = U256::from(parse_units(amount, decimals)?);
        let signer = EvmSigner::from_hex(private_key_hex, self.config.chain_id)?;

        let tx = TransactionRequest::default()
            .with_to(token)
            .with_value(U256::ZERO)
            .with_input(transfer_calldata(to, amount));
        self.submit(&signer, tx, TransferKind::Token).await
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> WalletResult<Vec<Transaction>> {
        let owner = EvmAddress::parse(address)?;
        let owner_str = owner.to_checksum(None);

        let (sent, received) = futures::try_join!(
            self.asset_transfers("fromAddress", &owner_str, limit),
            self.asset_transfers("toAddress", &owner_str, limit),
        )?;

        let mut seen = HashSet::new();
        let mut history: Vec<Transaction> = sent
            .iter()
            .chain(received.iter())
            .filter_map(|t| self.history_entry(&owner, t))
            .filter(|t| seen.insert(t.hash.clone()))
            .collect();

        history.sort_by(|a, b| b.block_number.cmp(&a.block_number));
        history.truncate(limit);
        Ok(history)
    }

    async fn get_transaction_status(&self, hash: &str) -> WalletResult<TransactionStatus> {
        let receipt = self
            .rpc
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if !receipt.is_null() {
            return Ok(receipt_status(&receipt));
        }

        let tx = self
            .rpc
            .call("eth_getTransactionByHash", json!([hash]))
            .await?;
        Ok(if tx.is_null() {
            TransactionStatus::Unknown
        } else {
            TransactionStatus::Pending
        })
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn receipt_status(receipt: &Value) -> TransactionStatus {
    match receipt.get("status").and_then(Value::as_str) {
        Some("0x0") => TransactionStatus::Failed,
        _ => TransactionStatus::Confirmed,
    }
}

/// Maps a failed write to the error the caller can act on, using the
/// provider's message text.
fn classify_write_error(err: RpcError) -> WalletError {
    if let RpcError::Transport(msg) = &err {
        return WalletError::ProviderUnavailable(msg.clone());
    }
    let message = err.message().to_string();
    let lower = message.to_lowercase();
    if lower.contains("insufficient funds") || lower.contains("insufficient balance") {
        WalletError::InsufficientFunds(message)
    } else if lower.contains("invalid address") {
        WalletError::InvalidAddress(message)
    } else if lower.contains("gas") {
        WalletError::GasEstimationFailed(message)
    } else {
        WalletError::SubmissionFailed(message)
    }
}

/// A transport failure on the broadcast itself leaves the outcome open.
fn classify_broadcast_error(err: RpcError, hash: &str) -> WalletError {
    match err {
        RpcError::Transport(reason) => WalletError::BroadcastUnknown {
            hash: hash.to_string(),
            reason,
        },
        other => classify_write_error(other),
    }
}

fn classify_fee_error(err: RpcError) -> WalletError {
    match err {
        RpcError::Transport(msg) => WalletError::ProviderUnavailable(msg),
        other => WalletError::GasEstimationFailed(other.to_string()),
    }
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// `"0x1bc16d674ec80000"` -> U256. `"0x"` reads as zero.
fn quantity_u256(value: &Value) -> Result<U256, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::Malformed(format!("expected hex quantity, got {}", value)))?;
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Malformed(format!("bad hex quantity {}: {}", s, e)))
}

fn quantity_u128(value: &Value) -> Result<u128, RpcError> {
    let n = quantity_u256(value)?;
    u128::try_from(n).map_err(|_| RpcError::Malformed(format!("quantity too large: {}", n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::rpc::testing::ScriptedTransport;
    use alloy::consensus::{Transaction as _, TxEnvelope};
    use alloy::eips::eip2718::Decodable2718;
    use alloy::primitives::keccak256;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const FROM: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
    const TO: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn client(t: Arc<ScriptedTransport>) -> EvmClient {
        EvmClient::with_transports(EvmChainConfig::sepolia("test"), t.clone(), t)
            .with_confirmation(Duration::from_millis(200), Duration::from_millis(10))
    }

    fn fee_script(t: ScriptedTransport) -> ScriptedTransport {
        t.respond("eth_getBlockByNumber", json!({"number": "0x10", "baseFeePerGas": "0x2540be400"}))
            .respond("eth_maxPriorityFeePerGas", json!("0x3b9aca00"))
    }

    fn send_script() -> ScriptedTransport {
        fee_script(ScriptedTransport::new())
            .respond("eth_getTransactionCount", json!("0x7"))
            .respond("eth_sendRawTransaction", json!("0xabc"))
            .respond("eth_getTransactionReceipt", Value::Null)
            .respond("eth_getTransactionReceipt", json!({"status": "0x1", "blockNumber": "0x20"}))
    }

    fn sent_envelope(t: &ScriptedTransport) -> (TxEnvelope, String) {
        let params = t.calls_to("eth_sendRawTransaction");
        let raw_hex = params[0][0].as_str().unwrap().to_string();
        let raw = hex::decode(raw_hex.trim_start_matches("0x")).unwrap();
        let hash = format!("0x{}", hex::encode(keccak256(&raw)));
        (TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap(), hash)
    }

    #[tokio::test]
    async fn test_native_balance() {
        let t = Arc::new(ScriptedTransport::new().respond("eth_getBalance", json!("0xde0b6b3a7640000")));
        let balance = client(t.clone()).get_native_balance(FROM).await.unwrap();
        assert_eq!(balance.raw, "1000000000000000000");
        assert_eq!(balance.formatted, "1");
        assert_eq!(balance.symbol, "ETH");
        assert_eq!(t.calls_to("eth_getBalance")[0], json!([FROM, "latest"]));
    }

    #[tokio::test]
    async fn test_balance_failure_is_not_zero() {
        let t = Arc::new(
            ScriptedTransport::new().fail("eth_getBalance", RpcError::Transport("timeout".into())),
        );
        let err = client(t).get_native_balance(FROM).await.unwrap_err();
        assert!(matches!(err, WalletError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_invalid_address_makes_no_call() {
        let t = Arc::new(ScriptedTransport::new());
        let err = client(t.clone()).get_native_balance("0x1234").await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidAddress(_)));
        assert!(t.calls().is_empty());
    }

    #[tokio::test]
    async fn test_token_balances_filter_and_metadata() {
        let t = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "alchemy_getTokenBalances",
                    json!({"address": FROM, "tokenBalances": [
                        {"contractAddress": USDC, "tokenBalance": "0x00000000000000000000000000000000000000000000000000000000000f4240"},
                        {"contractAddress": "0x0000000000000000000000000000000000000001", "tokenBalance": "0x0"},
                        {"contractAddress": "0x0000000000000000000000000000000000000002", "tokenBalance": "0x"},
                    ]}),
                )
                .respond(
                    "alchemy_getTokenMetadata",
                    json!({"decimals": 6, "symbol": "USDC", "name": "USD Coin", "logo": null}),
                ),
        );

        let tokens = client(t.clone()).get_token_balances(FROM).await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token.symbol.as_deref(), Some("USDC"));
        assert_eq!(tokens[0].token.logo_url, None);
        assert_eq!(tokens[0].balance.formatted, "1");
        assert_eq!(t.calls_to("alchemy_getTokenMetadata").len(), 1);
    }

    #[tokio::test]
    async fn test_token_without_symbol_is_not_invented() {
        let t = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "alchemy_getTokenBalances",
                    json!({"tokenBalances": [{"contractAddress": USDC, "tokenBalance": "0x10"}]}),
                )
                .respond("alchemy_getTokenMetadata", json!({"decimals": 0, "symbol": "", "name": null})),
        );
        let tokens = client(t).get_token_balances(FROM).await.unwrap();
        assert_eq!(tokens[0].token.symbol, None);
        assert_eq!(tokens[0].token.name, None);
        assert_eq!(tokens[0].balance.raw, "16");
    }

    #[tokio::test]
    async fn test_estimate_fee_eip1559() {
        let t = Arc::new(fee_script(ScriptedTransport::new()));
        let c = client(t);

        let native = c.estimate_fee(TransferKind::Native).await.unwrap();
        // (2 * 10 gwei + 1 gwei) * 21000
        assert_eq!(native.fee_raw, "441000000000000");
        assert_eq!(native.fee_formatted, "0.000441");
        assert_eq!(native.gas_limit, Some(21_000));
        assert_eq!(native.max_priority_fee.as_deref(), Some("1000000000"));

        let token = c.estimate_fee(TransferKind::Token).await.unwrap();
        assert_eq!(token.gas_limit, Some(65_000));
    }

    #[tokio::test]
    async fn test_estimate_fee_legacy_and_default_priority() {
        let legacy = Arc::new(
            ScriptedTransport::new()
                .respond("eth_getBlockByNumber", json!({"number": "0x1"}))
                .respond("eth_gasPrice", json!("0x3b9aca00")),
        );
        let fee = client(legacy).estimate_fee(TransferKind::Native).await.unwrap();
        assert_eq!(fee.fee_raw, "21000000000000");
        assert_eq!(fee.max_priority_fee, None);

        let no_priority = Arc::new(
            ScriptedTransport::new()
                .respond("eth_getBlockByNumber", json!({"baseFeePerGas": "0x0"}))
                .fail(
                    "eth_maxPriorityFeePerGas",
                    RpcError::Rejected { code: -32601, message: "method not found".into() },
                ),
        );
        let fee = client(no_priority).estimate_fee(TransferKind::Native).await.unwrap();
        assert_eq!(fee.fee_raw, (DEFAULT_PRIORITY_FEE_WEI * 21_000).to_string());
    }

    #[tokio::test]
    async fn test_fee_rejection_is_gas_estimation_failure() {
        let t = Arc::new(ScriptedTransport::new().fail(
            "eth_getBlockByNumber",
            RpcError::Rejected { code: -32000, message: "header not found".into() },
        ));
        let err = client(t).estimate_fee(TransferKind::Native).await.unwrap_err();
        assert!(matches!(err, WalletError::GasEstimationFailed(_)));
    }

    #[tokio::test]
    async fn test_send_native_signs_and_confirms() {
        let t = Arc::new(send_script());
        let receipt = client(t.clone())
            .send_native(KEY, TO, 1_000_000_000_000_000_000)
            .await
            .unwrap();

        let (envelope, hash) = sent_envelope(&t);
        assert_eq!(receipt.hash, hash);
        assert_eq!(receipt.status, TransactionStatus::Confirmed);
        assert_eq!(receipt.block_number, Some(0x20));
        assert!(receipt.explorer_url.unwrap().ends_with(&hash));

        assert_eq!(envelope.nonce(), 7);
        assert_eq!(envelope.gas_limit(), 21_000);
        assert_eq!(envelope.value(), U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(envelope.to(), Some(TO.parse::<Address>().unwrap()));
        assert_eq!(envelope.chain_id(), Some(11155111));
        assert_eq!(envelope.max_fee_per_gas(), 21_000_000_000);

        assert_eq!(t.calls_to("eth_getTransactionCount")[0], json!([FROM, "pending"]));
    }

    #[tokio::test]
    async fn test_send_token_encodes_transfer() {
        let t = Arc::new(send_script());
        client(t.clone())
            .send_token(KEY, USDC, TO, "1.5", 6)
            .await
            .unwrap();

        let (envelope, _) = sent_envelope(&t);
        assert_eq!(envelope.to(), Some(USDC.parse::<Address>().unwrap()));
        assert_eq!(envelope.value(), U256::ZERO);
        assert_eq!(envelope.gas_limit(), 65_000);

        let expected = transfer_calldata(TO.parse().unwrap(), U256::from(1_500_000u64));
        assert_eq!(envelope.input(), &expected);
    }

    #[tokio::test]
    async fn test_send_token_validates_inputs_before_any_call() {
        let t = Arc::new(ScriptedTransport::new());
        let c = client(t.clone());
        assert!(matches!(
            c.send_token(KEY, "0xnotatoken", TO, "1", 6).await,
            Err(WalletError::InvalidAddress(_))
        ));
        assert!(matches!(
            c.send_token(KEY, USDC, TO, "1.0000001", 6).await,
            Err(WalletError::InvalidAmount(_))
        ));
        assert!(matches!(
            c.send_native(KEY, "bogus", 1).await,
            Err(WalletError::InvalidAddress(_))
        ));
        assert!(t.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_transport_failure_reports_hash() {
        let t = Arc::new(fee_script(ScriptedTransport::new())
            .respond("eth_getTransactionCount", json!("0x0"))
            .fail("eth_sendRawTransaction", RpcError::Transport("connection reset".into())));
        let err = client(t.clone()).send_native(KEY, TO, 1).await.unwrap_err();
        assert!(!err.is_retryable());

        let (_, expected) = sent_envelope(&t);
        assert_eq!(
            err,
            WalletError::BroadcastUnknown {
                hash: expected,
                reason: "connection reset".into()
            }
        );
        assert!(t.calls_to("eth_getTransactionReceipt").is_empty());
    }

    #[tokio::test]
    async fn test_send_maps_provider_errors() {
        let cases = [
            ("insufficient funds for gas * price + value", "InsufficientFunds"),
            ("intrinsic gas too low", "GasEstimationFailed"),
            ("nonce too low", "SubmissionFailed"),
        ];
        for (message, expected) in cases {
            let t = Arc::new(fee_script(ScriptedTransport::new())
                .respond("eth_getTransactionCount", json!("0x0"))
                .fail("eth_sendRawTransaction", RpcError::Rejected { code: -32000, message: message.into() }));
            let err = client(t).send_native(KEY, TO, 1).await.unwrap_err();
            let kind = match err {
                WalletError::InsufficientFunds(_) => "InsufficientFunds",
                WalletError::GasEstimationFailed(_) => "GasEstimationFailed",
                WalletError::SubmissionFailed(_) => "SubmissionFailed",
                other => panic!("unexpected {:?}", other),
            };
            assert_eq!(kind, expected, "{}", message);
        }
    }

    #[tokio::test]
    async fn test_reverted_receipt_fails() {
        let t = Arc::new(fee_script(ScriptedTransport::new())
            .respond("eth_getTransactionCount", json!("0x0"))
            .respond("eth_sendRawTransaction", json!("0xabc"))
            .respond("eth_getTransactionReceipt", json!({"status": "0x0", "blockNumber": "0x1"})));
        let err = client(t).send_native(KEY, TO, 1).await.unwrap_err();
        assert!(matches!(err, WalletError::SubmissionFailed(ref m) if m.contains("reverted")));
    }

    #[tokio::test]
    async fn test_confirmation_timeout_keeps_hash() {
        let t = Arc::new(fee_script(ScriptedTransport::new())
            .respond("eth_getTransactionCount", json!("0x0"))
            .respond("eth_sendRawTransaction", json!("0xabc"))
            .respond("eth_getTransactionReceipt", Value::Null));
        let err = client(t.clone()).send_native(KEY, TO, 1).await.unwrap_err();
        let (_, hash) = sent_envelope(&t);
        assert_eq!(err, WalletError::ConfirmationTimeout { hash });
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_history_merges_and_orders() {
        let t = Arc::new(
            ScriptedTransport::new()
                .respond(
                    "alchemy_getAssetTransfers",
                    json!({"transfers": [
                        {"hash": "0x01", "from": FROM, "to": TO, "value": 0.5, "asset": "ETH", "blockNum": "0x10",
                         "metadata": {"blockTimestamp": "2024-01-01T00:00:00.000Z"}},
                        {"hash": "0x03", "from": FROM, "to": FROM, "value": 1, "asset": "ETH", "blockNum": "0x30"},
                    ]}),
                )
                .respond(
                    "alchemy_getAssetTransfers",
                    json!({"transfers": [
                        {"hash": "0x02", "from": TO, "to": FROM, "value": 10, "asset": "USDC", "blockNum": "0x20"},
                        {"hash": "0x03", "from": FROM, "to": FROM, "value": 1, "asset": "ETH", "blockNum": "0x30"},
                    ]}),
                ),
        );

        let history = client(t.clone()).get_transaction_history(FROM, 10).await.unwrap();
        let hashes: Vec<_> = history.iter().map(|h| h.hash.as_str()).collect();
        assert_eq!(hashes, ["0x03", "0x02", "0x01"]);
        assert_eq!(history[1].tx_type, TransactionType::Receive);
        assert_eq!(history[2].tx_type, TransactionType::Send);
        assert_eq!(history[2].value.as_deref(), Some("0.5"));
        assert_eq!(history[2].timestamp, Some(1_704_067_200));

        let calls = t.calls_to("alchemy_getAssetTransfers");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][0]["maxCount"], "0xa");
    }

    #[tokio::test]
    async fn test_transaction_status() {
        let t = Arc::new(
            ScriptedTransport::new()
                .respond("eth_getTransactionReceipt", Value::Null)
                .respond("eth_getTransactionByHash", json!({"hash": "0x01"})),
        );
        assert_eq!(
            client(t).get_transaction_status("0x01").await.unwrap(),
            TransactionStatus::Pending
        );

        let t = Arc::new(
            ScriptedTransport::new()
                .respond("eth_getTransactionReceipt", Value::Null)
                .respond("eth_getTransactionByHash", Value::Null),
        );
        assert_eq!(
            client(t).get_transaction_status("0x01").await.unwrap(),
            TransactionStatus::Unknown
        );

        let t = Arc::new(ScriptedTransport::new().respond("eth_getTransactionReceipt", json!({"status": "0x0"})));
        assert_eq!(
            client(t).get_transaction_status("0x01").await.unwrap(),
            TransactionStatus::Failed
        );
    }

    #[test]
    fn test_address_for_key() {
        let t = Arc::new(ScriptedTransport::new());
        assert_eq!(client(t).address_for_key(KEY).unwrap(), FROM);
    }
}
