// wallet-core/src/chains/solana/client.rs
//
// Solana ChainClient over JSON-RPC. Transactions are legacy messages built
// locally, signed with ed25519 and sent base64 encoded.

use crate::chains::amount::{format_units, parse_units};
use crate::chains::solana::address::{programs, Pubkey, SolanaAddress};
use crate::chains::solana::signer::SolanaSigner;
use crate::chains::solana::tokens;
use crate::chains::solana::transaction::{
    create_associated_token_account_idempotent, spl_transfer_checked, system_transfer, Instruction,
    Message, SignedSolanaTransaction,
};
use crate::chains::SolanaChainConfig;
use crate::config::TimeoutConfig;
use crate::error::{WalletError, WalletResult};
use crate::network::models::{
    AddressValidation, Balance, Chain, FeeEstimate, TokenBalance, TokenInfo, Transaction,
    TransactionReceipt, TransactionStatus, TransactionType, TransferKind,
};
use crate::network::rpc::{HttpTransport, RpcError, RpcTransport};
use crate::network::traits::ChainClient;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Used when the node cannot price a message.
pub const DEFAULT_LAMPORTS_PER_SIGNATURE: u64 = 5_000;

/// `getSignaturesForAddress` upper bound.
const MAX_SIGNATURES_PER_QUERY: usize = 1_000;

pub struct SolanaClient {
    config: SolanaChainConfig,
    rpc: Arc<dyn RpcTransport>,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl std::fmt::Debug for SolanaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaClient")
            .field("name", &self.config.name)
            .finish_non_exhaustive()
    }
}

impl SolanaClient {
    pub fn new(config: SolanaChainConfig, timeouts: &TimeoutConfig) -> WalletResult<Self> {
        let rpc = Arc::new(HttpTransport::new(config.rpc_url.clone(), timeouts.request())?);
        Ok(Self::with_transport(config, rpc)
            .with_confirmation(timeouts.confirmation(), timeouts.poll_interval()))
    }

    pub fn with_transport(config: SolanaChainConfig, rpc: Arc<dyn RpcTransport>) -> Self {
        let timeouts = TimeoutConfig::default();
        Self {
            config,
            rpc,
            confirmation_timeout: timeouts.confirmation(),
            poll_interval: timeouts.poll_interval(),
        }
    }

    pub fn with_confirmation(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn config(&self) -> &SolanaChainConfig {
        &self.config
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], RpcError> {
        let result = self
            .rpc
            .call("getLatestBlockhash", json!([{"commitment": "confirmed"}]))
            .await?;
        let text = result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::Malformed(format!("no blockhash in {}", result)))?;

        bs58::decode(text)
            .into_vec()
            .ok()
            .and_then(|b| <[u8; 32]>::try_from(b).ok())
            .ok_or_else(|| RpcError::Malformed(format!("bad blockhash {}", text)))
    }

    /// Lamports the cluster charges for `message`. Falls back to the flat
    /// per-signature fee when the node answers `null`.
    async fn fee_for_message(&self, message: &Message) -> Result<u64, RpcError> {
        let encoded = BASE64.encode(message.serialize());
        let result = self
            .rpc
            .call("getFeeForMessage", json!([encoded, {"commitment": "confirmed"}]))
            .await?;

        match result.get("value").and_then(Value::as_u64) {
            Some(fee) => Ok(fee),
            None => {
                debug!("getFeeForMessage returned no value, using per-signature default");
                Ok(DEFAULT_LAMPORTS_PER_SIGNATURE * u64::from(message.header.num_required_signatures))
            }
        }
    }

    /// Program that owns `mint`, which must be one of the token programs.
    async fn token_program_for_mint(&self, mint: &Pubkey) -> WalletResult<Pubkey> {
        let info = self
            .rpc
            .call(
                "getAccountInfo",
                json!([mint.to_string(), {"encoding": "base64", "commitment": "confirmed"}]),
            )
            .await
            .map_err(classify_write_error)?;

        let owner = info
            .pointer("/value/owner")
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::InvalidAddress(format!("token mint {} does not exist", mint)))?;

        if owner == programs::TOKEN || owner == programs::TOKEN_2022 {
            programs::id(owner)
        } else {
            Err(WalletError::InvalidAddress(format!(
                "{} is not an SPL token mint (owner {})",
                mint, owner
            )))
        }
    }

    async fn submit(
        &self,
        signer: &SolanaSigner,
        instructions: &[Instruction],
    ) -> WalletResult<TransactionReceipt> {
        let payer = signer.pubkey();
        let blockhash = self.latest_blockhash().await.map_err(classify_write_error)?;

        let message = Message::compile(instructions, &payer, blockhash)?;
        let tx = SignedSolanaTransaction::sign(&message, &[signer])?;
        let signature = tx.signature();

        match self
            .rpc
            .call(
                "sendTransaction",
                json!([
                    BASE64.encode(tx.serialize()),
                    {"encoding": "base64", "preflightCommitment": "confirmed"}
                ]),
            )
            .await
        {
            Ok(returned) => {
                if returned.as_str().map(|s| s != signature).unwrap_or(false) {
                    warn!(%signature, node_signature = ?returned, "node reported a different signature");
                }
            }
            Err(e) => {
                error!(from = %payer, "sendTransaction failed: {}", e);
                return Err(classify_broadcast_error(e, &signature));
            }
        }
        info!(%signature, from = %payer, "transaction broadcast");

        self.wait_for_confirmation(&signature).await
    }

    /// Polls `getSignatureStatuses` until the signature reaches `confirmed`
    /// or `finalized`, or `confirmation_timeout` runs out.
    pub async fn wait_for_confirmation(&self, signature: &str) -> WalletResult<TransactionReceipt> {
        let poll = async {
            loop {
                match self
                    .rpc
                    .call("getSignatureStatuses", json!([[signature]]))
                    .await
                {
                    Ok(result) => {
                        if let Some(status) = first_status(&result) {
                            let done = !status.get("err").map(Value::is_null).unwrap_or(true)
                                || matches!(
                                    status.get("confirmationStatus").and_then(Value::as_str),
                                    Some("confirmed") | Some("finalized")
                                );
                            if done {
                                return status.clone();
                            }
                        }
                    }
                    Err(e) => debug!(%signature, "status poll failed: {}", e),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let status = tokio::time::timeout(self.confirmation_timeout, poll)
            .await
            .map_err(|_| {
                warn!(%signature, "confirmation wait timed out");
                WalletError::ConfirmationTimeout {
                    hash: signature.to_string(),
                }
            })?;

        let slot = status.get("slot").and_then(Value::as_u64);
        match signature_status(&status) {
            TransactionStatus::Failed => {
                error!(%signature, err = %status["err"], "transaction failed on-chain");
                Err(WalletError::SubmissionFailed(format!(
                    "Transaction {} failed: {}",
                    signature, status["err"]
                )))
            }
            status => {
                info!(%signature, ?slot, "transaction confirmed");
                Ok(TransactionReceipt {
                    hash: signature.to_string(),
                    chain: Chain::Solana,
                    status,
                    block_number: slot,
                    explorer_url: Some(self.config.tx_url(signature)),
                })
            }
        }
    }

    async fn token_accounts(&self, owner: &Pubkey, program: &str) -> WalletResult<Vec<Value>> {
        let result = self
            .rpc
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    {"programId": program},
                    {"encoding": "jsonParsed", "commitment": "confirmed"}
                ]),
            )
            .await?;
        Ok(result
            .get("value")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ChainClient for SolanaClient {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    fn validate_address(&self, address: &str) -> AddressValidation {
        SolanaAddress::validate(address)
    }

    fn address_for_key(&self, private_key_hex: &str) -> WalletResult<String> {
        Ok(SolanaSigner::from_hex(private_key_hex)?.pubkey().to_string())
    }

    async fn get_native_balance(&self, address: &str) -> WalletResult<Balance> {
        let address = SolanaAddress::parse(address)?;
        let result = self
            .rpc
            .call("getBalance", json!([address.to_string(), {"commitment": "confirmed"}]))
            .await?;
        let lamports = result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| RpcError::Malformed(format!("expected lamports, got {}", result)))?;
        Ok(Balance::new(lamports.to_string(), self.config.decimals, &self.config.symbol))
    }

    async fn get_token_balances(&self, address: &str) -> WalletResult<Vec<TokenBalance>> {
        let owner = SolanaAddress::parse(address)?;
        let (classic, extended) = futures::try_join!(
            self.token_accounts(&owner, programs::TOKEN),
            self.token_accounts(&owner, programs::TOKEN_2022),
        )?;

        // One mint may be spread over several accounts.
        let mut held: Vec<(String, u128, u8)> = Vec::new();
        for account in classic.iter().chain(extended.iter()) {
            let Some(info) = account.pointer("/account/data/parsed/info") else {
                continue;
            };
            let Some(mint) = info.get("mint").and_then(Value::as_str) else {
                continue;
            };
            let amount = info
                .pointer("/tokenAmount/amount")
                .and_then(Value::as_str)
                .and_then(|a| a.parse::<u128>().ok());
            let decimals = info
                .pointer("/tokenAmount/decimals")
                .and_then(Value::as_u64)
                .and_then(|d| u8::try_from(d).ok());
            let (Some(amount), Some(decimals)) = (amount, decimals) else {
                warn!(%mint, "skipping token account with unreadable amount");
                continue;
            };

            match held.iter_mut().find(|(m, _, _)| m == mint) {
                Some(entry) => entry.1 = entry.1.saturating_add(amount),
                None => held.push((mint.to_string(), amount, decimals)),
            }
        }

        Ok(held
            .into_iter()
            .filter(|(_, amount, _)| *amount > 0)
            .map(|(mint, amount, decimals)| {
                let known = tokens::lookup(&mint);
                let symbol = known.map(|k| k.symbol.to_string());
                TokenBalance {
                    balance: Balance::new(amount.to_string(), decimals, symbol.clone().unwrap_or_default()),
                    token: TokenInfo {
                        address: mint,
                        symbol,
                        name: known.map(|k| k.name.to_string()),
                        decimals,
                        logo_url: None,
                        verified: known.is_some(),
                    },
                }
            })
            .collect())
    }

    async fn estimate_fee(&self, kind: TransferKind) -> WalletResult<FeeEstimate> {
        // Fees depend on the signer count, not on which accounts are used.
        let payer = Pubkey::new([1u8; 32]);
        let other = Pubkey::new([2u8; 32]);
        let instructions = match kind {
            TransferKind::Native => vec![system_transfer(&payer, &other, 1)],
            TransferKind::Token => {
                let token = programs::id(programs::TOKEN)?;
                vec![spl_transfer_checked(&token, &other, &other, &other, &payer, 1, 0)]
            }
        };

        let blockhash = self.latest_blockhash().await.map_err(classify_fee_error)?;
        let message = Message::compile(&instructions, &payer, blockhash)?;
        let lamports = self.fee_for_message(&message).await.map_err(classify_fee_error)?;
        let raw = lamports.to_string();

        Ok(FeeEstimate {
            chain: Chain::Solana,
            kind,
            fee_formatted: format_units(&raw, self.config.decimals),
            fee_raw: raw,
            fee_symbol: self.config.symbol.clone(),
            gas_limit: None,
            max_fee_per_gas: None,
            max_priority_fee: None,
        })
    }

    async fn send_native(
        &self,
        private_key_hex: &str,
        to: &str,
        amount: u128,
    ) -> WalletResult<TransactionReceipt> {
        let to = SolanaAddress::parse(to)?;
        let lamports = u64::try_from(amount)
            .map_err(|_| WalletError::InvalidAmount(format!("{} lamports exceeds u64", amount)))?;
        let signer = SolanaSigner::from_hex(private_key_hex)?;

        let ix = system_transfer(&signer.pubkey(), &to, lamports);
        self.submit(&signer, &[ix]).await
    }

    async fn send_token(
        &self,
        private_key_hex: &str,
        token: &str,
        to: &str,
        amount: &str,
        decimals: u8,
    ) -> WalletResult<TransactionReceipt> {
        let mint = SolanaAddress::parse(token)
            .map_err(|e| WalletError::InvalidAddress(format!("token mint: {}", e)))?;
        let recipient = SolanaAddress::parse(to)?;
        let base_units = parse_units(amount, decimals)?;
        let base_units = u64::try_from(base_units)
            .map_err(|_| WalletError::InvalidAmount(format!("{} exceeds the SPL amount range", amount)))?;
        let signer = SolanaSigner::from_hex(private_key_hex)?;
        let owner = signer.pubkey();

        let token_program = self.token_program_for_mint(&mint).await?;
        let source = SolanaAddress::associated_token_address(&owner, &mint, &token_program)?;
        let destination = SolanaAddress::associated_token_address(&recipient, &mint, &token_program)?;
        debug!(%source, %destination, %mint, "resolved associated token accounts");

        let instructions = [
            create_associated_token_account_idempotent(&owner, &destination, &recipient, &mint, &token_program)?,
            spl_transfer_checked(&token_program, &source, &mint, &destination, &owner, base_units, decimals),
        ];
        self.submit(&signer, &instructions).await
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> WalletResult<Vec<Transaction>> {
        let address = SolanaAddress::parse(address)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let result = self
            .rpc
            .call(
                "getSignaturesForAddress",
                json!([address.to_string(), {"limit": limit.min(MAX_SIGNATURES_PER_QUERY)}]),
            )
            .await?;

        Ok(result
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let hash = entry.get("signature")?.as_str()?.to_string();
                        Some(Transaction {
                            explorer_url: Some(self.config.tx_url(&hash)),
                            hash,
                            chain: Chain::Solana,
                            from: None,
                            to: None,
                            value: None,
                            symbol: None,
                            tx_type: TransactionType::Unknown,
                            status: signature_status(entry),
                            block_number: entry.get("slot").and_then(Value::as_u64),
                            timestamp: entry.get("blockTime").and_then(Value::as_i64),
                        })
                    })
                    .take(limit)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_transaction_status(&self, hash: &str) -> WalletResult<TransactionStatus> {
        let result = self
            .rpc
            .call(
                "getSignatureStatuses",
                json!([[hash], {"searchTransactionHistory": true}]),
            )
            .await?;
        Ok(first_status(&result)
            .map(signature_status)
            .unwrap_or(TransactionStatus::Unknown))
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn first_status(result: &Value) -> Option<&Value> {
    result
        .pointer("/value/0")
        .filter(|v| !v.is_null())
}

fn signature_status(status: &Value) -> TransactionStatus {
    if status.get("err").map(|e| !e.is_null()).unwrap_or(false) {
        return TransactionStatus::Failed;
    }
    match status.get("confirmationStatus").and_then(Value::as_str) {
        Some("confirmed") | Some("finalized") => TransactionStatus::Confirmed,
        Some(_) => TransactionStatus::Pending,
        None => TransactionStatus::Unknown,
    }
}

/// Maps a failed write using the preflight simulation message.
fn classify_write_error(err: RpcError) -> WalletError {
    if let RpcError::Transport(msg) = &err {
        return WalletError::ProviderUnavailable(msg.clone());
    }
    let message = err.message().to_string();
    let lower = message.to_lowercase();
    if lower.contains("insufficient")
        || lower.contains("no record of a prior credit")
        || lower.contains("custom program error: 0x1")
    {
        WalletError::InsufficientFunds(message)
    } else {
        WalletError::SubmissionFailed(message)
    }
}

/// A transport failure on the broadcast itself leaves the outcome open.
fn classify_broadcast_error(err: RpcError, signature: &str) -> WalletError {
    match err {
        RpcError::Transport(reason) => WalletError::BroadcastUnknown {
            hash: signature.to_string(),
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
