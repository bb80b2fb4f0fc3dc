// wallet-core/src/network/models.rs
//
// Chain-agnostic data returned across the service boundary.
// All structs serialize camelCase for the UI side.

use crate::chains::amount::format_units;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CHAIN IDENTIFICATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Solana,
}

impl Chain {
    pub const ALL: [Chain; 2] = [Chain::Ethereum, Chain::Solana];

    pub fn native_symbol(self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH",
            Chain::Solana => "SOL",
        }
    }

    /// wei / lamports
    pub fn native_decimals(self) -> u8 {
        match self {
            Chain::Ethereum => 18,
            Chain::Solana => 9,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Chain::Ethereum => f.write_str("ethereum"),
            Chain::Solana => f.write_str("solana"),
        }
    }
}

// =============================================================================
// BALANCE & ASSETS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Base units as decimal digits (string to avoid overflow)
    pub raw: String,
    /// Human-readable, e.g. "1.5"
    pub formatted: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Balance {
    pub fn new(raw: impl Into<String>, decimals: u8, symbol: impl Into<String>) -> Self {
        let raw = raw.into();
        let formatted = format_units(&raw, decimals);
        Self {
            raw,
            formatted,
            symbol: symbol.into(),
            decimals,
        }
    }

    pub fn zero(symbol: impl Into<String>, decimals: u8) -> Self {
        Self::new("0", decimals, symbol)
    }

    pub fn is_zero(&self) -> bool {
        self.raw.chars().all(|c| c == '0')
    }
}

/// ERC-20 contract or SPL mint.
///
/// `symbol` / `name` stay `None` when nothing authoritative is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub decimals: u8,
    pub logo_url: Option<String>,
    /// From a curated list rather than on-chain metadata
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token: TokenInfo,
    /// Raw and formatted amount; `symbol` is empty when the token has none.
    pub balance: Balance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub chain: Chain,
    pub address: String,
    pub native: Balance,
    pub tokens: Vec<TokenBalance>,
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
    /// The node does not know the transaction (dropped or never seen)
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    Send,
    Receive,
    TokenTransfer,
    Unknown,
}

/// What a fee is being estimated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Native,
    Token,
}

/// History entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub chain: Chain,
    pub from: Option<String>,
    pub to: Option<String>,
    /// Human-readable amount when the source reports one
    pub value: Option<String>,
    pub symbol: Option<String>,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub block_number: Option<u64>,
    /// Unix seconds
    pub timestamp: Option<i64>,
    pub explorer_url: Option<String>,
}

/// Result of a confirmed submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Ethereum tx hash or Solana signature
    pub hash: String,
    pub chain: Chain,
    pub status: TransactionStatus,
    /// Block number (Ethereum) or slot (Solana)
    pub block_number: Option<u64>,
    pub explorer_url: Option<String>,
}

// =============================================================================
// FEE ESTIMATION
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeEstimate {
    pub chain: Chain,
    pub kind: TransferKind,
    /// Native base units
    pub fee_raw: String,
    pub fee_formatted: String,
    pub fee_symbol: String,
    // === EVM only ===
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<String>,
    pub max_priority_fee: Option<String>,
}

// =============================================================================
// ADDRESS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressValidation {
    pub is_valid: bool,
    /// EIP-55 checksum form for Ethereum, the input for Solana
    pub normalized: Option<String>,
    pub error: Option<String>,
}

impl AddressValidation {
    pub fn valid(normalized: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            normalized: Some(normalized.into()),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            normalized: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_formatting() {
        let b = Balance::new("1500000000", 9, "SOL");
        assert_eq!(b.formatted, "1.5");
        assert!(!b.is_zero());
        assert!(Balance::zero("ETH", 18).is_zero());
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(AddressValidation::invalid("bad")).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(serde_json::to_value(Chain::Solana).unwrap(), "solana");
        assert_eq!(serde_json::to_value(TransferKind::Token).unwrap(), "token");
    }
}
