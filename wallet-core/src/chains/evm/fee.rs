// wallet-core/src/chains/evm/fee.rs
//
// Gas limits and EIP-1559 fee parameters.

use crate::network::models::TransferKind;
use alloy::primitives::U256;

/// Gas limit policy for a transfer kind. Swap in a simulating estimator
/// without touching transaction building.
pub trait GasEstimator: Send + Sync + std::fmt::Debug {
    fn gas_limit(&self, kind: TransferKind) -> u64;
}

/// 21000 for plain value transfers, a padded constant for ERC-20 `transfer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedGasEstimator {
    pub native: u64,
    pub token: u64,
}

impl FixedGasEstimator {
    pub const NATIVE_TRANSFER: u64 = 21_000;
    pub const TOKEN_TRANSFER: u64 = 65_000;
}

impl Default for FixedGasEstimator {
    fn default() -> Self {
        Self {
            native: Self::NATIVE_TRANSFER,
            token: Self::TOKEN_TRANSFER,
        }
    }
}

impl GasEstimator for FixedGasEstimator {
    fn gas_limit(&self, kind: TransferKind) -> u64 {
        match kind {
            TransferKind::Native => self.native,
            TransferKind::Token => self.token,
        }
    }
}

/// Used when the node does not implement `eth_maxPriorityFeePerGas`.
pub const DEFAULT_PRIORITY_FEE_WEI: u128 = 1_000_000_000;

/// Per-gas prices for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeParams {
    Eip1559 {
        max_fee_per_gas: u128,
        max_priority_fee_per_gas: u128,
    },
    /// Pre-London networks without `baseFeePerGas`.
    Legacy { gas_price: u128 },
}

impl FeeParams {
    /// maxFee = 2 * baseFee + priority
    pub fn from_base_fee(base_fee: u128, priority_fee: u128) -> Self {
        FeeParams::Eip1559 {
            max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority_fee),
            max_priority_fee_per_gas: priority_fee,
        }
    }

    /// Upper bound per gas unit.
    pub fn max_price(&self) -> u128 {
        match *self {
            FeeParams::Eip1559 { max_fee_per_gas, .. } => max_fee_per_gas,
            FeeParams::Legacy { gas_price } => gas_price,
        }
    }

    pub fn max_cost(&self, gas_limit: u64) -> U256 {
        U256::from(self.max_price()) * U256::from(gas_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_limits() {
        let est = FixedGasEstimator::default();
        assert_eq!(est.gas_limit(TransferKind::Native), 21_000);
        assert_eq!(est.gas_limit(TransferKind::Token), 65_000);
    }

    #[test]
    fn test_eip1559_max_fee() {
        let fee = FeeParams::from_base_fee(10_000_000_000, DEFAULT_PRIORITY_FEE_WEI);
        assert_eq!(
            fee,
            FeeParams::Eip1559 {
                max_fee_per_gas: 21_000_000_000,
                max_priority_fee_per_gas: 1_000_000_000,
            }
        );
        assert_eq!(fee.max_cost(21_000), U256::from(441_000_000_000_000u128));
    }

    #[test]
    fn test_legacy_cost() {
        let fee = FeeParams::Legacy { gas_price: 5 };
        assert_eq!(fee.max_cost(10), U256::from(50u64));
    }
}
