// wallet-core/src/chains/amount.rs
//
// Decimal string <-> integer base units (wei, lamports, token atoms).

use alloy::primitives::utils::{self, UnitsError};
use alloy::primitives::U256;
use tracing::debug;

use crate::error::{WalletError, WalletResult};

/// `"1.5"` with 9 decimals -> `1_500_000_000`.
///
/// Rejects negatives, exponents, empty input, more fractional digits than
/// `decimals`, and values that do not fit in `u128`. The scaling itself is
/// alloy's.
pub fn parse_units(amount: &str, decimals: u8) -> WalletResult<u128> {
    let amount = amount.trim();
    let invalid = |why: &str| WalletError::InvalidAmount(format!("'{}': {}", amount, why));

    if amount.is_empty() {
        return Err(invalid("empty amount"));
    }

    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid("no digits"));
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid("only digits and one '.' are allowed"));
    }
    if frac_part.len() > decimals as usize {
        return Err(invalid(&format!("more than {} decimal places", decimals)));
    }

    // ".25" and "7." in the form alloy expects
    let int_part = if int_part.is_empty() { "0" } else { int_part };
    let normalized = if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    };

    let scaled = utils::parse_units(&normalized, decimals).map_err(|e| match e {
        UnitsError::InvalidUnit(_) => invalid("decimals too large"),
        _ => invalid("too large"),
    })?;
    u128::try_from(scaled.get_absolute()).map_err(|_| invalid("too large"))
}

/// Formats an integer amount given as decimal digits, trimming trailing
/// zeros: `("1500000000", 9)` -> `"1.5"`. Input that is not a `U256` in
/// decimal comes back unchanged.
pub fn format_units(raw: &str, decimals: u8) -> String {
    let value = match U256::from_str_radix(raw, 10) {
        Ok(v) => v,
        Err(e) => {
            debug!(raw, "not a decimal amount: {}", e);
            return raw.to_string();
        }
    };
    match utils::format_units(value, decimals) {
        Ok(text) if text.contains('.') => {
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        Ok(text) => text,
        Err(e) => {
            debug!(raw, decimals, "cannot scale amount: {}", e);
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("1.5", 9).unwrap(), 1_500_000_000);
        assert_eq!(parse_units("0.000000001", 9).unwrap(), 1);
        assert_eq!(parse_units("1", 18).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse_units(".25", 6).unwrap(), 250_000);
        assert_eq!(parse_units("7.", 2).unwrap(), 700);
        assert_eq!(parse_units(" 42 ", 0).unwrap(), 42);
    }

    #[test]
    fn test_parse_units_rejects_bad_input() {
        for bad in ["", ".", "-1", "1e5", "1.2.3", "abc", "1,5"] {
            assert!(
                matches!(parse_units(bad, 9), Err(WalletError::InvalidAmount(_))),
                "accepted {:?}",
                bad
            );
        }
        assert!(parse_units("0.0000000001", 9).is_err());
        assert!(parse_units("999999999999999999999999999999999999999", 18).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units("1500000000", 9), "1.5");
        assert_eq!(format_units("1", 9), "0.000000001");
        assert_eq!(format_units("0", 18), "0");
        assert_eq!(format_units("1000000000000000000", 18), "1");
        assert_eq!(format_units("123", 0), "123");
        assert_eq!(format_units("000120", 2), "1.2");
        assert_eq!(format_units("1000", 2), "10");
        assert_eq!(format_units("0x10", 2), "0x10");
    }
}
