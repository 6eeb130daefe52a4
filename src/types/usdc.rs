//! Conversions between human USDC amounts and on-chain units.

use crate::{constants::USDC_DECIMALS, error::GatewayError};
use alloy::primitives::U256;
use rust_decimal::Decimal;

/// Converts a USDC amount (e.g. `1.5`) into smallest units (e.g. `1_500_000`).
///
/// Fails if the amount is negative or carries more precision than the token supports.
pub fn to_units(amount: Decimal) -> Result<U256, GatewayError> {
    if amount.is_sign_negative() {
        return Err(GatewayError::InvalidParameters(format!("negative amount {amount}")));
    }

    let mut scaled = amount.normalize();
    if scaled.scale() > USDC_DECIMALS {
        return Err(GatewayError::InvalidParameters(format!(
            "amount {amount} has more than {USDC_DECIMALS} decimals"
        )));
    }
    // rescale silently keeps a smaller scale when the mantissa would overflow
    scaled.rescale(USDC_DECIMALS);
    if scaled.scale() != USDC_DECIMALS {
        return Err(GatewayError::InvalidParameters(format!("amount {amount} out of range")));
    }

    // mantissa is the value scaled by 10^USDC_DECIMALS now
    let units = u128::try_from(scaled.mantissa())
        .map_err(|_| GatewayError::InvalidParameters(format!("amount {amount} out of range")))?;
    Ok(U256::from(units))
}

/// Converts smallest units back into a USDC amount.
pub fn from_units(units: U256) -> Result<Decimal, GatewayError> {
    let units: i128 = units
        .try_into()
        .map_err(|_| GatewayError::InvalidParameters(format!("{units} units out of range")))?;
    Decimal::try_from_i128_with_scale(units, USDC_DECIMALS)
        .map(|amount| amount.normalize())
        .map_err(|err| GatewayError::InvalidParameters(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn converts_whole_and_fractional_amounts() {
        assert_eq!(to_units(Decimal::from(1000)).unwrap(), U256::from(1_000_000_000u64));
        assert_eq!(to_units(Decimal::from_str("2.01").unwrap()).unwrap(), U256::from(2_010_000));
        assert_eq!(to_units(Decimal::from_str("0.000001").unwrap()).unwrap(), U256::from(1));
        assert_eq!(to_units(Decimal::ZERO).unwrap(), U256::ZERO);
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        assert_eq!(
            to_units(Decimal::from_str("1.500000000").unwrap()).unwrap(),
            U256::from(1_500_000)
        );
    }

    #[test]
    fn rejects_excess_precision_and_negatives() {
        assert!(to_units(Decimal::from_str("0.0000001").unwrap()).is_err());
        assert!(to_units(Decimal::from(-1)).is_err());
    }

    #[test]
    fn rejects_amounts_too_large_to_scale() {
        let amount = Decimal::from_str("100000000000000000000000").unwrap();
        let err = to_units(amount).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParameters(_)));

        let largest = Decimal::from_str("10000000000000000000000").unwrap();
        assert_eq!(
            to_units(largest).unwrap(),
            U256::from(10u128.pow(22)) * U256::from(1_000_000)
        );
    }

    #[test]
    fn units_back_to_amount() {
        assert_eq!(from_units(U256::from(2_010_000)).unwrap(), Decimal::from_str("2.01").unwrap());
        assert!(from_units(U256::MAX).is_err());
    }
}
