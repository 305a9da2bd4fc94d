//! Conversion of human-readable amounts to raw integer atoms.
//!
//! All math uses `rust_decimal::Decimal`, so no value passes through a float.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::program::constants::USD_DECIMALS;

/// Errors that can occur during amount scaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalingError {
    NegativeAmount(String),
    Overflow { context: String },
    FractionalAmount { value: String },
    InvalidDecimal { input: String, reason: String },
}

impl fmt::Display for ScalingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingError::NegativeAmount(v) => write!(f, "Amount must not be negative, got {}", v),
            ScalingError::Overflow { context } => write!(f, "Overflow: {}", context),
            ScalingError::FractionalAmount { value } => {
                write!(f, "Fractional atoms not allowed: {}", value)
            }
            ScalingError::InvalidDecimal { input, reason } => {
                write!(f, "Invalid decimal '{}': {}", input, reason)
            }
        }
    }
}

impl std::error::Error for ScalingError {}

/// Parse a decimal string such as `"12.5"`.
pub fn parse_ui_amount(input: &str) -> Result<Decimal, ScalingError> {
    Decimal::from_str(input.trim()).map_err(|e| ScalingError::InvalidDecimal {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Convert a UI amount into raw atoms: `amount * 10^decimals`.
///
/// Rejects negative amounts, results with a fractional part (more precision
/// than the mint supports) and results that do not fit a `u64`.
pub fn scale_ui_amount(amount: Decimal, decimals: u8) -> Result<u64, ScalingError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ScalingError::NegativeAmount(amount.to_string()));
    }

    let multiplier = 10u64
        .checked_pow(decimals as u32)
        .map(Decimal::from)
        .ok_or_else(|| ScalingError::Overflow {
            context: format!("10^{} overflow", decimals),
        })?;

    let scaled = amount
        .checked_mul(multiplier)
        .ok_or_else(|| ScalingError::Overflow {
            context: format!("{} * 10^{}", amount, decimals),
        })?;

    if !scaled.fract().is_zero() {
        return Err(ScalingError::FractionalAmount {
            value: scaled.normalize().to_string(),
        });
    }

    scaled.to_u64().ok_or_else(|| ScalingError::Overflow {
        context: format!("{} does not fit u64", scaled),
    })
}

/// Convert a USD amount into the program's 6-decimal quote units.
pub fn usd_to_scaled(usd: Decimal) -> Result<u64, ScalingError> {
    scale_ui_amount(usd, USD_DECIMALS)
}

/// Convert raw atoms back into a UI amount.
pub fn atoms_to_ui_amount(atoms: u64, decimals: u8) -> Result<Decimal, ScalingError> {
    Decimal::try_from_i128_with_scale(atoms as i128, decimals as u32)
        .map(|d| d.normalize())
        .map_err(|e| ScalingError::Overflow {
            context: format!("{} atoms at {} decimals: {}", atoms, decimals, e),
        })
}
