//! Utility functions for the perps resolver.
//!
//! Address/counter parsing for text inputs and the little-endian encoders used
//! by seeds and instruction data.

use solana_pubkey::Pubkey;

use crate::program::constants::ADDRESS_PREVIEW_LEN;
use crate::program::error::{SdkError, SdkResult};

// ============================================================================
// Text Inputs
// ============================================================================

/// Truncated echo of a bad input, safe to put in an error message.
pub fn address_preview(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.chars().count() <= ADDRESS_PREVIEW_LEN {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(ADDRESS_PREVIEW_LEN).collect();
    format!("{}…", head)
}

/// Parse a base58 address, naming `field` in the error.
///
/// Rejects empty input, characters outside the base58 alphabet and inputs
/// that do not decode to exactly 32 bytes.
pub fn parse_address(field: &str, value: &str) -> SdkResult<Pubkey> {
    let invalid = |reason: String| SdkError::InvalidAddressFormat {
        field: field.to_string(),
        preview: address_preview(value),
        reason,
    };

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty value".to_string()));
    }

    let bytes = bs58::decode(trimmed)
        .into_vec()
        .map_err(|e| invalid(e.to_string()))?;

    let array: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| invalid(format!("decoded to {} bytes, expected 32", bytes.len())))?;

    Ok(Pubkey::new_from_array(array))
}

/// Parse an optional decimal counter; absent or blank means zero.
pub fn parse_counter(value: Option<&str>) -> SdkResult<u64> {
    match value.map(str::trim) {
        None | Some("") => Ok(0),
        Some(text) => text
            .parse::<u64>()
            .map_err(|e| SdkError::InvalidCounter(format!("{:?}: {}", text, e))),
    }
}

// ============================================================================
// Byte Encoding
// ============================================================================

/// 8-byte little-endian counter, as used in the position request seed.
pub fn counter_seed(counter: u64) -> [u8; 8] {
    counter.to_le_bytes()
}
