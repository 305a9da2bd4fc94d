//! Account structures and deserialization for the perpetuals program.
//!
//! Every account type is a closed struct decoded from its exact byte layout:
//! an 8-byte discriminator followed by borsh fields. Trailing fields the
//! resolver does not use are left undecoded. Callers that fetch by address
//! must also check the owning program; the discriminator alone proves nothing.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_pubkey::Pubkey;

use crate::program::constants::{
    CUSTODY_DISCRIMINATOR, PERPETUALS_DISCRIMINATOR, POOL_DISCRIMINATOR,
    TOKEN_ACCOUNT_AMOUNT_OFFSET,
};
use crate::program::error::{SdkError, SdkResult};

/// Check the discriminator and borsh-decode the fields that follow it.
///
/// Decoding stops after the last declared field; trailing bytes are ignored.
fn decode_account<T: BorshDeserialize>(
    name: &'static str,
    data: &[u8],
    discriminator: &[u8; 8],
) -> SdkResult<T> {
    if data.len() < 8 {
        return Err(SdkError::InvalidDataLength {
            expected: 8,
            actual: data.len(),
        });
    }
    if data[0..8] != discriminator[..] {
        return Err(SdkError::InvalidDiscriminator {
            expected: hex::encode(discriminator),
            actual: hex::encode(&data[0..8]),
        });
    }
    let mut body = &data[8..];
    T::deserialize(&mut body).map_err(|e| SdkError::Serialization(format!("{} account: {}", name, e)))
}

/// Discriminator followed by the borsh encoding of `value`.
fn encode_account<T: BorshSerialize>(discriminator: &[u8; 8], value: &T) -> SdkResult<Vec<u8>> {
    let mut buf = discriminator.to_vec();
    value
        .serialize(&mut buf)
        .map_err(|e| SdkError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Whether `data` starts with `discriminator`.
pub fn has_discriminator(data: &[u8], discriminator: &[u8; 8]) -> bool {
    data.len() >= 8 && data[0..8] == discriminator[..]
}

// ============================================================================
// Perpetuals Account (global state)
// ============================================================================

/// Program-wide switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Permissions {
    pub allow_swap: bool,
    pub allow_add_liquidity: bool,
    pub allow_remove_liquidity: bool,
    pub allow_increase_position: bool,
    pub allow_decrease_position: bool,
    pub allow_collateral_withdrawal: bool,
    pub allow_liquidate_position: bool,
}

/// Perpetuals account - singleton deployment-wide state
///
/// Layout:
/// - [0..8]   discriminator
/// - pools: Vec<Pubkey> (u32 length + 32 * n)
/// - permissions (7 bools)
/// - admin (32 bytes)
/// - transfer_authority_bump (1 byte)
/// - perpetuals_bump (1 byte)
/// - inception_time (i64)
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Perpetuals {
    pub pools: Vec<Pubkey>,
    pub permissions: Permissions,
    pub admin: Pubkey,
    pub transfer_authority_bump: u8,
    pub perpetuals_bump: u8,
    pub inception_time: i64,
}

impl Perpetuals {
    /// Type name used in logs and errors
    pub const NAME: &'static str = "Perpetuals";
    pub const DISCRIMINATOR: [u8; 8] = PERPETUALS_DISCRIMINATOR;

    /// Deserialize from account data
    pub fn deserialize(data: &[u8]) -> SdkResult<Self> {
        decode_account(Self::NAME, data, &PERPETUALS_DISCRIMINATOR)
    }

    /// Serialize to account data
    pub fn serialize(&self) -> SdkResult<Vec<u8>> {
        encode_account(&PERPETUALS_DISCRIMINATOR, self)
    }
}

// ============================================================================
// Pool Account
// ============================================================================

/// Pool account - aggregates the custodies available for trading
///
/// Layout (prefix):
/// - [0..8]   discriminator
/// - name: String (u32 length + utf-8)
/// - custodies: Vec<Pubkey> (u32 length + 32 * n)
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Pool {
    pub name: String,
    /// Custody accounts in program order
    pub custodies: Vec<Pubkey>,
}

impl Pool {
    pub const NAME: &'static str = "Pool";
    pub const DISCRIMINATOR: [u8; 8] = POOL_DISCRIMINATOR;

    /// Deserialize from account data
    pub fn deserialize(data: &[u8]) -> SdkResult<Self> {
        decode_account(Self::NAME, data, &POOL_DISCRIMINATOR)
    }

    /// Serialize to account data
    pub fn serialize(&self) -> SdkResult<Vec<u8>> {
        encode_account(&POOL_DISCRIMINATOR, self)
    }
}

// ============================================================================
// Custody Account
// ============================================================================

/// Oracle configuration of a custody.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OracleParams {
    pub oracle_account: Pubkey,
    pub oracle_type: u8,
    pub buffer: u8,
    pub max_price_age_sec: u32,
}

/// Custody account - one tradable/collateral asset of a pool
///
/// Layout (prefix):
/// - [0..8]     discriminator
/// - [8..40]    pool
/// - [40..72]   mint
/// - [72..104]  token_account
/// - [104]      decimals
/// - [105]      is_stable
/// - [106..138] oracle.oracle_account
/// - [138]      oracle.oracle_type
/// - [139]      oracle.buffer
/// - [140..144] oracle.max_price_age_sec
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CustodyAccount {
    pub pool: Pubkey,
    pub mint: Pubkey,
    pub token_account: Pubkey,
    pub decimals: u8,
    pub is_stable: bool,
    pub oracle: OracleParams,
}

impl CustodyAccount {
    pub const NAME: &'static str = "Custody";
    pub const DISCRIMINATOR: [u8; 8] = CUSTODY_DISCRIMINATOR;
    /// Bytes covered by the decoded prefix
    pub const PREFIX_LEN: usize = 144;

    /// Deserialize from account data
    pub fn deserialize(data: &[u8]) -> SdkResult<Self> {
        decode_account(Self::NAME, data, &CUSTODY_DISCRIMINATOR)
    }

    /// Serialize to account data
    pub fn serialize(&self) -> SdkResult<Vec<u8>> {
        encode_account(&CUSTODY_DISCRIMINATOR, self)
    }
}

/// A custody resolved against the ledger: its address, decoded state and
/// the token program owning its mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Custody {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub decimals: u8,
    pub token_program: Pubkey,
    pub account: CustodyAccount,
}

// ============================================================================
// SPL Token Account
// ============================================================================

/// Read the token amount of an SPL (legacy or 2022) token account.
///
/// Layout: [0..32] mint, [32..64] owner, [64..72] amount (u64 LE), ...
pub fn token_account_amount(data: &[u8]) -> SdkResult<u64> {
    let end = TOKEN_ACCOUNT_AMOUNT_OFFSET + 8;
    if data.len() < end {
        return Err(SdkError::InvalidDataLength {
            expected: end,
            actual: data.len(),
        });
    }
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&data[TOKEN_ACCOUNT_AMOUNT_OFFSET..end]);
    Ok(u64::from_le_bytes(arr))
}
