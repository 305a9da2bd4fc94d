//! Type definitions for the perpetuals on-chain program.
//!
//! This module contains protocol enums, the remaining-account unit and the
//! parameter structs used for instruction building.

use std::fmt;
use std::str::FromStr;

use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};
use solana_instruction::AccountMeta;
use solana_pubkey::Pubkey;

use crate::program::error::SdkError;

// ============================================================================
// Enums
// ============================================================================

/// Position side. The byte values are a protocol contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Side {
    #[default]
    Long = 1,
    Short = 2,
}

impl Side {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

impl BorshSerialize for Side {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&[self.as_byte()])
    }
}

impl TryFrom<u8> for Side {
    type Error = SdkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Side::Long),
            2 => Ok(Side::Short),
            _ => Err(SdkError::InvalidSide(value.to_string())),
        }
    }
}

impl FromStr for Side {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            _ => Err(SdkError::InvalidSide(s.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a position request. The byte values are a protocol contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum RequestChange {
    #[default]
    Increase = 1,
    Decrease = 2,
}

impl RequestChange {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestChange::Increase => "increase",
            RequestChange::Decrease => "decrease",
        }
    }
}

impl TryFrom<u8> for RequestChange {
    type Error = SdkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RequestChange::Increase),
            2 => Ok(RequestChange::Decrease),
            _ => Err(SdkError::InvalidRequestChange(value.to_string())),
        }
    }
}

impl FromStr for RequestChange {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "increase" => Ok(RequestChange::Increase),
            "decrease" => Ok(RequestChange::Decrease),
            _ => Err(SdkError::InvalidRequestChange(s.to_string())),
        }
    }
}

impl fmt::Display for RequestChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule for choosing among several accounts of a singleton type.
///
/// Ledger scans give no ordering guarantee, so `FirstReturned` is only as
/// stable as the backend. `LowestAddress` is stable across backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    #[default]
    FirstReturned,
    LowestAddress,
}

impl FromStr for TieBreak {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first-returned" => Ok(TieBreak::FirstReturned),
            "lowest" | "lowest-address" => Ok(TieBreak::LowestAddress),
            _ => Err(SdkError::InvalidTieBreak(s.to_string())),
        }
    }
}

/// Market type, deciding which dynamic accounts a trade needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarketKind {
    /// No dynamic accounts.
    #[default]
    Standard,
    /// Custody oracle accounts are passed as remaining accounts.
    DynamicOracle,
}

// ============================================================================
// Remaining Accounts
// ============================================================================

/// One auxiliary account passed positionally after the fixed account list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainingAccount {
    pub address: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl RemainingAccount {
    pub fn readonly(address: Pubkey) -> Self {
        Self {
            address,
            is_signer: false,
            is_writable: false,
        }
    }
}

impl From<RemainingAccount> for AccountMeta {
    fn from(account: RemainingAccount) -> Self {
        if account.is_writable {
            AccountMeta::new(account.address, account.is_signer)
        } else {
            AccountMeta::new_readonly(account.address, account.is_signer)
        }
    }
}

// ============================================================================
// Parameter Structs
// ============================================================================

/// Inputs for [`build_remaining_accounts`](crate::program::build_remaining_accounts).
#[derive(Debug, Clone)]
pub struct RemainingAccountsParams {
    /// Program ID of the trading program
    pub program_id: Pubkey,
    /// Market identifier (e.g. "SOL-PERP")
    pub market: String,
    /// Market type
    pub market_kind: MarketKind,
    pub side: Side,
    pub pool: Pubkey,
    /// Perpetuals (global state) account
    pub perpetuals: Pubkey,
    pub custody: Pubkey,
    pub collateral_custody: Pubkey,
    pub owner: Pubkey,
    pub position: Pubkey,
    pub position_request: Pubkey,
    /// ATA funding the request
    pub funding_account: Pubkey,
    pub input_mint: Pubkey,
    /// Size delta in quote units (6 decimals)
    pub size_usd_delta: Option<u64>,
    /// Collateral delta in quote units (6 decimals)
    pub collateral_usd_delta: Option<u64>,
}

/// Accounts shared by increase and decrease position request instructions.
#[derive(Debug, Clone)]
pub struct PositionRequestAccounts {
    pub owner: Pubkey,
    /// Funding ATA (increase) or receiving ATA (decrease)
    pub user_token_account: Pubkey,
    pub perpetuals: Pubkey,
    pub pool: Pubkey,
    pub position: Pubkey,
    pub position_request: Pubkey,
    pub position_request_ata: Pubkey,
    pub custody: Pubkey,
    pub collateral_custody: Pubkey,
    /// Input mint (increase) or desired mint (decrease)
    pub mint: Pubkey,
    /// Referral account; the owner is used when absent
    pub referral: Option<Pubkey>,
    pub token_program: Pubkey,
    pub associated_token_program: Pubkey,
    pub event_authority: Pubkey,
}

/// Parameters for createIncreasePositionMarketRequest, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct IncreasePositionRequestParams {
    /// Size delta in USD (6 decimals)
    pub size_usd_delta: u64,
    /// Collateral delta in input token atoms
    pub collateral_token_delta: u64,
    pub side: Side,
    /// Maximum (long) or minimum (short) acceptable price, USD 6 decimals
    pub price_slippage: u64,
    pub jupiter_minimum_out: Option<u64>,
    pub counter: u64,
}

/// Parameters for createDecreasePositionMarketRequest, in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct DecreasePositionRequestParams {
    /// Collateral to withdraw in USD (6 decimals)
    pub collateral_usd_delta: u64,
    /// Size delta in USD (6 decimals)
    pub size_usd_delta: u64,
    pub price_slippage: u64,
    pub jupiter_minimum_out: Option<u64>,
    pub entire_position: Option<bool>,
    pub counter: u64,
}
