//! Constants for the perpetuals program.
//!
//! This module contains program IDs, seeds, discriminators and layout offsets
//! matching the on-chain program exactly. Nothing here is read directly by the
//! resolution logic; values flow through [`PerpsConfig`](crate::program::PerpsConfig).

use solana_pubkey::Pubkey;
use std::str::FromStr;

// ============================================================================
// Program IDs
// ============================================================================

lazy_static::lazy_static! {
    /// Mainnet perpetuals program ID
    pub static ref PROGRAM_ID: Pubkey = Pubkey::from_str("PERPHjGBqRHArX4DySjwM6UJHiR3sWAatqfdBS2qQJu").unwrap();

    /// Mainnet USDC mint
    pub static ref USDC_MINT: Pubkey = Pubkey::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").unwrap();
}

/// SPL Token Program ID
pub const TOKEN_PROGRAM_ID: Pubkey = spl_token::ID;

/// Token-2022 Program ID
pub const TOKEN_2022_PROGRAM_ID: Pubkey = spl_token_2022::ID;

/// Associated Token Account Program ID
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = spl_associated_token_account::ID;

/// Wrapped SOL mint
pub const NATIVE_MINT: Pubkey = spl_token::native_mint::ID;

/// System Program ID
pub const SYSTEM_PROGRAM_ID: Pubkey = solana_sdk_ids::system_program::ID;

// ============================================================================
// PDA Seeds
// ============================================================================

/// Position PDA seed
pub const POSITION_SEED: &[u8] = b"position";
/// Position request PDA seed
pub const POSITION_REQUEST_SEED: &[u8] = b"position_request";
/// Perpetuals (global state) PDA seed
pub const PERPETUALS_SEED: &[u8] = b"perpetuals";
/// Custody PDA seed
pub const CUSTODY_SEED: &[u8] = b"custody";
/// Anchor event authority PDA seed
pub const EVENT_AUTHORITY_SEED: &[u8] = b"__event_authority";

// ============================================================================
// Account Discriminators (8 bytes each, sha256("account:<Name>") prefix)
// ============================================================================

/// Perpetuals account discriminator
pub const PERPETUALS_DISCRIMINATOR: [u8; 8] = [0x1c, 0xa7, 0x62, 0xbf, 0x68, 0x52, 0x6c, 0xc4];
/// Pool account discriminator
pub const POOL_DISCRIMINATOR: [u8; 8] = [0xf1, 0x9a, 0x6d, 0x04, 0x11, 0xb1, 0x6d, 0xbc];
/// Custody account discriminator
pub const CUSTODY_DISCRIMINATOR: [u8; 8] = [0x01, 0xb8, 0x30, 0x51, 0x5d, 0x83, 0x3f, 0x91];

// ============================================================================
// Instruction Discriminators (8 bytes each, sha256("global:<name>") prefix)
// ============================================================================

/// Instruction discriminators
pub mod instruction {
    pub const CREATE_INCREASE_POSITION_MARKET_REQUEST: [u8; 8] =
        [0xb8, 0x55, 0xc7, 0x18, 0x69, 0xab, 0x9c, 0x38];
    pub const CREATE_DECREASE_POSITION_MARKET_REQUEST: [u8; 8] =
        [0x4a, 0xc6, 0xc3, 0x56, 0xc1, 0x63, 0x01, 0x4f];
}

// ============================================================================
// Layout
// ============================================================================

/// Offset of the u64 amount inside an SPL token account
pub const TOKEN_ACCOUNT_AMOUNT_OFFSET: usize = 64;
/// Minimum SPL token account size
pub const TOKEN_ACCOUNT_SIZE: usize = 165;
/// Quote (USD) decimals used by size/collateral deltas
pub const USD_DECIMALS: u8 = 6;
/// Maximum characters of a bad input echoed back in errors
pub const ADDRESS_PREVIEW_LEN: usize = 12;
