//! Deployment configuration.
//!
//! A [`PerpsConfig`] is built once at startup and passed by reference into
//! every component, so tests and other networks can swap any id.

use std::env;
use std::str::FromStr;

use solana_pubkey::Pubkey;

use crate::network::DEFAULT_RPC_URL;
use crate::program::constants::{
    NATIVE_MINT, PROGRAM_ID, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID, USDC_MINT,
};
use crate::program::error::SdkResult;
use crate::program::types::TieBreak;
use crate::program::utils::parse_address;

/// Environment variable overriding the program id.
pub const ENV_PROGRAM_ID: &str = "PERPS_PROGRAM_ID";
/// Environment variable overriding the RPC URL.
pub const ENV_RPC_URL: &str = "PERPS_RPC_URL";
/// Environment variable selecting the singleton tie-break rule.
pub const ENV_TIE_BREAK: &str = "PERPS_TIE_BREAK";

/// Program ids, well-known mints and resolution policy for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerpsConfig {
    /// Perpetuals program ID
    pub program_id: Pubkey,
    /// Legacy SPL Token program
    pub token_program_id: Pubkey,
    /// Token-2022 program
    pub token_2022_program_id: Pubkey,
    /// Wrapped native asset mint
    pub native_mint: Pubkey,
    /// Stable quote mint
    pub usdc_mint: Pubkey,
    pub rpc_url: String,
    pub singleton_tie_break: TieBreak,
}

impl PerpsConfig {
    /// Mainnet deployment.
    pub fn mainnet() -> Self {
        Self::new(*PROGRAM_ID)
    }

    /// Mainnet token programs and mints with a custom program id.
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            token_program_id: TOKEN_PROGRAM_ID,
            token_2022_program_id: TOKEN_2022_PROGRAM_ID,
            native_mint: NATIVE_MINT,
            usdc_mint: *USDC_MINT,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            singleton_tie_break: TieBreak::default(),
        }
    }

    /// Mainnet defaults overridden by `PERPS_PROGRAM_ID`, `PERPS_RPC_URL`
    /// and `PERPS_TIE_BREAK` when set.
    pub fn from_env() -> SdkResult<Self> {
        let mut config = Self::mainnet();

        if let Ok(value) = env::var(ENV_PROGRAM_ID) {
            config.program_id = parse_address(ENV_PROGRAM_ID, &value)?;
        }
        if let Ok(value) = env::var(ENV_RPC_URL) {
            if !value.trim().is_empty() {
                config.rpc_url = value.trim().to_string();
            }
        }
        if let Ok(value) = env::var(ENV_TIE_BREAK) {
            config.singleton_tie_break = TieBreak::from_str(&value)?;
        }

        tracing::debug!(program_id = %config.program_id, rpc_url = %config.rpc_url, "loaded perps config");
        Ok(config)
    }

    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.singleton_tie_break = tie_break;
        self
    }

    pub fn with_usdc_mint(mut self, mint: Pubkey) -> Self {
        self.usdc_mint = mint;
        self
    }

    /// Whether `program` is one of the two recognized token programs.
    pub fn is_token_program(&self, program: &Pubkey) -> bool {
        *program == self.token_program_id || *program == self.token_2022_program_id
    }

    /// Parse a program id supplied as text, keeping the field name in errors.
    pub fn parse_program_id(value: &str) -> SdkResult<Pubkey> {
        parse_address("program_id", value)
    }
}

impl Default for PerpsConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}
