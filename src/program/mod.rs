//! On-chain program interaction module for the perpetuals program.
//!
//! Address derivation, account decoding, singleton resolution, remaining
//! accounts, token account provisioning and instruction building.

pub mod accounts;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod instructions;
pub mod ledger;
pub mod pda;
pub mod remaining;
pub mod resolver;
pub mod token;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use accounts::{Custody, CustodyAccount, OracleParams, Perpetuals, Permissions, Pool};
pub use client::{
    DecreasePositionRequest, IncreasePositionRequest, PerpsClient, PreparedPositionRequest,
};
pub use config::PerpsConfig;
pub use constants::*;
pub use error::{ResolutionWarning, SdkError, SdkResult};
pub use instructions::*;
#[cfg(feature = "solana-rpc")]
pub use ledger::RpcLedgerClient;
pub use ledger::{InMemoryLedger, KeyedAccount, LedgerAccount, LedgerClient};
pub use pda::*;
pub use remaining::{build_remaining_accounts, RemainingAccounts};
pub use resolver::{
    find_custody_by_mint, resolve_custodies, resolve_custody, resolve_singleton_global_state,
    resolve_singleton_pool, CustodyMatch, Singleton,
};
pub use token::{
    build_create_ata_idempotent_ix, build_sync_native_ix, derive_ata,
    detect_token_program_for_mint, ensure_ata, get_associated_token_address,
    top_up_wrapped_native_if_needed, EnsuredAta,
};
pub use types::*;
pub use utils::*;
