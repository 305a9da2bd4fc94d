//! # Perps Resolver
//!
//! Address derivation and instruction-account resolution for a perpetuals
//! trading program on Solana.
//!
//! ## Architecture
//!
//! The crate is organized in layers:
//!
//! 1. **Core**: PDAs, account layouts, instruction builders (pure, always available)
//! 2. **Ledger**: the `LedgerClient` trait, an in-memory ledger and, with
//!    the `solana-rpc` feature, an RPC-backed client
//! 3. **Resolution**: singleton pool/global-state lookup, custodies, remaining
//!    accounts and token account provisioning
//! 4. **Client**: `PerpsClient`, which runs the whole flow for a position request
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use perps_resolver::prelude::*;
//!
//! let config = PerpsConfig::from_env()?;
//! let client = PerpsClient::new(RpcLedgerClient::from_config(&config), config);
//!
//! let pool = client.resolve_pool().await?;
//! let position = client.deriver().position(&owner, &pool.address, &custody, &collateral, Side::Long);
//! ```

/// On-chain program interaction: PDAs, accounts, resolution, instructions.
pub mod program;

/// Amount scaling.
pub mod shared;

/// Network URL constants.
pub mod network;

// ── Prelude ──────────────────────────────────────────────────────────────────

pub mod prelude {
    pub use crate::program::{
        AddressDeriver, Custody, DecreasePositionRequest, EnsuredAta, IncreasePositionRequest,
        InMemoryLedger, LedgerClient, MarketKind, PerpsClient, PerpsConfig, Pool,
        PreparedPositionRequest, RemainingAccount, RemainingAccountsParams, RequestChange,
        ResolutionWarning, SdkError, SdkResult, Side, Singleton, TieBreak,
    };

    #[cfg(feature = "solana-rpc")]
    pub use crate::program::RpcLedgerClient;

    pub use crate::network::{DEFAULT_RPC_URL, DEVNET_RPC_URL};
    pub use crate::shared::{scale_ui_amount, usd_to_scaled};
}
