//! Network URL constants for the perps resolver.

/// Default mainnet RPC URL.
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Default devnet RPC URL.
pub const DEVNET_RPC_URL: &str = "https://api.devnet.solana.com";
