//! Error types for the perpetuals on-chain program module.

use std::fmt;

use solana_pubkey::Pubkey;
use thiserror::Error;

/// SDK-specific errors
#[derive(Debug, Error)]
pub enum SdkError {
    /// Malformed base58 input for a named field
    #[error("Invalid address for `{field}` ({preview}): {reason}")]
    InvalidAddressFormat {
        field: String,
        preview: String,
        reason: String,
    },

    /// No account of a singleton type exists for the program
    #[error("Missing singleton account: no {account} account found for program {program_id}")]
    MissingSingletonAccount {
        account: &'static str,
        program_id: Pubkey,
    },

    /// The pool has no custody for the requested mint
    #[error("Mint {mint} not found in pool {pool}")]
    MintNotFoundInPool { mint: Pubkey, pool: Pubkey },

    /// Ledger read failed (network, timeout, RPC error)
    #[error("Ledger fetch failed: {0}")]
    LedgerFetch(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Account is not owned by the expected program
    #[error("Invalid owner for {account} {address}: expected {expected}, got {actual}")]
    InvalidAccountOwner {
        account: &'static str,
        address: Pubkey,
        expected: Pubkey,
        actual: Pubkey,
    },

    /// Invalid account discriminator
    #[error("Invalid account discriminator: expected {expected}, got {actual}")]
    InvalidDiscriminator {
        expected: String,
        actual: String,
    },

    /// Invalid data length
    #[error("Invalid data length: expected {expected}, got {actual}")]
    InvalidDataLength {
        expected: usize,
        actual: usize,
    },

    /// Invalid side value
    #[error("Invalid side: {0} (expected long or short)")]
    InvalidSide(String),

    /// Invalid request change value
    #[error("Invalid request change: {0} (expected increase or decrease)")]
    InvalidRequestChange(String),

    /// Counter is not an unsigned 64-bit decimal
    #[error("Invalid counter: {0}")]
    InvalidCounter(String),

    /// Unknown singleton tie-break rule
    #[error("Invalid tie-break rule: {0} (expected first or lowest-address)")]
    InvalidTieBreak(String),

    /// ATA owner is not on the ed25519 curve and off-curve owners were not allowed
    #[error("Token owner {0} is off curve")]
    OwnerOffCurve(Pubkey),

    /// Arithmetic overflow
    #[error("Arithmetic overflow")]
    Overflow,

    /// An instruction could not be built
    #[error("Instruction build failed: {0}")]
    InstructionBuild(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Scaling error (UI amount conversion)
    #[error("Scaling error: {0}")]
    Scaling(#[from] crate::shared::scaling::ScalingError),
}

/// Result type alias for SDK operations
pub type SdkResult<T> = Result<T, SdkError>;

/// Non-fatal conditions observed during resolution.
///
/// These never abort a call; they travel with the result and are logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionWarning {
    /// More than one account of a singleton type was found.
    AmbiguousSingletonAccount {
        account: &'static str,
        candidates: usize,
        selected: Pubkey,
    },
    /// More than one custody in the pool holds the same mint.
    AmbiguousCustodyMint {
        mint: Pubkey,
        matches: usize,
        selected: Pubkey,
    },
    /// A custody records a different pool than the one resolved.
    CustodyPoolMismatch {
        custody: Pubkey,
        custody_pool: Pubkey,
        pool: Pubkey,
    },
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionWarning::AmbiguousSingletonAccount {
                account,
                candidates,
                selected,
            } => write!(
                f,
                "Ambiguous singleton: {} {} accounts found, selected {}",
                candidates, account, selected
            ),
            ResolutionWarning::AmbiguousCustodyMint {
                mint,
                matches,
                selected,
            } => write!(
                f,
                "Ambiguous custody: {} custodies hold mint {}, selected {}",
                matches, mint, selected
            ),
            ResolutionWarning::CustodyPoolMismatch {
                custody,
                custody_pool,
                pool,
            } => write!(
                f,
                "Custody {} belongs to pool {}, not resolved pool {}",
                custody, custody_pool, pool
            ),
        }
    }
}
