//! Program state resolution.
//!
//! Locates the singleton Perpetuals and Pool accounts through a ledger scan
//! and resolves the custodies a pool references. Every call re-reads the
//! ledger; nothing is cached between calls.

use solana_pubkey::Pubkey;

use crate::program::accounts::{Custody, CustodyAccount, Perpetuals, Pool};
use crate::program::config::PerpsConfig;
use crate::program::error::{ResolutionWarning, SdkError, SdkResult};
use crate::program::ledger::{KeyedAccount, LedgerClient};
use crate::program::token::detect_token_program_for_mint;
use crate::program::types::TieBreak;

/// A singleton account selected from a program scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Singleton<T> {
    pub address: Pubkey,
    pub account: T,
    /// Number of accounts the scan returned
    pub candidates: usize,
    /// Set when `candidates > 1`
    pub warning: Option<ResolutionWarning>,
}

/// Result of [`find_custody_by_mint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyMatch {
    pub custody: Custody,
    /// Set when more than one custody holds the mint
    pub warning: Option<ResolutionWarning>,
}

fn select_candidate(candidates: &[KeyedAccount], tie_break: TieBreak) -> Option<&KeyedAccount> {
    match tie_break {
        TieBreak::FirstReturned => candidates.first(),
        TieBreak::LowestAddress => candidates.iter().min_by_key(|k| k.address),
    }
}

async fn resolve_singleton<L, T>(
    ledger: &L,
    config: &PerpsConfig,
    name: &'static str,
    discriminator: &[u8; 8],
    decode: fn(&[u8]) -> SdkResult<T>,
) -> SdkResult<Singleton<T>>
where
    L: LedgerClient + ?Sized,
{
    let candidates = ledger
        .get_program_accounts(&config.program_id, discriminator)
        .await?;

    let selected = select_candidate(&candidates, config.singleton_tie_break).ok_or(
        SdkError::MissingSingletonAccount {
            account: name,
            program_id: config.program_id,
        },
    )?;

    let warning = if candidates.len() > 1 {
        let warning = ResolutionWarning::AmbiguousSingletonAccount {
            account: name,
            candidates: candidates.len(),
            selected: selected.address,
        };
        tracing::warn!(
            account = name,
            candidates = candidates.len(),
            selected = %selected.address,
            tie_break = ?config.singleton_tie_break,
            "{}",
            warning
        );
        Some(warning)
    } else {
        None
    };

    let account = decode(&selected.account.data)?;
    tracing::debug!(account = name, address = %selected.address, "resolved singleton");

    Ok(Singleton {
        address: selected.address,
        account,
        candidates: candidates.len(),
        warning,
    })
}

/// Resolve the deployment's Pool account.
///
/// Zero pools is fatal. More than one is tolerated: a warning is logged and
/// attached, and the configured tie-break picks the pool.
pub async fn resolve_singleton_pool<L>(ledger: &L, config: &PerpsConfig) -> SdkResult<Singleton<Pool>>
where
    L: LedgerClient + ?Sized,
{
    resolve_singleton(
        ledger,
        config,
        Pool::NAME,
        &Pool::DISCRIMINATOR,
        Pool::deserialize,
    )
    .await
}

/// Resolve the Perpetuals (global state) account, same rules as the pool.
pub async fn resolve_singleton_global_state<L>(
    ledger: &L,
    config: &PerpsConfig,
) -> SdkResult<Singleton<Perpetuals>>
where
    L: LedgerClient + ?Sized,
{
    resolve_singleton(
        ledger,
        config,
        Perpetuals::NAME,
        &Perpetuals::DISCRIMINATOR,
        Perpetuals::deserialize,
    )
    .await
}

/// Fetch a custody account and decode it, rejecting accounts the program
/// does not own.
pub(crate) async fn fetch_custody_account<L>(
    ledger: &L,
    program_id: &Pubkey,
    address: &Pubkey,
) -> SdkResult<CustodyAccount>
where
    L: LedgerClient + ?Sized,
{
    let raw = ledger
        .get_account(address)
        .await?
        .ok_or_else(|| SdkError::AccountNotFound(format!("{} {}", CustodyAccount::NAME, address)))?;
    if raw.owner != *program_id {
        return Err(SdkError::InvalidAccountOwner {
            account: CustodyAccount::NAME,
            address: *address,
            expected: *program_id,
            actual: raw.owner,
        });
    }
    CustodyAccount::deserialize(&raw.data)
}

/// Fetch and decode one custody account.
pub async fn resolve_custody<L>(
    ledger: &L,
    config: &PerpsConfig,
    address: &Pubkey,
) -> SdkResult<Custody>
where
    L: LedgerClient + ?Sized,
{
    let account = fetch_custody_account(ledger, &config.program_id, address).await?;
    let token_program = detect_token_program_for_mint(ledger, config, &account.mint).await;

    Ok(Custody {
        address: *address,
        mint: account.mint,
        decimals: account.decimals,
        token_program,
        account,
    })
}

/// Resolve every custody the pool references, in pool order.
pub async fn resolve_custodies<L>(
    ledger: &L,
    config: &PerpsConfig,
    pool: &Pool,
) -> SdkResult<Vec<Custody>>
where
    L: LedgerClient + ?Sized,
{
    let mut custodies = Vec::with_capacity(pool.custodies.len());
    for address in &pool.custodies {
        custodies.push(resolve_custody(ledger, config, address).await?);
    }
    tracing::debug!(pool = %pool.name, count = custodies.len(), "resolved custodies");
    Ok(custodies)
}

/// Find the pool's custody for `mint`.
///
/// When several custodies hold the mint the first in pool order wins and a
/// warning is logged and attached.
pub async fn find_custody_by_mint<L>(
    ledger: &L,
    config: &PerpsConfig,
    pool_address: &Pubkey,
    pool: &Pool,
    mint: &Pubkey,
) -> SdkResult<CustodyMatch>
where
    L: LedgerClient + ?Sized,
{
    let custodies = resolve_custodies(ledger, config, pool).await?;
    let mut matching = custodies.into_iter().filter(|c| c.mint == *mint);

    let custody = matching.next().ok_or(SdkError::MintNotFoundInPool {
        mint: *mint,
        pool: *pool_address,
    })?;
    let extra = matching.count();

    let warning = if extra > 0 {
        let warning = ResolutionWarning::AmbiguousCustodyMint {
            mint: *mint,
            matches: extra + 1,
            selected: custody.address,
        };
        tracing::warn!(%mint, pool = %pool_address, "{}", warning);
        Some(warning)
    } else {
        None
    };

    Ok(CustodyMatch { custody, warning })
}
