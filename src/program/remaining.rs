//! Remaining accounts for position request instructions.
//!
//! The trading program indexes this list positionally, so order and flags
//! are part of the instruction's contract.

use solana_instruction::AccountMeta;
use solana_pubkey::Pubkey;

use crate::program::error::SdkResult;
use crate::program::ledger::LedgerClient;
use crate::program::resolver::fetch_custody_account;
use crate::program::types::{MarketKind, RemainingAccount, RemainingAccountsParams};

/// Ordered, deduplicating list of remaining accounts.
///
/// An address keeps the position of its first insertion; adding it again
/// widens its flags (signer/writable are OR-ed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemainingAccounts {
    accounts: Vec<RemainingAccount>,
}

impl RemainingAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, address: Pubkey, is_signer: bool, is_writable: bool) {
        match self.accounts.iter_mut().find(|a| a.address == address) {
            Some(existing) => {
                existing.is_signer |= is_signer;
                existing.is_writable |= is_writable;
            }
            None => self.accounts.push(RemainingAccount {
                address,
                is_signer,
                is_writable,
            }),
        }
    }

    pub fn push_readonly(&mut self, address: Pubkey) {
        self.push(address, false, false);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn as_slice(&self) -> &[RemainingAccount] {
        &self.accounts
    }

    pub fn into_vec(self) -> Vec<RemainingAccount> {
        self.accounts
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        self.accounts.iter().copied().map(AccountMeta::from).collect()
    }
}

async fn custody_oracle<L>(ledger: &L, program_id: &Pubkey, custody: &Pubkey) -> SdkResult<Pubkey>
where
    L: LedgerClient + ?Sized,
{
    let account = fetch_custody_account(ledger, program_id, custody).await?;
    Ok(account.oracle.oracle_account)
}

/// Build the remaining accounts for a position request.
///
/// Standard markets need none. Dynamic-oracle markets pass the oracle of the
/// base custody, then of the collateral custody, both read-only. Both
/// custodies must be owned by `params.program_id`. Identical
/// params at a fixed ledger state always give the same list.
pub async fn build_remaining_accounts<L>(
    ledger: &L,
    params: &RemainingAccountsParams,
) -> SdkResult<Vec<RemainingAccount>>
where
    L: LedgerClient + ?Sized,
{
    let mut accounts = RemainingAccounts::new();

    match params.market_kind {
        MarketKind::Standard => {}
        MarketKind::DynamicOracle => {
            let base_oracle = custody_oracle(ledger, &params.program_id, &params.custody).await?;
            let collateral_oracle =
                custody_oracle(ledger, &params.program_id, &params.collateral_custody).await?;
            accounts.push_readonly(base_oracle);
            accounts.push_readonly(collateral_oracle);
        }
    }

    tracing::debug!(
        market = %params.market,
        kind = ?params.market_kind,
        side = %params.side,
        count = accounts.len(),
        "built remaining accounts"
    );

    Ok(accounts.into_vec())
}
