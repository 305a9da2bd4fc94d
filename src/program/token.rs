//! Associated token account provisioning.
//!
//! Derives ATAs and emits the minimal setup instructions a trade needs:
//! idempotent ATA creation and wrapped-native top-ups.

use solana_instruction::Instruction;
use solana_pubkey::Pubkey;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

use crate::program::accounts::token_account_amount;
use crate::program::config::PerpsConfig;
use crate::program::constants::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID};
use crate::program::error::{SdkError, SdkResult};
use crate::program::ledger::LedgerClient;

// ============================================================================
// Derivation
// ============================================================================

/// Get the Associated Token Address for a wallet and mint under a given ATA program.
///
/// Seeds: [wallet, token_program, mint]
pub fn get_associated_token_address(
    wallet: &Pubkey,
    mint: &Pubkey,
    token_program_id: &Pubkey,
    ata_program_id: &Pubkey,
) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), token_program_id.as_ref(), mint.as_ref()],
        ata_program_id,
    )
    .0
}

/// Derive the ATA of `owner` for `mint`.
///
/// Owners that are themselves PDAs (e.g. a position request) are off the
/// ed25519 curve and need `allow_owner_off_curve`.
pub fn derive_ata(
    mint: &Pubkey,
    owner: &Pubkey,
    allow_owner_off_curve: bool,
    token_program_id: &Pubkey,
) -> SdkResult<Pubkey> {
    if !allow_owner_off_curve && !owner.is_on_curve() {
        return Err(SdkError::OwnerOffCurve(*owner));
    }
    Ok(get_associated_token_address(
        owner,
        mint,
        token_program_id,
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    ))
}

// ============================================================================
// Instructions
// ============================================================================

/// Build an idempotent CreateAssociatedTokenAccount instruction.
///
/// Creates `owner`'s ATA for `mint` under `token_program_id`, paid by `payer`.
/// Succeeds without effect when the account already exists.
pub fn build_create_ata_idempotent_ix(
    payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program_id: &Pubkey,
) -> Instruction {
    create_associated_token_account_idempotent(payer, owner, mint, token_program_id)
}

/// Build a SyncNative instruction for a wrapped-native token account.
pub fn build_sync_native_ix(token_program_id: &Pubkey, account: &Pubkey) -> SdkResult<Instruction> {
    let ix = if *token_program_id == TOKEN_2022_PROGRAM_ID {
        spl_token_2022::instruction::sync_native(token_program_id, account)
    } else {
        spl_token::instruction::sync_native(token_program_id, account)
    };
    ix.map_err(|e| SdkError::InstructionBuild(format!("sync_native: {}", e)))
}

// ============================================================================
// Ledger-backed provisioning
// ============================================================================

/// Result of [`ensure_ata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsuredAta {
    pub ata: Pubkey,
    /// Token program the ATA was derived under
    pub token_program: Pubkey,
    /// Empty when the account already exists
    pub instructions: Vec<Instruction>,
}

/// Owning token program of `mint`.
///
/// Returns the mint's owner when it is a recognized token program and the
/// legacy token program otherwise, including when the mint cannot be fetched.
pub async fn detect_token_program_for_mint<L>(
    ledger: &L,
    config: &PerpsConfig,
    mint: &Pubkey,
) -> Pubkey
where
    L: LedgerClient + ?Sized,
{
    match ledger.get_account(mint).await {
        Ok(Some(account)) if config.is_token_program(&account.owner) => account.owner,
        Ok(Some(account)) => {
            tracing::debug!(%mint, owner = %account.owner, "mint owner is not a token program, assuming legacy");
            config.token_program_id
        }
        Ok(None) => {
            tracing::debug!(%mint, "mint account missing, assuming legacy token program");
            config.token_program_id
        }
        Err(e) => {
            tracing::warn!(%mint, error = %e, "mint fetch failed, assuming legacy token program");
            config.token_program_id
        }
    }
}

/// Make sure `owner`'s ATA for `mint` exists.
///
/// Returns one idempotent create instruction when the account is absent and
/// none when it exists. Replaying the create is harmless, so a whole
/// provisioning sequence can be retried after partial failure.
pub async fn ensure_ata<L>(
    ledger: &L,
    config: &PerpsConfig,
    mint: &Pubkey,
    owner: &Pubkey,
    payer: &Pubkey,
    allow_owner_off_curve: bool,
) -> SdkResult<EnsuredAta>
where
    L: LedgerClient + ?Sized,
{
    if !allow_owner_off_curve && !owner.is_on_curve() {
        return Err(SdkError::OwnerOffCurve(*owner));
    }

    let token_program = detect_token_program_for_mint(ledger, config, mint).await;
    let ata = get_associated_token_address(owner, mint, &token_program, &ASSOCIATED_TOKEN_PROGRAM_ID);

    let instructions = match ledger.get_account(&ata).await? {
        Some(_) => Vec::new(),
        None => {
            tracing::debug!(%ata, %owner, %mint, "ATA missing, adding idempotent create");
            vec![build_create_ata_idempotent_ix(payer, owner, mint, &token_program)]
        }
    };

    Ok(EnsuredAta {
        ata,
        token_program,
        instructions,
    })
}

/// Top up a wrapped-native ATA to `lamports_needed`.
///
/// Reads the current token balance (any read failure counts as zero) and,
/// when short, returns a system transfer of the difference followed by
/// SyncNative. Not idempotent: the delta is computed against the balance at
/// call time, so re-read before calling again for the same need. Only
/// instruction building can fail.
pub async fn top_up_wrapped_native_if_needed<L>(
    ledger: &L,
    config: &PerpsConfig,
    ata: &Pubkey,
    owner: &Pubkey,
    lamports_needed: u64,
) -> SdkResult<Vec<Instruction>>
where
    L: LedgerClient + ?Sized,
{
    let current = match ledger.get_account(ata).await {
        Ok(Some(account)) => token_account_amount(&account.data).unwrap_or_else(|e| {
            tracing::warn!(%ata, error = %e, "unreadable token balance, treating as zero");
            0
        }),
        Ok(None) => 0,
        Err(e) => {
            tracing::warn!(%ata, error = %e, "balance fetch failed, treating as zero");
            0
        }
    };

    let delta = lamports_needed.saturating_sub(current);
    if delta == 0 {
        return Ok(Vec::new());
    }

    tracing::debug!(%ata, current, lamports_needed, delta, "wrapping native top-up");
    Ok(vec![
        solana_system_interface::instruction::transfer(owner, ata, delta),
        build_sync_native_ix(&config.token_program_id, ata)?,
    ])
}
