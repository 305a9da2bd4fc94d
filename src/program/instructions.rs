//! Instruction builders for position requests.
//!
//! Fixed accounts come first in program order; remaining accounts are
//! appended after them unchanged.

use borsh::BorshSerialize;
use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;

use crate::program::constants::{instruction, SYSTEM_PROGRAM_ID};
use crate::program::error::{SdkError, SdkResult};
use crate::program::types::{
    DecreasePositionRequestParams, IncreasePositionRequestParams, PositionRequestAccounts,
    RemainingAccount,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// Create an account meta for a signer+writable account.
fn signer_mut(pubkey: Pubkey) -> AccountMeta {
    AccountMeta::new(pubkey, true)
}

/// Create an account meta for a writable account.
fn writable(pubkey: Pubkey) -> AccountMeta {
    AccountMeta::new(pubkey, false)
}

/// Create an account meta for a read-only account.
fn readonly(pubkey: Pubkey) -> AccountMeta {
    AccountMeta::new_readonly(pubkey, false)
}

/// Anchor instruction data: discriminator followed by borsh args.
fn instruction_data<T: BorshSerialize>(discriminator: &[u8; 8], args: &T) -> SdkResult<Vec<u8>> {
    let mut data = discriminator.to_vec();
    args.serialize(&mut data)
        .map_err(|e| SdkError::Serialization(e.to_string()))?;
    Ok(data)
}

fn request_keys(
    accounts: &PositionRequestAccounts,
    position_writable: bool,
    remaining: &[RemainingAccount],
    program_id: &Pubkey,
) -> Vec<AccountMeta> {
    let position = if position_writable {
        writable(accounts.position)
    } else {
        readonly(accounts.position)
    };

    let mut keys = vec![
        signer_mut(accounts.owner),
        writable(accounts.user_token_account),
        readonly(accounts.perpetuals),
        readonly(accounts.pool),
        position,
        writable(accounts.position_request),
        writable(accounts.position_request_ata),
        readonly(accounts.custody),
        readonly(accounts.collateral_custody),
        readonly(accounts.mint),
        readonly(accounts.referral.unwrap_or(accounts.owner)),
        readonly(accounts.token_program),
        readonly(accounts.associated_token_program),
        readonly(SYSTEM_PROGRAM_ID),
        readonly(accounts.event_authority),
        readonly(*program_id),
    ];
    keys.extend(remaining.iter().copied().map(AccountMeta::from));
    keys
}

// ============================================================================
// Instruction Builders
// ============================================================================

/// Build CreateIncreasePositionMarketRequest instruction.
///
/// Accounts:
/// 0. owner (signer, mut)
/// 1. funding_account (mut) - owner's ATA for the input mint
/// 2. perpetuals (readonly)
/// 3. pool (readonly)
/// 4. position (mut)
/// 5. position_request (mut)
/// 6. position_request_ata (mut)
/// 7. custody (readonly)
/// 8. collateral_custody (readonly)
/// 9. input_mint (readonly)
/// 10. referral (readonly)
/// 11. token_program (readonly)
/// 12. associated_token_program (readonly)
/// 13. system_program (readonly)
/// 14. event_authority (readonly)
/// 15. program (readonly)
/// 16.. remaining accounts
pub fn build_increase_position_market_request_ix(
    accounts: &PositionRequestAccounts,
    params: &IncreasePositionRequestParams,
    remaining: &[RemainingAccount],
    program_id: &Pubkey,
) -> SdkResult<Instruction> {
    // Data: [discriminator (8), size_usd_delta, collateral_token_delta, side (u8),
    //        price_slippage, jupiter_minimum_out (Option<u64>), counter]
    let data = instruction_data(&instruction::CREATE_INCREASE_POSITION_MARKET_REQUEST, params)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: request_keys(accounts, true, remaining, program_id),
        data,
    })
}

/// Build CreateDecreasePositionMarketRequest instruction.
///
/// Same account list as the increase request, except `user_token_account`
/// receives the proceeds, `mint` is the desired output mint and `position`
/// is read-only.
pub fn build_decrease_position_market_request_ix(
    accounts: &PositionRequestAccounts,
    params: &DecreasePositionRequestParams,
    remaining: &[RemainingAccount],
    program_id: &Pubkey,
) -> SdkResult<Instruction> {
    let data = instruction_data(&instruction::CREATE_DECREASE_POSITION_MARKET_REQUEST, params)?;

    Ok(Instruction {
        program_id: *program_id,
        accounts: request_keys(accounts, false, remaining, program_id),
        data,
    })
}
