//! PDA (Program Derived Address) derivation functions.
//!
//! This module provides all PDA derivation functions matching the on-chain program.
//! Every function is pure and safe to call from any thread.

use solana_pubkey::Pubkey;

use crate::program::constants::{
    CUSTODY_SEED, EVENT_AUTHORITY_SEED, PERPETUALS_SEED, POSITION_REQUEST_SEED, POSITION_SEED,
};
use crate::program::error::SdkResult;
use crate::program::types::{RequestChange, Side};
use crate::program::utils::{counter_seed, parse_address};

/// Get a Position PDA.
///
/// Seeds: ["position", owner, pool, custody, collateral_custody, side (1 byte)]
pub fn get_position_pda(
    owner: &Pubkey,
    pool: &Pubkey,
    custody: &Pubkey,
    collateral_custody: &Pubkey,
    side: Side,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            POSITION_SEED,
            owner.as_ref(),
            pool.as_ref(),
            custody.as_ref(),
            collateral_custody.as_ref(),
            &[side.as_byte()],
        ],
        program_id,
    )
}

/// Get a Position Request PDA.
///
/// Seeds: ["position_request", position, counter (8 bytes LE), request_change (1 byte)]
pub fn get_position_request_pda(
    position: &Pubkey,
    counter: u64,
    request_change: RequestChange,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            POSITION_REQUEST_SEED,
            position.as_ref(),
            &counter_seed(counter),
            &[request_change.as_byte()],
        ],
        program_id,
    )
}

/// Get the Perpetuals (global state) PDA.
///
/// Seeds: ["perpetuals"]
pub fn get_perpetuals_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[PERPETUALS_SEED], program_id)
}

/// Get a Custody PDA.
///
/// Seeds: ["custody", pool, mint]
pub fn get_custody_pda(pool: &Pubkey, mint: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CUSTODY_SEED, pool.as_ref(), mint.as_ref()], program_id)
}

/// Get the Anchor event authority PDA.
///
/// Seeds: ["__event_authority"]
pub fn get_event_authority_pda(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[EVENT_AUTHORITY_SEED], program_id)
}

/// Collection of all PDA derivation functions for convenient access.
pub struct Pda;

impl Pda {
    /// Get a Position PDA.
    pub fn position(
        owner: &Pubkey,
        pool: &Pubkey,
        custody: &Pubkey,
        collateral_custody: &Pubkey,
        side: Side,
        program_id: &Pubkey,
    ) -> (Pubkey, u8) {
        get_position_pda(owner, pool, custody, collateral_custody, side, program_id)
    }

    /// Get a Position Request PDA.
    pub fn position_request(
        position: &Pubkey,
        counter: u64,
        request_change: RequestChange,
        program_id: &Pubkey,
    ) -> (Pubkey, u8) {
        get_position_request_pda(position, counter, request_change, program_id)
    }

    /// Get the Perpetuals PDA.
    pub fn perpetuals(program_id: &Pubkey) -> (Pubkey, u8) {
        get_perpetuals_pda(program_id)
    }

    /// Get a Custody PDA.
    pub fn custody(pool: &Pubkey, mint: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
        get_custody_pda(pool, mint, program_id)
    }

    /// Get the event authority PDA.
    pub fn event_authority(program_id: &Pubkey) -> (Pubkey, u8) {
        get_event_authority_pda(program_id)
    }
}

// ============================================================================
// AddressDeriver
// ============================================================================

/// Position and request derivation bound to one program id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressDeriver {
    program_id: Pubkey,
}

impl AddressDeriver {
    pub fn new(program_id: Pubkey) -> Self {
        Self { program_id }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    /// Derive the position address for an (owner, pool, custody, collateral, side) tuple.
    pub fn position(
        &self,
        owner: &Pubkey,
        pool: &Pubkey,
        custody: &Pubkey,
        collateral_custody: &Pubkey,
        side: Side,
    ) -> Pubkey {
        let (position, _) =
            get_position_pda(owner, pool, custody, collateral_custody, side, &self.program_id);
        tracing::debug!(%owner, %pool, %custody, %collateral_custody, %side, %position, "derived position");
        position
    }

    /// Derive a position request address.
    ///
    /// An omitted counter defaults to zero. Zero is a documented default, not
    /// the next free counter for the position; callers tracking in-flight
    /// requests must pass their own value. Returns the address together with
    /// the counter actually used.
    pub fn position_request(
        &self,
        position: &Pubkey,
        request_change: RequestChange,
        counter: Option<u64>,
    ) -> (Pubkey, u64) {
        let counter = counter.unwrap_or(0);
        let (request, _) =
            get_position_request_pda(position, counter, request_change, &self.program_id);
        tracing::debug!(%position, %request_change, counter, %request, "derived position request");
        (request, counter)
    }

    /// [`position`](Self::position) over base58 inputs, each validated and
    /// named in the error when malformed.
    pub fn position_from_str(
        &self,
        owner: &str,
        pool: &str,
        custody: &str,
        collateral_custody: &str,
        side: Side,
    ) -> SdkResult<Pubkey> {
        let owner = parse_address("wallet", owner)?;
        let pool = parse_address("pool", pool)?;
        let custody = parse_address("custody", custody)?;
        let collateral_custody = parse_address("collateral", collateral_custody)?;
        Ok(self.position(&owner, &pool, &custody, &collateral_custody, side))
    }

    /// [`position_request`](Self::position_request) over a base58 position.
    pub fn position_request_from_str(
        &self,
        position: &str,
        request_change: RequestChange,
        counter: Option<u64>,
    ) -> SdkResult<(Pubkey, u64)> {
        let position = parse_address("position", position)?;
        Ok(self.position_request(&position, request_change, counter))
    }

    pub fn perpetuals(&self) -> Pubkey {
        get_perpetuals_pda(&self.program_id).0
    }

    pub fn event_authority(&self) -> Pubkey {
        get_event_authority_pda(&self.program_id).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::error::SdkError;
    use std::str::FromStr;

    fn test_program_id() -> Pubkey {
        Pubkey::from_str("PERPHjGBqRHArX4DySjwM6UJHiR3sWAatqfdBS2qQJu").unwrap()
    }

    struct Fixture {
        owner: Pubkey,
        pool: Pubkey,
        custody: Pubkey,
        collateral: Pubkey,
    }

    fn fixture() -> Fixture {
        Fixture {
            owner: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            custody: Pubkey::new_unique(),
            collateral: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_position_pda_is_deterministic() {
        let program_id = test_program_id();
        let f = fixture();

        let (pda1, bump1) =
            get_position_pda(&f.owner, &f.pool, &f.custody, &f.collateral, Side::Long, &program_id);
        let (pda2, bump2) =
            get_position_pda(&f.owner, &f.pool, &f.custody, &f.collateral, Side::Long, &program_id);

        assert_eq!(pda1, pda2);
        assert_eq!(bump1, bump2);
    }

    #[test]
    fn test_position_pda_matches_manual_seeds() {
        let program_id = test_program_id();
        let f = fixture();

        let expected = Pubkey::find_program_address(
            &[
                b"position",
                f.owner.as_ref(),
                f.pool.as_ref(),
                f.custody.as_ref(),
                f.collateral.as_ref(),
                &[1u8],
            ],
            &program_id,
        );

        assert_eq!(
            get_position_pda(&f.owner, &f.pool, &f.custody, &f.collateral, Side::Long, &program_id),
            expected
        );
    }

    #[test]
    fn test_sides_produce_different_positions() {
        let program_id = test_program_id();
        let f = fixture();

        let (long, _) =
            get_position_pda(&f.owner, &f.pool, &f.custody, &f.collateral, Side::Long, &program_id);
        let (short, _) =
            get_position_pda(&f.owner, &f.pool, &f.custody, &f.collateral, Side::Short, &program_id);

        assert_ne!(long, short);
    }

    #[test]
    fn test_every_position_field_changes_the_address() {
        let program_id = test_program_id();
        let f = fixture();
        let other = Pubkey::new_unique();
        let (base, _) =
            get_position_pda(&f.owner, &f.pool, &f.custody, &f.collateral, Side::Long, &program_id);

        let variants = [
            get_position_pda(&other, &f.pool, &f.custody, &f.collateral, Side::Long, &program_id),
            get_position_pda(&f.owner, &other, &f.custody, &f.collateral, Side::Long, &program_id),
            get_position_pda(&f.owner, &f.pool, &other, &f.collateral, Side::Long, &program_id),
            get_position_pda(&f.owner, &f.pool, &f.custody, &other, Side::Long, &program_id),
        ];
        for (pda, _) in variants {
            assert_ne!(pda, base);
        }

        let (other_program, _) = get_position_pda(
            &f.owner,
            &f.pool,
            &f.custody,
            &f.collateral,
            Side::Long,
            &Pubkey::new_unique(),
        );
        assert_ne!(other_program, base);
    }

    #[test]
    fn test_position_request_counters_differ() {
        let program_id = test_program_id();
        let position = Pubkey::new_unique();

        let (req0, _) = get_position_request_pda(&position, 0, RequestChange::Increase, &program_id);
        let (req1, _) = get_position_request_pda(&position, 1, RequestChange::Increase, &program_id);

        assert_ne!(req0, req1);
    }

    #[test]
    fn test_position_request_change_differs() {
        let program_id = test_program_id();
        let position = Pubkey::new_unique();

        let (inc, _) = get_position_request_pda(&position, 7, RequestChange::Increase, &program_id);
        let (dec, _) = get_position_request_pda(&position, 7, RequestChange::Decrease, &program_id);

        assert_ne!(inc, dec);
    }

    #[test]
    fn test_position_request_matches_manual_seeds() {
        let program_id = test_program_id();
        let position = Pubkey::new_unique();

        let expected = Pubkey::find_program_address(
            &[
                b"position_request",
                position.as_ref(),
                &[0, 1, 0, 0, 0, 0, 0, 0],
                &[2u8],
            ],
            &program_id,
        );

        assert_eq!(
            get_position_request_pda(&position, 256, RequestChange::Decrease, &program_id),
            expected
        );
    }

    #[test]
    fn test_deriver_defaults_counter_to_zero() {
        let deriver = AddressDeriver::new(test_program_id());
        let position = Pubkey::new_unique();

        let (implicit, used) = deriver.position_request(&position, RequestChange::Increase, None);
        let (explicit, _) = deriver.position_request(&position, RequestChange::Increase, Some(0));

        assert_eq!(used, 0);
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn test_deriver_from_str_names_bad_field() {
        let deriver = AddressDeriver::new(test_program_id());
        let f = fixture();

        let err = deriver
            .position_from_str(
                &f.owner.to_string(),
                &f.pool.to_string(),
                "not_base58!",
                &f.collateral.to_string(),
                Side::Long,
            )
            .unwrap_err();

        assert!(matches!(err, SdkError::InvalidAddressFormat { ref field, .. } if field == "custody"));
    }

    #[test]
    fn test_deriver_from_str_matches_typed() {
        let deriver = AddressDeriver::new(test_program_id());
        let f = fixture();

        let typed = deriver.position(&f.owner, &f.pool, &f.custody, &f.collateral, Side::Short);
        let text = deriver
            .position_from_str(
                &f.owner.to_string(),
                &f.pool.to_string(),
                &f.custody.to_string(),
                &f.collateral.to_string(),
                Side::Short,
            )
            .unwrap();

        assert_eq!(typed, text);
    }

    #[test]
    fn test_singleton_pdas() {
        let program_id = test_program_id();
        let deriver = AddressDeriver::new(program_id);

        assert_eq!(deriver.perpetuals(), Pda::perpetuals(&program_id).0);
        assert_eq!(deriver.event_authority(), Pda::event_authority(&program_id).0);
        assert_ne!(deriver.perpetuals(), deriver.event_authority());
    }

    #[test]
    fn test_custody_pda() {
        let program_id = test_program_id();
        let pool = Pubkey::new_unique();
        let sol = Pubkey::new_unique();
        let usdc = Pubkey::new_unique();

        assert_eq!(
            Pda::custody(&pool, &sol, &program_id),
            get_custody_pda(&pool, &sol, &program_id)
        );
        assert_ne!(
            get_custody_pda(&pool, &sol, &program_id).0,
            get_custody_pda(&pool, &usdc, &program_id).0
        );
    }
}
