//! Async client for preparing perpetuals position requests.
//!
//! [`PerpsClient`] bundles a [`LedgerClient`] with a [`PerpsConfig`] and
//! exposes the resolution, provisioning and instruction building steps, plus
//! orchestration that runs them in order.
//!
//! # Read skew
//!
//! The pool, custody, mint and balance reads behind one `prepare_*` call are
//! independent ledger requests with no snapshot isolation. During rapid
//! on-chain changes a result may combine a newer pool with an older custody
//! or balance. Callers needing a consistent view must re-run the whole call
//! and compare, or simulate the resulting transaction before sending.

use solana_instruction::Instruction;
use solana_pubkey::Pubkey;

use crate::program::accounts::{Custody, Perpetuals, Pool};
use crate::program::config::PerpsConfig;
use crate::program::constants::ASSOCIATED_TOKEN_PROGRAM_ID;
use crate::program::error::{ResolutionWarning, SdkResult};
use crate::program::instructions::{
    build_decrease_position_market_request_ix, build_increase_position_market_request_ix,
};
use crate::program::ledger::LedgerClient;
use crate::program::pda::AddressDeriver;
use crate::program::remaining::build_remaining_accounts;
use crate::program::resolver::{self, CustodyMatch, Singleton};
use crate::program::token::{self, derive_ata, EnsuredAta};
use crate::program::types::{
    DecreasePositionRequestParams, IncreasePositionRequestParams, MarketKind,
    PositionRequestAccounts, RemainingAccount, RemainingAccountsParams, RequestChange, Side,
};

/// Inputs for [`PerpsClient::prepare_increase_position_request`].
#[derive(Debug, Clone)]
pub struct IncreasePositionRequest {
    /// Trader and fee payer
    pub owner: Pubkey,
    /// Market (base) custody
    pub custody: Pubkey,
    pub collateral_custody: Pubkey,
    /// Mint the collateral is paid in
    pub input_mint: Pubkey,
    pub side: Side,
    /// Size delta in USD (6 decimals)
    pub size_usd_delta: u64,
    /// Collateral in input mint atoms
    pub collateral_token_delta: u64,
    pub price_slippage: u64,
    pub jupiter_minimum_out: Option<u64>,
    /// Request counter; zero when absent
    pub counter: Option<u64>,
    pub market: String,
    pub market_kind: MarketKind,
    pub referral: Option<Pubkey>,
}

/// Inputs for [`PerpsClient::prepare_decrease_position_request`].
#[derive(Debug, Clone)]
pub struct DecreasePositionRequest {
    pub owner: Pubkey,
    pub custody: Pubkey,
    pub collateral_custody: Pubkey,
    /// Mint the proceeds are paid out in
    pub desired_mint: Pubkey,
    pub side: Side,
    pub collateral_usd_delta: u64,
    pub size_usd_delta: u64,
    pub price_slippage: u64,
    pub jupiter_minimum_out: Option<u64>,
    pub entire_position: Option<bool>,
    pub counter: Option<u64>,
    pub market: String,
    pub market_kind: MarketKind,
    pub referral: Option<Pubkey>,
}

/// Everything needed to submit a position request.
#[derive(Debug, Clone)]
pub struct PreparedPositionRequest {
    pub pool: Pubkey,
    pub perpetuals: Pubkey,
    pub position: Pubkey,
    pub position_request: Pubkey,
    /// Counter the request address was derived with
    pub counter: u64,
    /// Owner ATA paying (increase) or receiving (decrease)
    pub user_token_account: Pubkey,
    pub position_request_ata: Pubkey,
    pub remaining_accounts: Vec<RemainingAccount>,
    /// Setup instructions followed by the request instruction
    pub instructions: Vec<Instruction>,
    /// Non-fatal conditions met while resolving
    pub warnings: Vec<ResolutionWarning>,
}

struct RequestContext {
    pool: Singleton<Pool>,
    /// Pool ambiguity and custody/pool mismatches
    warnings: Vec<ResolutionWarning>,
    perpetuals: Pubkey,
    custody: Custody,
    collateral_custody: Custody,
    position: Pubkey,
    position_request: Pubkey,
    counter: u64,
}

/// Client for resolving program state and preparing position requests.
pub struct PerpsClient<L> {
    /// Ledger access
    pub ledger: L,
    /// Deployment configuration
    pub config: PerpsConfig,
    deriver: AddressDeriver,
}

impl<L: LedgerClient> PerpsClient<L> {
    pub fn new(ledger: L, config: PerpsConfig) -> Self {
        let deriver = AddressDeriver::new(config.program_id);
        Self {
            ledger,
            config,
            deriver,
        }
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    pub async fn resolve_pool(&self) -> SdkResult<Singleton<Pool>> {
        resolver::resolve_singleton_pool(&self.ledger, &self.config).await
    }

    pub async fn resolve_global_state(&self) -> SdkResult<Singleton<Perpetuals>> {
        resolver::resolve_singleton_global_state(&self.ledger, &self.config).await
    }

    pub async fn resolve_custodies(&self, pool: &Pool) -> SdkResult<Vec<Custody>> {
        resolver::resolve_custodies(&self.ledger, &self.config, pool).await
    }

    pub async fn find_custody_by_mint(
        &self,
        pool_address: &Pubkey,
        pool: &Pool,
        mint: &Pubkey,
    ) -> SdkResult<CustodyMatch> {
        resolver::find_custody_by_mint(&self.ledger, &self.config, pool_address, pool, mint).await
    }

    // ========================================================================
    // Provisioning
    // ========================================================================

    pub async fn detect_token_program_for_mint(&self, mint: &Pubkey) -> Pubkey {
        token::detect_token_program_for_mint(&self.ledger, &self.config, mint).await
    }

    pub async fn ensure_ata(
        &self,
        mint: &Pubkey,
        owner: &Pubkey,
        payer: &Pubkey,
        allow_owner_off_curve: bool,
    ) -> SdkResult<EnsuredAta> {
        token::ensure_ata(
            &self.ledger,
            &self.config,
            mint,
            owner,
            payer,
            allow_owner_off_curve,
        )
        .await
    }

    pub async fn top_up_wrapped_native_if_needed(
        &self,
        ata: &Pubkey,
        owner: &Pubkey,
        lamports_needed: u64,
    ) -> SdkResult<Vec<Instruction>> {
        token::top_up_wrapped_native_if_needed(
            &self.ledger,
            &self.config,
            ata,
            owner,
            lamports_needed,
        )
        .await
    }

    pub async fn build_remaining_accounts(
        &self,
        params: &RemainingAccountsParams,
    ) -> SdkResult<Vec<RemainingAccount>> {
        build_remaining_accounts(&self.ledger, params).await
    }

    // ========================================================================
    // Orchestration
    // ========================================================================

    async fn request_context(
        &self,
        owner: &Pubkey,
        custody: &Pubkey,
        collateral_custody: &Pubkey,
        side: Side,
        change: RequestChange,
        counter: Option<u64>,
    ) -> SdkResult<RequestContext> {
        let pool = self.resolve_pool().await?;
        let custody = resolver::resolve_custody(&self.ledger, &self.config, custody).await?;
        let collateral_custody =
            resolver::resolve_custody(&self.ledger, &self.config, collateral_custody).await?;

        // The position is keyed to the resolved pool even when a custody
        // records another one; the mismatch is reported as a warning.
        let position = self.deriver.position(
            owner,
            &pool.address,
            &custody.address,
            &collateral_custody.address,
            side,
        );
        let (position_request, counter) = self.deriver.position_request(&position, change, counter);

        let mut warnings: Vec<ResolutionWarning> = pool.warning.iter().cloned().collect();
        for c in [&custody, &collateral_custody] {
            if c.account.pool != pool.address {
                let warning = ResolutionWarning::CustodyPoolMismatch {
                    custody: c.address,
                    custody_pool: c.account.pool,
                    pool: pool.address,
                };
                tracing::warn!(custody = %c.address, pool = %pool.address, "{}", warning);
                warnings.push(warning);
            }
        }

        Ok(RequestContext {
            pool,
            warnings,
            perpetuals: self.deriver.perpetuals(),
            custody,
            collateral_custody,
            position,
            position_request,
            counter,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn remaining_params(
        &self,
        ctx: &RequestContext,
        market: &str,
        market_kind: MarketKind,
        side: Side,
        owner: &Pubkey,
        funding_account: &Pubkey,
        input_mint: &Pubkey,
        size_usd_delta: u64,
        collateral_usd_delta: Option<u64>,
    ) -> RemainingAccountsParams {
        RemainingAccountsParams {
            program_id: self.config.program_id,
            market: market.to_string(),
            market_kind,
            side,
            pool: ctx.pool.address,
            perpetuals: ctx.perpetuals,
            custody: ctx.custody.address,
            collateral_custody: ctx.collateral_custody.address,
            owner: *owner,
            position: ctx.position,
            position_request: ctx.position_request,
            funding_account: *funding_account,
            input_mint: *input_mint,
            size_usd_delta: Some(size_usd_delta),
            collateral_usd_delta,
        }
    }

    /// Prepare an increase position market request.
    ///
    /// Resolves the pool and both custodies, derives the position and request
    /// addresses, makes sure the owner's funding ATA exists, wraps native
    /// collateral when the input mint is the native mint, then builds the
    /// remaining accounts and the request instruction. Returned instructions
    /// are in submission order. Subject to the read skew described in the
    /// module docs.
    pub async fn prepare_increase_position_request(
        &self,
        request: &IncreasePositionRequest,
    ) -> SdkResult<PreparedPositionRequest> {
        let ctx = self
            .request_context(
                &request.owner,
                &request.custody,
                &request.collateral_custody,
                request.side,
                RequestChange::Increase,
                request.counter,
            )
            .await?;

        let warnings = ctx.warnings.clone();
        let mut instructions = Vec::new();

        let funding = self
            .ensure_ata(&request.input_mint, &request.owner, &request.owner, false)
            .await?;
        instructions.extend(funding.instructions.iter().cloned());

        if request.input_mint == self.config.native_mint {
            instructions.extend(
                self.top_up_wrapped_native_if_needed(
                    &funding.ata,
                    &request.owner,
                    request.collateral_token_delta,
                )
                .await?,
            );
        }

        let position_request_ata = derive_ata(
            &request.input_mint,
            &ctx.position_request,
            true,
            &funding.token_program,
        )?;

        let remaining_params = self.remaining_params(
            &ctx,
            &request.market,
            request.market_kind,
            request.side,
            &request.owner,
            &funding.ata,
            &request.input_mint,
            request.size_usd_delta,
            None,
        );
        let remaining_accounts = self.build_remaining_accounts(&remaining_params).await?;

        let accounts = PositionRequestAccounts {
            owner: request.owner,
            user_token_account: funding.ata,
            perpetuals: ctx.perpetuals,
            pool: ctx.pool.address,
            position: ctx.position,
            position_request: ctx.position_request,
            position_request_ata,
            custody: ctx.custody.address,
            collateral_custody: ctx.collateral_custody.address,
            mint: request.input_mint,
            referral: request.referral,
            token_program: funding.token_program,
            associated_token_program: ASSOCIATED_TOKEN_PROGRAM_ID,
            event_authority: self.deriver.event_authority(),
        };
        let params = IncreasePositionRequestParams {
            size_usd_delta: request.size_usd_delta,
            collateral_token_delta: request.collateral_token_delta,
            side: request.side,
            price_slippage: request.price_slippage,
            jupiter_minimum_out: request.jupiter_minimum_out,
            counter: ctx.counter,
        };
        instructions.push(build_increase_position_market_request_ix(
            &accounts,
            &params,
            &remaining_accounts,
            &self.config.program_id,
        )?);

        tracing::debug!(
            position = %ctx.position,
            position_request = %ctx.position_request,
            counter = ctx.counter,
            instructions = instructions.len(),
            "prepared increase position request"
        );

        Ok(PreparedPositionRequest {
            pool: ctx.pool.address,
            perpetuals: ctx.perpetuals,
            position: ctx.position,
            position_request: ctx.position_request,
            counter: ctx.counter,
            user_token_account: funding.ata,
            position_request_ata,
            remaining_accounts,
            instructions,
            warnings,
        })
    }

    /// Prepare a decrease position market request.
    ///
    /// Same resolution as the increase path; the owner's ATA for the desired
    /// mint is created when missing so proceeds have somewhere to land.
    pub async fn prepare_decrease_position_request(
        &self,
        request: &DecreasePositionRequest,
    ) -> SdkResult<PreparedPositionRequest> {
        let ctx = self
            .request_context(
                &request.owner,
                &request.custody,
                &request.collateral_custody,
                request.side,
                RequestChange::Decrease,
                request.counter,
            )
            .await?;

        let warnings = ctx.warnings.clone();

        let receiving = self
            .ensure_ata(&request.desired_mint, &request.owner, &request.owner, false)
            .await?;
        let mut instructions = receiving.instructions.clone();

        let position_request_ata = derive_ata(
            &request.desired_mint,
            &ctx.position_request,
            true,
            &receiving.token_program,
        )?;

        let remaining_params = self.remaining_params(
            &ctx,
            &request.market,
            request.market_kind,
            request.side,
            &request.owner,
            &receiving.ata,
            &request.desired_mint,
            request.size_usd_delta,
            Some(request.collateral_usd_delta),
        );
        let remaining_accounts = self.build_remaining_accounts(&remaining_params).await?;

        let accounts = PositionRequestAccounts {
            owner: request.owner,
            user_token_account: receiving.ata,
            perpetuals: ctx.perpetuals,
            pool: ctx.pool.address,
            position: ctx.position,
            position_request: ctx.position_request,
            position_request_ata,
            custody: ctx.custody.address,
            collateral_custody: ctx.collateral_custody.address,
            mint: request.desired_mint,
            referral: request.referral,
            token_program: receiving.token_program,
            associated_token_program: ASSOCIATED_TOKEN_PROGRAM_ID,
            event_authority: self.deriver.event_authority(),
        };
        let params = DecreasePositionRequestParams {
            collateral_usd_delta: request.collateral_usd_delta,
            size_usd_delta: request.size_usd_delta,
            price_slippage: request.price_slippage,
            jupiter_minimum_out: request.jupiter_minimum_out,
            entire_position: request.entire_position,
            counter: ctx.counter,
        };
        instructions.push(build_decrease_position_market_request_ix(
            &accounts,
            &params,
            &remaining_accounts,
            &self.config.program_id,
        )?);

        Ok(PreparedPositionRequest {
            pool: ctx.pool.address,
            perpetuals: ctx.perpetuals,
            position: ctx.position,
            position_request: ctx.position_request,
            counter: ctx.counter,
            user_token_account: receiving.ata,
            position_request_ata,
            remaining_accounts,
            instructions,
            warnings,
        })
    }
}

#[cfg(feature = "solana-rpc")]
impl PerpsClient<crate::program::ledger::RpcLedgerClient> {
    /// Create an RPC-backed client from a config, connecting to `config.rpc_url`.
    pub fn from_config(config: PerpsConfig) -> Self {
        let ledger = crate::program::ledger::RpcLedgerClient::from_config(&config);
        Self::new(ledger, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::accounts::{CustodyAccount, OracleParams};
    use crate::program::constants::{NATIVE_MINT, SYSTEM_PROGRAM_ID, TOKEN_PROGRAM_ID};
    use crate::program::ledger::InMemoryLedger;
    use crate::program::pda::get_position_pda;

    struct Fixture {
        client: PerpsClient<InMemoryLedger>,
        pool: Pubkey,
        sol_custody: Pubkey,
        usdc_custody: Pubkey,
        usdc: Pubkey,
    }

    fn owner() -> Pubkey {
        // ed25519 base point, on curve
        let mut bytes = [0x66u8; 32];
        bytes[0] = 0x58;
        Pubkey::new_from_array(bytes)
    }

    fn fixture() -> Fixture {
        let config = PerpsConfig::new(Pubkey::new_unique());
        let ledger = InMemoryLedger::new();
        let pool = Pubkey::new_unique();
        let usdc = config.usdc_mint;
        let sol_custody = Pubkey::new_unique();
        let usdc_custody = Pubkey::new_unique();

        for (address, mint, decimals) in [(sol_custody, NATIVE_MINT, 9), (usdc_custody, usdc, 6)] {
            let custody = CustodyAccount {
                pool,
                mint,
                token_account: Pubkey::new_unique(),
                decimals,
                is_stable: mint == usdc,
                oracle: OracleParams {
                    oracle_account: Pubkey::new_unique(),
                    ..Default::default()
                },
            };
            ledger.set_program_account(address, config.program_id, custody.serialize().unwrap());
            ledger.set_mint(mint, TOKEN_PROGRAM_ID, decimals);
        }
        let pool_account = Pool {
            name: "Pool".to_string(),
            custodies: vec![sol_custody, usdc_custody],
        };
        ledger.set_program_account(pool, config.program_id, pool_account.serialize().unwrap());

        Fixture {
            client: PerpsClient::new(ledger, config),
            pool,
            sol_custody,
            usdc_custody,
            usdc,
        }
    }

    fn increase(f: &Fixture, input_mint: Pubkey) -> IncreasePositionRequest {
        IncreasePositionRequest {
            owner: owner(),
            custody: f.sol_custody,
            collateral_custody: f.usdc_custody,
            input_mint,
            side: Side::Long,
            size_usd_delta: 50_000_000,
            collateral_token_delta: 2_000_000_000,
            price_slippage: 200_000_000,
            jupiter_minimum_out: None,
            counter: None,
            market: "SOL-PERP".to_string(),
            market_kind: MarketKind::Standard,
            referral: None,
        }
    }

    #[tokio::test]
    async fn test_prepare_increase_with_native_input() {
        let f = fixture();
        let prepared = f
            .client
            .prepare_increase_position_request(&increase(&f, NATIVE_MINT))
            .await
            .unwrap();

        let (expected_position, _) = get_position_pda(
            &owner(),
            &f.pool,
            &f.sol_custody,
            &f.usdc_custody,
            Side::Long,
            &f.client.config.program_id,
        );
        assert_eq!(prepared.pool, f.pool);
        assert_eq!(prepared.position, expected_position);
        assert_eq!(prepared.counter, 0);
        assert!(prepared.warnings.is_empty());
        assert!(prepared.remaining_accounts.is_empty());

        // create ATA, transfer, sync native, request
        assert_eq!(prepared.instructions.len(), 4);
        assert_eq!(prepared.instructions[1].program_id, SYSTEM_PROGRAM_ID);
        let request_ix = &prepared.instructions[3];
        assert_eq!(request_ix.program_id, f.client.config.program_id);
        assert_eq!(request_ix.accounts[1].pubkey, prepared.user_token_account);
        assert_eq!(request_ix.accounts[5].pubkey, prepared.position_request);
    }

    #[tokio::test]
    async fn test_prepare_increase_with_funded_usdc() {
        let f = fixture();
        let funding = derive_ata(&f.usdc, &owner(), false, &TOKEN_PROGRAM_ID).unwrap();
        f.client
            .ledger
            .set_token_account(funding, f.usdc, owner(), 10_000_000, TOKEN_PROGRAM_ID);

        let mut request = increase(&f, f.usdc);
        request.counter = Some(3);
        request.market_kind = MarketKind::DynamicOracle;
        let prepared = f
            .client
            .prepare_increase_position_request(&request)
            .await
            .unwrap();

        assert_eq!(prepared.instructions.len(), 1);
        assert_eq!(prepared.counter, 3);
        assert_eq!(prepared.remaining_accounts.len(), 2);
        assert_eq!(prepared.instructions[0].accounts.len(), 18);
    }

    #[tokio::test]
    async fn test_prepare_decrease() {
        let f = fixture();
        let request = DecreasePositionRequest {
            owner: owner(),
            custody: f.sol_custody,
            collateral_custody: f.usdc_custody,
            desired_mint: f.usdc,
            side: Side::Long,
            collateral_usd_delta: 0,
            size_usd_delta: 0,
            price_slippage: 100_000_000,
            jupiter_minimum_out: None,
            entire_position: Some(true),
            counter: Some(1),
            market: "SOL-PERP".to_string(),
            market_kind: MarketKind::Standard,
            referral: None,
        };

        let prepared = f
            .client
            .prepare_decrease_position_request(&request)
            .await
            .unwrap();
        let (increase_request, _) = f.client.deriver().position_request(
            &prepared.position,
            RequestChange::Increase,
            Some(1),
        );
        assert_ne!(prepared.position_request, increase_request);
        assert_eq!(prepared.instructions.len(), 2);
    }

    #[tokio::test]
    async fn test_custody_from_another_pool_warns() {
        let f = fixture();
        let other_pool = Pubkey::new_unique();
        let stray_custody = Pubkey::new_unique();
        let custody = CustodyAccount {
            pool: other_pool,
            mint: f.usdc,
            token_account: Pubkey::new_unique(),
            decimals: 6,
            is_stable: true,
            oracle: OracleParams::default(),
        };
        f.client.ledger.set_program_account(
            stray_custody,
            f.client.config.program_id,
            custody.serialize().unwrap(),
        );

        let mut request = increase(&f, f.usdc);
        request.collateral_custody = stray_custody;
        let prepared = f
            .client
            .prepare_increase_position_request(&request)
            .await
            .unwrap();

        assert_eq!(prepared.pool, f.pool);
        assert_eq!(
            prepared.warnings,
            vec![ResolutionWarning::CustodyPoolMismatch {
                custody: stray_custody,
                custody_pool: other_pool,
                pool: f.pool,
            }]
        );
    }
}
