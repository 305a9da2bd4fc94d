//! End-to-end resolution against an in-memory ledger.

use solana_pubkey::Pubkey;

use perps_resolver::prelude::*;
use perps_resolver::program::{
    derive_ata, get_position_pda, get_position_request_pda, parse_counter, CustodyAccount,
    OracleParams, Perpetuals, Permissions, NATIVE_MINT, TOKEN_PROGRAM_ID,
};

struct Deployment {
    config: PerpsConfig,
    ledger: InMemoryLedger,
    pool: Pubkey,
    sol_custody: Pubkey,
    usdc_custody: Pubkey,
}

fn wallet() -> Pubkey {
    // ed25519 base point, on curve
    let mut bytes = [0x66u8; 32];
    bytes[0] = 0x58;
    Pubkey::new_from_array(bytes)
}

fn deployment() -> Deployment {
    let config = PerpsConfig::new(Pubkey::new_unique());
    let ledger = InMemoryLedger::new();
    let pool = Pubkey::new_unique();
    let sol_custody = Pubkey::new_unique();
    let usdc_custody = Pubkey::new_unique();

    for (address, mint, decimals) in [
        (sol_custody, NATIVE_MINT, 9u8),
        (usdc_custody, config.usdc_mint, 6u8),
    ] {
        let custody = CustodyAccount {
            pool,
            mint,
            token_account: Pubkey::new_unique(),
            decimals,
            is_stable: decimals == 6,
            oracle: OracleParams {
                oracle_account: Pubkey::new_unique(),
                oracle_type: 1,
                buffer: 0,
                max_price_age_sec: 60,
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

    let perpetuals = Perpetuals {
        pools: vec![pool],
        permissions: Permissions {
            allow_increase_position: true,
            allow_decrease_position: true,
            ..Default::default()
        },
        admin: Pubkey::new_unique(),
        transfer_authority_bump: 255,
        perpetuals_bump: 255,
        inception_time: 1_689_000_000,
    };
    ledger.set_program_account(
        client_deriver(&config).perpetuals(),
        config.program_id,
        perpetuals.serialize().unwrap(),
    );

    Deployment {
        config,
        ledger,
        pool,
        sol_custody,
        usdc_custody,
    }
}

fn client_deriver(config: &PerpsConfig) -> AddressDeriver {
    AddressDeriver::new(config.program_id)
}

#[test]
fn omitted_counter_matches_explicit_zero() {
    let config = PerpsConfig::new(Pubkey::new_unique());
    let deriver = client_deriver(&config);
    let (pool, sol, usdc) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());

    let position = deriver.position(&wallet(), &pool, &sol, &usdc, Side::Long);
    let (omitted, used) = deriver.position_request(&position, RequestChange::Increase, None);
    let explicit_counter = parse_counter(Some("0")).unwrap();
    let (explicit, _) =
        deriver.position_request(&position, RequestChange::Increase, Some(explicit_counter));

    assert_eq!(used, 0);
    assert_eq!(omitted, explicit);
    assert_eq!(
        omitted,
        get_position_request_pda(&position, 0, RequestChange::Increase, &config.program_id).0
    );
}

#[test]
fn every_position_field_changes_the_address() {
    let program_id = Pubkey::new_unique();
    let keys: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
    let base = get_position_pda(&keys[0], &keys[1], &keys[2], &keys[3], Side::Long, &program_id).0;

    for i in 0..4 {
        let mut changed = keys.clone();
        changed[i] = Pubkey::new_unique();
        let other = get_position_pda(
            &changed[0],
            &changed[1],
            &changed[2],
            &changed[3],
            Side::Long,
            &program_id,
        )
        .0;
        assert_ne!(base, other, "field {i} did not affect the address");
    }

    let short = get_position_pda(&keys[0], &keys[1], &keys[2], &keys[3], Side::Short, &program_id).0;
    assert_ne!(base, short);
}

#[tokio::test]
async fn two_pools_warn_but_resolve() {
    let d = deployment();
    let extra = Pubkey::new_unique();
    d.ledger.set_program_account(
        extra,
        d.config.program_id,
        Pool {
            name: "Stale".to_string(),
            custodies: vec![],
        }
        .serialize()
        .unwrap(),
    );

    let client = PerpsClient::new(d.ledger, d.config);
    let pool = client.resolve_pool().await.unwrap();
    assert_eq!(pool.address, d.pool);
    assert_eq!(pool.candidates, 2);
    assert!(matches!(
        pool.warning,
        Some(ResolutionWarning::AmbiguousSingletonAccount { candidates: 2, .. })
    ));
}

#[tokio::test]
async fn missing_global_state_is_fatal() {
    let config = PerpsConfig::new(Pubkey::new_unique());
    let client = PerpsClient::new(InMemoryLedger::new(), config);

    let err = client.resolve_global_state().await.unwrap_err();
    assert!(matches!(
        err,
        SdkError::MissingSingletonAccount {
            account: "Perpetuals",
            ..
        }
    ));
    assert!(err.to_string().contains("Perpetuals"));
}

#[tokio::test]
async fn global_state_and_custodies_resolve() {
    let d = deployment();
    let client = PerpsClient::new(d.ledger, d.config);

    let global = client.resolve_global_state().await.unwrap();
    assert_eq!(global.account.pools, vec![d.pool]);
    assert!(global.warning.is_none());

    let pool = client.resolve_pool().await.unwrap();
    let custodies = client.resolve_custodies(&pool.account).await.unwrap();
    let addresses: Vec<Pubkey> = custodies.iter().map(|c| c.address).collect();
    assert_eq!(addresses, vec![d.sol_custody, d.usdc_custody]);

    let usdc = client
        .find_custody_by_mint(&pool.address, &pool.account, &client.config.usdc_mint)
        .await
        .unwrap();
    assert_eq!(usdc.custody.address, d.usdc_custody);
    assert_eq!(usdc.custody.decimals, 6);

    let err = client
        .find_custody_by_mint(&pool.address, &pool.account, &Pubkey::new_unique())
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::MintNotFoundInPool { .. }));
}

#[tokio::test]
async fn provisioning_is_idempotent_and_top_up_clamps() {
    let d = deployment();
    let client = PerpsClient::new(d.ledger, d.config);
    let owner = wallet();

    let first = client.ensure_ata(&NATIVE_MINT, &owner, &owner, false).await.unwrap();
    assert_eq!(first.instructions.len(), 1);
    client
        .ledger
        .set_token_account(first.ata, NATIVE_MINT, owner, 300, TOKEN_PROGRAM_ID);
    let second = client.ensure_ata(&NATIVE_MINT, &owner, &owner, false).await.unwrap();
    assert!(second.instructions.is_empty());

    assert!(client
        .top_up_wrapped_native_if_needed(&first.ata, &owner, 300)
        .await
        .unwrap()
        .is_empty());
    let top_up = client
        .top_up_wrapped_native_if_needed(&first.ata, &owner, 1_000)
        .await
        .unwrap();
    assert_eq!(top_up.len(), 2);
    assert_eq!(&top_up[0].data[4..12], &700u64.to_le_bytes());
}

#[tokio::test]
async fn prepared_increase_request_is_consistent() {
    let d = deployment();
    let client = PerpsClient::new(d.ledger, d.config);
    let owner = wallet();
    let size = usd_to_scaled("250".parse().unwrap()).unwrap();
    let collateral = scale_ui_amount("1.5".parse().unwrap(), 9).unwrap();

    let prepared = client
        .prepare_increase_position_request(&IncreasePositionRequest {
            owner,
            custody: d.sol_custody,
            collateral_custody: d.sol_custody,
            input_mint: NATIVE_MINT,
            side: Side::Long,
            size_usd_delta: size,
            collateral_token_delta: collateral,
            price_slippage: usd_to_scaled("200".parse().unwrap()).unwrap(),
            jupiter_minimum_out: None,
            counter: Some(42),
            market: "SOL-PERP".to_string(),
            market_kind: MarketKind::DynamicOracle,
            referral: None,
        })
        .await
        .unwrap();

    let expected_position = client.deriver().position(
        &owner,
        &d.pool,
        &d.sol_custody,
        &d.sol_custody,
        Side::Long,
    );
    assert_eq!(prepared.position, expected_position);
    assert_eq!(prepared.counter, 42);
    assert_eq!(
        prepared.position_request_ata,
        derive_ata(&NATIVE_MINT, &prepared.position_request, true, &TOKEN_PROGRAM_ID).unwrap()
    );
    // Same custody on both sides: one oracle
    assert_eq!(prepared.remaining_accounts.len(), 1);

    let request_ix = prepared.instructions.last().unwrap();
    assert_eq!(&request_ix.data[8..16], &250_000_000u64.to_le_bytes());
    assert_eq!(&request_ix.data[16..24], &1_500_000_000u64.to_le_bytes());
    assert_eq!(&request_ix.data[request_ix.data.len() - 8..], &42u64.to_le_bytes());
    assert_eq!(request_ix.accounts.len(), 17);
}

#[tokio::test]
async fn ledger_failure_propagates_from_orchestration() {
    let d = deployment();
    d.ledger.fail_program_scans(true);
    let client = PerpsClient::new(d.ledger, d.config);

    let err = client
        .prepare_increase_position_request(&IncreasePositionRequest {
            owner: wallet(),
            custody: d.sol_custody,
            collateral_custody: d.usdc_custody,
            input_mint: client.config.usdc_mint,
            side: Side::Short,
            size_usd_delta: 1,
            collateral_token_delta: 1,
            price_slippage: 1,
            jupiter_minimum_out: None,
            counter: None,
            market: "SOL-PERP".to_string(),
            market_kind: MarketKind::Standard,
            referral: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::LedgerFetch(_)));
}
