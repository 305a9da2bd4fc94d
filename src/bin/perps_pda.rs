//! Derive position and position request addresses from the command line.
//!
//! Prints a JSON document on stdout; logs go to stderr (`RUST_LOG`, default `warn`).

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use perps_resolver::program::{
    parse_address, parse_counter, AddressDeriver, PerpsConfig, RequestChange, Side,
};

#[derive(Parser, Debug)]
#[command(name = "perps-pda", version, about = "Derive perpetuals position PDAs")]
struct Cli {
    /// Position owner
    #[arg(long)]
    wallet: String,

    /// Pool account
    #[arg(long)]
    pool: String,

    /// Market (base) custody
    #[arg(long)]
    custody: String,

    /// Collateral custody
    #[arg(long)]
    collateral: String,

    /// long | short
    #[arg(long, default_value = "long")]
    side: String,

    /// increase | decrease
    #[arg(long, default_value = "increase")]
    change: String,

    /// Request counter (unsigned 64-bit decimal), defaults to 0
    #[arg(long)]
    counter: Option<String>,

    /// Program id; falls back to PERPS_PROGRAM_ID, then mainnet
    #[arg(long)]
    program_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    program_id: String,
    inputs: Inputs,
    outputs: Outputs,
}

#[derive(Serialize)]
struct Inputs {
    wallet: String,
    pool: String,
    custody: String,
    collateral: String,
    side: Side,
    change: RequestChange,
    counter: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Outputs {
    position: String,
    position_request: String,
}

fn run(cli: Cli) -> Result<Output> {
    let program_id = match cli.program_id.as_deref() {
        Some(value) => PerpsConfig::parse_program_id(value)?,
        None => PerpsConfig::from_env()?.program_id,
    };

    let wallet = parse_address("wallet", &cli.wallet)?;
    let pool = parse_address("pool", &cli.pool)?;
    let custody = parse_address("custody", &cli.custody)?;
    let collateral = parse_address("collateral", &cli.collateral)?;
    let side: Side = cli.side.parse()?;
    let change: RequestChange = cli.change.parse()?;
    let counter = parse_counter(cli.counter.as_deref())?;

    let deriver = AddressDeriver::new(program_id);
    let position = deriver.position(&wallet, &pool, &custody, &collateral, side);
    let (position_request, counter) = deriver.position_request(&position, change, Some(counter));

    Ok(Output {
        program_id: program_id.to_string(),
        inputs: Inputs {
            wallet: wallet.to_string(),
            pool: pool.to_string(),
            custody: custody.to_string(),
            collateral: collateral.to_string(),
            side,
            change,
            counter: counter.to_string(),
        },
        outputs: Outputs {
            position: position.to_string(),
            position_request: position_request.to_string(),
        },
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let output = run(Cli::parse())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
