//! Channel Escrow demo binary.
//!
//! Wires an `Adjudicator` over an in-memory custody stand-in and a local
//! signing key, then walks the "happy path" scenario from the command line:
//! deposit, off-chain accrual, close, and confirmation after the dispute
//! window. Intended as a runnable demonstration of the adjudication engine,
//! not a production facilitator node — the real on-chain asset transfer and
//! RPC wiring are out of scope (spec.md §1).

use std::sync::Arc;

use alloy::primitives::{address, Address, U256};
use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use channel_chain::InMemoryCustody;
use channel_core::{Adjudicator, ProtocolConfig, SystemClock};

/// Environment variable names.
mod env {
    pub const CHAIN_ID: &str = "CHANNEL_CHAIN_ID";
    pub const ESCROW_ADDRESS: &str = "CHANNEL_ESCROW_ADDRESS";
    pub const CONFIG_PATH: &str = "CHANNEL_CONFIG_PATH";
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,channel_core=debug,channel_chain=debug")),
        )
        .init();

    let chain_id: u64 = std::env::var(env::CHAIN_ID)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(31337);
    let escrow: Address = std::env::var(env::ESCROW_ADDRESS)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(address!("00000000000000000000000000000000000e5c"));
    let config = match std::env::var(env::CONFIG_PATH) {
        Ok(path) => ProtocolConfig::from_toml(path)?,
        Err(_) => ProtocolConfig::mainnet(),
    };

    info!(%chain_id, %escrow, "starting channel escrow demo");

    let custody = Arc::new(InMemoryCustody::new());
    let clock = Arc::new(SystemClock);
    let adjudicator = Adjudicator::new(custody.clone(), clock, config.clone(), chain_id, escrow);

    let payer = address!("000000000000000000000000000000000000a1");
    let facilitator = address!("000000000000000000000000000000000000b2");
    let receiver = address!("000000000000000000000000000000000000c3");

    let facilitator_bond = config.min_facilitator_bond * U256::from(2u64);
    custody.fund(facilitator, facilitator_bond);
    adjudicator.deposit_bond(facilitator, facilitator_bond).await?;
    info!(%facilitator, bond = %facilitator_bond, "facilitator bonded");

    let deposit_amount = config.min_deposit * U256::from(1_000u64);
    custody.fund(payer, deposit_amount);
    adjudicator.deposit(payer, facilitator, receiver, deposit_amount).await?;
    info!(%payer, amount = %deposit_amount, "channel opened");

    // Five off-chain calls accrue here in a real deployment, each yielding a
    // server-signed Receipt; this demo jumps straight to the acknowledged
    // total a client would have derived from them.
    let acknowledged = config.min_deposit / U256::from(2u64);
    adjudicator.initiate_close(payer, acknowledged, alloy::primitives::B256::ZERO)?;
    info!(%payer, %acknowledged, "close initiated");

    adjudicator.facilitator_confirm(facilitator, payer).await?;
    info!(%payer, "channel settled");

    let channel = adjudicator.channel(payer).expect("channel exists");
    info!(
        status = ?channel.status,
        receiver_balance = %custody.external_balance(receiver),
        payer_balance = %custody.external_balance(payer),
        "final state"
    );

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔═╗┬ ┬┌─┐┌┐┌┌┐┌┌─┐┬  ╔═╗┌─┐┌─┐┬─┐┌─┐┬ ┬
    ║  ├─┤├─┤││││││├┤ │  ║╣ └─┐│  ├┬┘│ │││││
    ╚═╝┴ ┴┴ ┴┘└┘┘└┘└─┘┴─┘╚═╝└─┘└─┘┴└─└─┘└┴┘
    "#
    );
}
