//! Flight Oracle Coordinator
//!
//! Registers the oracle pool, follows contract events and serves the status
//! query API once bootstrap has completed.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flight_oracle_coordinator::config::CoordinatorConfig;
use flight_oracle_coordinator::coordinator::Coordinator;
use flight_oracle_coordinator::event_listener::SubscriptionPlan;
use flight_oracle_coordinator::ledger::RpcLedgerClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = CoordinatorConfig::from_env().context("invalid coordinator configuration")?;
    info!(
        rpc_url = %config.rpc_url,
        contract = %config.contracts.app_contract_address,
        pool_size = config.pool_size,
        "starting flight oracle coordinator"
    );

    let ledger = Arc::new(RpcLedgerClient::new(
        config.rpc_url.clone(),
        config.contracts.app_contract_address,
        config.event_poll_interval,
    ));

    let coordinator = match Coordinator::start(ledger, &config, SubscriptionPlan::default()).await {
        Ok(coordinator) => coordinator,
        Err(err) => {
            error!(error = %err, "coordinator did not start; query service stays offline");
            return Err(err.into());
        }
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    coordinator.serve(listener, shutdown_signal()).await?;
    info!("coordinator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
