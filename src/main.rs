//! Credura settlement service
//!
//! ```text
//! startup:  config -> logging -> provisioning (fatal on failure) -> ledger
//! runtime:  /gocardless/checkout  -> CollectionService
//!           /gocardless/webhook   -> WebhookProcessor -> SettlementCoordinator
//!           /circle/webhook       -> WebhookProcessor -> SettlementCoordinator
//! ```

use std::sync::Arc;

use anyhow::Context;
use credura_settlement::collection::CollectionService;
use credura_settlement::config::AppConfig;
use credura_settlement::correlation::CorrelationStore;
use credura_settlement::gateway::{self, AppState};
use credura_settlement::providers::{
    CircleMintClient, CircleWalletsClient, CollectionProvider, CustodialProvider,
    GoCardlessClient, WalletProvider,
};
use credura_settlement::provisioning::{Provisioner, StateStore};
use credura_settlement::settlement::{
    InMemoryLedger, PgLedger, PollPolicy, SettlementCoordinator, TransferLedger,
};
use credura_settlement::webhook::WebhookProcessor;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env).with_context(|| format!("loading config for {}", env))?;
    let _log_guard = credura_settlement::logging::init_logging(&config);

    tracing::info!(env = %env, version = env!("GIT_HASH"), "Starting Credura settlement service");

    let gocardless: Arc<dyn CollectionProvider> = Arc::new(GoCardlessClient::new(&config.gocardless)?);
    let custodial: Arc<dyn CustodialProvider> = Arc::new(CircleMintClient::new(&config.circle_mint)?);
    let wallets: Arc<dyn WalletProvider> = Arc::new(CircleWalletsClient::new(
        &config.circle_wallets,
        &config.contract,
    )?);

    // Nothing is served until every custodial resource exists
    let provisioner = Provisioner::new(
        StateStore::new(&config.provisioning.state_file),
        custodial.clone(),
        wallets.clone(),
    );
    let provisioned = provisioner
        .ensure_provisioned()
        .await
        .context("provisioning custodial resources")?;

    let ledger: Arc<dyn TransferLedger> = match config.postgres_url.as_deref() {
        Some(url) => {
            tracing::info!("Settlement ledger: PostgreSQL");
            Arc::new(
                PgLedger::connect(url, config.settlement.claim_lease())
                    .await
                    .context("connecting settlement ledger")?,
            )
        }
        None => {
            tracing::warn!("Settlement ledger: in-memory, idempotency is lost on restart");
            Arc::new(InMemoryLedger::with_claim_lease(config.settlement.claim_lease()))
        }
    };

    let correlations = Arc::new(CorrelationStore::new(config.settlement.correlation_ttl()));
    let _sweeper = correlations
        .clone()
        .spawn_sweeper(config.settlement.sweep_interval());

    let coordinator = Arc::new(SettlementCoordinator::new(
        custodial,
        wallets,
        ledger,
        provisioned,
        PollPolicy::from_config(&config.settlement),
    ));
    let collection = Arc::new(CollectionService::new(gocardless.clone(), correlations.clone()));
    let processor = Arc::new(WebhookProcessor::new(
        gocardless,
        coordinator,
        correlations.clone(),
    ));
    let state = Arc::new(AppState::new(collection, processor, correlations));

    let port = get_port_override().unwrap_or(config.gateway.port);
    gateway::run_server(&config.gateway.host, port, state).await?;
    Ok(())
}
