//! Served gateway over the in-process provider doubles

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use credura_settlement::collection::CollectionService;
use credura_settlement::correlation::CorrelationStore;
use credura_settlement::gateway::{AppState, build_router};
use credura_settlement::providers::mock::{MockCollection, MockCustodial, MockWallets};
use credura_settlement::provisioning::{Provisioner, StateStore};
use credura_settlement::settlement::{InMemoryLedger, PollPolicy, SettlementCoordinator};
use credura_settlement::webhook::WebhookProcessor;

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub gocardless: Arc<MockCollection>,
    pub circle_mint: Arc<MockCustodial>,
    pub wallets: Arc<MockWallets>,
    pub correlations: Arc<CorrelationStore>,
    pub wallet_address: String,
    state_file: PathBuf,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.state_file);
    }
}

/// Provision against the doubles, then serve the full router on an ephemeral port.
pub async fn spawn_app() -> TestApp {
    let gocardless = Arc::new(MockCollection::new());
    let circle_mint = Arc::new(MockCustodial::new());
    let wallets = Arc::new(MockWallets::new());

    let state_file = std::env::temp_dir().join(format!("credura-test-{}.json", Uuid::new_v4()));
    let provisioned = Provisioner::new(
        StateStore::new(&state_file),
        circle_mint.clone(),
        wallets.clone(),
    )
    .ensure_provisioned()
    .await
    .expect("provisioning against doubles");
    let wallet_address = provisioned.custodial_wallet_address.clone();

    let correlations = Arc::new(CorrelationStore::new(Duration::from_secs(60)));
    let coordinator = Arc::new(SettlementCoordinator::new(
        circle_mint.clone(),
        wallets.clone(),
        Arc::new(InMemoryLedger::new()),
        provisioned,
        PollPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            timeout: Duration::from_secs(2),
        },
    ));
    let collection = Arc::new(CollectionService::new(
        gocardless.clone(),
        correlations.clone(),
    ));
    let processor = Arc::new(WebhookProcessor::new(
        gocardless.clone(),
        coordinator,
        correlations.clone(),
    ));
    let state = Arc::new(AppState::new(collection, processor, correlations.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.ok();
    });

    TestApp {
        addr,
        client: reqwest::Client::new(),
        gocardless,
        circle_mint,
        wallets,
        correlations,
        wallet_address,
        state_file,
    }
}
