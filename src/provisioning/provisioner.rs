use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::error::ProvisioningError;
use super::state::{Provisioned, ProvisionedResources};
use super::store::StateStore;
use crate::providers::{CustodialProvider, ProviderError, WalletProvider};

pub struct Provisioner {
    store: StateStore,
    custodial: Arc<dyn CustodialProvider>,
    wallets: Arc<dyn WalletProvider>,
    write_lock: Mutex<()>,
}

fn creation_failed(resource: &'static str) -> impl FnOnce(ProviderError) -> ProvisioningError {
    move |source| ProvisioningError::Provider { resource, source }
}

impl Provisioner {
    pub fn new(
        store: StateStore,
        custodial: Arc<dyn CustodialProvider>,
        wallets: Arc<dyn WalletProvider>,
    ) -> Self {
        Self {
            store,
            custodial,
            wallets,
            write_lock: Mutex::new(()),
        }
    }

    /// Create whatever is missing (wire channel, then wallet, then recipient)
    /// and return the complete snapshot. No external call when the persisted
    /// state is already complete.
    pub async fn ensure_provisioned(&self) -> Result<Arc<Provisioned>, ProvisioningError> {
        let _guard = self.write_lock.lock().await;

        let mut state = self.store.load()?;
        if state.is_ready() {
            return Ok(Arc::new(state.snapshot()?));
        }

        if state.wire_channel_id.is_none() {
            let wire_id = self
                .custodial
                .create_wire_channel(Uuid::new_v4())
                .await
                .map_err(creation_failed("wire channel"))?;
            info!(wire_id = %wire_id, "Created wire channel");
            state = self.persist(
                &state,
                ProvisionedResources {
                    wire_channel_id: Some(wire_id),
                    ..Default::default()
                },
            )?;
        }

        if !state.has_wallet() {
            let wallet = self
                .wallets
                .create_wallet(Uuid::new_v4())
                .await
                .map_err(creation_failed("operating wallet"))?;
            info!(wallet_id = %wallet.id, address = %wallet.address, "Created operating wallet");
            state = self.persist(
                &state,
                ProvisionedResources {
                    custodial_wallet_id: Some(wallet.id),
                    custodial_wallet_address: Some(wallet.address),
                    entity_secret_cipher: Some(wallet.cipher_text),
                    ..Default::default()
                },
            )?;
        }

        if state.payout_recipient_id.is_none() {
            let address = state
                .custodial_wallet_address
                .clone()
                .ok_or(ProvisioningError::MissingDependency("walletAddress"))?;
            let recipient_id = self
                .custodial
                .create_recipient(Uuid::new_v4(), &address)
                .await
                .map_err(creation_failed("payout recipient"))?;
            info!(recipient_id = %recipient_id, "Created payout recipient");
            state = self.persist(
                &state,
                ProvisionedResources {
                    payout_recipient_id: Some(recipient_id),
                    ..Default::default()
                },
            )?;
        }

        Ok(Arc::new(state.snapshot()?))
    }

    /// Merge and write, skipping the write when nothing changed.
    fn persist(
        &self,
        current: &ProvisionedResources,
        update: ProvisionedResources,
    ) -> Result<ProvisionedResources, ProvisioningError> {
        let merged = current.merge(update);
        if &merged != current {
            self.store.save(&merged)?;
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::{MockCustodial, MockWallets};
    use std::path::PathBuf;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("credura-provision-{}.json", Uuid::new_v4()))
    }

    fn provisioner(
        path: &PathBuf,
        custodial: &Arc<MockCustodial>,
        wallets: &Arc<MockWallets>,
    ) -> Provisioner {
        Provisioner::new(
            StateStore::new(path),
            Arc::clone(custodial) as Arc<dyn CustodialProvider>,
            Arc::clone(wallets) as Arc<dyn WalletProvider>,
        )
    }

    #[tokio::test]
    async fn test_first_run_creates_everything_in_order() {
        let path = temp_path();
        let custodial = Arc::new(MockCustodial::new());
        let wallets = Arc::new(MockWallets::new());

        let provisioned = provisioner(&path, &custodial, &wallets)
            .ensure_provisioned()
            .await
            .unwrap();

        assert_eq!(provisioned.wire_channel_id, "wire-1");
        assert_eq!(provisioned.custodial_wallet_id, "wallet-1");
        assert_eq!(provisioned.payout_recipient_id, "recipient-1");
        assert_eq!(custodial.wire_channel_creates(), 1);
        assert_eq!(wallets.wallet_creates(), 1);
        assert_eq!(custodial.recipient_creates(), 1);

        let persisted = StateStore::new(&path).load().unwrap();
        assert!(persisted.is_ready());
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_second_run_makes_zero_external_calls() {
        let path = temp_path();
        let custodial = Arc::new(MockCustodial::new());
        let wallets = Arc::new(MockWallets::new());
        let first = provisioner(&path, &custodial, &wallets)
            .ensure_provisioned()
            .await
            .unwrap();

        let custodial_again = Arc::new(MockCustodial::new());
        let wallets_again = Arc::new(MockWallets::new());
        let second = provisioner(&path, &custodial_again, &wallets_again)
            .ensure_provisioned()
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(custodial_again.wire_channel_creates(), 0);
        assert_eq!(custodial_again.recipient_creates(), 0);
        assert_eq!(wallets_again.wallet_creates(), 0);
        std::fs::remove_file(path).unwrap();
    }

    #[tokio::test]
    async fn test_partial_state_only_fills_gaps() {
        let path = temp_path();
        StateStore::new(&path)
            .save(&ProvisionedResources {
                wire_channel_id: Some("wire-existing".into()),
                custodial_wallet_id: Some("wallet-existing".into()),
                custodial_wallet_address: Some("0xexisting".into()),
                entity_secret_cipher: Some("cipher-existing".into()),
                ..Default::default()
            })
            .unwrap();
        let custodial = Arc::new(MockCustodial::new());
        let wallets = Arc::new(MockWallets::new());

        let provisioned = provisioner(&path, &custodial, &wallets)
            .ensure_provisioned()
            .await
            .unwrap();

        assert_eq!(provisioned.wire_channel_id, "wire-existing");
        assert_eq!(provisioned.custodial_wallet_address, "0xexisting");
        assert_eq!(provisioned.payout_recipient_id, "recipient-1");
        assert_eq!(custodial.wire_channel_creates(), 0);
        assert_eq!(wallets.wallet_creates(), 0);
        assert_eq!(custodial.recipient_creates(), 1);
        std::fs::remove_file(path).unwrap();
    }
}
