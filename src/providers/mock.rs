//! In-process provider doubles for unit and integration tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::gocardless::{METADATA_CORRELATION_ID, PaymentLinks, ScheduleLinks};
use super::*;

fn rejected(provider: Provider) -> ProviderError {
    ProviderError::Http {
        provider,
        status: 422,
        body: r#"{"message":"mock rejection"}"#.to_string(),
    }
}

/// Body carries a provider request id that must never reach a webhook caller
pub const NOT_FOUND_REQUEST_ID: &str = "req-mock-404";

fn not_found(provider: Provider, id: &str) -> ProviderError {
    ProviderError::Http {
        provider,
        status: 404,
        body: format!(
            r#"{{"error":{{"message":"{} not found","request_id":"{}"}}}}"#,
            id, NOT_FOUND_REQUEST_ID
        ),
    }
}

#[derive(Default)]
pub struct MockCollection {
    payments: Mutex<HashMap<String, Payment>>,
    schedules: Mutex<HashMap<String, InstalmentSchedule>>,
    billing_requests: Mutex<Vec<NewBillingRequest>>,
    flow_keys: Mutex<Vec<Uuid>>,
    payment_fetches: AtomicUsize,
    fail_billing_request: Mutex<bool>,
}

impl MockCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_payment(
        &self,
        id: &str,
        amount: u64,
        correlation_id: Option<&str>,
        schedule_id: Option<&str>,
    ) {
        let mut metadata = HashMap::new();
        if let Some(c) = correlation_id {
            metadata.insert(METADATA_CORRELATION_ID.to_string(), c.to_string());
        }
        self.payments.lock().unwrap().insert(
            id.to_string(),
            Payment {
                id: id.to_string(),
                amount,
                currency: "USD".to_string(),
                metadata,
                links: PaymentLinks {
                    mandate: Some("MD1".to_string()),
                    instalment_schedule: schedule_id.map(str::to_string),
                },
            },
        );
    }

    pub fn add_schedule(&self, id: &str, correlation_id: &str, payment_ids: &[&str]) {
        let mut metadata = HashMap::new();
        metadata.insert(
            METADATA_CORRELATION_ID.to_string(),
            correlation_id.to_string(),
        );
        self.schedules.lock().unwrap().insert(
            id.to_string(),
            InstalmentSchedule {
                id: id.to_string(),
                metadata,
                links: ScheduleLinks {
                    payments: payment_ids.iter().map(|p| p.to_string()).collect(),
                },
            },
        );
    }

    pub fn set_fail_billing_request(&self, fail: bool) {
        *self.fail_billing_request.lock().unwrap() = fail;
    }

    pub fn billing_requests(&self) -> Vec<NewBillingRequest> {
        self.billing_requests.lock().unwrap().clone()
    }

    pub fn flow_keys(&self) -> Vec<Uuid> {
        self.flow_keys.lock().unwrap().clone()
    }

    pub fn payment_fetches(&self) -> usize {
        self.payment_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectionProvider for MockCollection {
    async fn get_payment(&self, payment_id: &str) -> Result<Payment, ProviderError> {
        self.payment_fetches.fetch_add(1, Ordering::SeqCst);
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .ok_or_else(|| not_found(Provider::GoCardless, payment_id))
    }

    async fn get_instalment_schedule(
        &self,
        schedule_id: &str,
    ) -> Result<InstalmentSchedule, ProviderError> {
        self.schedules
            .lock()
            .unwrap()
            .get(schedule_id)
            .cloned()
            .ok_or_else(|| not_found(Provider::GoCardless, schedule_id))
    }

    async fn create_billing_request(
        &self,
        request: &NewBillingRequest,
    ) -> Result<String, ProviderError> {
        if *self.fail_billing_request.lock().unwrap() {
            return Err(rejected(Provider::GoCardless));
        }
        let mut requests = self.billing_requests.lock().unwrap();
        requests.push(request.clone());
        Ok(format!("BRQ{}", requests.len()))
    }

    async fn create_billing_request_flow(
        &self,
        idempotency_key: Uuid,
        billing_request_id: &str,
    ) -> Result<String, ProviderError> {
        self.flow_keys.lock().unwrap().push(idempotency_key);
        Ok(format!(
            "https://pay-sandbox.gocardless.com/billing/static/flow?id={}",
            billing_request_id
        ))
    }
}

pub struct MockCustodial {
    deposits: Mutex<Vec<Deposit>>,
    acknowledge_deposits: Mutex<bool>,
    fail_wire: Mutex<bool>,
    fail_transfer: Mutex<bool>,
    transfer_keys: Mutex<Vec<Uuid>>,
    wires: Mutex<Vec<(u64, String)>>,
    wire_channel_creates: AtomicUsize,
    recipient_creates: AtomicUsize,
    deposit_polls: AtomicUsize,
}

impl Default for MockCustodial {
    fn default() -> Self {
        Self {
            deposits: Mutex::new(Vec::new()),
            acknowledge_deposits: Mutex::new(true),
            fail_wire: Mutex::new(false),
            fail_transfer: Mutex::new(false),
            transfer_keys: Mutex::new(Vec::new()),
            wires: Mutex::new(Vec::new()),
            wire_channel_creates: AtomicUsize::new(0),
            recipient_creates: AtomicUsize::new(0),
            deposit_polls: AtomicUsize::new(0),
        }
    }
}

impl MockCustodial {
    pub fn new() -> Self {
        Self::default()
    }

    /// When false, simulated wires never show up as deposits
    pub fn set_acknowledge_deposits(&self, acknowledge: bool) {
        *self.acknowledge_deposits.lock().unwrap() = acknowledge;
    }

    /// A deposit credited outside any simulated wire
    pub fn push_deposit(&self, amount: u64, currency: &str) {
        let mut deposits = self.deposits.lock().unwrap();
        let id = format!("dep-external-{}", deposits.len() + 1);
        deposits.push(Deposit {
            id,
            amount,
            currency: currency.to_string(),
            status: "complete".to_string(),
            create_date: Utc::now(),
        });
    }

    pub fn set_fail_wire(&self, fail: bool) {
        *self.fail_wire.lock().unwrap() = fail;
    }

    pub fn set_fail_transfer(&self, fail: bool) {
        *self.fail_transfer.lock().unwrap() = fail;
    }

    pub fn wire_channel_creates(&self) -> usize {
        self.wire_channel_creates.load(Ordering::SeqCst)
    }

    pub fn recipient_creates(&self) -> usize {
        self.recipient_creates.load(Ordering::SeqCst)
    }

    pub fn simulated_wires(&self) -> usize {
        self.wires.lock().unwrap().len()
    }

    /// `(amount, currency)` of every simulated wire, in submission order
    pub fn wires(&self) -> Vec<(u64, String)> {
        self.wires.lock().unwrap().clone()
    }

    pub fn deposit_polls(&self) -> usize {
        self.deposit_polls.load(Ordering::SeqCst)
    }

    pub fn transfer_keys(&self) -> Vec<Uuid> {
        self.transfer_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl CustodialProvider for MockCustodial {
    async fn create_wire_channel(&self, _idempotency_key: Uuid) -> Result<String, ProviderError> {
        let n = self.wire_channel_creates.fetch_add(1, Ordering::SeqCst);
        Ok(format!("wire-{}", n + 1))
    }

    async fn wire_instructions(&self, wire_id: &str) -> Result<WireInstructions, ProviderError> {
        Ok(WireInstructions {
            tracking_ref: format!("TRK-{}", wire_id),
            account_number: "1000000001".to_string(),
        })
    }

    async fn simulate_wire(
        &self,
        instructions: &WireInstructions,
        amount: u64,
        currency: &str,
    ) -> Result<String, ProviderError> {
        if *self.fail_wire.lock().unwrap() {
            return Err(rejected(Provider::CircleMint));
        }
        let n = {
            let mut wires = self.wires.lock().unwrap();
            wires.push((amount, currency.to_string()));
            wires.len()
        };
        if *self.acknowledge_deposits.lock().unwrap() {
            self.deposits.lock().unwrap().push(Deposit {
                id: format!("dep-{}", n),
                amount,
                currency: currency.to_string(),
                status: "complete".to_string(),
                create_date: Utc::now(),
            });
        }
        Ok(instructions.tracking_ref.clone())
    }

    async fn list_wire_deposits(&self) -> Result<Vec<Deposit>, ProviderError> {
        self.deposit_polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.deposits.lock().unwrap().clone())
    }

    async fn create_recipient(
        &self,
        _idempotency_key: Uuid,
        _address: &str,
    ) -> Result<String, ProviderError> {
        let n = self.recipient_creates.fetch_add(1, Ordering::SeqCst);
        Ok(format!("recipient-{}", n + 1))
    }

    async fn transfer_to_recipient(
        &self,
        idempotency_key: Uuid,
        _recipient_id: &str,
        _amount: u64,
        _currency: &str,
    ) -> Result<String, ProviderError> {
        if *self.fail_transfer.lock().unwrap() {
            return Err(rejected(Provider::CircleMint));
        }
        let mut keys = self.transfer_keys.lock().unwrap();
        keys.push(idempotency_key);
        Ok(format!("transfer-{}", keys.len()))
    }
}

#[derive(Default)]
pub struct MockWallets {
    executions: Mutex<Vec<ContractExecution>>,
    wallet_creates: AtomicUsize,
    fail_execute: Mutex<bool>,
}

impl MockWallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_execute(&self, fail: bool) {
        *self.fail_execute.lock().unwrap() = fail;
    }

    pub fn executions(&self) -> Vec<ContractExecution> {
        self.executions.lock().unwrap().clone()
    }

    pub fn wallet_creates(&self) -> usize {
        self.wallet_creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletProvider for MockWallets {
    async fn entity_secret_ciphertext(&self) -> Result<String, ProviderError> {
        Ok(Uuid::new_v4().to_string())
    }

    async fn create_wallet(&self, _idempotency_key: Uuid) -> Result<CreatedWallet, ProviderError> {
        let n = self.wallet_creates.fetch_add(1, Ordering::SeqCst);
        Ok(CreatedWallet {
            id: format!("wallet-{}", n + 1),
            address: format!("0x{:040x}", n + 1),
            cipher_text: "cipher".to_string(),
        })
    }

    async fn execute_contract(
        &self,
        execution: &ContractExecution,
    ) -> Result<String, ProviderError> {
        if *self.fail_execute.lock().unwrap() {
            return Err(rejected(Provider::CircleWallets));
        }
        let mut executions = self.executions.lock().unwrap();
        executions.push(execution.clone());
        Ok(format!("tx-{}", executions.len()))
    }
}
