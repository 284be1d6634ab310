//! Circle Mint business account client (wires, deposits, payouts)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use super::CustodialProvider;
use super::error::{Provider, ProviderError};
use super::http::ProviderHttp;
use crate::config::{CircleMintConfig, WireBankConfig};
use crate::money::{self, MinorUnits};

const DEPOSIT_STATUS_COMPLETE: &str = "complete";

/// Where an inbound wire must be sent for the business account to credit it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireInstructions {
    pub tracking_ref: String,
    pub account_number: String,
}

/// Wire deposit as listed on the business account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    pub id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub status: String,
    pub create_date: DateTime<Utc>,
}

impl Deposit {
    pub fn is_complete(&self) -> bool {
        self.status == DEPOSIT_STATUS_COMPLETE
    }
}

#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstructions {
    tracking_ref: String,
    beneficiary_bank: BeneficiaryBank,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BeneficiaryBank {
    account_number: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackingRef {
    tracking_ref: String,
}

#[derive(Deserialize)]
struct Amount {
    amount: String,
    currency: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDeposit {
    id: String,
    amount: Amount,
    status: String,
    create_date: DateTime<Utc>,
}

impl RawDeposit {
    fn into_deposit(self) -> Result<Deposit, ProviderError> {
        let amount = money::parse_major(&self.amount.amount).map_err(|e| ProviderError::Decode {
            provider: Provider::CircleMint,
            message: format!("deposit {} amount: {}", self.id, e),
        })?;
        Ok(Deposit {
            id: self.id,
            amount,
            currency: self.amount.currency,
            status: self.status,
            create_date: self.create_date,
        })
    }
}

pub struct CircleMintClient {
    http: ProviderHttp,
    wire_bank: WireBankConfig,
}

impl CircleMintClient {
    pub fn new(config: &CircleMintConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            http: ProviderHttp::new(
                Provider::CircleMint,
                &config.api_url,
                &config.api_secret,
                HeaderMap::new(),
            )?,
            wire_bank: config.wire_bank.clone(),
        })
    }
}

fn wire_channel_body(bank: &WireBankConfig, idempotency_key: Uuid) -> Value {
    json!({
        "idempotencyKey": idempotency_key.to_string(),
        "accountNumber": bank.account_number,
        "routingNumber": bank.routing_number,
        "billingDetails": {
            "name": bank.billing_name,
            "city": bank.billing_city,
            "country": bank.billing_country,
            "line1": bank.billing_line1,
            "line2": bank.billing_line2,
            "district": bank.billing_district,
            "postalCode": bank.billing_postal_code,
        },
        "bankAddress": {
            "bankName": bank.bank_name,
            "city": bank.bank_city,
            "country": bank.bank_country,
            "line1": bank.bank_line1,
            "line2": bank.bank_line2,
            "district": bank.bank_district,
        },
    })
}

fn money_body(amount: MinorUnits, currency: &str) -> Value {
    json!({ "amount": money::format_major(amount), "currency": currency })
}

#[async_trait]
impl CustodialProvider for CircleMintClient {
    async fn create_wire_channel(&self, idempotency_key: Uuid) -> Result<String, ProviderError> {
        let body = wire_channel_body(&self.wire_bank, idempotency_key);
        let created: Data<IdOnly> = self
            .http
            .post("/v1/businessAccount/banks/wires", &body)
            .await?;
        Ok(created.data.id)
    }

    async fn wire_instructions(&self, wire_id: &str) -> Result<WireInstructions, ProviderError> {
        let raw: Data<RawInstructions> = self
            .http
            .get(&format!(
                "/v1/businessAccount/banks/wires/{}/instructions",
                wire_id
            ))
            .await?;
        Ok(WireInstructions {
            tracking_ref: raw.data.tracking_ref,
            account_number: raw.data.beneficiary_bank.account_number,
        })
    }

    async fn simulate_wire(
        &self,
        instructions: &WireInstructions,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "amount": money_body(amount, currency),
            "trackingRef": instructions.tracking_ref,
            "beneficiaryBank": { "accountNumber": instructions.account_number },
        });
        let created: Data<TrackingRef> = self.http.post("/v1/mocks/payments/wire", &body).await?;
        Ok(created.data.tracking_ref)
    }

    async fn list_wire_deposits(&self) -> Result<Vec<Deposit>, ProviderError> {
        let raw: Data<Vec<RawDeposit>> = self
            .http
            .get("/v1/businessAccount/deposits?type=wire")
            .await?;
        raw.data.into_iter().map(RawDeposit::into_deposit).collect()
    }

    async fn create_recipient(
        &self,
        idempotency_key: Uuid,
        address: &str,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "idempotencyKey": idempotency_key.to_string(),
            "chain": "ETH",
            "address": address,
            "description": "Credura Developer Wallet",
            "currency": "USD",
        });
        let created: Data<IdOnly> = self
            .http
            .post("/v1/businessAccount/wallets/addresses/recipient", &body)
            .await?;
        Ok(created.data.id)
    }

    async fn transfer_to_recipient(
        &self,
        idempotency_key: Uuid,
        recipient_id: &str,
        amount: MinorUnits,
        currency: &str,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "idempotencyKey": idempotency_key.to_string(),
            "amount": money_body(amount, currency),
            "destination": {
                "type": "verified_blockchain",
                "addressId": recipient_id,
            },
        });
        let created: Data<IdOnly> = self
            .http
            .post("/v1/businessAccount/transfers", &body)
            .await?;
        Ok(created.data.id)
    }
}
