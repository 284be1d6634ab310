//! Circle developer-controlled wallets client
//!
//! Every mutating request carries `entitySecretCiphertext`: the registered
//! entity secret encrypted with the entity public key (RSA-OAEP, SHA-256),
//! base64 encoded. The provider rejects a ciphertext it has already seen, so a
//! fresh one is produced per request.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::HeaderMap;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::Sha256;
use tokio::sync::OnceCell;
use tracing::info;
use uuid::Uuid;

use super::WalletProvider;
use super::error::{Provider, ProviderError};
use super::http::ProviderHttp;
use crate::config::{CircleWalletsConfig, ContractConfig};

const ENTITY_SECRET_LEN: usize = 32;
const FEE_LEVEL: &str = "LOW";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedWallet {
    pub id: String,
    pub address: String,
    /// Ciphertext used for the creation request
    pub cipher_text: String,
}

/// One call of a loan pool contract function
#[derive(Debug, Clone, PartialEq)]
pub struct ContractExecution {
    pub wallet_id: String,
    pub function_signature: &'static str,
    pub parameters: Vec<Value>,
    pub idempotency_key: Uuid,
}

#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKey {
    public_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletSetCreated {
    wallet_set: IdOnly,
}

#[derive(Deserialize)]
struct WalletsCreated {
    wallets: Vec<WalletEntry>,
}

#[derive(Deserialize)]
struct WalletEntry {
    id: String,
    address: String,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

/// Accepts SPKI or PKCS#1 DER regardless of the PEM label the provider used.
pub(crate) fn parse_public_key(pem: &str) -> Result<RsaPublicKey, ProviderError> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = BASE64
        .decode(body.as_bytes())
        .map_err(|e| ProviderError::Encryption(format!("public key is not base64: {}", e)))?;
    RsaPublicKey::from_public_key_der(&der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
        .map_err(|e| ProviderError::Encryption(format!("public key is not RSA: {}", e)))
}

pub(crate) fn encrypt_entity_secret(
    key: &RsaPublicKey,
    entity_secret_hex: &str,
) -> Result<String, ProviderError> {
    let secret = hex::decode(entity_secret_hex.trim())
        .map_err(|e| ProviderError::Encryption(format!("entity secret is not hex: {}", e)))?;
    if secret.len() != ENTITY_SECRET_LEN {
        return Err(ProviderError::Encryption(format!(
            "entity secret must be {} bytes, got {}",
            ENTITY_SECRET_LEN,
            secret.len()
        )));
    }
    let mut rng = rand::thread_rng();
    let cipher = key
        .encrypt(&mut rng, Oaep::new::<Sha256>(), &secret)
        .map_err(|e| ProviderError::Encryption(e.to_string()))?;
    Ok(BASE64.encode(cipher))
}

pub struct CircleWalletsClient {
    http: ProviderHttp,
    entity_secret: String,
    blockchain: String,
    wallet_set_name: String,
    contract_address: String,
    public_key: OnceCell<RsaPublicKey>,
}

impl CircleWalletsClient {
    pub fn new(
        config: &CircleWalletsConfig,
        contract: &ContractConfig,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: ProviderHttp::new(
                Provider::CircleWallets,
                &config.api_url,
                &config.api_secret,
                HeaderMap::new(),
            )?,
            entity_secret: config.entity_secret.clone(),
            blockchain: config.blockchain.clone(),
            wallet_set_name: config.wallet_set_name.clone(),
            contract_address: contract.pool_address.clone(),
            public_key: OnceCell::new(),
        })
    }

    async fn public_key(&self) -> Result<&RsaPublicKey, ProviderError> {
        self.public_key
            .get_or_try_init(|| async {
                let raw: Data<PublicKey> = self.http.get("/v1/w3s/config/entity/publicKey").await?;
                parse_public_key(&raw.data.public_key)
            })
            .await
    }
}

#[async_trait]
impl WalletProvider for CircleWalletsClient {
    async fn entity_secret_ciphertext(&self) -> Result<String, ProviderError> {
        let key = self.public_key().await?;
        encrypt_entity_secret(key, &self.entity_secret)
    }

    async fn create_wallet(&self, idempotency_key: Uuid) -> Result<CreatedWallet, ProviderError> {
        let cipher_text = self.entity_secret_ciphertext().await?;
        let set: Data<WalletSetCreated> = self
            .http
            .post(
                "/v1/w3s/developer/walletSets",
                &json!({
                    "idempotencyKey": idempotency_key.to_string(),
                    "name": self.wallet_set_name,
                    "entitySecretCiphertext": cipher_text,
                }),
            )
            .await?;
        let wallet_set_id = set.data.wallet_set.id;
        info!(wallet_set_id = %wallet_set_id, "Created wallet set");

        let wallet_cipher = self.entity_secret_ciphertext().await?;
        let created: Data<WalletsCreated> = self
            .http
            .post(
                "/v1/w3s/developer/wallets",
                &json!({
                    "idempotencyKey": Uuid::new_v5(&idempotency_key, b"wallet").to_string(),
                    "walletSetId": wallet_set_id,
                    "blockchains": [self.blockchain],
                    "count": 1,
                    "accountType": "EOA",
                    "entitySecretCiphertext": wallet_cipher,
                }),
            )
            .await?;
        let wallet = created
            .data
            .wallets
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Decode {
                provider: Provider::CircleWallets,
                message: "wallet creation returned no wallet".to_string(),
            })?;

        Ok(CreatedWallet {
            id: wallet.id,
            address: wallet.address,
            cipher_text,
        })
    }

    async fn execute_contract(
        &self,
        execution: &ContractExecution,
    ) -> Result<String, ProviderError> {
        let cipher_text = self.entity_secret_ciphertext().await?;
        let body = json!({
            "walletId": execution.wallet_id,
            "abiParameters": execution.parameters,
            "idempotencyKey": execution.idempotency_key.to_string(),
            "contractAddress": self.contract_address,
            "abiFunctionSignature": execution.function_signature,
            "entitySecretCiphertext": cipher_text,
            "feeLevel": FEE_LEVEL,
        });
        let created: Data<IdOnly> = self
            .http
            .post("/v1/w3s/developer/transactions/contractExecution", &body)
            .await?;
        Ok(created.data.id)
    }
}
