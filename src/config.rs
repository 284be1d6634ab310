use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    pub gocardless: GoCardlessConfig,
    pub circle_mint: CircleMintConfig,
    pub circle_wallets: CircleWalletsConfig,
    pub contract: ContractConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    /// PostgreSQL connection URL for the settlement ledger. In-memory ledger when absent.
    #[serde(default)]
    pub postgres_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GoCardlessConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_secret: String,
    /// Where the hosted flow sends the borrower when they abandon it
    pub exit_url: String,
    /// Where the hosted flow sends the borrower once the mandate is authorised
    pub redirect_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CircleMintConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_secret: String,
    pub wire_bank: WireBankConfig,
}

/// Bank account registered as the wire channel on the business account.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WireBankConfig {
    pub account_number: String,
    pub routing_number: String,
    pub billing_name: String,
    pub billing_city: String,
    pub billing_country: String,
    pub billing_line1: String,
    #[serde(default)]
    pub billing_line2: Option<String>,
    pub billing_district: String,
    pub billing_postal_code: String,
    pub bank_name: String,
    pub bank_city: String,
    pub bank_country: String,
    #[serde(default)]
    pub bank_line1: Option<String>,
    #[serde(default)]
    pub bank_line2: Option<String>,
    #[serde(default)]
    pub bank_district: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CircleWalletsConfig {
    pub api_url: String,
    #[serde(default)]
    pub api_secret: String,
    /// Hex-encoded 32 byte entity secret registered with the wallet provider
    #[serde(default)]
    pub entity_secret: String,
    #[serde(default = "default_blockchain")]
    pub blockchain: String,
    #[serde(default = "default_wallet_set_name")]
    pub wallet_set_name: String,
}

fn default_blockchain() -> String {
    "ETH-SEPOLIA".to_string()
}

fn default_wallet_set_name() -> String {
    "Credura Wallet".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ContractConfig {
    /// Address of the loan pool contract invoked through the operating wallet
    #[serde(default)]
    pub pool_address: String,
}

/// Deposit polling bounds, ledger claim lease and correlation lifetime
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SettlementConfig {
    pub deposit_poll_max_attempts: u32,
    pub deposit_poll_initial_delay_ms: u64,
    pub deposit_poll_max_delay_ms: u64,
    pub deposit_poll_timeout_ms: u64,
    /// A PENDING ledger claim older than this may be taken over by a redelivery
    #[serde(default = "default_claim_lease_secs")]
    pub claim_lease_secs: u64,
    pub correlation_ttl_secs: u64,
    pub correlation_sweep_interval_secs: u64,
}

fn default_claim_lease_secs() -> u64 {
    300
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            deposit_poll_max_attempts: 8,
            deposit_poll_initial_delay_ms: 500,
            deposit_poll_max_delay_ms: 4_000,
            deposit_poll_timeout_ms: 30_000,
            claim_lease_secs: default_claim_lease_secs(),
            correlation_ttl_secs: 7 * 24 * 3600,
            correlation_sweep_interval_secs: 300,
        }
    }
}

impl SettlementConfig {
    pub fn claim_lease(&self) -> Duration {
        Duration::from_secs(self.claim_lease_secs)
    }

    pub fn correlation_ttl(&self) -> Duration {
        Duration::from_secs(self.correlation_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.correlation_sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProvisioningConfig {
    pub state_file: String,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            state_file: "./circle.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml`, then overlay secrets from the environment.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        let mut config = Self::from_yaml(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Secrets never need to live in the yaml file.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut String); 5] = [
            ("GOCARDLESS_API_SECRET", &mut self.gocardless.api_secret),
            ("CIRCLE_MINT_API_SECRET", &mut self.circle_mint.api_secret),
            ("CIRCLE_CONSOLE_API_SECRET", &mut self.circle_wallets.api_secret),
            (
                "CIRCLE_CONSOLE_DEV_WALLET_SECRET",
                &mut self.circle_wallets.entity_secret,
            ),
            ("POOL_WALLET_ADDRESS", &mut self.contract.pool_address),
        ];
        for (key, slot) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *slot = value;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gocardless.api_secret.is_empty() {
            return Err(ConfigError::Missing("GOCARDLESS_API_SECRET"));
        }
        if self.circle_mint.api_secret.is_empty() {
            return Err(ConfigError::Missing("CIRCLE_MINT_API_SECRET"));
        }
        if self.circle_wallets.api_secret.is_empty() {
            return Err(ConfigError::Missing("CIRCLE_CONSOLE_API_SECRET"));
        }
        if self.circle_wallets.entity_secret.is_empty() {
            return Err(ConfigError::Missing("CIRCLE_CONSOLE_DEV_WALLET_SECRET"));
        }
        if self.contract.pool_address.is_empty() {
            return Err(ConfigError::Missing("POOL_WALLET_ADDRESS"));
        }
        Ok(())
    }
}
