use serde::{Deserialize, Serialize};

use super::error::ProvisioningError;

/// Persisted provisioning state. A missing key means "not yet provisioned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedResources {
    #[serde(rename = "wireId", default, skip_serializing_if = "Option::is_none")]
    pub wire_channel_id: Option<String>,
    #[serde(rename = "cipherText", default, skip_serializing_if = "Option::is_none")]
    pub entity_secret_cipher: Option<String>,
    #[serde(rename = "recipientId", default, skip_serializing_if = "Option::is_none")]
    pub payout_recipient_id: Option<String>,
    #[serde(rename = "walletId", default, skip_serializing_if = "Option::is_none")]
    pub custodial_wallet_id: Option<String>,
    #[serde(rename = "walletAddress", default, skip_serializing_if = "Option::is_none")]
    pub custodial_wallet_address: Option<String>,
}

impl ProvisionedResources {
    /// Fill absent fields from `update`. Fields already set are never replaced.
    pub fn merge(&self, update: ProvisionedResources) -> Self {
        Self {
            wire_channel_id: self.wire_channel_id.clone().or(update.wire_channel_id),
            entity_secret_cipher: self
                .entity_secret_cipher
                .clone()
                .or(update.entity_secret_cipher),
            payout_recipient_id: self
                .payout_recipient_id
                .clone()
                .or(update.payout_recipient_id),
            custodial_wallet_id: self
                .custodial_wallet_id
                .clone()
                .or(update.custodial_wallet_id),
            custodial_wallet_address: self
                .custodial_wallet_address
                .clone()
                .or(update.custodial_wallet_address),
        }
    }

    pub fn has_wallet(&self) -> bool {
        self.custodial_wallet_id.is_some()
            && self.custodial_wallet_address.is_some()
            && self.entity_secret_cipher.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.wire_channel_id.is_some() && self.has_wallet() && self.payout_recipient_id.is_some()
    }

    pub fn snapshot(&self) -> Result<Provisioned, ProvisioningError> {
        fn take(value: &Option<String>, name: &'static str) -> Result<String, ProvisioningError> {
            value.clone().ok_or(ProvisioningError::Incomplete(name))
        }
        Ok(Provisioned {
            wire_channel_id: take(&self.wire_channel_id, "wireId")?,
            custodial_wallet_id: take(&self.custodial_wallet_id, "walletId")?,
            custodial_wallet_address: take(&self.custodial_wallet_address, "walletAddress")?,
            entity_secret_cipher: take(&self.entity_secret_cipher, "cipherText")?,
            payout_recipient_id: take(&self.payout_recipient_id, "recipientId")?,
        })
    }
}

/// Fully provisioned resources, read-only for the rest of the process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub wire_channel_id: String,
    pub custodial_wallet_id: String,
    pub custodial_wallet_address: String,
    pub entity_secret_cipher: String,
    pub payout_recipient_id: String,
}
