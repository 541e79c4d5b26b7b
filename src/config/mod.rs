//! Runtime configuration.
//!
//! Webhook secrets and the vault key are injected explicitly into the
//! components that need them, never read ambiently at call sites. A missing
//! secret or key is fatal at startup; nothing is silently defaulted.

use std::env;
use std::time::Duration;

use crate::errors::ConfigError;

/// Default gateway call deadline in seconds.
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

/// Hex length of the 256-bit vault key.
const VAULT_KEY_HEX_LEN: usize = 64;

/// One webhook provider: its name, the header it signs under, and the
/// shared secret it signs with.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider tag used in logs and audit records.
    pub name: String,
    /// Header carrying the hex HMAC signature, e.g. `webhook-signature`.
    pub signature_header: String,
    /// Shared HMAC secret.
    pub webhook_secret: String,
}

/// Configuration for the payments core.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Webhook providers and their secrets.
    pub providers: Vec<ProviderConfig>,
    /// Hex-encoded 256-bit vault key.
    pub vault_key_hex: String,
    /// Deadline applied to every gateway call.
    pub gateway_timeout: Duration,
}

impl PaymentConfig {
    /// Builds and validates a configuration.
    pub fn new(
        providers: Vec<ProviderConfig>,
        vault_key_hex: impl Into<String>,
        gateway_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let config =
            Self { providers, vault_key_hex: vault_key_hex.into(), gateway_timeout };
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the environment.
    ///
    /// `WATTPAY_WEBHOOK_SECRET` (signing header `webhook-signature`) and
    /// `WATTPAY_VAULT_KEY` are required. `WATTPAY_BPAY_WEBHOOK_SECRET` adds
    /// a second provider under `x-bpay-signature` when present.
    /// `WATTPAY_GATEWAY_TIMEOUT_SECS` overrides the gateway deadline.
    pub fn from_env() -> Result<Self, ConfigError> {
        let gateway_secret = env::var("WATTPAY_WEBHOOK_SECRET")
            .map_err(|_| ConfigError::MissingWebhookSecret("WATTPAY_WEBHOOK_SECRET".to_string()))?;
        let mut providers = vec![ProviderConfig {
            name: "gateway".to_string(),
            signature_header: "webhook-signature".to_string(),
            webhook_secret: gateway_secret,
        }];
        if let Ok(bpay_secret) = env::var("WATTPAY_BPAY_WEBHOOK_SECRET") {
            providers.push(ProviderConfig {
                name: "bpay".to_string(),
                signature_header: "x-bpay-signature".to_string(),
                webhook_secret: bpay_secret,
            });
        }

        let vault_key_hex =
            env::var("WATTPAY_VAULT_KEY").map_err(|_| ConfigError::MissingEncryptionKey)?;

        let gateway_timeout = env::var("WATTPAY_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS), Duration::from_secs);

        Self::new(providers, vault_key_hex, gateway_timeout)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::MissingWebhookSecret("no providers configured".to_string()));
        }
        for provider in &self.providers {
            if provider.webhook_secret.is_empty() {
                return Err(ConfigError::EmptyWebhookSecret(provider.name.clone()));
            }
        }
        if self.vault_key_hex.is_empty() {
            return Err(ConfigError::MissingEncryptionKey);
        }
        if self.vault_key_hex.len() != VAULT_KEY_HEX_LEN
            || hex::decode(&self.vault_key_hex).is_err()
        {
            return Err(ConfigError::InvalidEncryptionKey(format!(
                "expected {VAULT_KEY_HEX_LEN} hex characters"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(secret: &str) -> ProviderConfig {
        ProviderConfig {
            name: "gateway".to_string(),
            signature_header: "webhook-signature".to_string(),
            webhook_secret: secret.to_string(),
        }
    }

    const KEY: &str = "0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0";

    #[test]
    fn accepts_complete_config() {
        let config =
            PaymentConfig::new(vec![provider("whsec_x")], KEY, Duration::from_secs(5));
        assert!(config.is_ok());
    }

    #[test]
    fn empty_secret_is_fatal() {
        let err = PaymentConfig::new(vec![provider("")], KEY, Duration::from_secs(5))
            .expect_err("empty secret");
        assert!(matches!(err, ConfigError::EmptyWebhookSecret(_)));
    }

    #[test]
    fn missing_providers_are_fatal() {
        let err = PaymentConfig::new(vec![], KEY, Duration::from_secs(5))
            .expect_err("no providers");
        assert!(matches!(err, ConfigError::MissingWebhookSecret(_)));
    }

    #[test]
    fn malformed_vault_key_is_fatal() {
        let err = PaymentConfig::new(vec![provider("whsec_x")], "abcd", Duration::from_secs(5))
            .expect_err("short key");
        assert!(matches!(err, ConfigError::InvalidEncryptionKey(_)));
        let err = PaymentConfig::new(vec![provider("whsec_x")], "", Duration::from_secs(5))
            .expect_err("empty key");
        assert!(matches!(err, ConfigError::MissingEncryptionKey));
    }
}
