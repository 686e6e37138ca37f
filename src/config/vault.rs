//! # Vault Client Settings
//!
//! Connection settings loaded from the standard Vault environment variables.

use crate::constants::{
    DEFAULT_VAULT_ADDR, DEFAULT_VAULT_CLIENT_TIMEOUT_SECS, ENV_VAULT_ADDR,
    ENV_VAULT_CLIENT_TIMEOUT, ENV_VAULT_NAMESPACE, ENV_VAULT_SKIP_VERIFY, ENV_VAULT_TOKEN,
};
use anyhow::{bail, Result};
use std::time::Duration;
use zeroize::Zeroizing;

/// Settings for [`VaultClient`](crate::identity::vault::VaultClient)
#[derive(Clone)]
pub struct VaultSettings {
    /// Base address, e.g. `https://vault.example.com:8200`
    pub address: String,
    pub token: Zeroizing<String>,
    /// Vault Enterprise namespace
    pub namespace: Option<String>,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
    /// Accept invalid TLS certificates
    pub skip_verify: bool,
}

impl std::fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSettings")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .field("namespace", &self.namespace)
            .field("timeout_secs", &self.timeout_secs)
            .field("skip_verify", &self.skip_verify)
            .finish()
    }
}

impl VaultSettings {
    /// Load settings from environment variables with defaults
    ///
    /// # Errors
    /// Returns an error if `VAULT_TOKEN` is not set
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup
    ///
    /// # Errors
    /// Returns an error if no token is available
    pub fn from_source<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(token) = get(ENV_VAULT_TOKEN).filter(|t| !t.trim().is_empty()) else {
            bail!("{ENV_VAULT_TOKEN} is not set");
        };

        let address = get(ENV_VAULT_ADDR)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VAULT_ADDR.to_string());

        Ok(Self {
            address: address.trim_end_matches('/').to_string(),
            token: Zeroizing::new(token),
            namespace: get(ENV_VAULT_NAMESPACE).filter(|n| !n.trim().is_empty()),
            timeout_secs: parse_or_default(
                get(ENV_VAULT_CLIENT_TIMEOUT),
                DEFAULT_VAULT_CLIENT_TIMEOUT_SECS,
            ),
            skip_verify: get(ENV_VAULT_SKIP_VERIFY).is_some_and(|v| parse_bool(&v)),
        })
    }

    /// Get request timeout duration
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Parse a value or fall back to the default.
/// `VAULT_CLIENT_TIMEOUT` may carry a trailing `s` (e.g. `30s`).
fn parse_or_default(value: Option<String>, default: u64) -> u64 {
    value
        .and_then(|v| v.trim().trim_end_matches('s').parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    let v_lower = value.trim().to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}
