//! # Constants
//!
//! Shared constants used throughout the mapper.
//!
//! These values represent reasonable defaults and can be overridden via
//! environment variables where applicable.

/// Default Vault address when `VAULT_ADDR` is not set
pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";

/// Default per-request timeout for Vault API calls (seconds)
pub const DEFAULT_VAULT_CLIENT_TIMEOUT_SECS: u64 = 60;

/// Default path of the mapping document
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "vault_entity_mapper=info";

/// Environment variable holding the Vault address
pub const ENV_VAULT_ADDR: &str = "VAULT_ADDR";

/// Environment variable holding the Vault token
pub const ENV_VAULT_TOKEN: &str = "VAULT_TOKEN";

/// Environment variable holding the Vault Enterprise namespace
pub const ENV_VAULT_NAMESPACE: &str = "VAULT_NAMESPACE";

/// Environment variable holding the request timeout (seconds)
pub const ENV_VAULT_CLIENT_TIMEOUT: &str = "VAULT_CLIENT_TIMEOUT";

/// Environment variable disabling TLS certificate verification
pub const ENV_VAULT_SKIP_VERIFY: &str = "VAULT_SKIP_VERIFY";

/// Header carrying the Vault token
pub const VAULT_TOKEN_HEADER: &str = "X-Vault-Token";

/// Header carrying the Vault Enterprise namespace
pub const VAULT_NAMESPACE_HEADER: &str = "X-Vault-Namespace";
