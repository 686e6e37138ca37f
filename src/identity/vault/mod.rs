//! # Vault Identity Client
//!
//! Native REST implementation of [`IdentityStore`](crate::identity::IdentityStore)
//! for Vault's identity secrets engine.
//! Uses reqwest (rustls) for HTTP requests and `X-Vault-Token` authentication.
//!
//! References:
//! - [Identity secrets engine API](https://developer.hashicorp.com/vault/api-docs/secret/identity)
//! - [`sys/auth` API](https://developer.hashicorp.com/vault/api-docs/system/auth)

use crate::config::VaultSettings;
use crate::constants::{VAULT_NAMESPACE_HEADER, VAULT_TOKEN_HEADER};
use anyhow::{Context, Result};
use reqwest::{Client, Method, RequestBuilder};
use tracing::{info, warn};
use zeroize::Zeroizing;

mod operations;
mod requests;
mod responses;
mod tracker;

const LOOKUP_ENTITY_PATH: &str = "identity/lookup/entity";
const ENTITY_PATH: &str = "identity/entity";
const ENTITY_BATCH_DELETE_PATH: &str = "identity/entity/batch-delete";
const AUTH_METHODS_PATH: &str = "sys/auth";
const ALIAS_PATH: &str = "identity/entity-alias";
const ALIAS_BY_ID_PATH: &str = "identity/entity-alias/id";

/// Vault identity API client
pub struct VaultClient {
    http_client: Client,
    base_url: String,
    token: Zeroizing<String>,
    namespace: Option<String>,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl VaultClient {
    /// Create a new Vault client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built
    pub fn new(settings: &VaultSettings) -> Result<Self> {
        info!("Initializing Vault client for {}", settings.address);
        if let Some(namespace) = &settings.namespace {
            info!("Using Vault namespace: {}", namespace);
        }
        if settings.skip_verify {
            warn!("VAULT_SKIP_VERIFY is set: TLS certificate verification is disabled");
        }

        let http_client = Client::builder()
            .timeout(settings.timeout())
            .danger_accept_invalid_certs(settings.skip_verify)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: settings.address.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            namespace: settings.namespace.clone(),
        })
    }

    /// Build an authenticated request for `/v1/<path>`
    fn make_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'));

        let mut request = self
            .http_client
            .request(method, url)
            .header(VAULT_TOKEN_HEADER, self.token.as_str());

        if let Some(namespace) = &self.namespace {
            request = request.header(VAULT_NAMESPACE_HEADER, namespace);
        }

        request
    }
}
