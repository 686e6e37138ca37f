//! Per-call bookkeeping shared by every Vault operation: timing, metrics and
//! uniform error decoding.

use super::responses::VaultErrorResponse;
use crate::observability::metrics;
use anyhow::{anyhow, Context, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Instant;
use tracing::debug;

/// Tracks one store operation from request to decoded result
#[derive(Debug)]
pub struct OperationTracker {
    operation: &'static str,
    start: Instant,
}

impl OperationTracker {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Send the request; transport failures are recorded as errors
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        match request.send().await {
            Ok(response) => {
                debug!(
                    "Vault {} returned status {}",
                    self.operation,
                    response.status()
                );
                Ok(response)
            }
            Err(e) => {
                self.record("error");
                Err(anyhow::Error::new(e).context(format!("Failed to reach Vault for {}", self.operation)))
            }
        }
    }

    /// Decode a successful JSON body
    pub async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        match response.json::<T>().await {
            Ok(body) => {
                self.record("success");
                Ok(body)
            }
            Err(e) => {
                self.record("error");
                Err(anyhow::Error::new(e)
                    .context(format!("Failed to decode Vault {} response", self.operation)))
            }
        }
    }

    /// Decode a body that Vault may omit (`204 No Content`)
    pub async fn decode_optional<T: DeserializeOwned>(&self, response: Response) -> Result<Option<T>> {
        if response.status() == StatusCode::NO_CONTENT {
            self.record("success");
            return Ok(None);
        }
        let bytes = response
            .bytes()
            .await
            .context("Failed to read Vault response body");
        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                self.record("error");
                return Err(e);
            }
        };
        if bytes.is_empty() {
            self.record("success");
            return Ok(None);
        }
        match serde_json::from_slice::<T>(&bytes) {
            Ok(body) => {
                self.record("success");
                Ok(Some(body))
            }
            Err(e) => {
                self.record("error");
                Err(anyhow::Error::new(e)
                    .context(format!("Failed to decode Vault {} response", self.operation)))
            }
        }
    }

    pub fn record_success(&self) {
        self.record("success");
    }

    pub fn record_not_found(&self) {
        self.record("not_found");
    }

    /// Record the failure and turn the response into an error
    pub async fn fail(&self, response: Response) -> anyhow::Error {
        self.record("error");
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        handle_error_response(status, &error_text)
    }

    fn record(&self, result: &str) {
        metrics::record_store_operation(
            self.operation,
            result,
            self.start.elapsed().as_secs_f64(),
        );
    }
}

/// Build an error from a Vault error body, falling back to the raw text
pub fn handle_error_response(status: StatusCode, error_text: &str) -> anyhow::Error {
    match serde_json::from_str::<VaultErrorResponse>(error_text) {
        Ok(body) if !body.errors.is_empty() => {
            anyhow!("Vault API error (status {}): {}", status, body.errors.join("; "))
        }
        _ => anyhow!("Vault API error (status {}): {}", status, error_text.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_is_joined() {
        let err = handle_error_response(
            StatusCode::FORBIDDEN,
            r#"{"errors": ["1 error occurred", "permission denied"]}"#,
        );
        assert_eq!(
            err.to_string(),
            "Vault API error (status 403 Forbidden): 1 error occurred; permission denied"
        );
    }

    #[test]
    fn test_plain_text_body() {
        let err = handle_error_response(StatusCode::BAD_GATEWAY, "upstream down\n");
        assert_eq!(
            err.to_string(),
            "Vault API error (status 502 Bad Gateway): upstream down"
        );
    }
}
