// # parcel.app Shipment Source
//
// Implements `ShipmentSource` on top of the parcel.app REST API.
//
// ## Behavior
//
// - One HTTP request per fetch: `GET {base_url}/shipments`
// - No retries, backoff or caching (owned by `ShipmentCoordinator`)
// - Bounded request timeout set on the client
// - Errors are classified so the setup flow can tell a refused key from
//   an unreachable service
//
// ## Status Mapping
//
// | status     | error                    |
// |------------|--------------------------|
// | 200        | none, body is parsed     |
// | 401, 403   | `Error::Authentication`  |
// | 429        | `Error::RateLimited`     |
// | other      | `Error::Http`            |
//
// ## Security
//
// - The API key never appears in logs or `Debug` output
// - Empty keys are rejected at construction

use async_trait::async_trait;
use parcel_core::config::SourceConfig;
use parcel_core::traits::{ShipmentSource, ShipmentSourceFactory};
use parcel_core::{Error, Result, Shipment, SourceRegistry};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Name used in logs and error messages
const SOURCE_NAME: &str = "parcel.app";

/// Type name this crate registers under
pub const SOURCE_TYPE: &str = "parcel_app";

/// Default HTTP timeout for API requests
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the parcel.app shipments endpoint
pub struct ParcelApiClient {
    /// Bearer token
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Base URL without a trailing slash
    base_url: String,

    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for ParcelApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParcelApiClient")
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ParcelApiClient {
    /// Create a client with its own HTTP connection pool
    ///
    /// # Parameters
    ///
    /// - `api_key`: Bearer token issued by parcel.app
    /// - `base_url`: API root, e.g. `https://api.parcel.app/v1`
    /// - `timeout`: Upper bound on a single request
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Self::with_client(api_key, base_url, client)
    }

    /// Create a client that reuses an existing `reqwest::Client`
    pub fn with_client(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::config("parcel.app API key cannot be empty"));
        }

        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::config("parcel.app base URL cannot be empty"));
        }

        Ok(Self {
            api_key,
            base_url,
            client,
        })
    }

    /// Full URL of the shipments endpoint
    pub fn shipments_url(&self) -> String {
        format!("{}/shipments", self.base_url)
    }

    fn status_error(status: StatusCode, body: &str) -> Error {
        match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "API key rejected or lacks permission. Status: {}",
                status
            )),
            429 => Error::rate_limited(format!(
                "Rate limit exceeded. Please retry later. Status: {}",
                status
            )),
            _ => Error::http(format!("Unexpected status {}: {}", status, body)),
        }
    }

    /// Pull the shipment list out of a response body
    ///
    /// The body must be a JSON object. A missing or null `shipments`
    /// field means the account has no shipments.
    fn parse_body(body: &str) -> Result<Vec<Shipment>> {
        let value: Value = serde_json::from_str(body)?;
        let Value::Object(mut fields) = value else {
            return Err(Error::upstream(
                SOURCE_NAME,
                "Invalid response format: body is not a JSON object",
            ));
        };

        match fields.remove("shipments") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(shipments) => Ok(serde_json::from_value(shipments)?),
        }
    }
}

#[async_trait]
impl ShipmentSource for ParcelApiClient {
    /// Fetch every shipment on the account
    ///
    /// ```http
    /// GET {base_url}/shipments
    /// Authorization: Bearer <api_key>
    /// Content-Type: application/json
    /// ```
    async fn fetch_shipments(&self) -> Result<Vec<Shipment>> {
        let url = self.shipments_url();
        tracing::trace!("Fetching shipments from {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::http(format!("Request to {} timed out", url))
                } else {
                    Error::http(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read response body: {}", e)))?;

        if status != StatusCode::OK {
            return Err(Self::status_error(status, &body));
        }

        let shipments = Self::parse_body(&body)?;
        tracing::trace!("Received {} shipments", shipments.len());
        Ok(shipments)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

/// Factory for creating parcel.app sources
pub struct ParcelAppFactory;

impl ShipmentSourceFactory for ParcelAppFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn ShipmentSource>> {
        match config {
            SourceConfig::ParcelApp {
                api_key,
                base_url,
                timeout_secs,
            } => Ok(Box::new(ParcelApiClient::new(
                api_key.clone(),
                base_url.clone(),
                Duration::from_secs(*timeout_secs),
            )?)),
            other => Err(Error::config(format!(
                "Invalid config type for parcel.app source: {}",
                other.type_name()
            ))),
        }
    }
}

/// Register the parcel.app source with a registry
pub fn register(registry: &SourceRegistry) {
    registry.register_source(SOURCE_TYPE, Box::new(ParcelAppFactory));
}
