// # Shipment Source Trait
//
// Defines the interface for fetching the current shipment list.
//
// ## Implementations
//
// - parcel.app REST API: `parcel-source-http` crate
// - Test doubles: `tests/common`
//
// ## Usage
//
// ```rust,ignore
// use parcel_core::ShipmentSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* ShipmentSource implementation */;
//
//     // Confirm the credential before persisting it
//     if !source.validate_credentials().await {
//         anyhow::bail!("API key rejected");
//     }
//
//     let shipments = source.fetch_shipments().await?;
//     println!("{} shipments", shipments.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::Shipment;

/// Trait for shipment source implementations
///
/// A source performs exactly one upstream call per invocation and reports
/// failure by returning an error. It never retries, sleeps, or caches:
/// scheduling and staleness are owned by `ShipmentCoordinator`.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait ShipmentSource: Send + Sync {
    /// Fetch every shipment currently tracked by the account
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Shipment>)`: The parsed shipment list (empty if the
    ///   response has no `shipments` field)
    /// - `Err(Error)`: Non-success status, network failure, or malformed body.
    ///   Partial data is never returned.
    async fn fetch_shipments(&self) -> Result<Vec<Shipment>, crate::Error>;

    /// Perform a fetch and keep only the error class
    ///
    /// The setup flow uses this to tell a refused key
    /// (`Error::Authentication`) apart from an unreachable service.
    async fn check_credentials(&self) -> Result<(), crate::Error> {
        self.fetch_shipments().await.map(|_| ())
    }

    /// Perform a fetch and reduce the outcome to success or failure
    async fn validate_credentials(&self) -> bool {
        match self.check_credentials().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error validating {} API key: {}", self.source_name(), e);
                false
            }
        }
    }

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing shipment sources from configuration
pub trait ShipmentSourceFactory: Send + Sync {
    /// Create a ShipmentSource instance from configuration
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn ShipmentSource>, crate::Error>;
}
