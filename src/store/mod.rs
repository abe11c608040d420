//! Anomaly persistence.

pub mod sqlite;

pub use sqlite::SqliteAnomalyStore;

use async_trait::async_trait;

use crate::market::types::EnrichedAnomaly;

/// Append-only sink for enriched anomalies.
///
/// One record per detection; nothing ever updates or deletes. The
/// dispatcher treats a failed `record` as log-and-continue, so
/// implementations should return errors rather than panic.
#[async_trait]
pub trait AnomalyStore: Send + Sync {
    async fn record(
        &self,
        anomaly: &EnrichedAnomaly,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
