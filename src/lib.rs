//! tickwatch: streaming trade anomaly detection with news enrichment.
//!
//! The pipeline has three stages, connected by a bounded channel:
//!
//! 1. **Stream** ([`stream`]): one WebSocket session to the market-data
//!    feed, routed to a per-instrument rolling window and detector. The
//!    coordinator owns the connection state machine and reconnects
//!    forever on failure.
//! 2. **Detect** ([`market`]): two-factor z-score test over a bounded
//!    sample window. Pure computation, no I/O.
//! 3. **Enrich and report** ([`enrich`], [`store`], [`notify`]): each
//!    anomaly gets a headline and sentiment score on its own task, then
//!    is persisted and fanned out to the configured alert channels with
//!    per-step failure isolation.

pub mod config;
pub mod enrich;
pub mod market;
pub mod notify;
pub mod store;
pub mod stream;

pub use config::Config;
pub use enrich::EnrichmentDispatcher;
pub use market::{AnomalyDetector, AnomalyEvent, EnrichedAnomaly, Sample};
pub use store::{AnomalyStore, SqliteAnomalyStore};
pub use stream::{FinnhubTransport, StreamCoordinator, Transport};
