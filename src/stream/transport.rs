//! Transport seam for the market-data feed, plus the strict wire parse.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;

use crate::market::types::Sample;

/// Errors surfaced by a transport while connecting or streaming.
///
/// Parse failures of individual frames are deliberately *not* transport
/// errors: a malformed message is logged and skipped, while a transport
/// error tears the session down and triggers reconnection.
#[derive(Debug)]
pub enum TransportError {
    /// Could not establish (or use an unestablished) connection.
    Connection(String),
    /// The established stream failed mid-flight.
    Stream(String),
    /// The connection attempt timed out.
    Timeout,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connection(detail) => write!(f, "connection failed: {}", detail),
            TransportError::Stream(detail) => write!(f, "stream failed: {}", detail),
            TransportError::Timeout => write!(f, "connection attempt timed out"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Market-data feed boundary.
///
/// One `connect` establishes (or re-establishes) a session, `subscribe` is
/// then issued once per instrument, and `next_message` yields raw frames
/// until `Ok(None)` (orderly end of stream) or an error. Reconnect policy
/// lives entirely in the coordinator; implementations only report
/// failures.
#[async_trait]
pub trait Transport: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn subscribe(&mut self, symbol: &str) -> Result<(), TransportError>;

    async fn next_message(&mut self) -> Result<Option<String>, TransportError>;
}

/// A validated trade update, ready for routing to a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeUpdate {
    pub symbol: String,
    pub sample: Sample,
}

/// Frame envelope carrying just the discriminator field.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
}

/// A `trade` frame; the feed batches ticks, newest last.
#[derive(Debug, Deserialize)]
struct TradeFrame {
    data: Vec<TradeTick>,
}

/// One trade tick as it appears on the wire.
#[derive(Debug, Deserialize)]
struct TradeTick {
    /// Instrument symbol.
    #[serde(rename = "s")]
    symbol: String,
    /// Trade price.
    #[serde(rename = "p")]
    price: f64,
    /// Trade volume.
    #[serde(rename = "v")]
    volume: f64,
    /// Trade time, epoch milliseconds.
    #[serde(rename = "t")]
    timestamp_ms: i64,
}

/// Strictly parse one raw feed frame.
///
/// `Ok(None)` covers well-formed frames with no trade to consume: pings,
/// unknown message types, and trade frames with an empty batch. Anything
/// structurally wrong (bad JSON, missing or mistyped fields, an epoch out
/// of range) is an error the caller logs before skipping the frame.
///
/// A trade frame may batch several ticks; only the most recent one is
/// consumed.
pub fn parse_trade_update(
    raw: &str,
) -> Result<Option<TradeUpdate>, Box<dyn std::error::Error + Send + Sync>> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.kind != "trade" {
        return Ok(None);
    }
    let frame: TradeFrame = serde_json::from_str(raw)?;
    let Some(tick) = frame.data.last() else {
        return Ok(None);
    };
    let Some(timestamp) = Utc.timestamp_millis_opt(tick.timestamp_ms).single() else {
        return Err(format!("trade timestamp out of range: {}", tick.timestamp_ms).into());
    };
    Ok(Some(TradeUpdate {
        symbol: tick.symbol.clone(),
        sample: Sample {
            price: tick.price,
            volume: tick.volume,
            timestamp,
        },
    }))
}
