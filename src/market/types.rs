//! Core event types flowing through the detection pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single trade observation for one instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub price: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

/// A trade whose price and volume both deviated beyond the configured
/// thresholds from recent history.
///
/// Z-scores are rounded to two decimals at construction; everything
/// downstream (logs, database, alerts) sees the same values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    pub z_score_price: f64,
    pub z_score_volume: f64,
}

/// An anomaly with news context attached, ready for persistence and
/// alerting. `headline` is a placeholder when the lookup failed or found
/// nothing, never an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedAnomaly {
    pub event: AnomalyEvent,
    pub headline: String,
    pub sentiment: f64,
}

/// Round to two decimal places, the precision carried by reported z-scores
/// and sentiment.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
