//! Rolling statistics and anomaly evaluation.
//!
//! This module is purely computational: no I/O, no clock, no logging in
//! the evaluation path. The stream coordinator owns one
//! [`AnomalyDetector`] per configured instrument and feeds it samples in
//! arrival order.

pub mod detector;
pub mod types;
pub mod window;

pub use detector::{AnomalyDetector, DEFAULT_PRICE_Z_THRESHOLD, DEFAULT_VOLUME_Z_THRESHOLD};
pub use types::{AnomalyEvent, EnrichedAnomaly, Sample};
pub use window::{RollingWindow, WindowStats};
