//! Per-instrument two-factor z-score anomaly evaluation.
//!
//! A trade is anomalous only when its price *and* volume both deviate
//! beyond their thresholds from the rolling history. One-sided spikes
//! (a price jump on normal volume, a volume burst at a steady price) stay
//! silent, which filters most feed noise without any model fitting.

use super::types::{round2, AnomalyEvent, Sample};
use super::window::RollingWindow;

pub const DEFAULT_PRICE_Z_THRESHOLD: f64 = 3.0;
pub const DEFAULT_VOLUME_Z_THRESHOLD: f64 = 3.5;

/// Z-score of a value against a mean/std, with the zero-deviation guard:
/// std of 0.0 reports z = 0 instead of dividing.
pub fn z_score(value: f64, mean: f64, std: f64) -> f64 {
    if std > 0.0 {
        (value - mean) / std
    } else {
        0.0
    }
}

/// Rolling window plus thresholds for one instrument.
pub struct AnomalyDetector {
    symbol: String,
    window: RollingWindow,
    price_z_threshold: f64,
    volume_z_threshold: f64,
}

impl AnomalyDetector {
    pub fn new(
        symbol: impl Into<String>,
        window_size: usize,
        price_z_threshold: f64,
        volume_z_threshold: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            window: RollingWindow::new(window_size),
            price_z_threshold,
            volume_z_threshold,
        }
    }

    pub fn with_defaults(symbol: impl Into<String>, window_size: usize) -> Self {
        Self::new(
            symbol,
            window_size,
            DEFAULT_PRICE_Z_THRESHOLD,
            DEFAULT_VOLUME_Z_THRESHOLD,
        )
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// True once the window has seen its full capacity of samples.
    pub fn is_warm(&self) -> bool {
        self.window.is_full()
    }

    /// Z-scores of a sample against the current window statistics.
    ///
    /// Read-only companion to `observe`, used for status output. Note the
    /// window already contains the sample after `observe` ran, so these are
    /// inclusive z-scores.
    pub fn zscores_for(&self, sample: &Sample) -> (f64, f64) {
        let stats = self.window.stats();
        (
            z_score(sample.price, stats.mean_price, stats.std_price),
            z_score(sample.volume, stats.mean_volume, stats.std_volume),
        )
    }

    /// Push a sample into the window and evaluate it.
    ///
    /// Returns an event only when the window is warm and both |z| values
    /// exceed their thresholds. Until the window has filled once, nothing
    /// is ever emitted; early sparse statistics would be meaningless.
    pub fn observe(&mut self, sample: &Sample) -> Option<AnomalyEvent> {
        self.window.push(sample);
        if !self.window.is_full() {
            return None;
        }
        let (z_price, z_volume) = self.zscores_for(sample);
        if z_price.abs() > self.price_z_threshold && z_volume.abs() > self.volume_z_threshold {
            return Some(AnomalyEvent {
                symbol: self.symbol.clone(),
                timestamp: sample.timestamp,
                price: sample.price,
                volume: sample.volume,
                z_score_price: round2(z_price),
                z_score_volume: round2(z_volume),
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_sample(price: f64, volume: f64) -> Sample {
        Sample {
            price,
            volume,
            timestamp: Utc::now(),
        }
    }

    /// Warm a detector with 19 mildly varying samples so the 20th push
    /// evaluates against a full window.
    fn warmed_detector() -> AnomalyDetector {
        let mut detector = AnomalyDetector::with_defaults("BINANCE:BTCUSDT", 20);
        for i in 0..19 {
            let wiggle = (i % 2) as f64 * 0.2;
            assert!(detector
                .observe(&make_sample(100.0 + wiggle, 10.0 + wiggle))
                .is_none());
        }
        assert!(!detector.is_warm());
        detector
    }

    // Test: nothing fires while the window is still filling, even for a
    // wild outlier.
    #[test]
    fn test_cold_start_emits_nothing() {
        let mut detector = AnomalyDetector::with_defaults("BINANCE:BTCUSDT", 50);
        for _ in 0..30 {
            assert!(detector.observe(&make_sample(100.0, 10.0)).is_none());
        }
        assert!(detector.observe(&make_sample(10_000.0, 9_999.0)).is_none());
        assert!(!detector.is_warm());
    }

    // Test: a joint price and volume spike produces an event carrying the
    // triggering sample verbatim.
    #[test]
    fn test_joint_spike_detected() {
        let mut detector = warmed_detector();
        let spike = make_sample(150.0, 50.0);
        let event = detector.observe(&spike).unwrap();
        assert_eq!(event.symbol, "BINANCE:BTCUSDT");
        assert_eq!(event.price, 150.0);
        assert_eq!(event.volume, 50.0);
        assert_eq!(event.timestamp, spike.timestamp);
        assert!(event.z_score_price > DEFAULT_PRICE_Z_THRESHOLD);
        assert!(event.z_score_volume > DEFAULT_VOLUME_Z_THRESHOLD);
    }

    // Test: a price spike on ordinary volume stays silent.
    #[test]
    fn test_price_spike_alone_ignored() {
        let mut detector = warmed_detector();
        assert!(detector.observe(&make_sample(150.0, 10.1)).is_none());
    }

    // Test: a volume burst at a steady price stays silent.
    #[test]
    fn test_volume_spike_alone_ignored() {
        let mut detector = warmed_detector();
        assert!(detector.observe(&make_sample(100.1, 50.0)).is_none());
    }

    // Test: a flat window has zero deviation, so even a divergent sample
    // scores z = 0 and nothing fires (and nothing divides by zero).
    #[test]
    fn test_flat_window_scores_zero() {
        let mut detector = AnomalyDetector::with_defaults("BINANCE:ETHUSDT", 5);
        for _ in 0..4 {
            detector.observe(&make_sample(100.0, 10.0));
        }
        // Fifth identical push fills the window with zero variance.
        assert!(detector.observe(&make_sample(100.0, 10.0)).is_none());
        let flat = detector.zscores_for(&make_sample(100.0, 10.0));
        assert_eq!(flat, (0.0, 0.0));
    }

    // Test: emitted z-scores carry two decimals.
    #[test]
    fn test_event_zscores_rounded() {
        let mut detector = warmed_detector();
        let event = detector.observe(&make_sample(150.0, 50.0)).unwrap();
        assert_eq!(event.z_score_price, (event.z_score_price * 100.0).round() / 100.0);
        assert_eq!(
            event.z_score_volume,
            (event.z_score_volume * 100.0).round() / 100.0
        );
    }

    // Test: a full 60-sample window with prices near 100 (std ~1) and
    // volumes near 10. A trade at 105 is a strong price outlier, but its
    // volume z-score sits around 0.5, so the AND rule keeps it silent.
    #[test]
    fn test_sixty_sample_price_only_scenario() {
        let mut detector = AnomalyDetector::with_defaults("BINANCE:BTCUSDT", 60);
        for i in 0..59 {
            let price = if i % 2 == 0 { 99.0 } else { 101.0 };
            let volume = if i % 2 == 0 { 9.9 } else { 10.1 };
            assert!(detector.observe(&make_sample(price, volume)).is_none());
        }
        let probe = make_sample(105.0, 10.05);
        assert!(detector.observe(&probe).is_none());
        let (z_price, z_volume) = detector.zscores_for(&probe);
        assert!(z_price > DEFAULT_PRICE_Z_THRESHOLD);
        assert!(z_volume.abs() < 1.0);
    }

    // Test: negative deviations trigger on magnitude.
    #[test]
    fn test_crash_direction_detected() {
        let mut detector = warmed_detector();
        let event = detector.observe(&make_sample(50.0, 50.0));
        let event = event.unwrap();
        assert!(event.z_score_price < -DEFAULT_PRICE_Z_THRESHOLD);
        assert!(event.z_score_volume > DEFAULT_VOLUME_Z_THRESHOLD);
    }
}
