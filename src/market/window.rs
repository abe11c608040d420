//! Fixed-capacity rolling sample window with on-demand statistics.

use std::collections::VecDeque;

use super::types::Sample;

/// Summary statistics over a window's current contents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean_price: f64,
    pub std_price: f64,
    pub mean_volume: f64,
    pub std_volume: f64,
}

/// FIFO buffer of the most recent `capacity` samples for one instrument.
///
/// Prices and volumes stay in lockstep: one push appends to both, and
/// eviction drops the oldest pair. Statistics are recomputed from the
/// current contents on every call, nothing is cached.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    prices: VecDeque<f64>,
    volumes: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            prices: VecDeque::with_capacity(capacity),
            volumes: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample, evicting the oldest pair once over capacity.
    pub fn push(&mut self, sample: &Sample) {
        self.prices.push_back(sample.price);
        self.volumes.push_back(sample.volume);
        if self.prices.len() > self.capacity {
            self.prices.pop_front();
            self.volumes.pop_front();
        }
    }

    /// True once `capacity` samples have been observed.
    pub fn is_full(&self) -> bool {
        self.prices.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Population mean and standard deviation over the current contents.
    ///
    /// Fewer than two samples means deviation is undefined: both stds
    /// report 0.0 and callers must map that to a zero z-score rather than
    /// divide.
    pub fn stats(&self) -> WindowStats {
        let (mean_price, std_price) = mean_std(&self.prices);
        let (mean_volume, std_volume) = mean_std(&self.volumes);
        WindowStats {
            mean_price,
            std_price,
            mean_volume,
            std_volume,
        }
    }
}

/// Population mean/std of a series; std is 0.0 below two values.
fn mean_std(values: &VecDeque<f64>) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
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

    // Test: occupancy is min(total pushes, capacity) and the oldest pair
    // is the one evicted.
    #[test]
    fn test_push_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        for i in 0..5 {
            window.push(&make_sample(i as f64, 100.0 + i as f64));
            assert_eq!(window.len(), (i + 1).min(3));
        }
        assert!(window.is_full());
        // Survivors are samples 2, 3, 4 with mean price 3.0.
        let stats = window.stats();
        assert!((stats.mean_price - 3.0).abs() < 1e-9);
        assert!((stats.mean_volume - 103.0).abs() < 1e-9);
    }

    // Test: below two samples the stds report the 0.0 sentinel.
    #[test]
    fn test_stats_undefined_below_two_samples() {
        let mut window = RollingWindow::new(10);
        let stats = window.stats();
        assert_eq!(stats.std_price, 0.0);
        assert_eq!(stats.std_volume, 0.0);

        window.push(&make_sample(42.0, 7.0));
        let stats = window.stats();
        assert_eq!(stats.mean_price, 42.0);
        assert_eq!(stats.std_price, 0.0);
        assert_eq!(stats.std_volume, 0.0);
    }

    // Test: identical samples give zero deviation, no NaN.
    #[test]
    fn test_stats_identical_samples() {
        let mut window = RollingWindow::new(4);
        for _ in 0..4 {
            window.push(&make_sample(50.0, 10.0));
        }
        let stats = window.stats();
        assert_eq!(stats.mean_price, 50.0);
        assert_eq!(stats.std_price, 0.0);
        assert_eq!(stats.std_volume, 0.0);
    }

    // Test: population std (divide by n), not the sample estimator.
    #[test]
    fn test_stats_population_std() {
        let mut window = RollingWindow::new(4);
        for price in [2.0, 4.0, 4.0, 6.0] {
            window.push(&make_sample(price, 1.0));
        }
        let stats = window.stats();
        assert!((stats.mean_price - 4.0).abs() < 1e-9);
        // Population variance of [2, 4, 4, 6] is 2.0.
        assert!((stats.std_price - 2.0_f64.sqrt()).abs() < 1e-9);
    }
}
