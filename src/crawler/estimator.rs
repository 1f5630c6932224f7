//! Remaining-time estimation from recent fetch latencies

use std::collections::VecDeque;
use std::time::Duration;

/// Default number of samples kept in the sliding window
pub const DEFAULT_MAX_SAMPLES: usize = 100;

/// Sliding window of the most recent fetch durations
#[derive(Debug, Clone)]
pub struct ThroughputEstimator {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl ThroughputEstimator {
    /// Creates an estimator keeping at most `max_samples` durations
    pub fn new(max_samples: usize) -> Self {
        let max_samples = max_samples.max(1);
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Records one fetch duration, evicting the oldest sample when full
    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() == self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    /// Mean of the recorded durations, or None before the first sample
    pub fn mean(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let total: Duration = self.samples.iter().sum();
        Some(total.div_f64(self.samples.len() as f64))
    }

    /// Estimated time to finish `outstanding` more fetches
    ///
    /// Returns None while no sample has been recorded yet.
    pub fn estimate(&self, outstanding: usize) -> Option<Duration> {
        self.mean().map(|mean| mean.mul_f64(outstanding as f64))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for ThroughputEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn assert_close(actual: Duration, expected: Duration) {
        let diff = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        assert!(
            diff < Duration::from_micros(1),
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_empty_estimator_has_no_estimate() {
        let estimator = ThroughputEstimator::default();
        assert!(estimator.is_empty());
        assert_eq!(estimator.mean(), None);
        assert_eq!(estimator.estimate(10), None);
    }

    #[test]
    fn test_estimate_single_outstanding() {
        let mut estimator = ThroughputEstimator::default();
        for d in [100, 200, 300] {
            estimator.record(ms(d));
        }

        // one active request, nothing queued, nothing pending
        assert_close(estimator.estimate(1).unwrap(), ms(200));
    }

    #[test]
    fn test_estimate_scales_with_outstanding() {
        let mut estimator = ThroughputEstimator::default();
        estimator.record(ms(50));
        estimator.record(ms(150));

        assert_close(estimator.estimate(10).unwrap(), ms(1000));
        assert_eq!(estimator.estimate(0), Some(Duration::ZERO));
    }

    #[test]
    fn test_oldest_sample_evicted() {
        let mut estimator = ThroughputEstimator::new(2);
        estimator.record(ms(1000));
        estimator.record(ms(100));
        estimator.record(ms(300));

        assert_eq!(estimator.len(), 2);
        assert_close(estimator.mean().unwrap(), ms(200));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut estimator = ThroughputEstimator::new(0);
        estimator.record(ms(10));
        estimator.record(ms(20));
        assert_eq!(estimator.len(), 1);
        assert_close(estimator.mean().unwrap(), ms(20));
    }
}
