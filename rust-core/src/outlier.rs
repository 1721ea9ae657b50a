//! Median-based rejection of single-frame detection errors.
//!
//! Pose estimators occasionally snap a landmark to the wrong body part for a
//! single frame. One such jump is enough to produce a huge spurious velocity,
//! so each landmark keeps a short history of accepted positions and any new
//! point too far from the history median is replaced by the median.
//!
//! Rejected points are never added to the history, so an outlier cannot
//! contaminate the reference it is judged against.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::ring::RingBuffer;
use crate::types::{Landmark, LandmarkPoint};

/// Outlier filter parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Accepted positions remembered per landmark.
    pub history_size: usize,

    /// Maximum distance from the median (normalized units) before a point
    /// is rejected.
    pub max_deviation: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            history_size: 5,
            max_deviation: 0.15,
        }
    }
}

impl OutlierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::at_least("outlier.history_size", self.history_size, 2)?;
        ConfigError::positive("outlier.max_deviation", self.max_deviation)
    }
}

/// Per-landmark median outlier filter.
#[derive(Debug, Clone)]
pub struct OutlierFilter {
    config: OutlierConfig,
    history: [Option<RingBuffer<(f64, f64)>>; Landmark::COUNT],
    scratch: Vec<f64>,
    rejected_count: u64,
}

impl OutlierFilter {
    pub fn new(config: OutlierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: OutlierConfig) -> Self {
        let scratch = Vec::with_capacity(config.history_size);
        Self {
            config,
            history: std::array::from_fn(|_| None),
            scratch,
            rejected_count: 0,
        }
    }

    /// Filter one observation of `landmark`.
    ///
    /// With fewer than two remembered samples the point is accepted as is.
    /// Otherwise a point deviating more than `max_deviation` from the median
    /// is replaced by a synthetic point at the median with halved visibility.
    pub fn filter(&mut self, landmark: Landmark, point: &LandmarkPoint) -> LandmarkPoint {
        let capacity = self.config.history_size;
        let history = self.history[landmark.index()].get_or_insert_with(|| RingBuffer::new(capacity));

        if history.len() < 2 {
            history.push((point.x, point.y));
            return *point;
        }

        let median_x = median(&mut self.scratch, history.iter().map(|(x, _)| x));
        let median_y = median(&mut self.scratch, history.iter().map(|(_, y)| y));
        let median_point = LandmarkPoint::new(median_x, median_y, point.z, point.visibility * 0.5);
        let deviation = point.distance_2d(&median_point);

        if deviation > self.config.max_deviation {
            self.rejected_count += 1;
            debug!(
                landmark = %landmark,
                deviation,
                max_deviation = self.config.max_deviation,
                "rejecting outlier detection"
            );
            return median_point;
        }

        history.push((point.x, point.y));
        *point
    }

    /// Total points rejected since construction or the last reset.
    pub fn rejected_count(&self) -> u64 {
        self.rejected_count
    }

    /// Number of accepted samples remembered for a landmark.
    pub fn history_len(&self, landmark: Landmark) -> usize {
        self.history[landmark.index()].as_ref().map_or(0, RingBuffer::len)
    }

    pub fn reset(&mut self) {
        self.history = std::array::from_fn(|_| None);
        self.rejected_count = 0;
    }
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::with_valid_config(OutlierConfig::default())
    }
}

/// Median of `values`, using `scratch` as sort space.
fn median(scratch: &mut Vec<f64>, values: impl Iterator<Item = f64>) -> f64 {
    scratch.clear();
    scratch.extend(values);
    if scratch.is_empty() {
        return 0.0;
    }
    scratch.sort_by(|a, b| a.total_cmp(b));
    let mid = scratch.len() / 2;
    if scratch.len() % 2 == 0 {
        (scratch[mid - 1] + scratch[mid]) / 2.0
    } else {
        scratch[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn point(x: f64, y: f64) -> LandmarkPoint {
        LandmarkPoint::new(x, y, 0.0, 0.9)
    }

    #[test]
    fn test_bootstrap_passes_through() {
        let mut filter = OutlierFilter::default();
        let far = point(0.9, 0.9);
        assert_eq!(filter.filter(Landmark::RightAnkle, &point(0.1, 0.1)), point(0.1, 0.1));
        // second sample still passes: history had fewer than two samples
        assert_eq!(filter.filter(Landmark::RightAnkle, &far), far);
        assert_eq!(filter.history_len(Landmark::RightAnkle), 2);
    }

    #[test]
    fn test_rejects_jump() {
        let mut filter = OutlierFilter::default();
        for _ in 0..3 {
            filter.filter(Landmark::RightAnkle, &point(0.5, 0.8));
        }
        let out = filter.filter(Landmark::RightAnkle, &point(0.5, 0.2));
        assert_abs_diff_eq!(out.x, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out.y, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(out.visibility, 0.45, epsilon = 1e-12);
        assert_eq!(filter.rejected_count(), 1);
        // rejected point is not remembered
        assert_eq!(filter.history_len(Landmark::RightAnkle), 3);
    }

    #[test]
    fn test_accepts_small_motion() {
        let mut filter = OutlierFilter::default();
        filter.filter(Landmark::LeftHeel, &point(0.50, 0.80));
        filter.filter(Landmark::LeftHeel, &point(0.52, 0.80));
        let next = point(0.56, 0.78);
        assert_eq!(filter.filter(Landmark::LeftHeel, &next), next);
        assert_eq!(filter.rejected_count(), 0);
    }

    #[test]
    fn test_history_is_capped() {
        let mut filter = OutlierFilter::new(OutlierConfig {
            history_size: 3,
            max_deviation: 0.15,
        })
        .unwrap();
        for i in 0..10 {
            filter.filter(Landmark::RightKnee, &point(0.5 + i as f64 * 0.01, 0.5));
        }
        assert_eq!(filter.history_len(Landmark::RightKnee), 3);
    }

    #[test]
    fn test_invalid_config() {
        let config = OutlierConfig {
            history_size: 1,
            ..OutlierConfig::default()
        };
        assert!(OutlierFilter::new(config).is_err());
    }

    #[test]
    fn test_median_even_and_odd() {
        let mut scratch = Vec::new();
        assert_eq!(median(&mut scratch, [3.0, 1.0, 2.0].into_iter()), 2.0);
        assert_eq!(median(&mut scratch, [4.0, 1.0, 3.0, 2.0].into_iter()), 2.5);
    }
}
