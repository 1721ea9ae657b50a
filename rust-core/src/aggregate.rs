//! Aggregation across frames and contacts.
//!
//! - [`aggregate_angles`]: per-field mean over valid samples.
//! - [`majority_vote_gait_type`]: dominant strike pattern, ties to the
//!   first type to reach the maximum count.
//! - [`calculate_stride_frequency`]: cadence from the ankle height series via
//!   peak detection on the inverted signal. With image y pointing down, each
//!   peak of `-y` is the top of one swing.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{AngleKind, BiomechanicalAngles, GaitType};

/// Samples required before cadence is estimated (one second at 30 fps).
pub const MIN_CADENCE_SAMPLES: usize = 30;

/// Minimum peak spacing as a fraction of fps (seconds between steps).
pub const PEAK_SPACING_SECONDS: f64 = 0.3;

/// Rolling window sizes used by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Frames of joint angles averaged in reports.
    pub angle_window: usize,

    /// Frames of ankle height used for cadence.
    pub cadence_window: usize,

    /// Contacts kept for the majority vote.
    pub classification_window: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            angle_window: 30,
            cadence_window: 300,
            classification_window: 64,
        }
    }
}

impl AggregationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::at_least("aggregation.angle_window", self.angle_window, 1)?;
        ConfigError::at_least("aggregation.cadence_window", self.cadence_window, MIN_CADENCE_SAMPLES)?;
        ConfigError::at_least("aggregation.classification_window", self.classification_window, 1)
    }
}

/// Mean of each angle over the samples where it is present.
///
/// An angle with no valid samples stays `None`.
pub fn aggregate_angles<'a, I>(samples: I) -> BiomechanicalAngles
where
    I: IntoIterator<Item = &'a BiomechanicalAngles>,
{
    let mut sums = [0.0_f64; AngleKind::ALL.len()];
    let mut counts = [0_usize; AngleKind::ALL.len()];

    for sample in samples {
        for (i, kind) in AngleKind::ALL.iter().enumerate() {
            if let Some(value) = sample.get(*kind) {
                sums[i] += value;
                counts[i] += 1;
            }
        }
    }

    let mut result = BiomechanicalAngles::default();
    for (i, kind) in AngleKind::ALL.iter().enumerate() {
        if counts[i] > 0 {
            result.set(*kind, Some(sums[i] / counts[i] as f64));
        }
    }
    result
}

/// Most frequent known gait type; `Unknown` when there is none.
///
/// Ties resolve to the type seen first.
pub fn majority_vote_gait_type<I>(types: I) -> GaitType
where
    I: IntoIterator<Item = GaitType>,
{
    // insertion-ordered counts
    let mut counts: Vec<(GaitType, usize)> = Vec::with_capacity(3);
    for gait_type in types.into_iter().filter(|t| t.is_known()) {
        match counts.iter_mut().find(|(t, _)| *t == gait_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((gait_type, 1)),
        }
    }

    let mut best: Option<(GaitType, usize)> = None;
    for (gait_type, n) in counts {
        if best.map_or(true, |(_, max)| n > max) {
            best = Some((gait_type, n));
        }
    }
    best.map_or(GaitType::Unknown, |(t, _)| t)
}

/// Cadence in steps per minute from an ankle-y series (normalized or pixels,
/// y down) sampled at `fps`.
///
/// Requires at least [`MIN_CADENCE_SAMPLES`] samples and two detected steps.
pub fn calculate_stride_frequency(ankle_y: &[f64], fps: f64) -> Option<f64> {
    if ankle_y.len() < MIN_CADENCE_SAMPLES || !(fps > 0.0) {
        return None;
    }

    let inverted: Vec<f64> = ankle_y.iter().map(|y| -y).collect();
    let min_distance = ((PEAK_SPACING_SECONDS * fps) as usize).max(1);
    let peaks = find_peaks(&inverted, min_distance);
    if peaks.len() < 2 {
        return None;
    }

    let duration_seconds = ankle_y.len() as f64 / fps;
    Some(peaks.len() as f64 / duration_seconds * 60.0)
}

/// Indices of local maxima at least `min_distance` samples apart.
///
/// Flat peaks resolve to their middle sample. When two peaks are closer than
/// `min_distance` the higher one is kept, the later one on equal height, as
/// scipy's `find_peaks(distance=...)` does.
pub fn find_peaks(signal: &[f64], min_distance: usize) -> Vec<usize> {
    let n = signal.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if signal[i - 1] < signal[i] {
            // walk across a plateau
            let mut ahead = i;
            while ahead + 1 < n && signal[ahead + 1] == signal[i] {
                ahead += 1;
            }
            if ahead + 1 < n && signal[ahead + 1] < signal[i] {
                peaks.push((i + ahead) / 2);
                i = ahead;
            }
        }
        i += 1;
    }

    if min_distance <= 1 || peaks.len() < 2 {
        return peaks;
    }

    // suppress lower neighbours, highest peaks first, later before earlier
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| signal[peaks[b]].total_cmp(&signal[peaks[a]]).then(b.cmp(&a)));

    let mut keep = vec![true; peaks.len()];
    for &idx in &order {
        if !keep[idx] {
            continue;
        }
        for (other, kept) in keep.iter_mut().enumerate() {
            if other != idx && *kept && peaks[idx].abs_diff(peaks[other]) < min_distance {
                *kept = false;
            }
        }
    }

    peaks
        .into_iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}
