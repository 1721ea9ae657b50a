//! Landmark smoothing.
//!
//! Exponential moving average over each landmark's normalized position to
//! suppress frame-to-frame jitter from the pose estimator:
//!
//! `smoothed = α·raw + (1-α)·previous`
//!
//! Two variants:
//! - [`LandmarkSmoother`]: fixed α.
//! - [`AdaptiveLandmarkSmoother`]: α grows with raw displacement, so slow
//!   motion (stance) is smoothed harder and fast motion (swing) is tracked
//!   more tightly.
//!
//! Visibility always uses a fixed, more conservative weight so downstream
//! visibility gates do not flicker.
//!
//! All updates are O(1); state is one slot per [`Landmark`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{Landmark, LandmarkPoint, SmoothedLandmark};

/// Weight of the new visibility sample.
pub const VISIBILITY_ALPHA: f64 = 0.2;

/// Smoothing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Use the adaptive smoother instead of the fixed one.
    pub adaptive: bool,

    /// Fixed EMA weight of the new sample. Range: (0, 1].
    pub alpha: f64,

    /// Adaptive α at rest. Range: (0, 1].
    pub alpha_min: f64,

    /// Adaptive α at or above `motion_scale` displacement. Range: (0, 1].
    pub alpha_max: f64,

    /// Raw displacement (normalized units) that maps to `alpha_max`.
    pub motion_scale: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            adaptive: false,
            alpha: 0.5,
            alpha_min: 0.3,
            alpha_max: 0.8,
            motion_scale: 0.05,
        }
    }
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::unit_alpha("smoothing.alpha", self.alpha)?;
        ConfigError::unit_alpha("smoothing.alpha_min", self.alpha_min)?;
        ConfigError::unit_alpha("smoothing.alpha_max", self.alpha_max)?;
        ConfigError::positive("smoothing.motion_scale", self.motion_scale)?;
        if self.alpha_min > self.alpha_max {
            return Err(ConfigError::Inverted {
                lower: "smoothing.alpha_min",
                upper: "smoothing.alpha_max",
            });
        }
        Ok(())
    }
}

/// One EMA step for every channel of a landmark.
fn blend(prev: &SmoothedLandmark, raw: &LandmarkPoint, alpha: f64) -> SmoothedLandmark {
    SmoothedLandmark {
        x: alpha * raw.x + (1.0 - alpha) * prev.x,
        y: alpha * raw.y + (1.0 - alpha) * prev.y,
        z: alpha * raw.z + (1.0 - alpha) * prev.z,
        visibility: VISIBILITY_ALPHA * raw.visibility + (1.0 - VISIBILITY_ALPHA) * prev.visibility,
        raw_x: raw.x,
        raw_y: raw.y,
    }
}

/// Fixed-α exponential moving average smoother.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    alpha: f64,
    history: [Option<SmoothedLandmark>; Landmark::COUNT],
}

impl LandmarkSmoother {
    pub fn new(alpha: f64) -> Result<Self, ConfigError> {
        ConfigError::unit_alpha("smoothing.alpha", alpha)?;
        Ok(Self {
            alpha,
            history: [None; Landmark::COUNT],
        })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Smooth one landmark observation.
    ///
    /// The first observation of a landmark is returned unchanged.
    pub fn smooth(&mut self, landmark: Landmark, raw: &LandmarkPoint) -> SmoothedLandmark {
        let slot = &mut self.history[landmark.index()];
        let next = match slot {
            Some(prev) => blend(prev, raw, self.alpha),
            None => SmoothedLandmark::from_raw(raw),
        };
        *slot = Some(next);
        next
    }

    /// Last smoothed value of a landmark, if any.
    pub fn last(&self, landmark: Landmark) -> Option<&SmoothedLandmark> {
        self.history[landmark.index()].as_ref()
    }

    /// Forget all landmarks. Required between independent sequences.
    pub fn reset(&mut self) {
        self.history = [None; Landmark::COUNT];
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self {
            alpha: SmoothingConfig::default().alpha,
            history: [None; Landmark::COUNT],
        }
    }
}

/// EMA smoother whose α follows the speed of each landmark.
///
/// `α = α_min + clamp(disp / motion_scale, 0, 1) · (α_max - α_min)` where
/// `disp` is the planar raw displacement since the previous observation.
#[derive(Debug, Clone)]
pub struct AdaptiveLandmarkSmoother {
    alpha_min: f64,
    alpha_max: f64,
    motion_scale: f64,
    history: [Option<SmoothedLandmark>; Landmark::COUNT],
}

impl AdaptiveLandmarkSmoother {
    pub fn new(alpha_min: f64, alpha_max: f64, motion_scale: f64) -> Result<Self, ConfigError> {
        let config = SmoothingConfig {
            adaptive: true,
            alpha_min,
            alpha_max,
            motion_scale,
            ..SmoothingConfig::default()
        };
        config.validate()?;
        Ok(Self {
            alpha_min,
            alpha_max,
            motion_scale,
            history: [None; Landmark::COUNT],
        })
    }

    /// α for a given raw displacement.
    pub fn alpha_for(&self, displacement: f64) -> f64 {
        let motion = (displacement / self.motion_scale).clamp(0.0, 1.0);
        self.alpha_min + motion * (self.alpha_max - self.alpha_min)
    }

    pub fn smooth(&mut self, landmark: Landmark, raw: &LandmarkPoint) -> SmoothedLandmark {
        let next = match self.history[landmark.index()] {
            Some(prev) => {
                let displacement = (raw.x - prev.raw_x).hypot(raw.y - prev.raw_y);
                blend(&prev, raw, self.alpha_for(displacement))
            }
            None => SmoothedLandmark::from_raw(raw),
        };
        self.history[landmark.index()] = Some(next);
        next
    }

    pub fn last(&self, landmark: Landmark) -> Option<&SmoothedLandmark> {
        self.history[landmark.index()].as_ref()
    }

    pub fn reset(&mut self) {
        self.history = [None; Landmark::COUNT];
    }
}

impl Default for AdaptiveLandmarkSmoother {
    fn default() -> Self {
        let config = SmoothingConfig::default();
        Self {
            alpha_min: config.alpha_min,
            alpha_max: config.alpha_max,
            motion_scale: config.motion_scale,
            history: [None; Landmark::COUNT],
        }
    }
}

/// Either smoother, selected by [`SmoothingConfig::adaptive`].
#[derive(Debug, Clone)]
pub enum Smoother {
    Fixed(LandmarkSmoother),
    Adaptive(AdaptiveLandmarkSmoother),
}

impl Smoother {
    pub fn from_config(config: &SmoothingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.adaptive {
            AdaptiveLandmarkSmoother::new(config.alpha_min, config.alpha_max, config.motion_scale)
                .map(Smoother::Adaptive)
        } else {
            LandmarkSmoother::new(config.alpha).map(Smoother::Fixed)
        }
    }

    pub fn smooth(&mut self, landmark: Landmark, raw: &LandmarkPoint) -> SmoothedLandmark {
        match self {
            Smoother::Fixed(s) => s.smooth(landmark, raw),
            Smoother::Adaptive(s) => s.smooth(landmark, raw),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Smoother::Fixed(s) => s.reset(),
            Smoother::Adaptive(s) => s.reset(),
        }
    }
}
