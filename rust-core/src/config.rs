//! Analyzer configuration.
//!
//! [`GaitConfig`] bundles one sub-config per component into a single package
//! for the whole processing flow. Every field has a default, and a TOML file
//! only needs to name the values it overrides:
//!
//! ```toml
//! fps = 60.0
//! sides = ["left", "right"]
//!
//! [smoothing]
//! adaptive = true
//!
//! [contact]
//! height_threshold = 0.7
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::AggregationConfig;
use crate::classifier::ClassifierConfig;
use crate::contact::ContactConfig;
use crate::error::{ConfigError, Result};
use crate::gait_cycle::CycleConfig;
use crate::outlier::OutlierConfig;
use crate::smoothing::SmoothingConfig;
use crate::types::Side;
use crate::velocity::VelocityConfig;

/// Configuration for the complete analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// Video frame rate. Frame timestamps are `frame_number / fps`.
    pub fps: f64,

    /// Sides with their own state machine.
    pub sides: Vec<Side>,

    /// Landmark smoothing (fixed or adaptive EMA).
    pub smoothing: SmoothingConfig,

    /// Median outlier rejection ahead of smoothing.
    pub outlier: OutlierConfig,

    /// Ankle velocity window.
    pub velocity: VelocityConfig,

    /// Ground contact and toe-off thresholds.
    pub contact: ContactConfig,

    /// Phase timing.
    pub cycle: CycleConfig,

    /// Foot strike scoring thresholds and weights.
    pub classifier: ClassifierConfig,

    /// Rolling window sizes for session aggregates.
    pub aggregation: AggregationConfig,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            sides: vec![Side::Right], // camera on the runner's right
            smoothing: SmoothingConfig::default(),
            outlier: OutlierConfig::default(),
            velocity: VelocityConfig::default(),
            contact: ContactConfig::default(),
            cycle: CycleConfig::default(),
            classifier: ClassifierConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl GaitConfig {
    /// Checks every sub-config.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        ConfigError::positive("fps", self.fps)?;
        if self.sides.is_empty() {
            return Err(ConfigError::NoSides);
        }
        self.smoothing.validate()?;
        self.outlier.validate()?;
        self.velocity.validate()?;
        self.contact.validate()?;
        self.cycle.validate()?;
        self.classifier.validate()?;
        self.aggregation.validate()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let mut config: GaitConfig = toml::from_str(source)?;
        config.dedup_sides();
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading configuration");
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Drops repeated sides, keeping first occurrence order.
    pub fn dedup_sides(&mut self) {
        let mut seen = Vec::with_capacity(self.sides.len());
        self.sides.retain(|side| {
            if seen.contains(side) {
                false
            } else {
                seen.push(*side);
                true
            }
        });
    }
}
