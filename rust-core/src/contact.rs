//! Ground contact and toe-off detection.
//!
//! Heuristic per-frame checks on the tracked foot landmark:
//!
//! - **Contact**: foot low in the frame, nearly no vertical motion, and
//!   reliably detected. A positive result arms a cooldown so one physical
//!   footstrike cannot register as several contacts.
//! - **Toe-off**: strong upward vertical velocity with enough overall speed.
//!   No cooldown; stance duration already bounds how often this is asked.
//!
//! Velocities are in pixels/second with image y pointing down, so upward
//! motion has negative `velocity_y`.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ConfigError;
use crate::types::{LandmarkPoint, VelocityData};

/// Contact detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    /// The foot must be below this fraction of the frame height.
    /// Range: [0, 1]. Typical: 0.65.
    pub height_threshold: f64,

    /// Maximum |velocity_y| (px/s) for a contact.
    pub velocity_threshold: f64,

    /// Minimum landmark visibility for a contact.
    pub min_visibility: f64,

    /// Contact checks suppressed after a positive detection.
    pub min_cooldown_frames: u32,

    /// Toe-off requires velocity_y below minus this value (px/s).
    pub toe_off_velocity_threshold: f64,

    /// Toe-off requires speed above this value (px/s).
    pub toe_off_speed_threshold: f64,

    /// Vertical deceleration (px/s²) regarded as an impact.
    pub impact_acceleration_threshold: f64,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            height_threshold: 0.65,
            velocity_threshold: 50.0,
            min_visibility: 0.5,
            min_cooldown_frames: 10,
            toe_off_velocity_threshold: 50.0,
            toe_off_speed_threshold: 80.0,
            impact_acceleration_threshold: 500.0,
        }
    }
}

impl ContactConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::unit_interval("contact.height_threshold", self.height_threshold)?;
        ConfigError::positive("contact.velocity_threshold", self.velocity_threshold)?;
        ConfigError::unit_interval("contact.min_visibility", self.min_visibility)?;
        ConfigError::positive("contact.toe_off_velocity_threshold", self.toe_off_velocity_threshold)?;
        ConfigError::positive("contact.toe_off_speed_threshold", self.toe_off_speed_threshold)?;
        ConfigError::positive(
            "contact.impact_acceleration_threshold",
            self.impact_acceleration_threshold,
        )
    }
}

/// Debounced ground-contact detector for one foot.
#[derive(Debug, Clone)]
pub struct GroundContactDetector {
    config: ContactConfig,
    cooldown: u32,
}

impl GroundContactDetector {
    pub fn new(config: ContactConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, cooldown: 0 })
    }

    pub fn config(&self) -> &ContactConfig {
        &self.config
    }

    /// Is this frame a ground-contact instant?
    ///
    /// `landmark` is in normalized coordinates; `velocity` in px/s.
    /// While the cooldown is armed every call returns false and counts it down.
    pub fn detect_contact(
        &mut self,
        landmark: &LandmarkPoint,
        velocity: &VelocityData,
        image_height: u32,
    ) -> bool {
        if self.cooldown > 0 {
            self.cooldown -= 1;
            return false;
        }

        let height = image_height as f64;
        let is_low = landmark.y * height > self.config.height_threshold * height;
        let is_still = velocity.velocity_y.abs() < self.config.velocity_threshold;
        let is_visible = landmark.visibility > self.config.min_visibility;

        trace!(is_low, is_still, is_visible, velocity_y = velocity.velocity_y, "contact check");

        if is_low && is_still && is_visible {
            self.cooldown = self.config.min_cooldown_frames;
            true
        } else {
            false
        }
    }

    /// Is the foot pushing off the ground?
    pub fn detect_toe_off(&self, _landmark: &LandmarkPoint, velocity: &VelocityData) -> bool {
        velocity.velocity_y < -self.config.toe_off_velocity_threshold
            && velocity.speed > self.config.toe_off_speed_threshold
    }

    /// Did the foot decelerate sharply (landing impact)?
    ///
    /// A falling foot has positive velocity_y; stopping it gives strongly
    /// negative acceleration_y.
    pub fn detect_impact(&self, velocity: &VelocityData) -> bool {
        velocity.acceleration_y < -self.config.impact_acceleration_threshold
    }

    /// Remaining suppressed contact checks.
    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown
    }

    pub fn reset(&mut self) {
        self.cooldown = 0;
    }
}

impl Default for GroundContactDetector {
    fn default() -> Self {
        Self {
            config: ContactConfig::default(),
            cooldown: 0,
        }
    }
}
