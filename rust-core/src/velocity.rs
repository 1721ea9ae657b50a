//! Windowed finite-difference velocity and vertical acceleration.
//!
//! Velocity is the displacement between the oldest and newest buffered
//! position divided by their time delta. Spanning the whole window instead
//! of differencing adjacent frames averages out per-frame jitter.
//!
//! Vertical acceleration is the change between the oldest and newest
//! buffered vertical velocity over `samples × nominal_frame_time`.
//!
//! Both buffers have fixed capacity; the tracker never allocates after
//! construction.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ring::RingBuffer;
use crate::types::{PixelPoint, VelocityData};

/// Velocity tracking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Positions (and velocities) kept in the window.
    pub window_size: usize,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self { window_size: 5 }
    }
}

impl VelocityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::at_least("velocity.window_size", self.window_size, 2)
    }
}

/// Tracks one point's velocity over a sliding window.
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    positions: RingBuffer<(f64, f64, f64)>,
    velocities_y: RingBuffer<f64>,
    nominal_frame_time: f64,
}

impl VelocityTracker {
    /// `nominal_frame_time` is the expected seconds between frames (1 / fps).
    pub fn new(config: &VelocityConfig, nominal_frame_time: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        ConfigError::positive("nominal_frame_time", nominal_frame_time)?;
        Ok(Self {
            positions: RingBuffer::new(config.window_size),
            velocities_y: RingBuffer::new(config.window_size),
            nominal_frame_time,
        })
    }

    /// Add a position (pixels) observed at `timestamp` (seconds).
    ///
    /// Returns `None` until two positions are buffered. A zero time span
    /// yields zero velocity and acceleration.
    pub fn update(&mut self, position: PixelPoint, timestamp: f64) -> Option<VelocityData> {
        self.positions.push((position.x, position.y, timestamp));
        if self.positions.len() < 2 {
            return None;
        }

        let (x0, y0, t0) = self.positions.oldest()?;
        let (x1, y1, t1) = self.positions.newest()?;
        let dt = t1 - t0;
        if dt <= 0.0 {
            return Some(VelocityData::zero());
        }

        let velocity_x = (x1 - x0) / dt;
        let velocity_y = (y1 - y0) / dt;
        self.velocities_y.push(velocity_y);

        Some(VelocityData {
            velocity_x,
            velocity_y,
            speed: velocity_x.hypot(velocity_y),
            acceleration_y: self.vertical_acceleration(),
        })
    }

    fn vertical_acceleration(&self) -> f64 {
        let samples = self.velocities_y.len();
        if samples < 2 {
            return 0.0;
        }
        match (self.velocities_y.oldest(), self.velocities_y.newest()) {
            (Some(first), Some(last)) => (last - first) / (samples as f64 * self.nominal_frame_time),
            _ => 0.0,
        }
    }

    /// Positions currently buffered.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn reset(&mut self) {
        self.positions.clear();
        self.velocities_y.clear();
    }
}

impl Default for VelocityTracker {
    fn default() -> Self {
        let config = VelocityConfig::default();
        Self {
            positions: RingBuffer::new(config.window_size),
            velocities_y: RingBuffer::new(config.window_size),
            nominal_frame_time: 1.0 / 30.0,
        }
    }
}
