//! Frame-by-frame gait analysis pipeline.
//!
//! Orchestrates the full data flow from raw pose landmarks to per-frame
//! phase updates and session aggregates.
//!
//! # Architecture
//!
//! Each frame passes through, in order:
//! 1. **Outlier filtering**: per-landmark median rejection of tracking glitches
//! 2. **Smoothing**: fixed or adaptive EMA over normalized positions
//! 3. **Angles**: knee, ankle, hip and trunk angles in pixel space
//! 4. **Gait cycle**: one state machine per tracked side, classifying each contact
//!
//! Missing landmarks never fail a frame. They show up as absent angles and
//! skipped phase updates, and count against the detection rate. Landmarks
//! with non-finite coordinates are treated as missing.
//!
//! # Memory
//! Session aggregates use fixed-capacity windows; a long session holds no
//! more history than a short one.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::aggregate::{aggregate_angles, calculate_stride_frequency, majority_vote_gait_type};
use crate::angles::calculate_biomechanical_angles;
use crate::config::GaitConfig;
use crate::error::ConfigError;
use crate::gait_cycle::{GaitCycleStateMachine, PhaseUpdate};
use crate::outlier::OutlierFilter;
use crate::ring::RingBuffer;
use crate::smoothing::Smoother;
use crate::types::{BiomechanicalAngles, GaitStatistics, GaitType, Joint, LandmarkFrame, Side};

/// Share of frames (percent) that should contain a usable pose.
pub const DETECTION_RATE_TARGET: f64 = 85.0;

/// Per-frame processing budget in microseconds.
pub const LATENCY_BUDGET_US: u64 = 150_000;

/// Joints a side needs for its state machine to advance.
const REQUIRED_JOINTS: [Joint; 4] = [Joint::Ankle, Joint::Heel, Joint::Toe, Joint::Knee];

/// Output for one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub frame_number: u64,
    pub timestamp_s: f64,
    /// At least one tracked side had all required landmarks.
    pub pose_detected: bool,
    pub angles: BiomechanicalAngles,
    /// One entry per tracked side, in configuration order.
    pub updates: Vec<PhaseUpdate>,
}

impl FrameAnalysis {
    /// Classifications produced on this frame.
    pub fn classifications(&self) -> impl Iterator<Item = &crate::types::GaitClassification> {
        self.updates.iter().filter_map(|u| u.classification.as_ref())
    }
}

/// Per-side section of a [`SessionReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideReport {
    pub side: Side,
    pub statistics: GaitStatistics,
    /// Steps per minute from the recent ankle trajectory.
    pub cadence_spm: Option<f64>,
}

/// Session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub frames_processed: u64,
    pub frames_with_pose: u64,
    /// Percent of frames with a usable pose.
    pub detection_rate: f64,
    pub meets_detection_target: bool,
    pub mean_latency_us: f64,
    pub max_latency_us: u64,
    pub within_latency_budget: bool,
    /// Landmark samples replaced by the outlier filter.
    pub outliers_rejected: u64,
    pub dominant_gait_type: GaitType,
    /// Mean angles over the recent angle window.
    pub average_angles: BiomechanicalAngles,
    /// Mean cadence across sides that have one.
    pub cadence_spm: Option<f64>,
    pub sides: Vec<SideReport>,
}

/// Per-side analysis state.
#[derive(Debug, Clone)]
struct SideTrack {
    machine: GaitCycleStateMachine,
    ankle_y: RingBuffer<f64>,
}

/// Streaming gait analyzer.
///
/// Feed frames in order with [`process_frame`](GaitAnalyzer::process_frame);
/// read aggregates at any point with [`report`](GaitAnalyzer::report).
#[derive(Debug, Clone)]
pub struct GaitAnalyzer {
    config: GaitConfig,

    // Processing stages
    outlier: OutlierFilter,
    smoother: Smoother,
    sides: Vec<SideTrack>,

    // Rolling windows
    angles: RingBuffer<BiomechanicalAngles>,
    classifications: RingBuffer<GaitType>,

    // Session counters
    frames_processed: u64,
    frames_with_pose: u64,
    latency_total_us: u64,
    latency_max_us: u64,
}

impl GaitAnalyzer {
    pub fn new(mut config: GaitConfig) -> Result<Self, ConfigError> {
        config.dedup_sides();
        config.validate()?;

        let sides = config
            .sides
            .iter()
            .map(|&side| {
                Ok(SideTrack {
                    machine: GaitCycleStateMachine::new(side, &config)?,
                    ankle_y: RingBuffer::new(config.aggregation.cadence_window),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        debug!(fps = config.fps, sides = ?config.sides, adaptive = config.smoothing.adaptive, "analyzer ready");

        Ok(Self {
            outlier: OutlierFilter::new(config.outlier.clone())?,
            smoother: Smoother::from_config(&config.smoothing)?,
            sides,
            angles: RingBuffer::new(config.aggregation.angle_window),
            classifications: RingBuffer::new(config.aggregation.classification_window),
            frames_processed: 0,
            frames_with_pose: 0,
            latency_total_us: 0,
            latency_max_us: 0,
            config,
        })
    }

    pub fn config(&self) -> &GaitConfig {
        &self.config
    }

    /// Runs one frame through every stage.
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> FrameAnalysis {
        let started = Instant::now();

        // Stage 1 + 2: outlier rejection, then smoothing
        let mut cleaned = LandmarkFrame::new(frame.frame_number, frame.image_width, frame.image_height);
        for (landmark, point) in frame.iter() {
            if !(point.x.is_finite() && point.y.is_finite() && point.visibility.is_finite()) {
                trace!(landmark = %landmark, frame = frame.frame_number, "dropping non-finite landmark");
                continue;
            }
            let filtered = self.outlier.filter(landmark, point);
            let smoothed = self.smoother.smooth(landmark, &filtered);
            cleaned.set(landmark, smoothed.point());
        }

        // Stage 3: joint angles
        let angles = calculate_biomechanical_angles(&cleaned);
        if !angles.is_empty() {
            self.angles.push(angles);
        }

        // Stage 4: per-side state machines
        let mut pose_detected = false;
        let mut updates = Vec::with_capacity(self.sides.len());
        for track in &mut self.sides {
            let side = track.machine.side();
            if REQUIRED_JOINTS.iter().all(|j| cleaned.contains(side.landmark(*j))) {
                pose_detected = true;
            }
            if let Some(ankle) = cleaned.get(side.landmark(Joint::Ankle)) {
                track.ankle_y.push(ankle.y);
            }

            let update = track.machine.update(&cleaned);
            if let Some(classification) = &update.classification {
                self.classifications.push(classification.gait_type);
            }
            updates.push(update);
        }

        self.frames_processed += 1;
        if pose_detected {
            self.frames_with_pose += 1;
        }

        let elapsed_us = started.elapsed().as_micros() as u64;
        self.latency_total_us += elapsed_us;
        self.latency_max_us = self.latency_max_us.max(elapsed_us);
        trace!(frame = frame.frame_number, pose_detected, elapsed_us, "frame processed");

        FrameAnalysis {
            frame_number: frame.frame_number,
            timestamp_s: frame.frame_number as f64 / self.config.fps,
            pose_detected,
            angles,
            updates,
        }
    }

    /// Percent of processed frames with a usable pose; 0 before any frame.
    pub fn detection_rate(&self) -> f64 {
        if self.frames_processed == 0 {
            0.0
        } else {
            self.frames_with_pose as f64 / self.frames_processed as f64 * 100.0
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn outliers_rejected(&self) -> u64 {
        self.outlier.rejected_count()
    }

    /// Statistics of the state machine for `side`, if tracked.
    pub fn statistics(&self, side: Side) -> Option<GaitStatistics> {
        self.track(side).map(|t| t.machine.statistics())
    }

    /// Cadence for `side` from its recent ankle trajectory.
    pub fn cadence(&self, side: Side) -> Option<f64> {
        let track = self.track(side)?;
        let series: Vec<f64> = track.ankle_y.iter().collect();
        calculate_stride_frequency(&series, self.config.fps)
    }

    /// Dominant strike pattern over the recent contacts of all sides.
    pub fn dominant_gait_type(&self) -> GaitType {
        majority_vote_gait_type(self.classifications.iter())
    }

    /// Mean angles over the recent window.
    pub fn average_angles(&self) -> BiomechanicalAngles {
        let window: Vec<BiomechanicalAngles> = self.angles.iter().collect();
        aggregate_angles(&window)
    }

    /// Summary of the session so far.
    pub fn report(&self) -> SessionReport {
        let sides: Vec<SideReport> = self
            .sides
            .iter()
            .map(|track| {
                let side = track.machine.side();
                SideReport {
                    side,
                    statistics: track.machine.statistics(),
                    cadence_spm: self.cadence(side),
                }
            })
            .collect();

        let cadences: Vec<f64> = sides.iter().filter_map(|s| s.cadence_spm).collect();
        let cadence_spm = if cadences.is_empty() {
            None
        } else {
            Some(cadences.iter().sum::<f64>() / cadences.len() as f64)
        };

        let mean_latency_us = if self.frames_processed == 0 {
            0.0
        } else {
            self.latency_total_us as f64 / self.frames_processed as f64
        };
        let detection_rate = self.detection_rate();

        SessionReport {
            frames_processed: self.frames_processed,
            frames_with_pose: self.frames_with_pose,
            detection_rate,
            meets_detection_target: detection_rate >= DETECTION_RATE_TARGET,
            mean_latency_us,
            max_latency_us: self.latency_max_us,
            within_latency_budget: self.latency_max_us <= LATENCY_BUDGET_US,
            outliers_rejected: self.outlier.rejected_count(),
            dominant_gait_type: self.dominant_gait_type(),
            average_angles: self.average_angles(),
            cadence_spm,
            sides,
        }
    }

    /// Clears all state; the next frame is treated as the first.
    pub fn reset(&mut self) {
        self.outlier.reset();
        self.smoother.reset();
        for track in &mut self.sides {
            track.machine.reset();
            track.ankle_y.clear();
        }
        self.angles.clear();
        self.classifications.clear();
        self.frames_processed = 0;
        self.frames_with_pose = 0;
        self.latency_total_us = 0;
        self.latency_max_us = 0;
    }

    // ===== PRIVATE METHODS =====

    fn track(&self, side: Side) -> Option<&SideTrack> {
        self.sides.iter().find(|t| t.machine.side() == side)
    }
}
