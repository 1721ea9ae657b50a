//! Gait cycle phase state machine.
//!
//! Drives one foot through the running gait cycle, one frame per update:
//!
//! ```text
//! SWING ──contact──▶ CONTACT ──2 frames──▶ STANCE ──toe-off / 20 frames──▶ TOE_OFF ──2 frames──▶ SWING
//! ```
//!
//! The foot strike classifier runs on the `SWING → CONTACT` transition and
//! nowhere else, so every physical footstrike yields exactly one
//! classification. The stance timeout keeps a missed toe-off from stalling
//! the cycle. Completing `TOE_OFF → SWING` counts one cycle.
//!
//! A frame missing any of the side's ankle, heel, toe or knee is a no-op:
//! phase, counters and sub-trackers are left untouched.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::classifier::FootStrikeClassifier;
use crate::config::GaitConfig;
use crate::contact::GroundContactDetector;
use crate::error::ConfigError;
use crate::types::{
    GaitClassification, GaitPhase, GaitStatistics, Joint, LandmarkFrame, Side, VelocityData,
};
use crate::velocity::VelocityTracker;

/// Phase timing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Frames spent in CONTACT before STANCE.
    pub contact_frames: u32,

    /// Frames in STANCE after which TOE_OFF is forced.
    pub stance_timeout_frames: u32,

    /// Frames spent in TOE_OFF before SWING.
    pub toe_off_frames: u32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            contact_frames: 2,
            stance_timeout_frames: 20,
            toe_off_frames: 2,
        }
    }
}

impl CycleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::at_least("cycle.contact_frames", self.contact_frames as usize, 1)?;
        ConfigError::at_least("cycle.stance_timeout_frames", self.stance_timeout_frames as usize, 1)?;
        ConfigError::at_least("cycle.toe_off_frames", self.toe_off_frames as usize, 1)
    }
}

/// Result of one state machine update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseUpdate {
    pub frame_number: u64,
    pub side: Side,
    /// Phase after this frame.
    pub phase: GaitPhase,
    /// Phase before this frame.
    pub previous_phase: GaitPhase,
    /// Present only on the frame that entered CONTACT.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<GaitClassification>,
    /// True when required landmarks were missing and nothing was updated.
    pub skipped: bool,
}

impl PhaseUpdate {
    pub fn transitioned(&self) -> bool {
        self.phase != self.previous_phase
    }
}

/// Phase tracker and contact classifier for one foot.
#[derive(Debug, Clone)]
pub struct GaitCycleStateMachine {
    side: Side,
    cycle: CycleConfig,
    fps: f64,

    // Sub-trackers
    velocity: VelocityTracker,
    contact: GroundContactDetector,
    classifier: FootStrikeClassifier,

    // Phase state
    phase: GaitPhase,
    frames_in_phase: u32,

    // Statistics
    total_cycles: u64,
    total_contacts: u64,
    successful_classifications: u64,
    confidence_sum: f64,
    last_classification: Option<GaitClassification>,
}

impl GaitCycleStateMachine {
    /// Creates a state machine for `side` in the initial SWING phase.
    pub fn new(side: Side, config: &GaitConfig) -> Result<Self, ConfigError> {
        config.cycle.validate()?;
        ConfigError::positive("fps", config.fps)?;
        Ok(Self {
            side,
            cycle: config.cycle.clone(),
            fps: config.fps,
            velocity: VelocityTracker::new(&config.velocity, 1.0 / config.fps)?,
            contact: GroundContactDetector::new(config.contact.clone())?,
            classifier: FootStrikeClassifier::new(config.classifier.clone())?,
            phase: GaitPhase::Swing,
            frames_in_phase: 0,
            total_cycles: 0,
            total_contacts: 0,
            successful_classifications: 0,
            confidence_sum: 0.0,
            last_classification: None,
        })
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn phase(&self) -> GaitPhase {
        self.phase
    }

    pub fn frames_in_phase(&self) -> u32 {
        self.frames_in_phase
    }

    /// Most recent classification, if any contact has occurred.
    pub fn last_classification(&self) -> Option<&GaitClassification> {
        self.last_classification.as_ref()
    }

    /// Advance the machine by one frame.
    pub fn update(&mut self, frame: &LandmarkFrame) -> PhaseUpdate {
        let previous_phase = self.phase;

        let required = [Joint::Heel, Joint::Toe, Joint::Knee];
        let ankle_landmark = self.side.landmark(Joint::Ankle);
        let ankle = match frame.get(ankle_landmark) {
            Some(point) if required.iter().all(|j| frame.contains(self.side.landmark(*j))) => *point,
            _ => {
                trace!(side = %self.side, frame = frame.frame_number, "required landmarks missing, skipping");
                return PhaseUpdate {
                    frame_number: frame.frame_number,
                    side: self.side,
                    phase: self.phase,
                    previous_phase,
                    classification: None,
                    skipped: true,
                };
            }
        };
        let ankle_px = frame.to_pixel(&ankle);
        let timestamp = frame.frame_number as f64 / self.fps;
        let velocity = self.velocity.update(ankle_px, timestamp);

        let mut classification = None;
        match self.phase {
            GaitPhase::Swing => {
                if let Some(v) = velocity {
                    if self.contact.detect_contact(&ankle, &v, frame.image_height) {
                        self.transition(GaitPhase::Contact, frame.frame_number);
                        classification = Some(self.classify_contact(frame, &v));
                    }
                }
            }
            GaitPhase::Contact => {
                self.frames_in_phase += 1;
                if self.frames_in_phase >= self.cycle.contact_frames {
                    self.transition(GaitPhase::Stance, frame.frame_number);
                }
            }
            GaitPhase::Stance => {
                self.frames_in_phase += 1;
                let toe_off = velocity.is_some_and(|v| self.contact.detect_toe_off(&ankle, &v));
                if toe_off || self.frames_in_phase >= self.cycle.stance_timeout_frames {
                    if !toe_off {
                        debug!(side = %self.side, frame = frame.frame_number, "stance timeout, forcing toe-off");
                    }
                    self.transition(GaitPhase::ToeOff, frame.frame_number);
                }
            }
            GaitPhase::ToeOff => {
                self.frames_in_phase += 1;
                if self.frames_in_phase >= self.cycle.toe_off_frames {
                    self.transition(GaitPhase::Swing, frame.frame_number);
                    self.total_cycles += 1;
                }
            }
        }

        PhaseUpdate {
            frame_number: frame.frame_number,
            side: self.side,
            phase: self.phase,
            previous_phase,
            classification,
            skipped: false,
        }
    }

    fn transition(&mut self, to: GaitPhase, frame_number: u64) {
        debug_assert_eq!(self.phase.next(), to, "phase transitions must follow the cycle");
        debug!(side = %self.side, frame = frame_number, from = %self.phase, to = %to, "phase transition");
        self.phase = to;
        self.frames_in_phase = 0;
    }

    fn classify_contact(&mut self, frame: &LandmarkFrame, velocity: &VelocityData) -> GaitClassification {
        let mut classification = self.classifier.classify_frame(frame, self.side);
        if classification.is_successful() && self.contact.detect_impact(velocity) {
            classification.reasoning.push_str("; impact deceleration at contact");
        }

        self.total_contacts += 1;
        if classification.is_successful() {
            self.successful_classifications += 1;
            self.confidence_sum += classification.confidence;
        }
        self.last_classification = Some(classification.clone());
        classification
    }

    /// Aggregate counters for this side.
    pub fn statistics(&self) -> GaitStatistics {
        let success_rate = if self.total_contacts > 0 {
            self.successful_classifications as f64 / self.total_contacts as f64 * 100.0
        } else {
            0.0
        };
        let average_confidence = if self.successful_classifications > 0 {
            self.confidence_sum / self.successful_classifications as f64
        } else {
            0.0
        };
        GaitStatistics {
            total_cycles: self.total_cycles,
            total_contacts: self.total_contacts,
            successful_classifications: self.successful_classifications,
            success_rate,
            average_confidence,
            current_phase: self.phase,
        }
    }

    /// Return to SWING with all counters and sub-trackers cleared.
    pub fn reset(&mut self) {
        self.velocity.reset();
        self.contact.reset();
        self.phase = GaitPhase::Swing;
        self.frames_in_phase = 0;
        self.total_cycles = 0;
        self.total_contacts = 0;
        self.successful_classifications = 0;
        self.confidence_sum = 0.0;
        self.last_classification = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GaitType, Landmark, LandmarkPoint};

    const W: u32 = 1280;
    const H: u32 = 720;

    /// Right leg with the ankle at normalized height `ankle_y`; foot geometry
    /// matches a heel strike.
    fn leg_frame(frame_number: u64, ankle_y: f64) -> LandmarkFrame {
        let px = |x: f64, y: f64| LandmarkPoint::new(x / W as f64, y / H as f64, 0.0, 0.9);
        let ay = ankle_y * H as f64;
        LandmarkFrame::new(frame_number, W, H)
            .with(Landmark::RightKnee, px(508.0, ay - 40.0))
            .with(Landmark::RightAnkle, px(505.0, ay))
            .with(Landmark::RightHeel, px(500.0, ay + 40.0))
            .with(Landmark::RightFootIndex, px(510.0, ay + 20.0))
    }

    fn machine() -> GaitCycleStateMachine {
        GaitCycleStateMachine::new(Side::Right, &GaitConfig::default()).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let sm = machine();
        assert_eq!(sm.phase(), GaitPhase::Swing);
        assert_eq!(sm.statistics().total_cycles, 0);
        assert!(sm.last_classification().is_none());
    }

    #[test]
    fn test_contact_emits_one_classification() {
        let mut sm = machine();
        let first = sm.update(&leg_frame(0, 0.8));
        assert_eq!(first.phase, GaitPhase::Swing);

        let second = sm.update(&leg_frame(1, 0.8));
        assert_eq!(second.previous_phase, GaitPhase::Swing);
        assert_eq!(second.phase, GaitPhase::Contact);
        let classification = second.classification.unwrap();
        assert_eq!(classification.gait_type, GaitType::HeelStrike);
        assert_eq!(classification.contact_frame, 1);

        // no further classification until the next cycle's contact, which
        // waits out the cooldown in SWING
        for n in 2..36 {
            assert!(sm.update(&leg_frame(n, 0.8)).classification.is_none(), "frame {n}");
        }
        let next = sm.update(&leg_frame(36, 0.8));
        assert_eq!(next.phase, GaitPhase::Contact);
        assert_eq!(next.classification.unwrap().contact_frame, 36);
        assert_eq!(sm.statistics().total_contacts, 2);
    }

    #[test]
    fn test_full_cycle_by_timeout() {
        let mut sm = machine();
        let mut trace = Vec::new();
        for n in 0..30 {
            trace.push(sm.update(&leg_frame(n, 0.8)).phase);
        }
        // frame 1 contact, 2 in contact, 3 stance, stance timeout after 20 frames
        assert_eq!(trace[1], GaitPhase::Contact);
        assert_eq!(trace[2], GaitPhase::Contact);
        assert_eq!(trace[3], GaitPhase::Stance);
        assert_eq!(trace[22], GaitPhase::Stance);
        assert_eq!(trace[23], GaitPhase::ToeOff);
        assert_eq!(trace[24], GaitPhase::ToeOff);
        assert_eq!(trace[25], GaitPhase::Swing);
        assert_eq!(sm.statistics().total_cycles, 1);
    }

    #[test]
    fn test_toe_off_on_upward_motion() {
        let mut sm = machine();
        sm.update(&leg_frame(0, 0.8));
        sm.update(&leg_frame(1, 0.8));
        sm.update(&leg_frame(2, 0.8));
        assert_eq!(sm.update(&leg_frame(3, 0.8)).phase, GaitPhase::Stance);

        // foot lifts quickly: 10px up per frame = 300 px/s at 30 fps
        let mut y = 0.8;
        let mut phase = GaitPhase::Stance;
        for n in 4..8 {
            y -= 10.0 / H as f64;
            phase = sm.update(&leg_frame(n, y)).phase;
            if phase == GaitPhase::ToeOff {
                break;
            }
        }
        assert_eq!(phase, GaitPhase::ToeOff);
    }

    #[test]
    fn test_missing_landmark_is_noop() {
        let mut sm = machine();
        sm.update(&leg_frame(0, 0.8));
        let mut partial = leg_frame(1, 0.8);
        partial.remove(Landmark::RightHeel);

        let update = sm.update(&partial);
        assert!(update.skipped);
        assert!(!update.transitioned());
        assert_eq!(sm.phase(), GaitPhase::Swing);
        assert_eq!(sm.frames_in_phase(), 0);
        assert_eq!(sm.statistics().total_contacts, 0);
    }

    #[test]
    fn test_no_contact_high_in_frame() {
        let mut sm = machine();
        for n in 0..20 {
            assert_eq!(sm.update(&leg_frame(n, 0.3)).phase, GaitPhase::Swing);
        }
    }

    #[test]
    fn test_low_visibility_contact_counts_as_unsuccessful() {
        let mut sm = machine();
        let mut frames = vec![leg_frame(0, 0.8), leg_frame(1, 0.8)];
        for f in frames.iter_mut() {
            let mut heel = *f.get(Landmark::RightHeel).unwrap();
            heel.visibility = 0.3;
            f.set(Landmark::RightHeel, heel);
        }
        sm.update(&frames[0]);
        let update = sm.update(&frames[1]);
        let classification = update.classification.unwrap();
        assert_eq!(classification.gait_type, GaitType::Unknown);

        let stats = sm.statistics();
        assert_eq!(stats.total_contacts, 1);
        assert_eq!(stats.successful_classifications, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_statistics_average_confidence() {
        let mut sm = machine();
        for n in 0..2 {
            sm.update(&leg_frame(n, 0.8));
        }
        let stats = sm.statistics();
        assert_eq!(stats.successful_classifications, 1);
        assert_eq!(stats.success_rate, 100.0);
        assert!(stats.average_confidence >= 70.0);
        assert_eq!(stats.current_phase, GaitPhase::Contact);
    }

    #[test]
    fn test_reset() {
        let mut sm = machine();
        for n in 0..10 {
            sm.update(&leg_frame(n, 0.8));
        }
        sm.reset();
        assert_eq!(sm.phase(), GaitPhase::Swing);
        assert_eq!(sm.statistics().total_contacts, 0);
        assert!(sm.last_classification().is_none());
    }
}
