//! Foot strike classification at ground contact.
//!
//! Four independent geometric criteria are scored at the contact frame,
//! heel-strike-favoring positive and forefoot-favoring negative:
//!
//! 1. Vertical ratio `heel.y / toe.y` (heel lower than toe → heel strike).
//! 2. Horizontal offset `toe.x - knee.x` (foot ahead of knee → extended leg).
//! 3. Interior ankle angle between the knee and toe arms.
//! 4. Vertical knee-ankle gap, a half-weight knee-flexion proxy.
//!
//! `total > 1.5` is a heel strike, `total < -1.5` a forefoot strike, anything
//! between a midfoot strike. Confidence is
//! `min(60 + |total|/4 · 35, 95)`, plus 10 when at least three criteria are
//! non-zero, clamped to [0, 100].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::angles::angle_between;
use crate::error::ConfigError;
use crate::types::{
    Criterion, GaitClassification, GaitType, Joint, LandmarkFrame, PixelPoint, Side,
    StrikeMeasurements,
};

/// Thresholds and confidence constants of the foot strike scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Minimum visibility of heel, toe, ankle and knee.
    pub min_visibility: f64,

    /// heel.y / toe.y at or above this favors heel strike.
    pub heel_ratio_threshold: f64,
    /// heel.y / toe.y at or below this favors forefoot strike.
    pub forefoot_ratio_threshold: f64,

    /// toe.x - knee.x above this (px) favors heel strike.
    pub extended_offset_px: f64,
    /// toe.x - knee.x below minus this (px) favors forefoot strike.
    pub tucked_offset_px: f64,

    /// Ankle angle above this (degrees) favors heel strike.
    pub open_ankle_angle_deg: f64,
    /// Ankle angle below this (degrees) favors forefoot strike.
    pub closed_ankle_angle_deg: f64,

    /// Knee-ankle vertical gap at or above this (px) reads as an extended knee.
    pub knee_extended_gap_px: f64,
    /// Knee-ankle vertical gap at or below this (px) reads as a flexed knee.
    pub knee_flexed_gap_px: f64,
    /// Score contributed by the knee proxy.
    pub knee_weight: f64,

    /// Total score above this is a heel strike.
    pub heel_score_threshold: f64,
    /// Total score below this is a forefoot strike.
    pub forefoot_score_threshold: f64,

    pub base_confidence: f64,
    /// Confidence added at the maximum total score of 4.
    pub confidence_span: f64,
    pub confidence_cap: f64,
    pub agreement_bonus: f64,
    /// Non-zero criteria needed for the agreement bonus.
    pub agreement_min_criteria: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_visibility: 0.5,
            heel_ratio_threshold: 1.02,
            forefoot_ratio_threshold: 0.95,
            extended_offset_px: 30.0,
            tucked_offset_px: 20.0,
            open_ankle_angle_deg: 100.0,
            closed_ankle_angle_deg: 80.0,
            knee_extended_gap_px: 80.0,
            knee_flexed_gap_px: 35.0,
            knee_weight: 0.5,
            heel_score_threshold: 1.5,
            forefoot_score_threshold: -1.5,
            base_confidence: 60.0,
            confidence_span: 35.0,
            confidence_cap: 95.0,
            agreement_bonus: 10.0,
            agreement_min_criteria: 3,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::unit_interval("classifier.min_visibility", self.min_visibility)?;
        ConfigError::ordered(
            "classifier.forefoot_ratio_threshold",
            self.forefoot_ratio_threshold,
            "classifier.heel_ratio_threshold",
            self.heel_ratio_threshold,
        )?;
        ConfigError::ordered(
            "classifier.closed_ankle_angle_deg",
            self.closed_ankle_angle_deg,
            "classifier.open_ankle_angle_deg",
            self.open_ankle_angle_deg,
        )?;
        ConfigError::ordered(
            "classifier.knee_flexed_gap_px",
            self.knee_flexed_gap_px,
            "classifier.knee_extended_gap_px",
            self.knee_extended_gap_px,
        )?;
        ConfigError::ordered(
            "classifier.forefoot_score_threshold",
            self.forefoot_score_threshold,
            "classifier.heel_score_threshold",
            self.heel_score_threshold,
        )?;
        ConfigError::positive("classifier.extended_offset_px", self.extended_offset_px)?;
        ConfigError::positive("classifier.tucked_offset_px", self.tucked_offset_px)?;
        ConfigError::positive("classifier.knee_weight", self.knee_weight)?;
        ConfigError::percentage("classifier.base_confidence", self.base_confidence)?;
        ConfigError::non_negative("classifier.confidence_span", self.confidence_span)?;
        ConfigError::percentage("classifier.confidence_cap", self.confidence_cap)?;
        ConfigError::non_negative("classifier.agreement_bonus", self.agreement_bonus)?;
        ConfigError::at_least("classifier.agreement_min_criteria", self.agreement_min_criteria, 1)?;
        ConfigError::at_most(
            "classifier.agreement_min_criteria",
            self.agreement_min_criteria,
            Criterion::ALL.len(),
        )
    }
}

/// Pixel-space foot and leg positions at a contact frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeGeometry {
    pub heel: PixelPoint,
    pub toe: PixelPoint,
    pub ankle: PixelPoint,
    pub knee: PixelPoint,
}

/// Multi-criterion foot strike scorer.
#[derive(Debug, Clone, Default)]
pub struct FootStrikeClassifier {
    config: ClassifierConfig,
}

impl FootStrikeClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify the strike of `side` in `frame`.
    ///
    /// Missing or poorly visible landmarks give an `UNKNOWN` result with zero
    /// confidence and a reasoning naming the offending landmarks.
    pub fn classify_frame(&self, frame: &LandmarkFrame, side: Side) -> GaitClassification {
        let joints = [Joint::Heel, Joint::Toe, Joint::Ankle, Joint::Knee];

        let missing: Vec<&str> = joints
            .iter()
            .map(|j| side.landmark(*j))
            .filter(|l| !frame.contains(*l))
            .map(|l| l.name())
            .collect();
        if !missing.is_empty() {
            return GaitClassification::unknown(
                frame.frame_number,
                format!("missing landmarks: {}", missing.join(", ")),
            );
        }

        let low: Vec<String> = joints
            .iter()
            .map(|j| side.landmark(*j))
            .filter_map(|l| {
                frame
                    .get(l)
                    .filter(|p| p.visibility < self.config.min_visibility)
                    .map(|p| format!("{} ({:.2})", l.name(), p.visibility))
            })
            .collect();
        if !low.is_empty() {
            return GaitClassification::unknown(
                frame.frame_number,
                format!(
                    "low visibility below {:.2}: {}",
                    self.config.min_visibility,
                    low.join(", ")
                ),
            );
        }

        let geometry = match (
            frame.pixel(side.landmark(Joint::Heel)),
            frame.pixel(side.landmark(Joint::Toe)),
            frame.pixel(side.landmark(Joint::Ankle)),
            frame.pixel(side.landmark(Joint::Knee)),
        ) {
            (Some(heel), Some(toe), Some(ankle), Some(knee)) => StrikeGeometry { heel, toe, ankle, knee },
            _ => return GaitClassification::unknown(frame.frame_number, "missing landmarks"),
        };

        self.classify(&geometry, frame.frame_number)
    }

    /// Score pixel-space geometry and classify.
    pub fn classify(&self, geometry: &StrikeGeometry, contact_frame: u64) -> GaitClassification {
        let cfg = &self.config;
        let measurements = measure(geometry);

        let ratio_score = match measurements.vertical_ratio {
            Some(r) if r >= cfg.heel_ratio_threshold => 1.0,
            Some(r) if r <= cfg.forefoot_ratio_threshold => -1.0,
            _ => 0.0,
        };

        let offset = measurements.horizontal_offset_px;
        let offset_score = if offset > cfg.extended_offset_px {
            1.0
        } else if offset < -cfg.tucked_offset_px {
            -1.0
        } else {
            0.0
        };

        let angle_score = match measurements.ankle_angle_deg {
            Some(a) if a > cfg.open_ankle_angle_deg => 1.0,
            Some(a) if a < cfg.closed_ankle_angle_deg => -1.0,
            _ => 0.0,
        };

        let gap = measurements.knee_ankle_gap_px;
        let knee_score = if gap >= cfg.knee_extended_gap_px {
            cfg.knee_weight
        } else if gap <= cfg.knee_flexed_gap_px {
            -cfg.knee_weight
        } else {
            0.0
        };

        let scores: BTreeMap<Criterion, f64> = Criterion::ALL
            .into_iter()
            .zip([ratio_score, offset_score, angle_score, knee_score])
            .collect();

        let total: f64 = scores.values().sum();
        let gait_type = if total > cfg.heel_score_threshold {
            GaitType::HeelStrike
        } else if total < cfg.forefoot_score_threshold {
            GaitType::ForefootStrike
        } else {
            GaitType::MidfootStrike
        };

        let agreeing = scores.values().filter(|s| **s != 0.0).count();
        let confidence = self.confidence(total, agreeing);

        let reasoning = format!(
            "{} (score {:+.1}, {} of {} criteria active): heel/toe ratio {}, toe-knee offset {:+.0}px, ankle angle {}, knee-ankle gap {:.0}px",
            gait_type,
            total,
            agreeing,
            Criterion::ALL.len(),
            measurements
                .vertical_ratio
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.3}", r)),
            offset,
            measurements
                .ankle_angle_deg
                .map_or_else(|| "n/a".to_string(), |a| format!("{:.1}°", a)),
            gap,
        );

        info!(
            contact_frame,
            gait_type = %gait_type,
            total_score = total,
            confidence,
            "foot strike classified"
        );

        GaitClassification {
            gait_type,
            confidence,
            contact_frame,
            biomechanical_scores: scores,
            measurements: Some(measurements),
            reasoning,
        }
    }

    /// Confidence for a total score with `agreeing` non-zero criteria.
    pub fn confidence(&self, total_score: f64, agreeing: usize) -> f64 {
        let cfg = &self.config;
        let base = (cfg.base_confidence + (total_score.abs() / 4.0) * cfg.confidence_span)
            .min(cfg.confidence_cap);
        let bonus = if agreeing >= cfg.agreement_min_criteria {
            cfg.agreement_bonus
        } else {
            0.0
        };
        (base + bonus).clamp(0.0, 100.0)
    }
}

fn measure(g: &StrikeGeometry) -> StrikeMeasurements {
    StrikeMeasurements {
        vertical_ratio: (g.toe.y != 0.0).then(|| g.heel.y / g.toe.y),
        horizontal_offset_px: g.toe.x - g.knee.x,
        ankle_angle_deg: angle_between(g.knee, g.ankle, g.toe),
        knee_ankle_gap_px: g.ankle.y - g.knee.y,
    }
}
