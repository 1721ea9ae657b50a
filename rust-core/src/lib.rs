//! Gait Analysis Core
//!
//! Streaming foot-strike classification and gait-cycle tracking from 2D
//! pose landmarks. Frames go in one at a time; phase transitions, one
//! classification per ground contact, joint angles and session aggregates
//! come out.
//!
//! # Design Philosophy
//!
//! - **Degrade, don't fail**: a frame with missing landmarks is a no-op for
//!   the state machine and an `UNKNOWN` for the classifier, never an error.
//! - **Explainable**: every classification carries its per-criterion scores,
//!   the measurements behind them, and a reasoning string.
//! - **Bounded state**: every history is a fixed-capacity window, so cost per
//!   frame is constant however long the session runs.
//! - **Validated configuration**: thresholds are configurable and checked
//!   once, at construction.
//!
//! # Example
//!
//! ```
//! use gait_core::{GaitAnalyzer, GaitConfig, Landmark, LandmarkFrame, LandmarkPoint};
//!
//! let mut analyzer = GaitAnalyzer::new(GaitConfig::default()).unwrap();
//! let frame = LandmarkFrame::new(0, 1280, 720)
//!     .with(Landmark::RightAnkle, LandmarkPoint::new(0.39, 0.8, 0.0, 0.9));
//!
//! let analysis = analyzer.process_frame(&frame);
//! assert_eq!(analysis.updates.len(), 1);
//! ```

pub mod aggregate;
pub mod angles;
pub mod classifier;
pub mod config;
pub mod contact;
pub mod error;
pub mod export;
pub mod gait_cycle;
pub mod outlier;
pub mod pipeline;
pub mod ring;
pub mod smoothing;
pub mod types;
pub mod velocity;

#[cfg(test)]
mod integration_tests;

// Re-export commonly used types
pub use classifier::{ClassifierConfig, FootStrikeClassifier, StrikeGeometry};
pub use config::GaitConfig;
pub use contact::{ContactConfig, GroundContactDetector};
pub use error::{ConfigError, GaitError};
pub use export::{FrameReader, StreamingExporter};
pub use gait_cycle::{CycleConfig, GaitCycleStateMachine, PhaseUpdate};
pub use pipeline::{FrameAnalysis, GaitAnalyzer, SessionReport, SideReport};
pub use types::{
    BiomechanicalAngles, GaitClassification, GaitPhase, GaitStatistics, GaitType, Landmark,
    LandmarkFrame, LandmarkPoint, Side,
};

/// Crate version, reported by the CLI and in exported sessions.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
