//! Core data types for the gait analysis core.
//!
//! This module defines the landmark identities, per-frame inputs, and the
//! derived outputs (phases, classifications, angles) that flow through the
//! pipeline.
//!
//! Design principle: if a concept exists, it gets a type. Landmarks are an
//! enum indexed into a fixed array, never string keys hashed per frame.
//! Optional numeric values are `Option<f64>`, never sentinel values, so a
//! legitimate zero angle is never confused with "not available".

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Body side of a tracked limb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// The landmark for `joint` on this side.
    pub fn landmark(self, joint: Joint) -> Landmark {
        match (self, joint) {
            (Side::Left, Joint::Shoulder) => Landmark::LeftShoulder,
            (Side::Left, Joint::Hip) => Landmark::LeftHip,
            (Side::Left, Joint::Knee) => Landmark::LeftKnee,
            (Side::Left, Joint::Ankle) => Landmark::LeftAnkle,
            (Side::Left, Joint::Heel) => Landmark::LeftHeel,
            (Side::Left, Joint::Toe) => Landmark::LeftFootIndex,
            (Side::Right, Joint::Shoulder) => Landmark::RightShoulder,
            (Side::Right, Joint::Hip) => Landmark::RightHip,
            (Side::Right, Joint::Knee) => Landmark::RightKnee,
            (Side::Right, Joint::Ankle) => Landmark::RightAnkle,
            (Side::Right, Joint::Heel) => Landmark::RightHeel,
            (Side::Right, Joint::Toe) => Landmark::RightFootIndex,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anatomical joint kind, independent of side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Shoulder,
    Hip,
    Knee,
    Ankle,
    Heel,
    /// Tip of the foot (`foot_index` in pose-estimator naming).
    Toe,
}

/// Named body landmarks consumed by the gait core.
///
/// The discriminant doubles as the index into [`LandmarkFrame`] storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    LeftShoulder = 0,
    RightShoulder = 1,
    LeftHip = 2,
    RightHip = 3,
    LeftKnee = 4,
    RightKnee = 5,
    LeftAnkle = 6,
    RightAnkle = 7,
    LeftHeel = 8,
    RightHeel = 9,
    LeftFootIndex = 10,
    RightFootIndex = 11,
}

impl Landmark {
    /// Number of tracked landmarks.
    pub const COUNT: usize = 12;

    /// All landmarks in index order.
    pub const ALL: [Landmark; Landmark::COUNT] = [
        Landmark::LeftShoulder,
        Landmark::RightShoulder,
        Landmark::LeftHip,
        Landmark::RightHip,
        Landmark::LeftKnee,
        Landmark::RightKnee,
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
        Landmark::LeftHeel,
        Landmark::RightHeel,
        Landmark::LeftFootIndex,
        Landmark::RightFootIndex,
    ];

    /// Storage index of this landmark.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Pose-estimator name of this landmark.
    pub fn name(self) -> &'static str {
        match self {
            Landmark::LeftShoulder => "left_shoulder",
            Landmark::RightShoulder => "right_shoulder",
            Landmark::LeftHip => "left_hip",
            Landmark::RightHip => "right_hip",
            Landmark::LeftKnee => "left_knee",
            Landmark::RightKnee => "right_knee",
            Landmark::LeftAnkle => "left_ankle",
            Landmark::RightAnkle => "right_ankle",
            Landmark::LeftHeel => "left_heel",
            Landmark::RightHeel => "right_heel",
            Landmark::LeftFootIndex => "left_foot_index",
            Landmark::RightFootIndex => "right_foot_index",
        }
    }

    /// Resolve a pose-estimator name. Unknown names (face, hands, ...) return None.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.name() == name)
    }
}

impl fmt::Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single landmark detection in normalized image coordinates.
///
/// `x` and `y` are in [0, 1] relative to image width/height with y growing
/// downwards. `z` is the estimator's relative depth and is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    /// Detection confidence [0.0, 1.0].
    pub visibility: f64,
}

impl LandmarkPoint {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    /// Planar Euclidean distance to another point, in normalized units.
    pub fn distance_2d(&self, other: &LandmarkPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A 2D position in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One frame of landmark detections from the pose estimator.
///
/// Storage is a fixed array indexed by [`Landmark`]; absent landmarks are
/// `None`. Frames are transient: the pipeline consumes them and keeps only
/// derived state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "FrameRecord", into = "FrameRecord")]
pub struct LandmarkFrame {
    pub frame_number: u64,
    pub image_width: u32,
    pub image_height: u32,
    points: [Option<LandmarkPoint>; Landmark::COUNT],
}

impl LandmarkFrame {
    /// Creates an empty frame.
    pub fn new(frame_number: u64, image_width: u32, image_height: u32) -> Self {
        Self {
            frame_number,
            image_width,
            image_height,
            points: [None; Landmark::COUNT],
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, landmark: Landmark, point: LandmarkPoint) -> Self {
        self.set(landmark, point);
        self
    }

    pub fn set(&mut self, landmark: Landmark, point: LandmarkPoint) {
        self.points[landmark.index()] = Some(point);
    }

    pub fn remove(&mut self, landmark: Landmark) -> Option<LandmarkPoint> {
        self.points[landmark.index()].take()
    }

    pub fn get(&self, landmark: Landmark) -> Option<&LandmarkPoint> {
        self.points[landmark.index()].as_ref()
    }

    pub fn contains(&self, landmark: Landmark) -> bool {
        self.points[landmark.index()].is_some()
    }

    /// Iterates over present landmarks in index order.
    pub fn iter(&self) -> impl Iterator<Item = (Landmark, &LandmarkPoint)> {
        Landmark::ALL
            .iter()
            .zip(self.points.iter())
            .filter_map(|(l, p)| p.as_ref().map(|p| (*l, p)))
    }

    /// Number of present landmarks.
    pub fn len(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.points.iter().all(Option::is_none)
    }

    /// Position of `landmark` converted to pixel space.
    pub fn pixel(&self, landmark: Landmark) -> Option<PixelPoint> {
        self.get(landmark).map(|p| self.to_pixel(p))
    }

    /// Converts a normalized point to pixel space using this frame's size.
    pub fn to_pixel(&self, point: &LandmarkPoint) -> PixelPoint {
        PixelPoint::new(
            point.x * self.image_width as f64,
            point.y * self.image_height as f64,
        )
    }
}

/// Wire shape of a frame: landmarks keyed by pose-estimator name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_number: u64,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub landmarks: HashMap<String, LandmarkPoint>,
}

impl From<FrameRecord> for LandmarkFrame {
    fn from(record: FrameRecord) -> Self {
        let mut frame = LandmarkFrame::new(record.frame_number, record.image_width, record.image_height);
        for (name, point) in record.landmarks {
            match Landmark::from_name(&name) {
                Some(landmark) => frame.set(landmark, point),
                None => tracing::trace!(landmark = %name, "ignoring untracked landmark"),
            }
        }
        frame
    }
}

impl From<LandmarkFrame> for FrameRecord {
    fn from(frame: LandmarkFrame) -> Self {
        let landmarks = frame
            .iter()
            .map(|(l, p)| (l.name().to_string(), *p))
            .collect();
        Self {
            frame_number: frame.frame_number,
            image_width: frame.image_width,
            image_height: frame.image_height,
            landmarks,
        }
    }
}

/// Output of the landmark smoother for one landmark.
///
/// Keeps the raw position alongside the smoothed one so the adaptive
/// smoother can measure raw displacement between frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedLandmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub visibility: f64,
    pub raw_x: f64,
    pub raw_y: f64,
}

impl SmoothedLandmark {
    /// Bootstrap value: the raw point, unchanged.
    pub fn from_raw(raw: &LandmarkPoint) -> Self {
        Self {
            x: raw.x,
            y: raw.y,
            z: raw.z,
            visibility: raw.visibility,
            raw_x: raw.x,
            raw_y: raw.y,
        }
    }

    /// The smoothed position as a landmark point.
    pub fn point(&self) -> LandmarkPoint {
        LandmarkPoint::new(self.x, self.y, self.z, self.visibility)
    }
}

/// Kinematics of a tracked point, in pixels/second and pixels/second².
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VelocityData {
    pub velocity_x: f64,
    /// Positive is downwards (image y axis).
    pub velocity_y: f64,
    pub speed: f64,
    pub acceleration_y: f64,
}

impl VelocityData {
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Which joint angle a value refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleKind {
    KneeRight,
    KneeLeft,
    AnkleRight,
    AnkleLeft,
    HipRight,
    HipLeft,
    Trunk,
}

impl AngleKind {
    pub const ALL: [AngleKind; 7] = [
        AngleKind::KneeRight,
        AngleKind::KneeLeft,
        AngleKind::AnkleRight,
        AngleKind::AnkleLeft,
        AngleKind::HipRight,
        AngleKind::HipLeft,
        AngleKind::Trunk,
    ];
}

/// Joint angles for one frame, in degrees [0, 180].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BiomechanicalAngles {
    pub knee_right: Option<f64>,
    pub knee_left: Option<f64>,
    pub ankle_right: Option<f64>,
    pub ankle_left: Option<f64>,
    pub hip_right: Option<f64>,
    pub hip_left: Option<f64>,
    pub trunk: Option<f64>,
}

impl BiomechanicalAngles {
    pub fn get(&self, kind: AngleKind) -> Option<f64> {
        match kind {
            AngleKind::KneeRight => self.knee_right,
            AngleKind::KneeLeft => self.knee_left,
            AngleKind::AnkleRight => self.ankle_right,
            AngleKind::AnkleLeft => self.ankle_left,
            AngleKind::HipRight => self.hip_right,
            AngleKind::HipLeft => self.hip_left,
            AngleKind::Trunk => self.trunk,
        }
    }

    pub fn set(&mut self, kind: AngleKind, value: Option<f64>) {
        let slot = match kind {
            AngleKind::KneeRight => &mut self.knee_right,
            AngleKind::KneeLeft => &mut self.knee_left,
            AngleKind::AnkleRight => &mut self.ankle_right,
            AngleKind::AnkleLeft => &mut self.ankle_left,
            AngleKind::HipRight => &mut self.hip_right,
            AngleKind::HipLeft => &mut self.hip_left,
            AngleKind::Trunk => &mut self.trunk,
        };
        *slot = value;
    }

    /// Number of angles that could be computed.
    pub fn valid_count(&self) -> usize {
        AngleKind::ALL.iter().filter(|k| self.get(**k).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.valid_count() == 0
    }
}

/// Phase of the running gait cycle for one side.
///
/// Phases only advance in the cyclic order
/// `Swing → Contact → Stance → ToeOff → Swing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GaitPhase {
    /// Foot airborne.
    #[default]
    Swing,
    /// Instant of ground strike.
    Contact,
    /// Weight-bearing.
    Stance,
    /// Push-off.
    ToeOff,
}

impl GaitPhase {
    /// The only phase this one may transition to.
    pub fn next(self) -> GaitPhase {
        match self {
            GaitPhase::Swing => GaitPhase::Contact,
            GaitPhase::Contact => GaitPhase::Stance,
            GaitPhase::Stance => GaitPhase::ToeOff,
            GaitPhase::ToeOff => GaitPhase::Swing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GaitPhase::Swing => "SWING",
            GaitPhase::Contact => "CONTACT",
            GaitPhase::Stance => "STANCE",
            GaitPhase::ToeOff => "TOE_OFF",
        }
    }
}

impl fmt::Display for GaitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Foot strike pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GaitType {
    HeelStrike,
    MidfootStrike,
    ForefootStrike,
    #[default]
    Unknown,
}

impl GaitType {
    pub fn as_str(self) -> &'static str {
        match self {
            GaitType::HeelStrike => "HEEL_STRIKE",
            GaitType::MidfootStrike => "MIDFOOT_STRIKE",
            GaitType::ForefootStrike => "FOREFOOT_STRIKE",
            GaitType::Unknown => "UNKNOWN",
        }
    }

    pub fn is_known(self) -> bool {
        self != GaitType::Unknown
    }
}

impl fmt::Display for GaitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring criteria of the foot-strike classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    VerticalRatio,
    HorizontalOffset,
    AnkleAngle,
    KneeFlexion,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::VerticalRatio,
        Criterion::HorizontalOffset,
        Criterion::AnkleAngle,
        Criterion::KneeFlexion,
    ];
}

/// Raw geometric measurements taken at a contact frame (pixel space).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StrikeMeasurements {
    /// heel.y / toe.y. None when toe.y is zero.
    pub vertical_ratio: Option<f64>,
    /// toe.x - knee.x.
    pub horizontal_offset_px: f64,
    /// Interior angle at the ankle between knee and toe. None when degenerate.
    pub ankle_angle_deg: Option<f64>,
    /// ankle.y - knee.y.
    pub knee_ankle_gap_px: f64,
}

/// Foot strike classification produced at a `Swing → Contact` transition.
///
/// Immutable once created; the next contact produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitClassification {
    pub gait_type: GaitType,
    /// Confidence [0, 100].
    pub confidence: f64,
    pub contact_frame: u64,
    pub biomechanical_scores: BTreeMap<Criterion, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurements: Option<StrikeMeasurements>,
    pub reasoning: String,
}

impl GaitClassification {
    /// A zero-confidence UNKNOWN result explaining why classification failed.
    pub fn unknown(contact_frame: u64, reasoning: impl Into<String>) -> Self {
        Self {
            gait_type: GaitType::Unknown,
            confidence: 0.0,
            contact_frame,
            biomechanical_scores: BTreeMap::new(),
            measurements: None,
            reasoning: reasoning.into(),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.gait_type.is_known()
    }
}

/// Aggregate counters of one gait-cycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaitStatistics {
    pub total_cycles: u64,
    pub total_contacts: u64,
    pub successful_classifications: u64,
    /// Percentage of contacts that produced a known gait type.
    pub success_rate: f64,
    /// Mean confidence of successful classifications.
    pub average_confidence: f64,
    pub current_phase: GaitPhase,
}
