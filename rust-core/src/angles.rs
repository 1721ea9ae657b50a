//! Joint angle calculation from three-point geometry.
//!
//! The angle at vertex B between arms BA and BC:
//! `θ = arccos(clip((BA·BC) / (|BA||BC|), -1, 1))`
//!
//! Returns degrees in [0, 180]:
//! - 180° = fully extended (A, B, C collinear, B between)
//! - 90°  = right angle
//!
//! A zero-length arm has no defined angle and yields `None`.

use crate::types::{AngleKind, BiomechanicalAngles, Joint, LandmarkFrame, PixelPoint, Side};

/// Arms shorter than this (pixels) are treated as degenerate.
const MIN_ARM_LENGTH: f64 = 1e-9;

/// Height of the synthetic vertical reference above the hip, in pixels.
pub const TRUNK_REFERENCE_OFFSET_PX: f64 = 100.0;

/// Angle at `b` between `a` and `c`, in degrees, via the dot product.
pub fn angle_between(a: PixelPoint, b: PixelPoint, c: PixelPoint) -> Option<f64> {
    let ba = (a.x - b.x, a.y - b.y);
    let bc = (c.x - b.x, c.y - b.y);

    let mag_ba = ba.0.hypot(ba.1);
    let mag_bc = bc.0.hypot(bc.1);
    if mag_ba < MIN_ARM_LENGTH || mag_bc < MIN_ARM_LENGTH {
        return None;
    }

    let cos_angle = ((ba.0 * bc.0 + ba.1 * bc.1) / (mag_ba * mag_bc)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Same angle as [`angle_between`] computed from two `atan2` headings.
///
/// Used as an independent cross-check; agrees with the dot-product form
/// within floating tolerance for well-conditioned inputs.
pub fn angle_between_atan2(a: PixelPoint, b: PixelPoint, c: PixelPoint) -> Option<f64> {
    let ba = (a.x - b.x, a.y - b.y);
    let bc = (c.x - b.x, c.y - b.y);
    if ba.0.hypot(ba.1) < MIN_ARM_LENGTH || bc.0.hypot(bc.1) < MIN_ARM_LENGTH {
        return None;
    }

    let mut degrees = (bc.1.atan2(bc.0) - ba.1.atan2(ba.0)).to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    Some(degrees)
}

/// Angle at `vertex` of `side`, when all three landmarks are present.
fn side_angle(frame: &LandmarkFrame, side: Side, a: Joint, vertex: Joint, c: Joint) -> Option<f64> {
    let a = frame.pixel(side.landmark(a))?;
    let b = frame.pixel(side.landmark(vertex))?;
    let c = frame.pixel(side.landmark(c))?;
    angle_between(a, b, c)
}

/// Trunk lean: angle at the hip between the shoulder and a point straight
/// above the hip. 0° is upright.
///
/// Uses the right side when available, otherwise the left.
fn trunk_angle(frame: &LandmarkFrame) -> Option<f64> {
    [Side::Right, Side::Left].iter().find_map(|side| {
        let shoulder = frame.pixel(side.landmark(Joint::Shoulder))?;
        let hip = frame.pixel(side.landmark(Joint::Hip))?;
        let vertical = PixelPoint::new(hip.x, hip.y - TRUNK_REFERENCE_OFFSET_PX);
        angle_between(shoulder, hip, vertical)
    })
}

/// Compute every joint angle the frame supports.
///
/// Missing landmarks leave the corresponding angle `None`; the call never
/// fails as a whole.
pub fn calculate_biomechanical_angles(frame: &LandmarkFrame) -> BiomechanicalAngles {
    let mut angles = BiomechanicalAngles::default();

    for side in Side::BOTH {
        let (knee, ankle, hip) = match side {
            Side::Right => (AngleKind::KneeRight, AngleKind::AnkleRight, AngleKind::HipRight),
            Side::Left => (AngleKind::KneeLeft, AngleKind::AnkleLeft, AngleKind::HipLeft),
        };
        angles.set(knee, side_angle(frame, side, Joint::Hip, Joint::Knee, Joint::Ankle));
        angles.set(ankle, side_angle(frame, side, Joint::Knee, Joint::Ankle, Joint::Toe));
        angles.set(hip, side_angle(frame, side, Joint::Shoulder, Joint::Hip, Joint::Knee));
    }
    angles.trunk = trunk_angle(frame);

    angles
}
