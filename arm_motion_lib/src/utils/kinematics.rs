// Closed-form kinematics for the base / shoulder / elbow arm

use std::f64::consts::{FRAC_PI_2, PI};

use crate::types::{ArmGeometry, JointAngles, MotionError, MotionResult, Position};

/// Below this shoulder-to-target distance the triangle collapses.
const DEGENERATE_EPSILON: f64 = 1e-9;

/// Inverse and forward kinematics for a fixed set of link lengths.
///
/// The arm rotates about the vertical axis at the base, then works in its
/// vertical plane as a two-link chain hinged at the shoulder pivot, which sits
/// `base_height` above the origin. The shoulder angle is measured from the
/// upright rest pose and the elbow angle is the bend relative to the upper arm
/// (0 = straight), so `JointAngles::default()` points the arm straight up.
#[derive(Debug, Clone, Copy)]
pub struct GeometrySolver {
    base_height: f64,
    upper_arm: f64,
    forearm: f64,
}

impl GeometrySolver {
    pub fn new(geometry: &ArmGeometry) -> Self {
        Self::from_lengths(
            geometry.base_height,
            geometry.upper_arm_length,
            geometry.forearm_length,
        )
    }

    pub fn from_lengths(base_height: f64, upper_arm: f64, forearm: f64) -> Self {
        Self {
            base_height,
            upper_arm,
            forearm,
        }
    }

    pub fn max_reach(&self) -> f64 {
        self.upper_arm + self.forearm
    }

    pub fn min_reach(&self) -> f64 {
        (self.upper_arm - self.forearm).abs()
    }

    /// Joint angles placing the end effector at `target`.
    ///
    /// Uses the law of cosines on the triangle formed by the upper arm, the
    /// forearm and the shoulder-to-target line, elbow up.
    pub fn solve(&self, target: &Position) -> MotionResult<JointAngles> {
        let (l2, l3) = (self.upper_arm, self.forearm);

        let base = target.x.atan2(target.z);
        let r = (target.x * target.x + target.z * target.z).sqrt();
        let dy = target.y - self.base_height;
        let h = (r * r + dy * dy).sqrt();

        if h < DEGENERATE_EPSILON {
            return Err(MotionError::Degenerate);
        }
        if h > self.max_reach() {
            return Err(MotionError::Unreachable {
                distance: h,
                max_reach: self.max_reach(),
            });
        }
        if h < self.min_reach() {
            return Err(MotionError::TooClose {
                distance: h,
                min_reach: self.min_reach(),
            });
        }

        // Clamp guards against rounding right at the workspace boundary
        let phi1 = ((l2 * l2 + h * h - l3 * l3) / (2.0 * l2 * h))
            .clamp(-1.0, 1.0)
            .acos();
        let phi2 = dy.atan2(r);
        let shoulder = FRAC_PI_2 - (phi1 + phi2);

        let phi3 = ((l2 * l2 + l3 * l3 - h * h) / (2.0 * l2 * l3))
            .clamp(-1.0, 1.0)
            .acos();
        let elbow = PI - phi3;

        Ok(JointAngles::new(base, shoulder, elbow))
    }

    /// End-effector position for the given joint angles.
    pub fn forward(&self, angles: &JointAngles) -> Position {
        let (radial, height) = self.planar_end_effector(angles);
        Position::new(
            radial * angles.base.sin(),
            height,
            radial * angles.base.cos(),
        )
    }

    /// Elbow joint position, for presentation layers drawing the links.
    pub fn elbow_position(&self, angles: &JointAngles) -> Position {
        let radial = self.upper_arm * angles.shoulder.sin();
        let height = self.base_height + self.upper_arm * angles.shoulder.cos();
        Position::new(
            radial * angles.base.sin(),
            height,
            radial * angles.base.cos(),
        )
    }

    // (radial distance, height) in the arm's vertical plane
    fn planar_end_effector(&self, angles: &JointAngles) -> (f64, f64) {
        let upper = angles.shoulder;
        let fore = angles.shoulder + angles.elbow;
        let radial = self.upper_arm * upper.sin() + self.forearm * fore.sin();
        let height = self.base_height + self.upper_arm * upper.cos() + self.forearm * fore.cos();
        (radial, height)
    }
}
