use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A point in arm-base coordinates (y up).
pub type Position = Vector3<f64>;

/// Joint angles of the 3-DOF arm, in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    /// Rotation about the vertical axis.
    pub base: f64,
    /// Upper arm angle measured from the vertical rest pose.
    pub shoulder: f64,
    /// Forearm angle relative to the upper arm.
    pub elbow: f64,
}

impl JointAngles {
    pub fn new(base: f64, shoulder: f64, elbow: f64) -> Self {
        Self {
            base,
            shoulder,
            elbow,
        }
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.base, self.shoulder, self.elbow]
    }

    /// Largest absolute per-joint difference.
    pub fn max_abs_diff(&self, other: &JointAngles) -> f64 {
        self.to_array()
            .iter()
            .zip(other.to_array().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
