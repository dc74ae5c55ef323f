use crate::types::JointAngles;

/// First-order exponential smoothing of joint angles.
///
/// Every tick closes a fixed fraction of the remaining error, so the rate of
/// convergence is tied to the tick rate rather than wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct MotionSmoother {
    alpha: f64,
}

impl MotionSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn advance(&self, actual: &JointAngles, desired: &JointAngles) -> JointAngles {
        JointAngles::new(
            self.step(actual.base, desired.base),
            self.step(actual.shoulder, desired.shoulder),
            self.step(actual.elbow, desired.elbow),
        )
    }

    fn step(&self, actual: f64, desired: f64) -> f64 {
        actual + (desired - actual) * self.alpha
    }
}
