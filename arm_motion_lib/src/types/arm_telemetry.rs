use serde::{Deserialize, Serialize};

use crate::{ControlMode, EntityId, EntityState, JointAngles, SequencerPhase};

/// Decimated joint telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Tick index the sample was taken at.
    pub tick: u64,
    /// Shoulder angular speed (rad/s), magnitude only.
    pub velocity: f64,
    /// Static torque proxy on the shoulder.
    pub load: f64,
}

/// Per-tick output consumed by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickFrame {
    pub tick: u64,
    pub mode: ControlMode,
    pub phase: SequencerPhase,
    pub actual_angles: JointAngles,
    pub desired_angles: JointAngles,
    pub target: [f64; 3],
    pub end_effector: [f64; 3],
    pub grip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_entity: Option<EntityId>,
    pub entities: Vec<EntityState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<TelemetrySample>,
    /// Solver failure for this tick's target, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver_error: Option<String>,
}
