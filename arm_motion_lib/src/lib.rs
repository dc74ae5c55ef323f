//! # Arm Motion Library
//!
//! Motion-and-control engine for a simulated 3-DOF robotic arm: inverse
//! kinematics, joint smoothing, the pick-and-place sequencer, teach/replay,
//! gripper attachment, entity physics and joint telemetry.
//!
//! The engine renders nothing and reads no input devices. A presentation layer
//! feeds it target points and operator commands and consumes one
//! [`TickFrame`] per simulation tick.

pub mod control;
pub mod types;
pub mod utils;

// Re-export everything for convenience
pub use control::*;
pub use types::*;
pub use utils::*;
