pub mod controller;
pub mod gripper;
pub mod physics;
pub mod sequencer;
pub mod smoother;
pub mod teach;
pub mod telemetry;

pub use controller::*;
pub use gripper::*;
pub use physics::*;
pub use sequencer::*;
pub use smoother::*;
pub use teach::*;
pub use telemetry::*;
