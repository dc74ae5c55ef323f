pub mod arm_telemetry;
pub mod arm_types;
pub mod config;
pub mod entity;
pub mod error;
pub mod joint_state;
pub mod waypoint;

pub use arm_telemetry::*;
pub use arm_types::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use joint_state::*;
pub use waypoint::*;
