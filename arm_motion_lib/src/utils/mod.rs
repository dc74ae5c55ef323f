pub mod kinematics;
pub mod tracing;

pub use kinematics::*;
pub use self::tracing::*;
