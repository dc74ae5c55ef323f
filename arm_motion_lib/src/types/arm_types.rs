use serde::{Deserialize, Serialize};

/// Which source drives the end-effector target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Target follows operator input.
    #[default]
    Manual,
    /// Pick-and-place sequencer owns the target.
    Autonomous,
    /// Taught program is being replayed.
    Replay,
}

impl std::fmt::Display for ControlMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlMode::Manual => "manual",
            ControlMode::Autonomous => "autonomous",
            ControlMode::Replay => "replay",
        };
        f.write_str(name)
    }
}
