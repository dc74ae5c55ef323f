//! Error types for the motion engine.

use thiserror::Error;

/// Conditions reported by the motion engine.
///
/// None of these is fatal. The engine holds its last valid state and hands
/// the condition back to the caller for display.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MotionError {
    /// Target lies beyond the fully extended arm.
    #[error("target out of reach: distance {distance:.3} exceeds max reach {max_reach:.3}")]
    Unreachable {
        /// Distance from the shoulder pivot to the target.
        distance: f64,
        /// Upper arm plus forearm length.
        max_reach: f64,
    },

    /// Target lies inside the dead zone the folded arm cannot reach.
    #[error("target too close: distance {distance:.3} below min reach {min_reach:.3}")]
    TooClose {
        /// Distance from the shoulder pivot to the target.
        distance: f64,
        /// Absolute difference between upper arm and forearm length.
        min_reach: f64,
    },

    /// Target coincides with the shoulder pivot.
    #[error("degenerate target: coincides with the shoulder pivot")]
    Degenerate,

    /// Operator command rejected in the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl MotionError {
    /// Creates an invalid operation error.
    #[must_use]
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Self::InvalidOperation(reason.into())
    }

    /// True for geometry failures where the prior joint command is held.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::TooClose { .. } | Self::Degenerate
        )
    }
}

/// Result alias for motion engine operations.
pub type MotionResult<T> = std::result::Result<T, MotionError>;
