use serde::{Deserialize, Serialize};

use crate::Position;

/// A taught sample: end-effector target plus gripper state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Position,
    pub grip: bool,
}

/// Ordered waypoints, replayed as a closed loop.
///
/// Recorded waypoints are never edited; the program only grows by
/// [`Program::push`] or empties by [`Program::clear`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    waypoints: Vec<Waypoint>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Index after `index`, wrapping to 0 past the last waypoint.
    pub fn next_index(&self, index: usize) -> usize {
        if self.waypoints.is_empty() {
            0
        } else {
            (index + 1) % self.waypoints.len()
        }
    }
}
