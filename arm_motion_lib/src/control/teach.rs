use tracing::debug;

use crate::control::sequencer::move_toward;
use crate::types::{Position, Program, ReplayConfig, Waypoint};

/// Outcome of one replay tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayEvent {
    Idle,
    Moving,
    /// Waypoint `index` reached. `grip` is set when the gripper must change
    /// to that state.
    Reached { index: usize, grip: Option<bool> },
}

/// Records taught waypoints and replays them as a closed loop.
#[derive(Debug, Clone)]
pub struct TeachReplayer {
    speed: f64,
    arrival_threshold: f64,
    program: Program,
    index: usize,
    active: bool,
}

impl TeachReplayer {
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            speed: config.speed,
            arrival_threshold: config.arrival_threshold,
            program: Program::new(),
            index: 0,
            active: false,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Waypoint currently being approached.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Append a waypoint; returns the new program length.
    pub fn record(&mut self, position: Position, grip: bool) -> usize {
        self.program.push(Waypoint { position, grip });
        debug!(
            "Recorded waypoint {} at ({:.2}, {:.2}, {:.2}) grip={}",
            self.program.len() - 1,
            position.x,
            position.y,
            position.z,
            grip
        );
        self.program.len()
    }

    pub fn clear(&mut self) {
        self.program.clear();
        self.index = 0;
        self.active = false;
    }

    /// Start replaying from the first waypoint. An empty program does not start.
    pub fn start(&mut self) -> bool {
        if self.program.is_empty() {
            return false;
        }
        self.index = 0;
        self.active = true;
        true
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn step(&mut self, target: &mut Position, dt: f64, current_grip: bool) -> ReplayEvent {
        if !self.active {
            return ReplayEvent::Idle;
        }
        let Some(waypoint) = self.program.get(self.index).copied() else {
            self.active = false;
            return ReplayEvent::Idle;
        };

        move_toward(target, &waypoint.position, self.speed, dt);
        if (waypoint.position - *target).norm() >= self.arrival_threshold {
            return ReplayEvent::Moving;
        }

        let reached = self.index;
        self.index = self.program.next_index(reached);
        let grip = (waypoint.grip != current_grip).then_some(waypoint.grip);

        ReplayEvent::Reached {
            index: reached,
            grip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replayer() -> TeachReplayer {
        TeachReplayer::new(&ReplayConfig {
            speed: 2.0,
            arrival_threshold: 0.1,
        })
    }

    #[test]
    fn test_empty_program_does_not_start() {
        let mut replay = replayer();
        assert!(!replay.start());
        assert!(!replay.is_active());

        let mut target = Position::new(0.0, 4.0, 2.0);
        assert_eq!(replay.step(&mut target, 0.1, false), ReplayEvent::Idle);
    }

    #[test]
    fn test_replay_visits_in_order_and_wraps() {
        let mut replay = replayer();
        replay.record(Position::new(1.0, 2.0, 2.0), false);
        replay.record(Position::new(2.0, 2.0, 1.0), true);
        replay.record(Position::new(0.0, 3.0, 2.0), false);
        assert!(replay.start());

        let mut target = Position::new(0.0, 4.0, 2.0);
        let mut grip = false;
        let mut visited = Vec::new();
        for _ in 0..3000 {
            if let ReplayEvent::Reached { index, grip: change } = replay.step(&mut target, 1.0 / 60.0, grip) {
                visited.push(index);
                if let Some(g) = change {
                    grip = g;
                }
            }
            if visited.len() == 7 {
                break;
            }
        }

        assert_eq!(visited, vec![0, 1, 2, 0, 1, 2, 0]);
        assert!(replay.is_active());
    }

    #[test]
    fn test_grip_change_reported_only_on_mismatch() {
        let mut replay = replayer();
        replay.record(Position::new(0.0, 4.0, 2.0), true);
        replay.start();

        let mut target = Position::new(0.0, 4.0, 2.0);
        assert_eq!(
            replay.step(&mut target, 0.1, false),
            ReplayEvent::Reached {
                index: 0,
                grip: Some(true)
            }
        );
        assert_eq!(
            replay.step(&mut target, 0.1, true),
            ReplayEvent::Reached {
                index: 0,
                grip: None
            }
        );
    }

    #[test]
    fn test_clear_stops_and_empties() {
        let mut replay = replayer();
        replay.record(Position::new(0.0, 4.0, 2.0), false);
        replay.start();
        replay.clear();

        assert!(replay.program().is_empty());
        assert!(!replay.is_active());
        assert_eq!(replay.index(), 0);
    }
}
