use std::collections::BTreeMap;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Entity, EntityId, Position, SequencerConfig};

/// Phases of one autonomous pick-and-place cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerPhase {
    #[default]
    Idle,
    Approach,
    Descend,
    Lift,
    MoveToZone,
    LowerToDrop,
    Retract,
}

/// Gripper side effect fired when a phase's sub-target is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalAction {
    None,
    Attach,
    Detach,
}

impl SequencerPhase {
    /// Transition table: the phase entered once this one's sub-target is reached.
    pub fn next(self) -> SequencerPhase {
        match self {
            SequencerPhase::Idle => SequencerPhase::Idle,
            SequencerPhase::Approach => SequencerPhase::Descend,
            SequencerPhase::Descend => SequencerPhase::Lift,
            SequencerPhase::Lift => SequencerPhase::MoveToZone,
            SequencerPhase::MoveToZone => SequencerPhase::LowerToDrop,
            SequencerPhase::LowerToDrop => SequencerPhase::Retract,
            SequencerPhase::Retract => SequencerPhase::Idle,
        }
    }

    pub fn arrival_action(self) -> ArrivalAction {
        match self {
            SequencerPhase::Descend => ArrivalAction::Attach,
            SequencerPhase::LowerToDrop => ArrivalAction::Detach,
            _ => ArrivalAction::None,
        }
    }

    pub fn is_active(self) -> bool {
        self != SequencerPhase::Idle
    }
}

/// Outcome of one sequencer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    Idle,
    Moving,
    /// Phase advanced with no gripper action.
    Advanced(SequencerPhase),
    Attach(EntityId),
    Detach(EntityId),
    Completed,
    /// The tracked entity no longer exists; the cycle was abandoned.
    EntityLost(EntityId),
}

/// Move `target` toward `goal` at constant speed, stopping on it.
///
/// Returns the remaining distance.
pub fn move_toward(target: &mut Position, goal: &Position, speed: f64, dt: f64) -> f64 {
    let delta = goal - *target;
    let distance = delta.norm();
    let step = speed * dt.max(0.0);

    if distance <= step {
        *target = *goal;
        return 0.0;
    }

    *target += delta / distance * step;
    distance - step
}

/// Finite-state machine driving the target through a pick-and-place cycle.
#[derive(Debug, Clone)]
pub struct AutoSequencer {
    config: SequencerConfig,
    attach_offset: f64,
    home: Position,
    phase: SequencerPhase,
    tracked: Option<EntityId>,
}

impl AutoSequencer {
    pub fn new(config: &SequencerConfig, attach_offset: f64, home: Position) -> Self {
        Self {
            config: config.clone(),
            attach_offset,
            home,
            phase: SequencerPhase::Idle,
            tracked: None,
        }
    }

    pub fn phase(&self) -> SequencerPhase {
        self.phase
    }

    pub fn tracked(&self) -> Option<EntityId> {
        self.tracked
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_active()
    }

    /// Begin a cycle on `entity`. Ignored while a cycle is running.
    pub fn start(&mut self, entity: EntityId) -> bool {
        if self.is_running() {
            return false;
        }
        debug!("Sequencer starting cycle on entity {}", entity);
        self.phase = SequencerPhase::Approach;
        self.tracked = Some(entity);
        true
    }

    pub fn stop(&mut self) {
        self.phase = SequencerPhase::Idle;
        self.tracked = None;
    }

    /// Entity to pick next: the free one nearest `from` that is not already
    /// resting in the drop zone.
    pub fn select_entity(
        &self,
        from: &Position,
        entities: &BTreeMap<EntityId, Entity>,
    ) -> Option<EntityId> {
        entities
            .values()
            .filter(|e| !self.in_drop_zone(&e.position))
            .map(|e| (e.id, (e.position - from).norm()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn in_drop_zone(&self, position: &Position) -> bool {
        let zone = Vector2::new(self.config.drop_zone[0], self.config.drop_zone[1]);
        (Vector2::new(position.x, position.z) - zone).norm() <= self.config.drop_zone_radius
    }

    /// Sub-target for `phase`, given the tracked entity's current position.
    pub fn sub_target(&self, phase: SequencerPhase, entity: Option<&Position>) -> Option<Position> {
        let cfg = &self.config;
        match phase {
            SequencerPhase::Idle => None,
            SequencerPhase::Approach => {
                entity.map(|p| Position::new(p.x, p.y + cfg.hover_offset, p.z))
            }
            SequencerPhase::Descend => {
                entity.map(|p| Position::new(p.x, p.y + self.attach_offset, p.z))
            }
            SequencerPhase::Lift => entity.map(|p| Position::new(p.x, cfg.lift_height, p.z)),
            SequencerPhase::MoveToZone => Some(cfg.drop_point(cfg.lift_height)),
            SequencerPhase::LowerToDrop => Some(cfg.drop_point(cfg.drop_height)),
            SequencerPhase::Retract => Some(self.home),
        }
    }

    pub fn step(
        &mut self,
        target: &mut Position,
        dt: f64,
        entities: &BTreeMap<EntityId, Entity>,
    ) -> SequencerEvent {
        if !self.is_running() {
            return SequencerEvent::Idle;
        }

        let entity_position = self
            .tracked
            .and_then(|id| entities.get(&id))
            .map(|e| e.position);

        let Some(goal) = self.sub_target(self.phase, entity_position.as_ref()) else {
            let lost = self.tracked.unwrap_or_default();
            self.stop();
            return SequencerEvent::EntityLost(lost);
        };

        move_toward(target, &goal, self.config.speed, dt);
        if (goal - *target).norm() >= self.config.arrival_threshold {
            return SequencerEvent::Moving;
        }

        let arrived = self.phase;
        self.phase = arrived.next();
        debug!("Sequencer {:?} -> {:?}", arrived, self.phase);

        let tracked = self.tracked;
        let event = match (arrived.arrival_action(), tracked) {
            (ArrivalAction::Attach, Some(id)) => SequencerEvent::Attach(id),
            (ArrivalAction::Detach, Some(id)) => SequencerEvent::Detach(id),
            _ if !self.phase.is_active() => SequencerEvent::Completed,
            _ => SequencerEvent::Advanced(self.phase),
        };

        if !self.phase.is_active() {
            self.tracked = None;
        }
        event
    }
}
