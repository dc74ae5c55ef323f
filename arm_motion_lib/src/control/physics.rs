use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::types::{Entity, EntityId, EntityState, PhysicsConfig, Position};

/// Free fall and rest for liftable entities.
///
/// Owns every entity position. A held entity is pinned below the end effector
/// instead of falling.
#[derive(Debug, Clone)]
pub struct EntityPhysics {
    floor_level: f64,
    gravity_per_tick: f64,
    attach_offset: f64,
    entities: BTreeMap<EntityId, Entity>,
}

impl EntityPhysics {
    pub fn new(config: &PhysicsConfig, attach_offset: f64, initial_positions: &[[f64; 3]]) -> Self {
        let mut physics = Self {
            floor_level: config.floor_level,
            gravity_per_tick: config.gravity_per_tick,
            attach_offset,
            entities: BTreeMap::new(),
        };
        physics.reset(initial_positions);
        physics
    }

    /// Replace all entities, assigning ids in list order.
    pub fn reset(&mut self, initial_positions: &[[f64; 3]]) {
        self.entities = initial_positions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let id = i as EntityId;
                (id, Entity::new(id, Vector3::from(*p)))
            })
            .collect();
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, Entity> {
        &self.entities
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Where a held entity sits for the given end-effector position.
    pub fn held_position(&self, end_effector: &Position) -> Position {
        end_effector - Vector3::new(0.0, self.attach_offset, 0.0)
    }

    pub fn step(&mut self, attached: Option<EntityId>, end_effector: &Position) {
        let held = self.held_position(end_effector);

        for entity in self.entities.values_mut() {
            if Some(entity.id) == attached {
                entity.position = held;
                entity.vertical_velocity = 0.0;
                continue;
            }

            if entity.position.y > self.floor_level {
                entity.vertical_velocity -= self.gravity_per_tick;
                entity.position.y += entity.vertical_velocity;
            }

            if entity.position.y <= self.floor_level {
                entity.position.y = self.floor_level;
                entity.vertical_velocity = 0.0;
            }
        }
    }

    pub fn snapshot(&self, attached: Option<EntityId>) -> Vec<EntityState> {
        self.entities
            .values()
            .map(|e| EntityState {
                id: e.id,
                position: [e.position.x, e.position.y, e.position.z],
                attached: Some(e.id) == attached,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn physics(positions: &[[f64; 3]]) -> EntityPhysics {
        let config = PhysicsConfig {
            floor_level: 0.5,
            gravity_per_tick: 0.01,
        };
        EntityPhysics::new(&config, 0.5, positions)
    }

    #[test]
    fn test_free_fall_accelerates_then_rests_on_floor() {
        let mut physics = physics(&[[1.0, 3.0, 1.0]]);
        let effector = Position::new(0.0, 4.0, 2.0);

        physics.step(None, &effector);
        let e = physics.get(0).unwrap();
        assert_abs_diff_eq!(e.vertical_velocity, -0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(e.position.y, 2.99, epsilon = 1e-12);

        physics.step(None, &effector);
        let e = physics.get(0).unwrap();
        assert_abs_diff_eq!(e.vertical_velocity, -0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(e.position.y, 2.97, epsilon = 1e-12);

        for _ in 0..200 {
            physics.step(None, &effector);
        }
        let e = physics.get(0).unwrap();
        assert_eq!(e.position.y, 0.5);
        assert_eq!(e.vertical_velocity, 0.0);
        assert_eq!(e.position.x, 1.0);
    }

    #[test]
    fn test_resting_entity_stays_put() {
        let mut physics = physics(&[[2.0, 0.5, 2.0]]);
        physics.step(None, &Position::zeros());
        assert_eq!(physics.get(0).unwrap().position, Position::new(2.0, 0.5, 2.0));
    }

    #[test]
    fn test_held_entity_tracks_effector_and_forgets_velocity() {
        let mut physics = physics(&[[0.0, 5.0, 0.0], [2.0, 0.5, 2.0]]);
        let effector = Position::new(1.0, 3.0, 1.0);

        // Let entity 0 pick up some falling speed first
        for _ in 0..5 {
            physics.step(None, &effector);
        }
        assert!(physics.get(0).unwrap().vertical_velocity < 0.0);

        physics.step(Some(0), &effector);
        let held = physics.get(0).unwrap();
        assert_eq!(held.position, Position::new(1.0, 2.5, 1.0));
        assert_eq!(held.vertical_velocity, 0.0);

        // Released: starts falling from rest
        physics.step(None, &effector);
        let released = physics.get(0).unwrap();
        assert_abs_diff_eq!(released.vertical_velocity, -0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_snapshot_flags_only_the_held_entity() {
        let physics = physics(&[[0.0, 0.5, 1.0], [2.0, 0.5, 2.0]]);
        let snapshot = physics.snapshot(Some(1));
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot[0].attached);
        assert!(snapshot[1].attached);
    }
}
