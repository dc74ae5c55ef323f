use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{Entity, EntityId, Position};

/// Grip flag plus the single attachment slot.
///
/// The grip flag may be set with nothing attached (an empty grasp). At most one
/// entity is ever attached because there is only one slot.
#[derive(Debug, Clone)]
pub struct GripperController {
    capture_radius: f64,
    grip: bool,
    attached: Option<EntityId>,
}

impl GripperController {
    pub fn new(capture_radius: f64) -> Self {
        Self {
            capture_radius,
            grip: false,
            attached: None,
        }
    }

    pub fn grip(&self) -> bool {
        self.grip
    }

    pub fn attached(&self) -> Option<EntityId> {
        self.attached
    }

    /// Close the gripper, attaching the nearest free entity within the capture radius.
    pub fn engage(
        &mut self,
        end_effector: &Position,
        entities: &BTreeMap<EntityId, Entity>,
    ) -> Option<EntityId> {
        self.grip = true;
        if self.attached.is_some() {
            return self.attached;
        }

        let nearest = entities
            .values()
            .map(|e| (e.id, (e.position - end_effector).norm()))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((id, distance)) if distance < self.capture_radius => {
                debug!("Grip engaged on entity {} at distance {:.3}", id, distance);
                self.attached = Some(id);
            }
            Some((id, distance)) => {
                debug!(
                    "Empty grasp: nearest entity {} at {:.3} outside capture radius {:.3}",
                    id, distance, self.capture_radius
                );
            }
            None => debug!("Empty grasp: no entities"),
        }

        self.attached
    }

    /// Close the gripper on a specific entity regardless of distance.
    pub fn attach(&mut self, id: EntityId) {
        debug!("Grip attached to entity {}", id);
        self.grip = true;
        self.attached = Some(id);
    }

    /// Open the gripper, dropping whatever is held.
    pub fn disengage(&mut self) -> Option<EntityId> {
        self.grip = false;
        let released = self.attached.take();
        if let Some(id) = released {
            debug!("Grip released entity {}", id);
        }
        released
    }

    /// Release if something is held, otherwise try to grab.
    pub fn toggle(
        &mut self,
        end_effector: &Position,
        entities: &BTreeMap<EntityId, Entity>,
    ) -> Option<EntityId> {
        if self.attached.is_some() {
            self.disengage();
            None
        } else {
            self.engage(end_effector, entities)
        }
    }

    pub fn reset(&mut self) {
        self.grip = false;
        self.attached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(positions: &[[f64; 3]]) -> BTreeMap<EntityId, Entity> {
        positions
            .iter()
            .enumerate()
            .map(|(i, p)| (i as EntityId, Entity::new(i as EntityId, Position::from(*p))))
            .collect()
    }

    #[test]
    fn test_engage_picks_nearest_within_radius() {
        let mut gripper = GripperController::new(1.5);
        let scene = entities(&[[2.0, 0.5, 2.0], [0.5, 0.5, 2.0], [0.0, 0.5, -3.0]]);

        let attached = gripper.engage(&Position::new(0.0, 1.0, 2.0), &scene);

        assert_eq!(attached, Some(1));
        assert!(gripper.grip());
    }

    #[test]
    fn test_empty_grasp_sets_grip_without_attaching() {
        let mut gripper = GripperController::new(1.5);
        let scene = entities(&[[4.0, 0.5, 4.0]]);

        assert_eq!(gripper.engage(&Position::new(0.0, 1.0, 0.0), &scene), None);
        assert!(gripper.grip());
        assert_eq!(gripper.attached(), None);
    }

    #[test]
    fn test_disengage_is_unconditional() {
        let mut gripper = GripperController::new(1.5);
        gripper.attach(2);
        assert_eq!(gripper.disengage(), Some(2));
        assert!(!gripper.grip());

        assert_eq!(gripper.disengage(), None);
        assert!(!gripper.grip());
    }

    #[test]
    fn test_toggle_alternates_release_and_grab() {
        let mut gripper = GripperController::new(1.5);
        let scene = entities(&[[0.0, 0.5, 1.0]]);
        let effector = Position::new(0.0, 1.0, 1.0);

        assert_eq!(gripper.toggle(&effector, &scene), Some(0));
        assert_eq!(gripper.toggle(&effector, &scene), None);
        assert!(!gripper.grip());
        assert_eq!(gripper.attached(), None);
    }

    #[test]
    fn test_engage_never_holds_two() {
        let mut gripper = GripperController::new(10.0);
        let scene = entities(&[[0.0, 0.5, 1.0], [0.0, 0.5, 1.2]]);
        let effector = Position::new(0.0, 1.0, 1.0);

        assert_eq!(gripper.engage(&effector, &scene), Some(0));
        // Second engage keeps the first entity rather than grabbing another
        assert_eq!(gripper.engage(&Position::new(0.0, 1.0, 1.2), &scene), Some(0));
    }
}
