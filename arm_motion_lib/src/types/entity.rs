use serde::{Deserialize, Serialize};

use crate::Position;

pub type EntityId = u32;

/// A liftable block in the scene.
///
/// Whether it is held is not stored here: the gripper owns the single
/// attachment slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub position: Position,
    /// Vertical velocity in units per tick, negative when falling.
    pub vertical_velocity: f64,
}

impl Entity {
    pub fn new(id: EntityId, position: Position) -> Self {
        Self {
            id,
            position,
            vertical_velocity: 0.0,
        }
    }
}

/// Entity as reported to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub id: EntityId,
    pub position: [f64; 3],
    pub attached: bool,
}
