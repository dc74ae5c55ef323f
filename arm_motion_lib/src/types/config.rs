use eyre::Result;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::utils::GeometrySolver;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub arm: ArmGeometry,
    pub motion: MotionConfig,
    pub sequencer: SequencerConfig,
    pub replay: ReplayConfig,
    pub gripper: GripperConfig,
    pub physics: PhysicsConfig,
    pub telemetry: TelemetryConfig,
    pub entities: EntitiesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmGeometry {
    pub base_height: f64,      // L1: floor to shoulder pivot
    pub upper_arm_length: f64, // L2
    pub forearm_length: f64,   // L3
    pub home_position: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Fraction of the remaining joint error closed per tick.
    pub smoothing_factor: f64,
    pub tick_rate_hz: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    pub speed: f64, // units per second
    pub arrival_threshold: f64,
    pub hover_offset: f64,
    pub lift_height: f64,
    pub drop_zone: [f64; 2], // x, z
    pub drop_height: f64,
    /// Entities resting within this horizontal radius of the zone count as delivered.
    pub drop_zone_radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub speed: f64,
    pub arrival_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GripperConfig {
    pub capture_radius: f64,
    /// Vertical distance from the end effector down to a held entity's centre.
    pub attach_offset: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub floor_level: f64,
    pub gravity_per_tick: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub decimation: u64,
    pub history_capacity: usize,
    pub payload_load: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitiesConfig {
    pub initial_positions: Vec<[f64; 3]>,
}

impl Default for ArmGeometry {
    fn default() -> Self {
        Self {
            base_height: 1.0,
            upper_arm_length: 3.0,
            forearm_length: 2.5,
            home_position: [0.0, 4.0, 2.0],
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.1,
            tick_rate_hz: 60.0,
        }
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            speed: 3.0,
            arrival_threshold: 0.1,
            hover_offset: 2.0,
            lift_height: 3.0,
            drop_zone: [-3.0, 1.0],
            drop_height: 1.0,
            drop_zone_radius: 0.75,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed: 2.0,
            arrival_threshold: 0.1,
        }
    }
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            capture_radius: 1.5,
            attach_offset: 0.5,
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            floor_level: 0.5,
            gravity_per_tick: 0.01,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            decimation: 5,
            history_capacity: 50,
            payload_load: 0.5,
        }
    }
}

impl Default for EntitiesConfig {
    fn default() -> Self {
        Self {
            initial_positions: vec![[2.0, 0.5, 2.0], [3.0, 0.5, 0.0], [0.0, 0.5, 3.5]],
        }
    }
}

impl ArmGeometry {
    pub fn home(&self) -> Vector3<f64> {
        Vector3::from(self.home_position)
    }
}

impl SequencerConfig {
    /// Drop zone centre at the given height.
    pub fn drop_point(&self, height: f64) -> Vector3<f64> {
        Vector3::new(self.drop_zone[0], height, self.drop_zone[1])
    }
}

impl MotionConfig {
    pub fn tick_period(&self) -> f64 {
        1.0 / self.tick_rate_hz
    }
}

impl SimConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let arm = &self.arm;
        if arm.base_height < 0.0 || arm.upper_arm_length <= 0.0 || arm.forearm_length <= 0.0 {
            return Err(eyre::eyre!(
                "Base height must be non-negative and arm links positive (L1={}, L2={}, L3={})",
                arm.base_height,
                arm.upper_arm_length,
                arm.forearm_length
            ));
        }

        let alpha = self.motion.smoothing_factor;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(eyre::eyre!("Smoothing factor {} outside (0, 1]", alpha));
        }

        if self.motion.tick_rate_hz <= 0.0 {
            return Err(eyre::eyre!("Tick rate must be positive"));
        }

        if self.telemetry.decimation == 0 || self.telemetry.history_capacity == 0 {
            return Err(eyre::eyre!(
                "Telemetry decimation ({}) and history capacity ({}) must be non-zero",
                self.telemetry.decimation,
                self.telemetry.history_capacity
            ));
        }

        for (name, value) in [
            ("sequencer.speed", self.sequencer.speed),
            ("sequencer.arrival_threshold", self.sequencer.arrival_threshold),
            ("replay.speed", self.replay.speed),
            ("replay.arrival_threshold", self.replay.arrival_threshold),
            ("gripper.capture_radius", self.gripper.capture_radius),
        ] {
            if value <= 0.0 {
                return Err(eyre::eyre!("{} must be positive, got {}", name, value));
            }
        }

        GeometrySolver::new(arm)
            .solve(&arm.home())
            .map_err(|e| eyre::eyre!("Home position {:?} is not reachable: {}", arm.home_position, e))?;

        Ok(())
    }
}
