use std::collections::BTreeMap;

use eyre::Result;
use tracing::{debug, info, warn};

use crate::control::{
    AutoSequencer, EntityPhysics, GripperController, MotionSmoother, ReplayEvent,
    SequencerEvent, SequencerPhase, TeachReplayer, TelemetryEstimator,
};
use crate::types::{
    ControlMode, Entity, EntityId, JointAngles, MotionError, MotionResult, Position, Program,
    SimConfig, TelemetrySample, TickFrame,
};
use crate::utils::GeometrySolver;

/// Composition root of the motion engine.
///
/// Owns the target, joint state, entities, taught program and telemetry, and
/// advances all of them once per [`MotionController::tick`]. Operator commands
/// are applied between ticks; a rejected command leaves every piece of state
/// untouched.
pub struct MotionController {
    config: SimConfig,
    solver: GeometrySolver,
    smoother: MotionSmoother,
    sequencer: AutoSequencer,
    replayer: TeachReplayer,
    gripper: GripperController,
    physics: EntityPhysics,
    telemetry: TelemetryEstimator,
    home_angles: JointAngles,
    mode: ControlMode,
    target: Position,
    desired: JointAngles,
    actual: JointAngles,
    tick: u64,
    solver_error: Option<MotionError>,
}

impl MotionController {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let solver = GeometrySolver::new(&config.arm);
        let home = config.arm.home();
        let home_angles = solver
            .solve(&home)
            .map_err(|e| eyre::eyre!("Home position not solvable: {}", e))?;

        info!(
            "Motion controller ready: L1={} L2={} L3={}, {} entities",
            config.arm.base_height,
            config.arm.upper_arm_length,
            config.arm.forearm_length,
            config.entities.initial_positions.len()
        );

        Ok(Self {
            solver,
            smoother: MotionSmoother::new(config.motion.smoothing_factor),
            sequencer: AutoSequencer::new(&config.sequencer, config.gripper.attach_offset, home),
            replayer: TeachReplayer::new(&config.replay),
            gripper: GripperController::new(config.gripper.capture_radius),
            physics: EntityPhysics::new(
                &config.physics,
                config.gripper.attach_offset,
                &config.entities.initial_positions,
            ),
            telemetry: TelemetryEstimator::new(&config.telemetry),
            home_angles,
            mode: ControlMode::Manual,
            target: home,
            desired: home_angles,
            actual: home_angles,
            tick: 0,
            solver_error: None,
            config,
        })
    }

    /// Manual target input. Returns the new joint command, or the reason the
    /// previous command is being held.
    pub fn update_target(&mut self, point: Position) -> MotionResult<JointAngles> {
        if self.mode != ControlMode::Manual {
            return Err(self.reject(format!(
                "target input ignored while {} mode is active",
                self.mode
            )));
        }

        self.target = point;
        match self.solver.solve(&point) {
            Ok(angles) => {
                self.desired = angles;
                self.solver_error = None;
                Ok(angles)
            }
            Err(e) => {
                debug!("Holding joint command: {}", e);
                self.solver_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Advance the simulation by one tick of `elapsed` seconds.
    pub fn tick(&mut self, elapsed: f64) -> TickFrame {
        self.tick += 1;

        match self.mode {
            ControlMode::Manual => {}
            ControlMode::Autonomous => self.step_sequencer(elapsed),
            ControlMode::Replay => self.step_replay(elapsed),
        }

        match self.solver.solve(&self.target) {
            Ok(angles) => {
                self.desired = angles;
                self.solver_error = None;
            }
            Err(e) => {
                if self.mode != ControlMode::Manual && self.solver_error.is_none() {
                    warn!("{} mode drove target out of the workspace: {}", self.mode, e);
                }
                self.solver_error = Some(e);
            }
        }

        let previous = self.actual;
        self.actual = self.smoother.advance(&previous, &self.desired);

        let end_effector = self.end_effector();
        let attached = self.gripper.attached();
        self.physics.step(attached, &end_effector);

        let telemetry =
            self.telemetry
                .observe(self.tick, &previous, &self.actual, elapsed, attached.is_some());

        self.frame(telemetry)
    }

    fn step_sequencer(&mut self, elapsed: f64) {
        let event = self
            .sequencer
            .step(&mut self.target, elapsed, self.physics.entities());

        match event {
            SequencerEvent::Attach(id) => self.gripper.attach(id),
            SequencerEvent::Detach(_) => {
                self.gripper.disengage();
            }
            SequencerEvent::Completed => {
                info!("Auto sequence complete");
                self.mode = ControlMode::Manual;
            }
            SequencerEvent::EntityLost(id) => {
                warn!("Auto sequence abandoned: entity {} no longer exists", id);
                self.mode = ControlMode::Manual;
            }
            SequencerEvent::Idle => self.mode = ControlMode::Manual,
            SequencerEvent::Moving | SequencerEvent::Advanced(_) => {}
        }
    }

    fn step_replay(&mut self, elapsed: f64) {
        let end_effector = self.end_effector();
        let event = self
            .replayer
            .step(&mut self.target, elapsed, self.gripper.grip());

        match event {
            ReplayEvent::Reached {
                index,
                grip: Some(true),
            } => {
                let grabbed = self.gripper.engage(&end_effector, self.physics.entities());
                debug!("Replay waypoint {} engaged grip: {:?}", index, grabbed);
            }
            ReplayEvent::Reached {
                index,
                grip: Some(false),
            } => {
                self.gripper.disengage();
                debug!("Replay waypoint {} released grip", index);
            }
            ReplayEvent::Reached { grip: None, .. } | ReplayEvent::Moving => {}
            ReplayEvent::Idle => self.mode = ControlMode::Manual,
        }
    }

    /// Begin an autonomous pick-and-place cycle on the nearest free entity.
    ///
    /// Ignored while a cycle is already running. Rejected while holding an
    /// entity or replaying.
    pub fn start_auto_sequence(&mut self) -> MotionResult<EntityId> {
        if let (ControlMode::Autonomous, Some(tracked)) = (self.mode, self.sequencer.tracked()) {
            debug!("Auto sequence already running on entity {}", tracked);
            return Ok(tracked);
        }
        if self.mode == ControlMode::Replay {
            return Err(self.reject("stop replay before starting the auto sequence"));
        }
        if let Some(held) = self.gripper.attached() {
            return Err(self.reject(format!(
                "release entity {} before starting the auto sequence",
                held
            )));
        }

        let Some(entity) = self
            .sequencer
            .select_entity(&self.end_effector(), self.physics.entities())
        else {
            return Err(self.reject("no entity left outside the drop zone"));
        };

        self.sequencer.start(entity);
        self.mode = ControlMode::Autonomous;
        info!("Auto sequence started on entity {}", entity);
        Ok(entity)
    }

    /// Release if holding, otherwise grab the nearest entity in range.
    pub fn toggle_gripper(&mut self) -> MotionResult<Option<EntityId>> {
        self.require_manual("toggle the gripper")?;
        let end_effector = self.end_effector();
        let attached = self.gripper.toggle(&end_effector, self.physics.entities());
        info!(
            "Gripper {} (holding {:?})",
            if self.gripper.grip() { "closed" } else { "open" },
            attached
        );
        Ok(attached)
    }

    /// Append the current target and grip state to the program.
    pub fn record_waypoint(&mut self) -> MotionResult<usize> {
        self.require_manual("record a waypoint")?;
        let len = self.replayer.record(self.target, self.gripper.grip());
        info!("Program now has {} waypoints", len);
        Ok(len)
    }

    /// Start or stop replay. Returns the resulting mode.
    pub fn toggle_replay(&mut self) -> MotionResult<ControlMode> {
        match self.mode {
            ControlMode::Replay => {
                self.replayer.stop();
                self.mode = ControlMode::Manual;
                info!("Replay stopped at waypoint {}", self.replayer.index());
            }
            ControlMode::Autonomous => {
                return Err(self.reject("abort the auto sequence before replaying"));
            }
            ControlMode::Manual => {
                if self.replayer.start() {
                    self.mode = ControlMode::Replay;
                    info!("Replaying {} waypoints", self.replayer.program().len());
                } else {
                    info!("Program is empty; staying in manual mode");
                }
            }
        }
        Ok(self.mode)
    }

    pub fn clear_program(&mut self) -> MotionResult<()> {
        self.require_manual("clear the program")?;
        self.replayer.clear();
        info!("Program cleared");
        Ok(())
    }

    /// Drop back to manual mode at the tick boundary. Grip and attachment are
    /// left as they are.
    pub fn abort(&mut self) {
        if self.mode != ControlMode::Manual {
            info!("Aborting {} mode", self.mode);
        }
        self.sequencer.stop();
        self.replayer.stop();
        self.mode = ControlMode::Manual;
    }

    /// Restore every piece of state to its initial value.
    pub fn reset(&mut self) {
        self.sequencer.stop();
        self.replayer.clear();
        self.gripper.reset();
        self.physics.reset(&self.config.entities.initial_positions);
        self.telemetry.clear();
        self.mode = ControlMode::Manual;
        self.target = self.config.arm.home();
        self.desired = self.home_angles;
        self.actual = self.home_angles;
        self.tick = 0;
        self.solver_error = None;
        info!("Simulation reset");
    }

    fn require_manual(&self, action: &str) -> MotionResult<()> {
        if self.mode == ControlMode::Manual {
            Ok(())
        } else {
            Err(self.reject(format!("cannot {} while {} mode is active", action, self.mode)))
        }
    }

    fn reject(&self, reason: impl Into<String>) -> MotionError {
        let err = MotionError::invalid_operation(reason);
        warn!("{}", err);
        err
    }

    fn frame(&self, telemetry: Option<TelemetrySample>) -> TickFrame {
        let attached = self.gripper.attached();
        let effector = self.end_effector();
        TickFrame {
            tick: self.tick,
            mode: self.mode,
            phase: self.sequencer.phase(),
            actual_angles: self.actual,
            desired_angles: self.desired,
            target: [self.target.x, self.target.y, self.target.z],
            end_effector: [effector.x, effector.y, effector.z],
            grip: self.gripper.grip(),
            attached_entity: attached,
            entities: self.physics.snapshot(attached),
            telemetry,
            solver_error: self.solver_error.as_ref().map(|e| e.to_string()),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn phase(&self) -> SequencerPhase {
        self.sequencer.phase()
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn desired_angles(&self) -> JointAngles {
        self.desired
    }

    pub fn actual_angles(&self) -> JointAngles {
        self.actual
    }

    pub fn end_effector(&self) -> Position {
        self.solver.forward(&self.actual)
    }

    pub fn grip(&self) -> bool {
        self.gripper.grip()
    }

    pub fn attached_entity(&self) -> Option<EntityId> {
        self.gripper.attached()
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, Entity> {
        self.physics.entities()
    }

    pub fn program(&self) -> &Program {
        self.replayer.program()
    }

    pub fn replay_index(&self) -> usize {
        self.replayer.index()
    }

    pub fn history(&self) -> Vec<TelemetrySample> {
        self.telemetry.history().iter().copied().collect()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn solver_error(&self) -> Option<&MotionError> {
        self.solver_error.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const DT: f64 = 1.0 / 60.0;

    fn controller() -> MotionController {
        MotionController::new(SimConfig::default()).unwrap()
    }

    fn run(controller: &mut MotionController, ticks: usize) {
        for _ in 0..ticks {
            controller.tick(DT);
        }
    }

    #[test]
    fn test_starts_at_home() {
        let c = controller();
        let tip = c.end_effector();
        assert_abs_diff_eq!(tip.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tip.y, 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tip.z, 2.0, epsilon = 1e-9);
        assert_eq!(c.mode(), ControlMode::Manual);
        assert_eq!(c.phase(), SequencerPhase::Idle);
    }

    #[test]
    fn test_unreachable_target_holds_previous_command() {
        let mut c = controller();
        let good = c.update_target(Position::new(0.0, 1.0, 3.0)).unwrap();

        let err = c.update_target(Position::new(0.0, 1.0, 10.0)).unwrap_err();
        assert!(err.is_unreachable());
        assert_eq!(c.desired_angles(), good);

        let frame = c.tick(DT);
        assert_eq!(frame.desired_angles, good);
        assert!(frame.solver_error.is_some());
    }

    #[test]
    fn test_degenerate_target_is_reported() {
        let mut c = controller();
        let before = c.desired_angles();
        assert_eq!(
            c.update_target(Position::new(0.0, 1.0, 0.0)),
            Err(MotionError::Degenerate)
        );
        assert_eq!(c.desired_angles(), before);
    }

    #[test]
    fn test_manual_target_is_reached_after_smoothing() {
        let mut c = controller();
        c.update_target(Position::new(1.0, 2.0, 3.0)).unwrap();
        run(&mut c, 400);

        let tip = c.end_effector();
        assert_abs_diff_eq!(tip.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(tip.y, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(tip.z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_auto_sequence_rejected_while_holding() {
        let mut c = controller();
        c.update_target(Position::new(2.0, 1.0, 2.0)).unwrap();
        run(&mut c, 300);
        assert_eq!(c.toggle_gripper().unwrap(), Some(0));

        let err = c.start_auto_sequence().unwrap_err();
        assert!(matches!(err, MotionError::InvalidOperation(_)));
        assert_eq!(c.phase(), SequencerPhase::Idle);
        assert_eq!(c.mode(), ControlMode::Manual);
        assert_eq!(c.attached_entity(), Some(0));
    }

    #[test]
    fn test_auto_sequence_is_not_reentrant() {
        let mut c = controller();
        let first = c.start_auto_sequence().unwrap();
        run(&mut c, 10);
        let phase = c.phase();

        assert_eq!(c.start_auto_sequence().unwrap(), first);
        assert_eq!(c.phase(), phase);
    }

    #[test]
    fn test_commands_rejected_outside_manual_mode() {
        let mut c = controller();
        c.start_auto_sequence().unwrap();

        assert!(c.record_waypoint().is_err());
        assert!(c.toggle_gripper().is_err());
        assert!(c.toggle_replay().is_err());
        assert!(c.update_target(Position::new(1.0, 2.0, 3.0)).is_err());
        assert!(c.program().is_empty());
    }

    #[test]
    fn test_empty_replay_stays_manual() {
        let mut c = controller();
        assert_eq!(c.toggle_replay().unwrap(), ControlMode::Manual);
    }

    #[test]
    fn test_abort_preserves_grip() {
        let mut c = controller();
        c.start_auto_sequence().unwrap();
        for _ in 0..3000 {
            c.tick(DT);
            if c.attached_entity().is_some() {
                break;
            }
        }
        assert!(c.attached_entity().is_some());

        c.abort();
        assert_eq!(c.mode(), ControlMode::Manual);
        assert_eq!(c.phase(), SequencerPhase::Idle);
        assert!(c.grip());
        assert!(c.attached_entity().is_some());
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut c = controller();
        c.update_target(Position::new(1.0, 2.0, 3.0)).unwrap();
        c.record_waypoint().unwrap();
        run(&mut c, 50);
        c.reset();

        assert_eq!(c.tick_count(), 0);
        assert!(c.program().is_empty());
        assert!(c.history().is_empty());
        assert_eq!(c.target(), c.config().arm.home());
        assert!(!c.grip());
        assert_eq!(c.entities().len(), 3);
        assert_eq!(c.entities()[&0].position, Position::new(2.0, 0.5, 2.0));
    }

    #[test]
    fn test_telemetry_history_bounded() {
        let mut c = controller();
        c.update_target(Position::new(2.0, 3.0, 0.0)).unwrap();
        let mut samples = 0;
        for _ in 0..1000 {
            if c.tick(DT).telemetry.is_some() {
                samples += 1;
            }
            assert!(c.history().len() <= c.config().telemetry.history_capacity);
        }
        assert_eq!(samples, 200);
        assert_eq!(c.history().len(), 50);
        assert_eq!(c.history().last().map(|s| s.tick), Some(1000));
    }
}
