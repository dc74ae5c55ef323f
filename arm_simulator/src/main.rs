use std::io::{self, BufWriter, Write};
use std::path::Path;

use arm_motion_lib::{init_tracing, MotionController, SimConfig, TelemetrySample, TickFrame};
use chrono::{DateTime, Utc};
use clap::Parser;
use eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::{debug, info, warn};

mod script;
use script::{parse_command, OperatorCommand};

const DEFAULT_CONFIG_PATH: &str = "config/arm_3dof.toml";
const DEMO_SCRIPT: &str = include_str!("../../config/demo_script.txt");

#[derive(Parser)]
#[command(name = "arm_simulator")]
#[command(about = "Run the 3-DOF arm motion engine headless and emit per-tick frames as JSON lines")]
struct Cli {
    /// Simulation config (falls back to ARM_CONFIG, then config/arm_3dof.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Operator script; the built-in demo runs when omitted
    #[arg(short, long)]
    script: Option<String>,

    /// Extra ticks to run after the script finishes
    #[arg(short, long, default_value_t = 120)]
    ticks: u64,

    /// Emit every Nth frame
    #[arg(short, long, default_value_t = 1)]
    emit_every: u64,
}

/// Final line written after the run.
#[derive(Serialize)]
struct RunSummary {
    started_at: DateTime<Utc>,
    ticks: u64,
    program_len: usize,
    history: Vec<TelemetrySample>,
}

struct Simulator<W: Write> {
    controller: MotionController,
    tick_period: f64,
    emit_every: u64,
    out: W,
}

impl<W: Write> Simulator<W> {
    fn new(config: SimConfig, emit_every: u64, out: W) -> Result<Self> {
        let tick_period = config.motion.tick_period();
        Ok(Self {
            controller: MotionController::new(config)?,
            tick_period,
            emit_every: emit_every.max(1),
            out,
        })
    }

    fn run_ticks(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            let frame = self.controller.tick(self.tick_period);
            if frame.tick % self.emit_every == 0 {
                self.emit(&frame)?;
            }
        }
        Ok(())
    }

    fn emit(&mut self, frame: &TickFrame) -> Result<()> {
        serde_json::to_writer(&mut self.out, frame)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn execute(&mut self, command: OperatorCommand) -> Result<()> {
        debug!("Executing command: {:?}", command);

        // Operator-level rejections are reported and the run continues
        let outcome = match command {
            OperatorCommand::Wait(ticks) => return self.run_ticks(ticks),
            OperatorCommand::Target(point) => self.controller.update_target(point).map(|_| ()),
            OperatorCommand::Auto => self.controller.start_auto_sequence().map(|_| ()),
            OperatorCommand::Grip => self.controller.toggle_gripper().map(|_| ()),
            OperatorCommand::Record => self.controller.record_waypoint().map(|_| ()),
            OperatorCommand::Replay => self.controller.toggle_replay().map(|_| ()),
            OperatorCommand::Clear => self.controller.clear_program(),
            OperatorCommand::Abort => {
                self.controller.abort();
                Ok(())
            }
            OperatorCommand::Reset => {
                self.controller.reset();
                Ok(())
            }
        };

        if let Err(e) = outcome {
            warn!("Command rejected: {}", e);
        }
        Ok(())
    }

    fn finish(&mut self, started_at: DateTime<Utc>) -> Result<()> {
        let summary = RunSummary {
            started_at,
            ticks: self.controller.tick_count(),
            program_len: self.controller.program().len(),
            history: self.controller.history(),
        };
        serde_json::to_writer(&mut self.out, &summary)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

fn load_config(cli_path: Option<&str>) -> Result<SimConfig> {
    let explicit = cli_path
        .map(str::to_string)
        .or_else(|| std::env::var("ARM_CONFIG").ok());

    let config = match explicit {
        Some(path) => {
            info!("Loading config from: {}", path);
            SimConfig::load_from_file(&path)
                .wrap_err_with(|| format!("Failed to load config from {}", path))?
        }
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Loading config from: {}", DEFAULT_CONFIG_PATH);
            SimConfig::load_from_file(DEFAULT_CONFIG_PATH)?
        }
        None => {
            info!("No config file found, using built-in defaults");
            SimConfig::default()
        }
    };

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let _guard = init_tracing();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    info!(
        "Arm geometry L1={} L2={} L3={}, ticking at {} Hz",
        config.arm.base_height,
        config.arm.upper_arm_length,
        config.arm.forearm_length,
        config.motion.tick_rate_hz
    );

    let script = match &cli.script {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read script {}", path))?,
        None => DEMO_SCRIPT.to_string(),
    };

    let started_at = Utc::now();
    let stdout = io::stdout();
    let mut simulator = Simulator::new(config, cli.emit_every, BufWriter::new(stdout.lock()))?;

    for (line_no, line) in script.lines().enumerate() {
        match parse_command(line) {
            Ok(Some(command)) => simulator.execute(command)?,
            Ok(None) => {}
            Err(e) => warn!("Skipping script line {}: {}", line_no + 1, e),
        }
    }

    simulator.run_ticks(cli.ticks)?;

    let ticks = simulator.controller.tick_count();
    simulator.finish(started_at)?;

    info!("Simulation finished after {} ticks", ticks);
    Ok(())
}
