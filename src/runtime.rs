// Fixed-rate drivetrain loop with watchdog
// The watchdog stops the drivetrain when tank commands stop arriving, so a
// crashed teleop cannot leave the robot driving on its last command.

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{
    CMD_TIMEOUT, LOOP_HZ, TOPIC_CMD_RESET_GYRO, TOPIC_CMD_TANK, TOPIC_HEALTH, TOPIC_STATE_DRIVETRAIN,
};
use crate::drivetrain::{Drivetrain, DrivetrainConfig};
use crate::hal::Simulation;
use crate::messages::{DrivetrainTelemetry, RuntimeHealth, TankDriveCommand};

/// Loop knobs that can be overridden from the command line
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    pub loop_hz: u64,
    pub cmd_timeout: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            loop_hz: LOOP_HZ,
            cmd_timeout: CMD_TIMEOUT,
        }
    }
}

/// Tick period for a loop rate, without integer truncation
pub fn loop_period(loop_hz: u64) -> Duration {
    Duration::from_secs_f64(1.0 / loop_hz.max(1) as f64)
}

pub struct Runtime {
    drivetrain: Drivetrain,
    latest_cmd: Option<TankDriveCommand>,
    cmd_received_at: Instant,
    cmd_timeout: Duration,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new(drivetrain: Drivetrain, cmd_timeout: Duration) -> Self {
        Self {
            drivetrain,
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            cmd_timeout,
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    /// Process incoming command
    pub fn on_command(&mut self, cmd: TankDriveCommand) {
        self.on_command_at(cmd, Instant::now());
    }

    fn on_command_at(&mut self, cmd: TankDriveCommand, now: Instant) {
        debug!("Received command: {:?}", &cmd);
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = now;
    }

    pub fn on_reset_gyro(&mut self) {
        self.drivetrain.reset_gyro();
    }

    /// Compute actuation based on watchdog state
    pub fn compute_actuation(&mut self) -> TankDriveCommand {
        self.compute_actuation_at(Instant::now())
    }

    fn compute_actuation_at(&mut self, now: Instant) -> TankDriveCommand {
        let cmd_age = now.saturating_duration_since(self.cmd_received_at);

        if cmd_age > self.cmd_timeout {
            // Watchdog triggered - stop the robot
            if self.health != RuntimeHealth::CmdStale {
                warn!("Command stale ({:?} old), stopping drivetrain", cmd_age);
            }
            self.health = RuntimeHealth::CmdStale;
            TankDriveCommand::stop()
        } else if let Some(cmd) = self.latest_cmd {
            if self.health != RuntimeHealth::Ok {
                info!("Commands resumed");
            }
            self.health = RuntimeHealth::Ok;
            cmd
        } else {
            // No command ever received
            self.health = RuntimeHealth::CmdStale;
            TankDriveCommand::stop()
        }
    }

    /// Compute actuation and send it to the drivetrain
    pub fn tick(&mut self) -> TankDriveCommand {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> TankDriveCommand {
        let actuation = self.compute_actuation_at(now);
        self.drivetrain.tank_drive(actuation.left, actuation.right);
        actuation
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    pub fn telemetry(&self) -> DrivetrainTelemetry {
        self.drivetrain.telemetry()
    }
}

pub async fn run(options: RuntimeOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // No vendor motor bus in this build; drive the simulated hardware
    let sim = Simulation::new();
    let mut bus = sim.bus();
    let drivetrain = Drivetrain::init(&mut bus, &mut sim.imu(), &DrivetrainConfig::default())?;

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_tank = session.declare_subscriber(TOPIC_CMD_TANK).await?;
    let sub_reset_gyro = session.declare_subscriber(TOPIC_CMD_RESET_GYRO).await?;
    let pub_state = session.declare_publisher(TOPIC_STATE_DRIVETRAIN).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new(drivetrain, options.cmd_timeout);
    let period = loop_period(options.loop_hz);
    let mut tick = interval(period);

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        options.loop_hz,
        options.cmd_timeout.as_millis()
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_TANK, TOPIC_CMD_RESET_GYRO);
    info!("Publishing to: {}, {}", TOPIC_STATE_DRIVETRAIN, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_tank.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<TankDriveCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse tank command: {}", e),
            }
        }
        while let Ok(Some(_)) = sub_reset_gyro.try_recv() {
            runtime.on_reset_gyro();
        }

        // 2. Apply actuation (includes watchdog logic), then advance the simulation
        runtime.tick();
        sim.step(period.as_secs_f64());

        // 3. Publish drivetrain state
        let state_json = serde_json::to_string(&runtime.telemetry())?;
        pub_state.put(state_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health())?;
        pub_health.put(health_json).await?;
    }
}
