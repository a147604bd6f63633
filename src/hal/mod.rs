// Hardware capability seams for the drivetrain
//
// The motor controllers, their encoders and the IMU live in vendor drivers.
// This module names the parts of those drivers the drivetrain consumes,
// plus an in-process simulation that implements them.

pub mod sim;

pub use sim::{SimImu, SimMotor, SimMotorBus, SimMotorSnapshot, Simulation};

/// Motor construction as reported to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorType {
    Brushless,
}

/// What a motor does when no output is commanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdleMode {
    /// Shaft is held resistively
    #[default]
    Brake,
    /// Shaft spins freely
    Coast,
}

/// Errors raised while bringing drivetrain hardware up
#[derive(Debug, thiserror::Error)]
pub enum HardwareInitError {
    #[error("No motor controller responding at CAN id {can_id}")]
    DeviceNotFound { can_id: u8 },

    #[error("Motor controller at CAN id {can_id} is already in use")]
    DuplicateDevice { can_id: u8 },

    #[error("Motor controller at CAN id {can_id} cannot follow itself")]
    SelfFollow { can_id: u8 },

    #[error("Failed to configure motor controller {can_id}: {reason}")]
    Configuration { can_id: u8, reason: String },

    #[error("IMU unavailable: {0}")]
    ImuUnavailable(String),
}

pub type Result<T> = std::result::Result<T, HardwareInitError>;

/// A rotary encoder attached to a motor controller
pub trait Encoder: Send {
    /// Accumulated position in raw ticks; sign follows direction of travel
    fn position(&self) -> f64;
}

/// A single motor controller on the drivetrain bus
pub trait MotorController: Send {
    fn can_id(&self) -> u8;

    /// Command a normalized output in [-1, 1]
    fn set(&mut self, output: f64);

    fn set_inverted(&mut self, inverted: bool) -> Result<()>;

    fn set_idle_mode(&mut self, mode: IdleMode) -> Result<()>;

    /// Mirror `leader`'s commanded output from now on
    fn follow(&mut self, leader: &dyn MotorController) -> Result<()>;

    /// Handle to this controller's integrated encoder
    fn encoder(&self) -> Box<dyn Encoder>;
}

/// Registers motor controllers on the bus
pub trait MotorBus {
    fn open_motor(&mut self, can_id: u8, motor_type: MotorType) -> Result<Box<dyn MotorController>>;
}

/// Brings up the inertial sensor
pub trait ImuPort {
    fn open_imu(&mut self) -> Result<Box<dyn Imu>>;
}

/// Inertial sensor providing heading
pub trait Imu: Send {
    /// Accumulated heading in degrees, clockwise positive
    fn angle(&self) -> f64;

    /// Zero the heading at the current orientation
    fn reset(&mut self);
}
