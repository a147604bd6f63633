// Six-motor tank drivetrain with encoder distance and gyro heading

use tracing::{info, warn};

use super::bank::{BankConfig, MotorBank};
use super::estimator::{DistanceEstimator, EncoderSource, Side};
use crate::config::{
    LEFT_BOTTOM_MOTOR_ID, LEFT_MIDDLE_MOTOR_ID, LEFT_TOP_MOTOR_ID, RIGHT_BOTTOM_MOTOR_ID,
    RIGHT_MIDDLE_MOTOR_ID, RIGHT_TOP_MOTOR_ID,
};
use crate::hal::{Encoder, IdleMode, Imu, ImuPort, MotorBus, MotorType, Result};
use crate::messages::DrivetrainTelemetry;

/// Left and right bank wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrivetrainConfig {
    pub left: BankConfig,
    pub right: BankConfig,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            left: BankConfig {
                name: "left",
                leader: LEFT_BOTTOM_MOTOR_ID,
                followers: &[LEFT_MIDDLE_MOTOR_ID, LEFT_TOP_MOTOR_ID],
                inverted: true,
                idle_mode: IdleMode::Brake,
                motor_type: MotorType::Brushless,
            },
            right: BankConfig {
                name: "right",
                leader: RIGHT_BOTTOM_MOTOR_ID,
                followers: &[RIGHT_MIDDLE_MOTOR_ID, RIGHT_TOP_MOTOR_ID],
                inverted: false,
                idle_mode: IdleMode::Brake,
                motor_type: MotorType::Brushless,
            },
        }
    }
}

/// Leader encoders of both banks
pub struct DriveEncoders {
    left: Box<dyn Encoder>,
    right: Box<dyn Encoder>,
}

impl EncoderSource for DriveEncoders {
    fn encoder_position(&self, side: Side) -> f64 {
        match side {
            Side::Left => self.left.position(),
            Side::Right => self.right.position(),
        }
    }
}

pub struct Drivetrain {
    left: MotorBank,
    right: MotorBank,
    estimator: DistanceEstimator<DriveEncoders>,
    imu: Box<dyn Imu>,
}

impl Drivetrain {
    /// Bring up both banks and open the IMU, which the drivetrain then owns
    ///
    /// Fails if any motor cannot be opened or configured, or the IMU does not answer.
    pub fn init(
        bus: &mut dyn MotorBus,
        imu_port: &mut dyn ImuPort,
        config: &DrivetrainConfig,
    ) -> Result<Self> {
        info!("Initializing drivetrain");
        let left = MotorBank::configure(bus, &config.left)?;
        let right = MotorBank::configure(bus, &config.right)?;
        let imu = imu_port.open_imu()?;

        let estimator = DistanceEstimator::new(DriveEncoders {
            left: left.encoder(),
            right: right.encoder(),
        });

        info!("Drivetrain initialized, heading {:.1} deg", imu.angle());
        Ok(Self {
            left,
            right,
            estimator,
            imu,
        })
    }

    /// Command each side directly, in [-1, 1]
    pub fn tank_drive(&mut self, left: f64, right: f64) {
        self.left.set(sanitize_output(self.left.name(), left));
        self.right.set(sanitize_output(self.right.name(), right));
    }

    pub fn stop(&mut self) {
        self.tank_drive(0.0, 0.0);
    }

    /// Gyro heading in degrees, clockwise positive
    pub fn gyro_angle(&self) -> f64 {
        self.imu.angle()
    }

    pub fn reset_gyro(&mut self) {
        info!("Resetting gyro heading");
        self.imu.reset();
    }

    pub fn imu(&self) -> &dyn Imu {
        self.imu.as_ref()
    }

    pub fn raw_distance(&self, side: Side) -> f64 {
        self.estimator.raw_distance(side)
    }

    pub fn calibrated_distance(&self, side: Side) -> f64 {
        self.estimator.calibrated_distance(side)
    }

    pub fn max_magnitude_distance(&self) -> f64 {
        self.estimator.max_magnitude_distance()
    }

    pub fn bank(&self, side: Side) -> &MotorBank {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn telemetry(&self) -> DrivetrainTelemetry {
        DrivetrainTelemetry {
            left_raw: self.raw_distance(Side::Left),
            right_raw: self.raw_distance(Side::Right),
            left_inches: self.calibrated_distance(Side::Left),
            right_inches: self.calibrated_distance(Side::Right),
            max_inches: self.max_magnitude_distance(),
            heading_deg: self.gyro_angle(),
        }
    }
}

impl Drop for Drivetrain {
    fn drop(&mut self) {
        info!("Stopping drivetrain");
        self.stop();
    }
}

fn sanitize_output(bank: &str, output: f64) -> f64 {
    if !output.is_finite() {
        warn!("Ignoring non-finite {} output {}", bank, output);
        return 0.0;
    }
    output.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::calibration::RAW_MULTIPLIER;
    use crate::hal::{HardwareInitError, SimImu, SimMotorBus, Simulation};

    fn sim_drivetrain() -> (Simulation, Drivetrain) {
        let sim = Simulation::new();
        let mut bus = sim.bus();
        let drivetrain =
            Drivetrain::init(&mut bus, &mut sim.imu(), &DrivetrainConfig::default()).unwrap();
        (sim, drivetrain)
    }

    #[test]
    fn test_default_wiring() {
        let (sim, drivetrain) = sim_drivetrain();
        let bus = sim.bus();

        assert_eq!(drivetrain.bank(Side::Left).leader_id(), 1);
        assert_eq!(drivetrain.bank(Side::Right).leader_id(), 4);
        assert_eq!(bus.motor(2).unwrap().leader, Some(1));
        assert_eq!(bus.motor(3).unwrap().leader, Some(1));
        assert_eq!(bus.motor(5).unwrap().leader, Some(4));
        assert_eq!(bus.motor(6).unwrap().leader, Some(4));

        for id in 1..=3 {
            assert!(bus.motor(id).unwrap().inverted);
        }
        for id in 4..=6 {
            assert!(!bus.motor(id).unwrap().inverted);
        }
        for id in 1..=6 {
            assert_eq!(bus.motor(id).unwrap().idle_mode, IdleMode::Brake);
        }
    }

    #[test]
    fn test_tank_drive_sets_leaders() {
        let (sim, mut drivetrain) = sim_drivetrain();
        drivetrain.tank_drive(0.5, -0.25);

        let bus = sim.bus();
        assert_eq!(bus.motor(1).unwrap().output, 0.5);
        assert_eq!(bus.motor(4).unwrap().output, -0.25);
    }

    #[test]
    fn test_tank_drive_clamps_and_rejects_nan() {
        let (sim, mut drivetrain) = sim_drivetrain();
        drivetrain.tank_drive(2.0, f64::NAN);

        let bus = sim.bus();
        assert_eq!(bus.motor(1).unwrap().output, 1.0);
        assert_eq!(bus.motor(4).unwrap().output, 0.0);
    }

    #[test]
    fn test_stop() {
        let (sim, mut drivetrain) = sim_drivetrain();
        drivetrain.tank_drive(0.7, 0.7);
        drivetrain.stop();

        let bus = sim.bus();
        assert_eq!(bus.motor(1).unwrap().output, 0.0);
        assert_eq!(bus.motor(4).unwrap().output, 0.0);
    }

    #[test]
    fn test_distance_reads_leader_encoders() {
        let (sim, drivetrain) = sim_drivetrain();
        let bus = sim.bus();
        bus.set_position(1, 100.0);
        bus.set_position(4, -150.0);

        assert_eq!(drivetrain.raw_distance(Side::Left), 100.0);
        assert_eq!(drivetrain.raw_distance(Side::Right), -150.0);
        assert_eq!(drivetrain.calibrated_distance(Side::Left), 100.0 * RAW_MULTIPLIER);
        assert_eq!(drivetrain.max_magnitude_distance(), -150.0 * RAW_MULTIPLIER);
    }

    #[test]
    fn test_driving_forward_accumulates_distance() {
        let (sim, mut drivetrain) = sim_drivetrain();
        drivetrain.tank_drive(0.5, 0.5);
        for _ in 0..10 {
            sim.step(0.02);
        }

        let telemetry = drivetrain.telemetry();
        assert!(telemetry.left_inches > 0.0);
        assert!((telemetry.left_inches - telemetry.right_inches).abs() < 1e-9);
        assert!(telemetry.heading_deg.abs() < 1e-9);
    }

    #[test]
    fn test_gyro_passthrough_and_reset() {
        let (sim, mut drivetrain) = sim_drivetrain();
        sim.imu().set_angle(37.5);
        assert_eq!(drivetrain.gyro_angle(), 37.5);
        assert_eq!(drivetrain.imu().angle(), 37.5);

        drivetrain.reset_gyro();
        assert_eq!(drivetrain.gyro_angle(), 0.0);
        assert_eq!(sim.imu().angle(), 0.0);
    }

    #[test]
    fn test_drop_stops_motors() {
        let (sim, mut drivetrain) = sim_drivetrain();
        drivetrain.tank_drive(1.0, 1.0);
        drop(drivetrain);

        let bus = sim.bus();
        assert_eq!(bus.motor(1).unwrap().output, 0.0);
        assert_eq!(bus.motor(4).unwrap().output, 0.0);
    }

    #[test]
    fn test_overlapping_banks_rejected() {
        let mut bus = SimMotorBus::new();
        let mut config = DrivetrainConfig::default();
        config.right.followers = &[5, 1];
        let err = Drivetrain::init(&mut bus, &mut SimImu::new(), &config).err().unwrap();
        assert!(matches!(err, HardwareInitError::DuplicateDevice { can_id: 1 }));
    }

    #[test]
    fn test_missing_imu_fails_init() {
        let sim = Simulation::new();
        let mut bus = sim.bus();
        let mut imu = sim.imu();
        imu.mark_absent();

        let config = DrivetrainConfig::default();
        let err = Drivetrain::init(&mut bus, &mut imu, &config).err().unwrap();
        assert!(matches!(err, HardwareInitError::ImuUnavailable(_)));
        // Banks were released, so a retry with a working IMU succeeds
        assert!(Drivetrain::init(&mut bus, &mut SimImu::new(), &config).is_ok());
    }
}
