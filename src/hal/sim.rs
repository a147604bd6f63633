// In-process simulated drivetrain hardware
//
// Motor controllers and the IMU share state behind an Arc<Mutex<..>> so the
// handles given to the drivetrain and the Simulation that advances them see
// the same values. Encoders integrate each motor's effective command
// (the leader's command for followers) at a fixed free speed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{
    Encoder, HardwareInitError, IdleMode, Imu, ImuPort, MotorBus, MotorController, MotorType, Result,
};
use crate::config::{
    LEFT_BOTTOM_MOTOR_ID, RIGHT_BOTTOM_MOTOR_ID, SIM_FREE_SPEED_TICKS_PER_SEC, SIM_TRACK_WIDTH_INCHES,
};
use crate::drivetrain::calibration::ticks_to_inches;

#[derive(Debug, Clone, Copy)]
struct SimMotorState {
    motor_type: MotorType,
    output: f64,
    inverted: bool,
    idle_mode: IdleMode,
    leader: Option<u8>,
    position: f64,
    open: bool,
}

#[derive(Debug, Default)]
struct BusState {
    motors: BTreeMap<u8, SimMotorState>,
    absent: BTreeSet<u8>,
}

impl BusState {
    /// Command a motor is actually running: its leader's, if it follows one
    fn effective_output(&self, can_id: u8) -> f64 {
        match self.motors.get(&can_id) {
            Some(SimMotorState { leader: Some(leader), .. }) => {
                self.motors.get(leader).map_or(0.0, |m| m.output)
            }
            Some(state) => state.output,
            None => 0.0,
        }
    }
}

/// Point-in-time copy of a simulated motor, for assertions and diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimMotorSnapshot {
    pub can_id: u8,
    pub motor_type: MotorType,
    pub output: f64,
    pub inverted: bool,
    pub idle_mode: IdleMode,
    pub leader: Option<u8>,
    pub position: f64,
}

fn lock(state: &Mutex<BusState>) -> MutexGuard<'_, BusState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated motor bus; clones share the same devices
#[derive(Debug, Clone, Default)]
pub struct SimMotorBus {
    state: Arc<Mutex<BusState>>,
}

impl SimMotorBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open_motor` fail for this id as if nothing answered on the bus
    pub fn mark_absent(&self, can_id: u8) {
        lock(&self.state).absent.insert(can_id);
    }

    /// Overwrite a motor's encoder position (raw ticks)
    pub fn set_position(&self, can_id: u8, ticks: f64) {
        if let Some(motor) = lock(&self.state).motors.get_mut(&can_id) {
            motor.position = ticks;
        }
    }

    pub fn motor(&self, can_id: u8) -> Option<SimMotorSnapshot> {
        lock(&self.state).motors.get(&can_id).map(|m| SimMotorSnapshot {
            can_id,
            motor_type: m.motor_type,
            output: m.output,
            inverted: m.inverted,
            idle_mode: m.idle_mode,
            leader: m.leader,
            position: m.position,
        })
    }

    /// Advance every encoder by `dt_secs` of travel at its effective output
    fn advance(&self, dt_secs: f64) {
        let mut state = lock(&self.state);
        let deltas: Vec<(u8, f64)> = state
            .motors
            .keys()
            .map(|&id| (id, state.effective_output(id) * SIM_FREE_SPEED_TICKS_PER_SEC * dt_secs))
            .collect();

        for (id, delta) in deltas {
            if let Some(motor) = state.motors.get_mut(&id) {
                motor.position += delta;
            }
        }
    }
}

impl MotorBus for SimMotorBus {
    fn open_motor(&mut self, can_id: u8, motor_type: MotorType) -> Result<Box<dyn MotorController>> {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        if state.absent.contains(&can_id) {
            return Err(HardwareInitError::DeviceNotFound { can_id });
        }

        match state.motors.get_mut(&can_id) {
            Some(existing) if existing.open => {
                return Err(HardwareInitError::DuplicateDevice { can_id });
            }
            Some(existing) => {
                // Reopened after a drop: controller keeps its encoder count
                existing.open = true;
                existing.motor_type = motor_type;
            }
            None => {
                state.motors.insert(
                    can_id,
                    SimMotorState {
                        motor_type,
                        output: 0.0,
                        inverted: false,
                        idle_mode: IdleMode::default(),
                        leader: None,
                        position: 0.0,
                        open: true,
                    },
                );
            }
        }

        debug!("Sim motor {} opened ({:?})", can_id, motor_type);
        Ok(Box::new(SimMotor {
            can_id,
            state: Arc::clone(&self.state),
        }))
    }
}

/// Handle to one simulated motor controller
#[derive(Debug)]
pub struct SimMotor {
    can_id: u8,
    state: Arc<Mutex<BusState>>,
}

impl SimMotor {
    fn update(&self, f: impl FnOnce(&mut SimMotorState)) {
        if let Some(motor) = lock(&self.state).motors.get_mut(&self.can_id) {
            f(motor);
        }
    }
}

impl MotorController for SimMotor {
    fn can_id(&self) -> u8 {
        self.can_id
    }

    fn set(&mut self, output: f64) {
        let output = output.clamp(-1.0, 1.0);
        self.update(|m| m.output = output);
    }

    fn set_inverted(&mut self, inverted: bool) -> Result<()> {
        self.update(|m| m.inverted = inverted);
        Ok(())
    }

    fn set_idle_mode(&mut self, mode: IdleMode) -> Result<()> {
        self.update(|m| m.idle_mode = mode);
        Ok(())
    }

    fn follow(&mut self, leader: &dyn MotorController) -> Result<()> {
        let leader_id = leader.can_id();
        if leader_id == self.can_id {
            return Err(HardwareInitError::SelfFollow { can_id: self.can_id });
        }

        let mut state = lock(&self.state);
        if !state.motors.contains_key(&leader_id) {
            return Err(HardwareInitError::Configuration {
                can_id: self.can_id,
                reason: format!("leader {} is not on this bus", leader_id),
            });
        }
        if let Some(motor) = state.motors.get_mut(&self.can_id) {
            motor.leader = Some(leader_id);
        }
        Ok(())
    }

    fn encoder(&self) -> Box<dyn Encoder> {
        Box::new(SimEncoder {
            can_id: self.can_id,
            state: Arc::clone(&self.state),
        })
    }
}

impl Drop for SimMotor {
    fn drop(&mut self) {
        self.update(|m| m.open = false);
    }
}

#[derive(Debug)]
struct SimEncoder {
    can_id: u8,
    state: Arc<Mutex<BusState>>,
}

impl Encoder for SimEncoder {
    fn position(&self) -> f64 {
        lock(&self.state).motors.get(&self.can_id).map_or(0.0, |m| m.position)
    }
}

/// Simulated gyro; clones share the same heading
#[derive(Debug, Clone, Default)]
pub struct SimImu {
    heading: Arc<Mutex<f64>>,
    absent: Arc<AtomicBool>,
}

impl SimImu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `open_imu` fail as if the sensor never answered
    pub fn mark_absent(&self) {
        self.absent.store(true, Ordering::Relaxed);
    }

    pub fn set_angle(&self, degrees: f64) {
        *self.heading.lock().unwrap_or_else(PoisonError::into_inner) = degrees;
    }

    pub fn rotate(&self, degrees: f64) {
        *self.heading.lock().unwrap_or_else(PoisonError::into_inner) += degrees;
    }
}

impl Imu for SimImu {
    fn angle(&self) -> f64 {
        *self.heading.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reset(&mut self) {
        self.set_angle(0.0);
    }
}

impl ImuPort for SimImu {
    fn open_imu(&mut self) -> Result<Box<dyn Imu>> {
        if self.absent.load(Ordering::Relaxed) {
            return Err(HardwareInitError::ImuUnavailable(
                "no response from sim gyro".to_string(),
            ));
        }
        debug!("Sim IMU opened at {:.1} deg", self.angle());
        Ok(Box::new(self.clone()))
    }
}

/// Steps simulated motors and heading together
#[derive(Debug, Clone)]
pub struct Simulation {
    bus: SimMotorBus,
    imu: SimImu,
    left_leader: u8,
    right_leader: u8,
}

impl Simulation {
    /// Simulation wired for the default leader ids
    pub fn new() -> Self {
        Self::with_leaders(LEFT_BOTTOM_MOTOR_ID, RIGHT_BOTTOM_MOTOR_ID)
    }

    pub fn with_leaders(left_leader: u8, right_leader: u8) -> Self {
        Self {
            bus: SimMotorBus::new(),
            imu: SimImu::new(),
            left_leader,
            right_leader,
        }
    }

    pub fn bus(&self) -> SimMotorBus {
        self.bus.clone()
    }

    pub fn imu(&self) -> SimImu {
        self.imu.clone()
    }

    /// Advance encoders by `dt_secs`, then turn the heading by the
    /// difference in left and right wheel travel
    pub fn step(&self, dt_secs: f64) {
        let before = self.leader_positions();
        self.bus.advance(dt_secs);
        let after = self.leader_positions();

        let left_inches = ticks_to_inches(after.0 - before.0);
        let right_inches = ticks_to_inches(after.1 - before.1);
        // Left outrunning right turns clockwise
        let turn_rad = (left_inches - right_inches) / SIM_TRACK_WIDTH_INCHES;
        self.imu.rotate(turn_rad.to_degrees());
    }

    fn leader_positions(&self) -> (f64, f64) {
        let position = |id| self.bus.motor(id).map_or(0.0, |m| m.position);
        (position(self.left_leader), position(self.right_leader))
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_same_id_twice_rejected() {
        let mut bus = SimMotorBus::new();
        let _motor = bus.open_motor(1, MotorType::Brushless).unwrap();
        let err = bus.open_motor(1, MotorType::Brushless).err().unwrap();
        assert!(matches!(err, HardwareInitError::DuplicateDevice { can_id: 1 }));
    }

    #[test]
    fn test_reopen_after_drop() {
        let mut bus = SimMotorBus::new();
        let motor = bus.open_motor(1, MotorType::Brushless).unwrap();
        drop(motor);
        assert!(bus.open_motor(1, MotorType::Brushless).is_ok());
    }

    #[test]
    fn test_absent_device() {
        let mut bus = SimMotorBus::new();
        bus.mark_absent(7);
        let err = bus.open_motor(7, MotorType::Brushless).err().unwrap();
        assert!(matches!(err, HardwareInitError::DeviceNotFound { can_id: 7 }));
    }

    #[test]
    fn test_follower_tracks_leader_output() {
        let sim = Simulation::with_leaders(1, 4);
        let mut bus = sim.bus();
        let mut leader = bus.open_motor(1, MotorType::Brushless).unwrap();
        let mut follower = bus.open_motor(2, MotorType::Brushless).unwrap();
        follower.follow(leader.as_ref()).unwrap();
        // Own output is ignored while following
        follower.set(-1.0);
        leader.set(0.5);

        sim.step(1.0);

        let expected = 0.5 * SIM_FREE_SPEED_TICKS_PER_SEC;
        assert_eq!(bus.motor(1).unwrap().position, expected);
        assert_eq!(bus.motor(2).unwrap().position, expected);
        assert_eq!(follower.encoder().position(), expected);
    }

    struct StubController(u8);

    impl MotorController for StubController {
        fn can_id(&self) -> u8 {
            self.0
        }
        fn set(&mut self, _output: f64) {}
        fn set_inverted(&mut self, _inverted: bool) -> Result<()> {
            Ok(())
        }
        fn set_idle_mode(&mut self, _mode: IdleMode) -> Result<()> {
            Ok(())
        }
        fn follow(&mut self, _leader: &dyn MotorController) -> Result<()> {
            Ok(())
        }
        fn encoder(&self) -> Box<dyn Encoder> {
            unimplemented!()
        }
    }

    #[test]
    fn test_follow_self_rejected() {
        let mut bus = SimMotorBus::new();
        let mut motor = bus.open_motor(4, MotorType::Brushless).unwrap();
        let err = motor.follow(&StubController(4)).err().unwrap();
        assert!(matches!(err, HardwareInitError::SelfFollow { can_id: 4 }));
        assert_eq!(bus.motor(4).unwrap().leader, None);
    }

    #[test]
    fn test_follow_unknown_leader_rejected() {
        let mut bus = SimMotorBus::new();
        let mut motor = bus.open_motor(4, MotorType::Brushless).unwrap();
        let err = motor.follow(&StubController(9)).err().unwrap();
        assert!(matches!(err, HardwareInitError::Configuration { can_id: 4, .. }));
    }

    #[test]
    fn test_output_clamped() {
        let mut bus = SimMotorBus::new();
        let mut motor = bus.open_motor(1, MotorType::Brushless).unwrap();
        motor.set(3.0);
        assert_eq!(bus.motor(1).unwrap().output, 1.0);
    }

    #[test]
    fn test_heading_turns_clockwise_when_left_leads() {
        let sim = Simulation::with_leaders(1, 4);
        let mut bus = sim.bus();
        let mut left = bus.open_motor(1, MotorType::Brushless).unwrap();
        let mut right = bus.open_motor(4, MotorType::Brushless).unwrap();
        left.set(0.5);
        right.set(-0.5);

        sim.step(0.1);
        assert!(sim.imu().angle() > 0.0);

        left.set(0.3);
        right.set(0.3);
        let heading = sim.imu().angle();
        sim.step(0.1);
        assert!((sim.imu().angle() - heading).abs() < 1e-12);
    }

    #[test]
    fn test_absent_imu() {
        let mut imu = SimImu::new();
        imu.mark_absent();
        let err = imu.open_imu().err().unwrap();
        assert!(matches!(err, HardwareInitError::ImuUnavailable(_)));
    }

    #[test]
    fn test_opened_imu_shares_heading() {
        let mut port = SimImu::new();
        let opened = port.open_imu().unwrap();
        port.rotate(12.5);
        assert_eq!(opened.angle(), 12.5);
    }

    #[test]
    fn test_imu_reset() {
        let mut imu = SimImu::new();
        imu.rotate(42.0);
        assert_eq!(imu.angle(), 42.0);
        imu.reset();
        assert_eq!(imu.angle(), 0.0);
    }
}
