// One side of the drivetrain: a leader motor controller plus followers
//
// The leader takes every command and carries the encoder used for distance;
// followers mirror the leader on the bus.

use tracing::{debug, info};

use crate::hal::{Encoder, HardwareInitError, IdleMode, MotorBus, MotorController, MotorType, Result};

/// Wiring and behavior for one motor bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankConfig {
    pub name: &'static str,
    pub leader: u8,
    pub followers: &'static [u8],
    pub inverted: bool,
    pub idle_mode: IdleMode,
    pub motor_type: MotorType,
}

impl BankConfig {
    /// All CAN ids in this bank, leader first
    pub fn can_ids(&self) -> impl Iterator<Item = u8> + '_ {
        std::iter::once(self.leader).chain(self.followers.iter().copied())
    }
}

/// A configured leader/follower group
pub struct MotorBank {
    name: &'static str,
    leader: Box<dyn MotorController>,
    followers: Vec<Box<dyn MotorController>>,
}

impl MotorBank {
    /// Open every motor in the bank, link followers, and apply inversion and
    /// idle mode to each unit
    pub fn configure(bus: &mut dyn MotorBus, config: &BankConfig) -> Result<Self> {
        info!(
            "Configuring {} bank: leader {}, followers {:?}",
            config.name, config.leader, config.followers
        );

        if config.followers.contains(&config.leader) {
            return Err(HardwareInitError::SelfFollow { can_id: config.leader });
        }

        let mut leader = bus.open_motor(config.leader, config.motor_type)?;
        let mut followers = Vec::with_capacity(config.followers.len());
        for &id in config.followers {
            let mut follower = bus.open_motor(id, config.motor_type)?;
            follower.follow(leader.as_ref())?;
            debug!("Motor {} following {}", id, config.leader);
            followers.push(follower);
        }

        for motor in std::iter::once(&mut leader).chain(followers.iter_mut()) {
            motor.set_inverted(config.inverted)?;
            motor.set_idle_mode(config.idle_mode)?;
        }

        info!(
            "{} bank ready (inverted={}, idle={:?})",
            config.name, config.inverted, config.idle_mode
        );
        Ok(Self {
            name: config.name,
            leader,
            followers,
        })
    }

    /// Command the leader; followers pick it up on the bus
    pub fn set(&mut self, output: f64) {
        self.leader.set(output);
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn leader_id(&self) -> u8 {
        self.leader.can_id()
    }

    pub fn follower_ids(&self) -> Vec<u8> {
        self.followers.iter().map(|m| m.can_id()).collect()
    }

    /// Handle to the leader's encoder, the one used for distance
    pub fn encoder(&self) -> Box<dyn Encoder> {
        self.leader.encoder()
    }
}
