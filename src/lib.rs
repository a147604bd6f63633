pub mod config;
pub mod drivetrain;
pub mod hal;
pub mod messages;
pub mod runtime;
