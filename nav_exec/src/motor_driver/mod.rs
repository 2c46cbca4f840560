//! # Motor Driver Module
//!
//! This module provides a unified interface over the drivers of the robot's two drive motors. The
//! composition root picks the implementation:
//!
//! - [`SimMotorDriver`] - Records and logs demands, used for simulation and testing.
//! - [`GpioMotorDriver`] - Drives an H-bridge through direction, brake and PWM pins.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`MotorDriver`] implementation over embedded-hal GPIO and PWM pins.
pub mod gpio;

/// Simulated [`MotorDriver`].
pub mod sim;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use gpio::{GpioMotorDriver, MotorChannel};
pub use sim::SimMotorDriver;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for driving the left and right motors.
pub trait MotorDriver {
    /// Set the speed of both motors.
    ///
    /// ## Arguments
    /// - `left_pct`, `right_pct` - Speeds in percent. Must be within `[-100, 100]`, values outside
    ///   this range are rejected.
    fn set_speed(&mut self, left_pct: f64, right_pct: f64) -> Result<(), MotorDriverError>;

    /// Stop both motors.
    fn stop(&mut self) -> Result<(), MotorDriverError>;

    /// Stop both motors and release the hardware.
    fn cleanup(&mut self) -> Result<(), MotorDriverError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MotorDriverError {
    #[error("Motor demand ({0}, {1}) is outside [-100, 100]")]
    DemandOutOfRange(f64, f64),

    #[error("Could not set the {0} pin")]
    Pin(&'static str),

    #[error("The driver has been cleaned up")]
    Released,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<D: MotorDriver + ?Sized> MotorDriver for Box<D> {
    fn set_speed(&mut self, left_pct: f64, right_pct: f64) -> Result<(), MotorDriverError> {
        (**self).set_speed(left_pct, right_pct)
    }

    fn stop(&mut self) -> Result<(), MotorDriverError> {
        (**self).stop()
    }

    fn cleanup(&mut self) -> Result<(), MotorDriverError> {
        (**self).cleanup()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check a demand is finite and within `[-100, 100]`.
pub fn check_demand(left_pct: f64, right_pct: f64) -> Result<(), MotorDriverError> {
    let valid = |v: f64| v.is_finite() && v.abs() <= 100.0;

    if valid(left_pct) && valid(right_pct) {
        Ok(())
    } else {
        Err(MotorDriverError::DemandOutOfRange(left_pct, right_pct))
    }
}
