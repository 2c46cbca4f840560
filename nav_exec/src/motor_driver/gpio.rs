//! [`MotorDriver`] implementation for an H-bridge driven from GPIO
//!
//! Each motor has a direction pin, a brake pin and a PWM output. The sign of the demand selects
//! the direction, its magnitude sets the duty cycle, and a zero demand applies the brake.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use embedded_hal::{digital::v2::OutputPin, PwmPin};
use log::{debug, trace};
use util::maths::lin_map;

use super::{check_demand, MotorDriver, MotorDriverError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The pins of one motor.
pub struct MotorChannel<P, W> {
    pub direction: P,
    pub brake: P,
    pub pwm: W,

    /// Swap the meaning of the direction pin, for a motor mounted the other way round.
    pub inverted: bool,
}

pub struct GpioMotorDriver<P, W> {
    left: MotorChannel<P, W>,
    right: MotorChannel<P, W>,
    released: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<P, W> MotorChannel<P, W>
where
    P: OutputPin,
    W: PwmPin<Duty = f64>,
{
    pub fn new(direction: P, brake: P, pwm: W, inverted: bool) -> Self {
        Self {
            direction,
            brake,
            pwm,
            inverted,
        }
    }

    fn set(&mut self, speed_pct: f64) -> Result<(), MotorDriverError> {
        if speed_pct == 0.0 {
            self.pwm.set_duty(0.0);
            return self
                .brake
                .set_high()
                .map_err(|_| MotorDriverError::Pin("brake"));
        }

        let forward = (speed_pct > 0.0) != self.inverted;
        let dir = if forward {
            self.direction.set_high()
        } else {
            self.direction.set_low()
        };
        dir.map_err(|_| MotorDriverError::Pin("direction"))?;

        self.brake
            .set_low()
            .map_err(|_| MotorDriverError::Pin("brake"))?;

        let duty = lin_map((0.0, 100.0), (0.0, self.pwm.get_max_duty()), speed_pct.abs());
        self.pwm.set_duty(duty);

        Ok(())
    }
}

impl<P, W> GpioMotorDriver<P, W>
where
    P: OutputPin,
    W: PwmPin<Duty = f64>,
{
    /// Create the driver, enabling both PWM outputs with the brakes applied.
    pub fn new(
        left: MotorChannel<P, W>,
        right: MotorChannel<P, W>,
    ) -> Result<Self, MotorDriverError> {
        let mut driver = Self {
            left,
            right,
            released: false,
        };

        driver.left.pwm.enable();
        driver.right.pwm.enable();
        driver.stop()?;

        debug!("GpioMotorDriver initialised");

        Ok(driver)
    }
}

impl<P, W> MotorDriver for GpioMotorDriver<P, W>
where
    P: OutputPin,
    W: PwmPin<Duty = f64>,
{
    fn set_speed(&mut self, left_pct: f64, right_pct: f64) -> Result<(), MotorDriverError> {
        if self.released {
            return Err(MotorDriverError::Released);
        }
        check_demand(left_pct, right_pct)?;

        trace!("GpioMotorDriver: left {:.1} %, right {:.1} %", left_pct, right_pct);

        self.left.set(left_pct)?;
        self.right.set(right_pct)
    }

    fn stop(&mut self) -> Result<(), MotorDriverError> {
        if self.released {
            return Err(MotorDriverError::Released);
        }

        self.left.set(0.0)?;
        self.right.set(0.0)
    }

    fn cleanup(&mut self) -> Result<(), MotorDriverError> {
        if self.released {
            return Ok(());
        }

        self.stop()?;
        self.left.pwm.disable();
        self.right.pwm.disable();
        self.released = true;

        debug!("GpioMotorDriver released");

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::Infallible;

    #[derive(Debug, Default)]
    struct MockPin {
        high: bool,
    }

    #[derive(Debug, Default)]
    struct MockPwm {
        enabled: bool,
        duty: f64,
    }

    impl OutputPin for MockPin {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    impl PwmPin for MockPwm {
        type Duty = f64;

        fn disable(&mut self) {
            self.enabled = false;
        }

        fn enable(&mut self) {
            self.enabled = true;
        }

        fn get_duty(&self) -> f64 {
            self.duty
        }

        fn get_max_duty(&self) -> f64 {
            1.0
        }

        fn set_duty(&mut self, duty: f64) {
            self.duty = duty;
        }
    }

    fn channel(inverted: bool) -> MotorChannel<MockPin, MockPwm> {
        MotorChannel::new(MockPin::default(), MockPin::default(), MockPwm::default(), inverted)
    }

    #[test]
    fn test_pin_mapping() {
        let mut d = GpioMotorDriver::new(channel(false), channel(true)).unwrap();
        assert!(d.left.pwm.enabled);
        assert!(d.left.brake.high && d.right.brake.high);

        d.set_speed(25.0, 25.0).unwrap();
        assert!(!d.left.brake.high);
        assert!(d.left.direction.high);
        assert!(!d.right.direction.high);
        assert!((d.left.pwm.duty - 0.25).abs() < 1e-12);
        assert!((d.right.pwm.duty - 0.25).abs() < 1e-12);

        d.set_speed(-50.0, 0.0).unwrap();
        assert!(!d.left.direction.high);
        assert!((d.left.pwm.duty - 0.5).abs() < 1e-12);
        assert!(d.right.brake.high);
        assert_eq!(d.right.pwm.duty, 0.0);

        assert!(d.set_speed(150.0, 0.0).is_err());
    }

    #[test]
    fn test_cleanup_brakes() {
        let mut d = GpioMotorDriver::new(channel(false), channel(false)).unwrap();
        d.set_speed(30.0, -30.0).unwrap();
        d.cleanup().unwrap();

        assert!(d.left.brake.high && d.right.brake.high);
        assert!(!d.left.pwm.enabled && !d.right.pwm.enabled);
        assert_eq!(d.stop(), Err(MotorDriverError::Released));
    }
}
