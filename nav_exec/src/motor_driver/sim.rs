//! Simulated motor driver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace};

use super::{check_demand, MotorDriver, MotorDriverError};
use crate::auto::nav_ctrl::WheelDemand;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Motor driver with no hardware behind it. Every demand is logged and recorded.
#[derive(Debug, Default, Clone)]
pub struct SimMotorDriver {
    last_demand: WheelDemand,

    /// Largest magnitude demanded on either wheel.
    peak_abs_pct: f64,

    num_calls: usize,

    released: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimMotorDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_demand(&self) -> &WheelDemand {
        &self.last_demand
    }

    pub fn peak_abs_pct(&self) -> f64 {
        self.peak_abs_pct
    }

    /// Number of `set_speed` and `stop` calls.
    pub fn num_calls(&self) -> usize {
        self.num_calls
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl MotorDriver for SimMotorDriver {
    fn set_speed(&mut self, left_pct: f64, right_pct: f64) -> Result<(), MotorDriverError> {
        if self.released {
            return Err(MotorDriverError::Released);
        }
        check_demand(left_pct, right_pct)?;

        trace!("SimMotorDriver: left {:.1} %, right {:.1} %", left_pct, right_pct);

        self.last_demand = WheelDemand {
            left_pct,
            right_pct,
        };
        self.peak_abs_pct = self.peak_abs_pct.max(self.last_demand.max_abs_pct());
        self.num_calls += 1;

        Ok(())
    }

    fn stop(&mut self) -> Result<(), MotorDriverError> {
        if self.released {
            return Err(MotorDriverError::Released);
        }

        self.last_demand = WheelDemand::zero();
        self.num_calls += 1;

        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), MotorDriverError> {
        if !self.released {
            self.stop()?;
            self.released = true;
            debug!("SimMotorDriver released after {} calls", self.num_calls);
        }

        Ok(())
    }
}
