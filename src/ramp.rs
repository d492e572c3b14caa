// Dead-band-aware, saturating power ramp for the two drive motors
//
// Power on each side is either 0 or within [min, max] in magnitude.
// A step from rest jumps straight to the floor, a step down from the floor
// snaps to 0, and everything past the ceiling is clamped.

use crate::config::{CALIBRATION_POWER, RampConfig, SideLimits};
use crate::messages::{Command, Direction, Side};

/// Commanded power for both motors
#[derive(Debug, Clone)]
pub struct RampState {
    power: [i32; 2],
    limits: [SideLimits; 2],
    slow_down_rate: i32,
}

impl RampState {
    /// Start at rest with fixed per-side limits
    pub fn new(config: RampConfig) -> Self {
        Self {
            power: [0, 0],
            limits: [config.left, config.right],
            slow_down_rate: config.slow_down_rate,
        }
    }

    pub fn power(&self, side: Side) -> i32 {
        self.power[side.index()]
    }

    pub fn limits(&self, side: Side) -> SideLimits {
        self.limits[side.index()]
    }

    /// Current power as a wire command
    pub fn command(&self) -> Command {
        Command::SetPower {
            left: self.power(Side::Left),
            right: self.power(Side::Right),
        }
    }

    /// One acceleration step toward `direction`
    pub fn accelerate(&mut self, direction: Direction, side: Side) {
        let delta = direction.sign() * self.limits(side).step;
        self.step(delta, side);
    }

    /// One slow-down step toward rest; no-op at rest
    pub fn decay(&mut self, side: Side) {
        let current = self.power(side);
        if current != 0 {
            self.step(-current.signum() * self.slow_down_rate, side);
        }
    }

    pub fn decay_all(&mut self) {
        for side in Side::ALL {
            self.decay(side);
        }
    }

    pub fn stop(&mut self, side: Side) {
        self.power[side.index()] = 0;
    }

    pub fn stop_all(&mut self) {
        self.power = [0, 0];
    }

    /// Fixed asymmetric powers compensating for motor imbalance, kept
    /// inside each side's band
    pub fn calibrate(&mut self) {
        for side in Side::ALL {
            let limits = self.limits(side);
            self.power[side.index()] = CALIBRATION_POWER[side.index()].clamp(limits.min, limits.max);
        }
    }

    fn step(&mut self, delta: i32, side: Side) {
        let limits = self.limits(side);
        let way = delta.signum();
        let current = self.power[side.index()];

        let next = if current == 0 {
            way * limits.min
        } else if (current == limits.min && way < 0) || (current == -limits.min && way > 0) {
            0
        } else {
            let sum = current.saturating_add(delta);
            if sum.signum() != current.signum() {
                // Passed through zero in one step
                0
            } else if sum.abs() < limits.min {
                // Landed inside the dead band from above; hold the floor
                current.signum() * limits.min
            } else {
                sum
            }
        };

        self.power[side.index()] = next.clamp(-limits.max, limits.max);
    }
}
