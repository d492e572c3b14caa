// Gamepad tank drive: left stick Y drives the left side, right stick Y the right
//
// Stick deflection maps straight to power (full deflection = 100), with small
// deflections treated as centred. The ramp is not involved; the session
// samples the sticks on its own tick and sends the result.

use gilrs::{Axis, EventType, GamepadId, Gilrs};
use tracing::{info, warn};

use crate::config::SideLimits;
use crate::messages::{Command, Side};

/// Power at full stick deflection
pub const AXIS_SCALE: f32 = 100.0;

/// Powers below this magnitude are sent as 0
pub const AXIS_DEAD_ZONE: i32 = 20;

#[derive(Debug, thiserror::Error)]
pub enum GamepadError {
    #[error("Gamepad support unavailable: {0}")]
    Init(String),
}

/// Stick position in [-1, 1] (up positive) to a motor power
pub fn axis_to_power(value: f32, limits: SideLimits) -> i32 {
    // Truncates toward zero; NaN maps to 0
    let power = (value * AXIS_SCALE) as i32;
    if power.abs() < AXIS_DEAD_ZONE {
        0
    } else {
        power.clamp(-limits.max, limits.max)
    }
}

/// Both stick positions to a power command
pub fn tank_drive(left: f32, right: f32, limits: [SideLimits; 2]) -> Command {
    Command::SetPower {
        left: axis_to_power(left, limits[Side::Left.index()]),
        right: axis_to_power(right, limits[Side::Right.index()]),
    }
}

/// First connected gamepad, followed across reconnects
pub struct GamepadSource {
    gilrs: Gilrs,
    active: Option<GamepadId>,
    limits: [SideLimits; 2],
}

impl GamepadSource {
    pub fn open(limits: [SideLimits; 2]) -> Result<Self, GamepadError> {
        let gilrs = Gilrs::new().map_err(|e| GamepadError::Init(e.to_string()))?;
        let active = gilrs.gamepads().next().map(|(id, pad)| {
            info!("Using gamepad {}", pad.name());
            id
        });
        if active.is_none() {
            warn!("No gamepad connected yet");
        }
        Ok(Self {
            gilrs,
            active,
            limits,
        })
    }

    /// Drain pending events, then read both sticks. `None` while no gamepad
    /// is connected.
    pub fn sample(&mut self) -> Option<Command> {
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                EventType::Connected if self.active.is_none() => {
                    info!("Gamepad {} connected", self.gilrs.gamepad(event.id).name());
                    self.active = Some(event.id);
                }
                EventType::Disconnected if self.active == Some(event.id) => {
                    warn!("Gamepad disconnected");
                    self.active = None;
                }
                _ => {}
            }
        }

        let pad = self.gilrs.gamepad(self.active?);
        Some(tank_drive(
            pad.value(Axis::LeftStickY),
            pad.value(Axis::RightStickY),
            self.limits,
        ))
    }
}
