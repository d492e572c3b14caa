// Turns operator actions into ramp steps and outbound commands
//
// Direct mode: every drive key steps the ramp and sends right away; with no
// input the robot keeps its last power.
// Timed mode: drive keys only mark a side as held. The ramp tick steps held
// sides and decays the rest, and the send tick ships whatever the ramp holds.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::DispatchMode;
use crate::messages::{Action, Command, Direction, Side};
use crate::ramp::RampState;

/// What the session should do after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Send(Command),
    Idle,
    Quit,
}

#[derive(Debug, Clone, Copy)]
struct Held {
    direction: Direction,
    at: Instant,
}

pub struct InputDispatcher {
    ramp: RampState,
    mode: DispatchMode,
    hold: Duration,
    held: [Option<Held>; 2],
}

impl InputDispatcher {
    /// `hold` is how long a press keeps its side held in timed mode
    pub fn new(ramp: RampState, mode: DispatchMode, hold: Duration) -> Self {
        Self {
            ramp,
            mode,
            hold,
            held: [None, None],
        }
    }

    pub fn ramp(&self) -> &RampState {
        &self.ramp
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn handle(&mut self, action: Action, now: Instant) -> Dispatch {
        if let Some(directions) = action.drive() {
            return self.drive(directions, now);
        }

        match action {
            Action::Quit => Dispatch::Quit,
            Action::Stop => {
                self.ramp.stop_all();
                self.held = [None, None];
                Dispatch::Send(self.ramp.command())
            }
            Action::Calibrate => {
                self.ramp.calibrate();
                Dispatch::Send(Command::Calibrate {
                    left: self.ramp.power(Side::Left),
                    right: self.ramp.power(Side::Right),
                })
            }
            Action::QueryEncoders => Dispatch::Send(Command::QueryEncoders),
            Action::ResetEncoders => Dispatch::Send(Command::ResetEncoders),
            Action::QueryIr => Dispatch::Send(Command::QueryIr),
            Action::HealthCheck => Dispatch::Send(Command::HealthCheck),
            // Drive actions were handled above
            _ => Dispatch::Idle,
        }
    }

    fn drive(&mut self, directions: [Option<Direction>; 2], now: Instant) -> Dispatch {
        match self.mode {
            DispatchMode::Direct => {
                for side in Side::ALL {
                    if let Some(direction) = directions[side.index()] {
                        self.ramp.accelerate(direction, side);
                    }
                }
                Dispatch::Send(self.ramp.command())
            }
            DispatchMode::Timed => {
                for side in Side::ALL {
                    if let Some(direction) = directions[side.index()] {
                        self.held[side.index()] = Some(Held { direction, at: now });
                    }
                }
                Dispatch::Idle
            }
        }
    }

    /// Ramp tick (timed mode): step held sides, decay released ones
    pub fn ramp_tick(&mut self, now: Instant) {
        if self.mode != DispatchMode::Timed {
            return;
        }
        for side in Side::ALL {
            let slot = &mut self.held[side.index()];
            match *slot {
                Some(held) if now.saturating_duration_since(held.at) <= self.hold => {
                    self.ramp.accelerate(held.direction, side);
                }
                Some(_) => {
                    debug!("{:?} side released", side);
                    *slot = None;
                    self.ramp.decay(side);
                }
                None => self.ramp.decay(side),
            }
        }
    }

    /// Send tick: current power, changed or not
    pub fn send_tick(&self) -> Command {
        self.ramp.command()
    }
}
