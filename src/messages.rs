// Define message types exchanged between the operator and the robot

use std::fmt;

/// Drive side of the differential base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    /// Slot of this side in per-side arrays
    pub const fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Direction of a single acceleration event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub const fn sign(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Command from operator -> robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetPower { left: i32, right: i32 },
    QueryIr,
    QueryEncoders,
    ResetEncoders,
    HealthCheck,
    /// Calibration powers, already fitted to each side's band
    Calibrate { left: i32, right: i32 },
    EndSession,
}

/// Operator intent produced by the keymap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Forward,
    Backward,
    TurnLeft,
    TurnRight,
    Wheel(Side, Direction),
    Stop,
    QueryEncoders,
    ResetEncoders,
    QueryIr,
    HealthCheck,
    Calibrate,
    Quit,
}

impl Action {
    /// Per-side directions requested by a drive action, `None` for everything else
    pub fn drive(self) -> Option<[Option<Direction>; 2]> {
        use Direction::{Backward, Forward};
        let dirs = match self {
            Action::Forward => [Some(Forward), Some(Forward)],
            Action::Backward => [Some(Backward), Some(Backward)],
            Action::TurnLeft => [Some(Backward), Some(Forward)],
            Action::TurnRight => [Some(Forward), Some(Backward)],
            Action::Wheel(side, dir) => {
                let mut dirs = [None, None];
                dirs[side.index()] = Some(dir);
                dirs
            }
            _ => return None,
        };
        Some(dirs)
    }
}

/// Raw datagram received from the robot. The reply grammar belongs to the
/// firmware, so nothing here looks inside it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryMessage(Vec<u8>);

impl TelemetryMessage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TelemetryMessage {
    // Lossy text form for the console, without the trailing line break
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.0);
        f.write_str(text.trim_end_matches(&['\r', '\n'][..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_indices_are_distinct() {
        assert_eq!(Side::Left.index(), 0);
        assert_eq!(Side::Right.index(), 1);
        assert_eq!(Side::ALL.map(Side::index), [0, 1]);
    }

    #[test]
    fn test_turns_spin_sides_opposite_ways() {
        let left = Action::TurnLeft.drive().unwrap();
        assert_eq!(left, [Some(Direction::Backward), Some(Direction::Forward)]);
        let right = Action::TurnRight.drive().unwrap();
        assert_eq!(right, [Some(Direction::Forward), Some(Direction::Backward)]);
    }

    #[test]
    fn test_wheel_action_touches_one_side() {
        let dirs = Action::Wheel(Side::Right, Direction::Backward).drive().unwrap();
        assert_eq!(dirs, [None, Some(Direction::Backward)]);
        assert!(Action::Stop.drive().is_none());
        assert!(Action::QueryIr.drive().is_none());
    }

    #[test]
    fn test_telemetry_display_trims_line_break() {
        let msg = TelemetryMessage::new(b"[0, 1, 2]\r\n".to_vec());
        assert_eq!(msg.to_string(), "[0, 1, 2]");
        assert_eq!(msg.len(), 11);
    }
}
