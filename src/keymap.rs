// Keyboard layout: arrows drive, a/z and s/x run one wheel, space stops,
// e/t/r/c/m send requests, q or Esc quits
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::messages::{Action, Direction, Side};

/// Help lines shown at the bottom of the console
pub const HELP: [&str; 3] = [
    "Forward/Backward: up/down arrow, Left/Right: left/right arrow, Stop: space",
    "Left Wheel: a/z, Right Wheel: s/x",
    "Quit: q, Encoder: e, IR: r, Reset Encoder: t, Check Status: c, Calibrate: m",
];

/// Map a key press to an operator action. Releases and unmapped keys give `None`.
pub fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    // Raw mode swallows SIGINT, so treat Ctrl-C as quit
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
        KeyCode::Char(' ') => Action::Stop,

        KeyCode::Up => Action::Forward,
        KeyCode::Down => Action::Backward,
        KeyCode::Left => Action::TurnLeft,
        KeyCode::Right => Action::TurnRight,

        KeyCode::Char('a') => Action::Wheel(Side::Left, Direction::Forward),
        KeyCode::Char('z') => Action::Wheel(Side::Left, Direction::Backward),
        KeyCode::Char('s') => Action::Wheel(Side::Right, Direction::Forward),
        KeyCode::Char('x') => Action::Wheel(Side::Right, Direction::Backward),

        KeyCode::Char('e') => Action::QueryEncoders,
        KeyCode::Char('t') => Action::ResetEncoders,
        KeyCode::Char('r') => Action::QueryIr,
        KeyCode::Char('c') => Action::HealthCheck,
        KeyCode::Char('m') => Action::Calibrate,
        _ => return None,
    };
    Some(action)
}

/// Character echoed on the prompt row for a key press
pub fn echo_for(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c) if c.is_ascii_lowercase() => Some(c),
        _ => None,
    }
}
