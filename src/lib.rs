// Keyboard teleoperation for the QuickBot differential-drive robot
//
// Key presses become ramped motor powers, sent as short text commands over
// UDP; replies from the robot are polled in the background and shown on a
// terminal console.

pub mod codec;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod gamepad;
pub mod keymap;
pub mod messages;
pub mod ramp;
pub mod runtime;
pub mod telemetry;
pub mod transport;
