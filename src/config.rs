// Addresses, cadences, ramp parameters and the command line
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::messages::Side;

// Network
pub const DEFAULT_PORT: u16 = 5005; // shared by robot and operator
pub const DEFAULT_ROBOT_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 160));
pub const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const RECV_BUFFER_SIZE: usize = 2048; // bytes per datagram

// Telemetry poll cadence
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

// Timed dispatch: ramp tick, send tick, and how long a key press counts as held
pub const RAMP_TICK: Duration = Duration::from_millis(20);
pub const SEND_TICK: Duration = Duration::from_millis(200);
pub const INPUT_HOLD: Duration = Duration::from_millis(100);

// Console redraw cadence when nothing else wakes the foreground loop
pub const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

// Gamepad tank drive: sample and send cadence
pub const GAMEPAD_TICK: Duration = Duration::from_millis(100);

// Motor imbalance compensation (left, right)
pub const CALIBRATION_POWER: [i32; 2] = [90, 80];

// Largest power the motor driver accepts
pub const MAX_POWER: i32 = 255;

// Log destination while the console owns the terminal
pub const DEFAULT_LOG_FILE: &str = "quickbot-teleop.log";

/// Error types for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid ramp parameters: {0}")]
    Invalid(String),
}

/// Dead-band floor, saturation ceiling and step size of one motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideLimits {
    pub min: i32,
    pub max: i32,
    pub step: i32,
}

impl Default for SideLimits {
    fn default() -> Self {
        Self {
            min: 35,
            max: 100,
            step: 2,
        }
    }
}

/// Ramp parameters for both motors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RampConfig {
    pub left: SideLimits,
    pub right: SideLimits,
    pub slow_down_rate: i32,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            left: SideLimits::default(),
            right: SideLimits::default(),
            slow_down_rate: 2,
        }
    }
}

impl RampConfig {
    /// Same limits on both sides
    pub fn symmetric(limits: SideLimits) -> Self {
        Self {
            left: limits,
            right: limits,
            ..Self::default()
        }
    }

    pub fn side(&self, side: Side) -> SideLimits {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Load from a JSON file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for side in Side::ALL {
            let limits = self.side(side);
            if limits.min <= 0 || limits.min > limits.max || limits.max > MAX_POWER {
                return Err(ConfigError::Invalid(format!(
                    "{:?} side needs 0 < min <= max <= {}, got min={} max={}",
                    side, MAX_POWER, limits.min, limits.max
                )));
            }
            if limits.step <= 0 || limits.step > limits.max {
                return Err(ConfigError::Invalid(format!(
                    "{:?} side needs 0 < step <= max, got step={}",
                    side, limits.step
                )));
            }
        }
        if self.slow_down_rate <= 0 || self.slow_down_rate > MAX_POWER {
            return Err(ConfigError::Invalid(format!(
                "slow_down_rate must be in 1..={}, got {}",
                MAX_POWER, self.slow_down_rate
            )));
        }
        Ok(())
    }
}

/// How input events turn into outbound commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DispatchMode {
    /// Every key press mutates the ramp and sends at once
    #[default]
    Direct,
    /// Key presses set a held direction; ramp and send run on fixed ticks
    Timed,
}

/// Where drive input comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InputSource {
    /// Arrow and wheel keys through the ramp
    #[default]
    Keyboard,
    /// Gamepad sticks as tank drive: left stick Y is the left side, right stick Y the right
    Gamepad,
}

/// Keyboard teleop for the QuickBot differential-drive robot
#[derive(Debug, Parser)]
#[command(name = "quickbot-teleop", version)]
pub struct Args {
    /// Robot IP address
    #[arg(value_name = "ROBOT_ADDR", default_value_t = DEFAULT_ROBOT_IP)]
    pub robot: IpAddr,

    /// UDP port shared by the robot and this host
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Local address to bind
    #[arg(long, default_value_t = DEFAULT_BIND_IP)]
    pub bind: IpAddr,

    /// Input dispatch model
    #[arg(long, value_enum, default_value_t = DispatchMode::Direct)]
    pub mode: DispatchMode,

    /// Drive input source; the keyboard still handles requests and quit
    #[arg(long, value_enum, default_value_t = InputSource::Keyboard)]
    pub input: InputSource,

    /// JSON file overriding the ramp parameters
    #[arg(long, value_name = "PATH")]
    pub ramp_config: Option<PathBuf>,

    /// Where log lines go while the console is up
    #[arg(long, value_name = "PATH", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,
}

/// Everything a session needs, resolved from the command line
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub local: SocketAddr,
    pub remote: SocketAddr,
    pub mode: DispatchMode,
    pub input: InputSource,
    pub ramp: RampConfig,
}

impl SessionConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let ramp = match &args.ramp_config {
            Some(path) => RampConfig::load(path)?,
            None => RampConfig::default(),
        };
        Ok(Self {
            local: SocketAddr::new(args.bind, args.port),
            remote: SocketAddr::new(args.robot, args.port),
            mode: args.mode,
            input: args.input,
            ramp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RampConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.side(Side::Left).min, 35);
        assert_eq!(config.side(Side::Right).max, 100);
    }

    #[test]
    fn test_rejects_floor_above_ceiling() {
        let config = RampConfig::symmetric(SideLimits {
            min: 120,
            max: 100,
            step: 2,
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_non_positive_rates() {
        let mut config = RampConfig::default();
        config.right.step = 0;
        assert!(config.validate().is_err());

        let mut config = RampConfig::default();
        config.slow_down_rate = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_limits_that_could_overflow() {
        let config = RampConfig::symmetric(SideLimits {
            min: 1,
            max: i32::MAX,
            step: i32::MAX,
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = RampConfig::default();
        config.left.step = 101;
        assert!(config.validate().is_err());

        let mut config = RampConfig::default();
        config.slow_down_rate = i32::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_step_in_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("quickbot-ramp-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "left": { "min": 1, "max": 2147483647, "step": 2147483647 } }"#,
        )
        .unwrap();
        let result = RampConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RampConfig =
            serde_json::from_str(r#"{ "left": { "min": 45, "max": 100, "step": 2 } }"#).unwrap();
        assert_eq!(config.left.min, 45);
        assert_eq!(config.right, SideLimits::default());
        assert_eq!(config.slow_down_rate, 2);
    }

    #[test]
    fn test_no_argument_uses_default_robot() {
        let args = Args::try_parse_from(["quickbot-teleop"]).unwrap();
        let config = SessionConfig::from_args(&args).unwrap();
        assert_eq!(config.remote, SocketAddr::new(DEFAULT_ROBOT_IP, DEFAULT_PORT));
        assert_eq!(config.local.port(), DEFAULT_PORT);
        assert_eq!(config.mode, DispatchMode::Direct);
        assert_eq!(config.input, InputSource::Keyboard);
        assert_eq!(args.log_file, PathBuf::from(DEFAULT_LOG_FILE));
    }

    #[test]
    fn test_one_argument_sets_robot() {
        let args = Args::try_parse_from(["quickbot-teleop", "10.0.0.7", "--mode", "timed"]).unwrap();
        assert_eq!(args.robot, "10.0.0.7".parse::<IpAddr>().unwrap());
        assert_eq!(args.mode, DispatchMode::Timed);
    }

    #[test]
    fn test_two_positionals_are_a_usage_error() {
        let err = Args::try_parse_from(["quickbot-teleop", "10.0.0.7", "10.0.0.8"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
