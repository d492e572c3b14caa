// QuickBot text command grammar
//
// Every command is an ASCII datagram of the form `$<BODY>*\n`.
// Replies are passed through untouched.

use crate::messages::{Command, TelemetryMessage};

/// Wire text for a command
pub fn encode(command: &Command) -> String {
    match *command {
        // Calibration is just a fixed power pair as far as the robot knows
        Command::SetPower { left, right } | Command::Calibrate { left, right } => {
            format!("$PWM={},{}*\n", left, right)
        }
        Command::QueryIr => "$IRVAL?*\n".to_string(),
        Command::QueryEncoders => "$ENVAL?*\n".to_string(),
        Command::ResetEncoders => "$RESET*\n".to_string(),
        Command::HealthCheck => "$CHECK*\n".to_string(),
        Command::EndSession => "$END*\n".to_string(),
    }
}

/// Wrap a received datagram
pub fn decode(bytes: &[u8]) -> TelemetryMessage {
    TelemetryMessage::new(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_power() {
        let cmd = Command::SetPower {
            left: 90,
            right: -35,
        };
        assert_eq!(encode(&cmd), "$PWM=90,-35*\n");
        assert_eq!(
            encode(&Command::SetPower { left: 0, right: 0 }),
            "$PWM=0,0*\n"
        );
    }

    #[test]
    fn test_queries_and_requests() {
        assert_eq!(encode(&Command::QueryIr), "$IRVAL?*\n");
        assert_eq!(encode(&Command::QueryEncoders), "$ENVAL?*\n");
        assert_eq!(encode(&Command::ResetEncoders), "$RESET*\n");
        assert_eq!(encode(&Command::HealthCheck), "$CHECK*\n");
        assert_eq!(encode(&Command::EndSession), "$END*\n");
    }

    #[test]
    fn test_calibrate_sends_its_powers() {
        let cmd = Command::Calibrate {
            left: 90,
            right: 80,
        };
        assert_eq!(encode(&cmd), "$PWM=90,80*\n");
        let narrowed = Command::Calibrate {
            left: 88,
            right: 85,
        };
        assert_eq!(encode(&narrowed), "$PWM=88,85*\n");
    }

    #[test]
    fn test_decode_is_pass_through() {
        let raw = [0x24, 0xFF, 0x00, b'\n'];
        let msg = decode(&raw);
        assert_eq!(msg.as_bytes(), &raw);
        assert!(decode(&[]).is_empty());
    }
}
