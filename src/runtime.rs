// Teleop session: foreground input loop plus background telemetry poller
//
// The foreground owns the ramp and the send side of the socket. The poller
// owns the receive side and hands datagrams over through a watch channel.
// Shutdown is a watch flag the poller checks every tick.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::codec::encode;
use crate::config::{
    DispatchMode, GAMEPAD_TICK, INPUT_HOLD, InputSource, POLL_INTERVAL, RAMP_TICK,
    REDRAW_INTERVAL, SEND_TICK, SessionConfig,
};
use crate::console::{Console, TerminalGuard};
use crate::dispatcher::{Dispatch, InputDispatcher};
use crate::gamepad::GamepadSource;
use crate::keymap::{action_for, echo_for};
use crate::messages::{Action, Command, Side};
use crate::ramp::RampState;
use crate::telemetry::{TelemetryPoller, TelemetrySlot};
use crate::transport::{TransportError, UdpTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    Terminated,
}

/// Wire text that went out, or why it didn't
pub type SendOutcome = Result<String, TransportError>;

pub struct Session {
    transport: Arc<UdpTransport>,
    dispatcher: InputDispatcher,
    state: SessionState,
}

impl Session {
    pub fn new(transport: Arc<UdpTransport>, dispatcher: InputDispatcher) -> Self {
        Self {
            transport,
            dispatcher,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn ramp(&self) -> &RampState {
        self.dispatcher.ramp()
    }

    pub fn start(&mut self) {
        if self.state == SessionState::Idle {
            info!(
                "Session started: {:?} dispatch, robot at {}",
                self.dispatcher.mode(),
                self.transport.remote_addr()
            );
            self.state = SessionState::Running;
        }
    }

    /// Apply one operator action. `None` when nothing was sent.
    pub fn on_action(&mut self, action: Action, now: Instant) -> Option<SendOutcome> {
        if !self.is_running() {
            return None;
        }
        match self.dispatcher.handle(action, now) {
            Dispatch::Send(cmd) => Some(self.transmit(&cmd)),
            Dispatch::Idle => None,
            Dispatch::Quit => {
                self.terminate();
                None
            }
        }
    }

    /// Ramp tick for timed dispatch
    pub fn ramp_tick(&mut self, now: Instant) {
        if self.is_running() {
            self.dispatcher.ramp_tick(now);
        }
    }

    /// Send tick for timed dispatch
    pub fn send_tick(&mut self) -> Option<SendOutcome> {
        if !self.is_running() {
            return None;
        }
        let cmd = self.dispatcher.send_tick();
        Some(self.transmit(&cmd))
    }

    /// Send a command built outside the dispatcher (gamepad sticks)
    pub fn send_command(&mut self, cmd: &Command) -> Option<SendOutcome> {
        if !self.is_running() {
            return None;
        }
        Some(self.transmit(cmd))
    }

    /// Tell the robot we're done and stop accepting input
    pub fn terminate(&mut self) {
        if self.state == SessionState::Running {
            if let Err(e) = self.transmit(&Command::EndSession) {
                warn!("Could not send end of session: {}", e);
            }
        }
        if self.state != SessionState::Terminated {
            info!("Session terminated");
        }
        self.state = SessionState::Terminated;
    }

    fn transmit(&self, cmd: &Command) -> SendOutcome {
        let text = encode(cmd);
        match self.transport.send(text.as_bytes()) {
            Ok(()) => {
                debug!("Sent {:?}", text);
                Ok(text)
            }
            Err(e) => {
                warn!("{}", e);
                Err(e)
            }
        }
    }
}

pub async fn run(config: SessionConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening link {} -> {}", config.local, config.remote);
    let transport = Arc::new(UdpTransport::bind(config.local, config.remote)?);

    let dispatcher = InputDispatcher::new(RampState::new(config.ramp), config.mode, INPUT_HOLD);
    let mut session = Session::new(transport.clone(), dispatcher);

    let gamepad = match config.input {
        InputSource::Gamepad => Some(GamepadSource::open([config.ramp.left, config.ramp.right])?),
        InputSource::Keyboard => None,
    };

    let terminal = TerminalGuard::enter()?;

    let (poller, mut telemetry) = TelemetryPoller::new(transport, POLL_INTERVAL);
    let (stop_tx, stop_rx) = watch::channel(false);
    let poller_handle = tokio::spawn(poller.run(stop_rx));

    let result = foreground(&mut session, &mut telemetry, gamepad);
    session.terminate();
    drop(terminal);

    let _ = stop_tx.send(true);
    if let Err(e) = poller_handle.await {
        warn!("Telemetry poller ended abnormally: {}", e);
    }

    result.map_err(Into::into)
}

fn foreground(
    session: &mut Session,
    telemetry: &mut TelemetrySlot,
    mut gamepad: Option<GamepadSource>,
) -> io::Result<()> {
    let mut console = Console::new(io::stdout());
    let timed = session.dispatcher.mode() == DispatchMode::Timed && gamepad.is_none();
    let ticking = timed || gamepad.is_some();
    let send_period = if gamepad.is_some() { GAMEPAD_TICK } else { SEND_TICK };
    let mut next_ramp = Instant::now() + RAMP_TICK;
    let mut next_send = Instant::now() + send_period;
    let mut stick_power = None;

    session.start();
    console.render()?;

    while session.is_running() {
        let mut deadline = Instant::now() + REDRAW_INTERVAL;
        if timed {
            deadline = deadline.min(next_ramp);
        }
        if ticking {
            deadline = deadline.min(next_send);
        }
        let wait = deadline.saturating_duration_since(Instant::now());

        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                if let Some(c) = echo_for(&key) {
                    console.prompt(Some(c));
                }
                match action_for(&key) {
                    // Sticks own the drive while a gamepad is in use
                    Some(action) if gamepad.is_some() && action.drive().is_some() => {}
                    Some(action) => {
                        if let Some(outcome) = session.on_action(action, Instant::now()) {
                            show_sent(&mut console, outcome);
                        }
                    }
                    None if key.kind != KeyEventKind::Release => {
                        debug!("Ignoring key {:?}", key.code);
                        console.prompt(None);
                    }
                    None => {}
                }
            }
        }

        let now = Instant::now();
        if timed && now >= next_ramp {
            session.ramp_tick(now);
            next_ramp = now + RAMP_TICK;
        }
        if ticking && now >= next_send {
            let outcome = match gamepad.as_mut() {
                Some(pad) => match pad.sample() {
                    Some(cmd) => {
                        stick_power = Some(cmd);
                        session.send_command(&cmd)
                    }
                    None => {
                        console.sent("no gamepad connected");
                        None
                    }
                },
                None => session.send_tick(),
            };
            if let Some(outcome) = outcome {
                show_sent(&mut console, outcome);
            }
            next_send = now + send_period;
        }

        if telemetry.has_changed() {
            if let Some(msg) = telemetry.take_latest() {
                console.received(&msg);
            }
        }
        match stick_power {
            Some(Command::SetPower { left, right }) => console.power(left, right),
            _ => {
                let ramp = session.ramp();
                console.power(ramp.power(Side::Left), ramp.power(Side::Right));
            }
        }
        console.render()?;
    }

    Ok(())
}

fn show_sent<W: io::Write>(console: &mut Console<W>, outcome: SendOutcome) {
    match outcome {
        Ok(text) => console.sent(&text),
        Err(e) => console.sent(&format!("send failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RampConfig, SideLimits};
    use crate::messages::Direction;
    use std::net::{SocketAddr, UdpSocket};
    use std::time::Duration;

    fn robot_and_session(mode: DispatchMode) -> (UdpSocket, Session) {
        let robot = UdpSocket::bind("127.0.0.1:0").unwrap();
        robot
            .set_read_timeout(Some(Duration::from_secs(1)))
            .unwrap();
        let local: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let transport = UdpTransport::bind(local, robot.local_addr().unwrap()).unwrap();
        let ramp = RampState::new(RampConfig::symmetric(SideLimits {
            min: 45,
            max: 100,
            step: 2,
        }));
        let dispatcher = InputDispatcher::new(ramp, mode, INPUT_HOLD);
        (robot, Session::new(Arc::new(transport), dispatcher))
    }

    fn next_datagram(robot: &UdpSocket) -> String {
        let mut buf = [0u8; 256];
        let len = robot.recv(&mut buf).unwrap();
        String::from_utf8_lossy(&buf[..len]).into_owned()
    }

    #[test]
    fn test_idle_session_ignores_input() {
        let (_robot, mut session) = robot_and_session(DispatchMode::Direct);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.on_action(Action::Forward, Instant::now()).is_none());
        assert_eq!(session.ramp().power(Side::Left), 0);
    }

    #[test]
    fn test_presses_reach_robot() {
        let (robot, mut session) = robot_and_session(DispatchMode::Direct);
        session.start();
        let press = Action::Wheel(Side::Left, Direction::Forward);
        for _ in 0..3 {
            let sent = session.on_action(press, Instant::now()).unwrap().unwrap();
            assert!(sent.starts_with("$PWM="));
        }

        assert_eq!(next_datagram(&robot), "$PWM=45,0*\n");
        assert_eq!(next_datagram(&robot), "$PWM=47,0*\n");
        assert_eq!(next_datagram(&robot), "$PWM=49,0*\n");

        session.on_action(Action::QueryIr, Instant::now());
        assert_eq!(next_datagram(&robot), "$IRVAL?*\n");
    }

    #[test]
    fn test_quit_sends_end_and_is_final() {
        let (robot, mut session) = robot_and_session(DispatchMode::Direct);
        session.start();
        assert!(session.on_action(Action::Quit, Instant::now()).is_none());
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(next_datagram(&robot), "$END*\n");

        session.start();
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(session.on_action(Action::Forward, Instant::now()).is_none());
        assert!(session.send_tick().is_none());

        // Terminating twice doesn't send a second end
        session.terminate();
        robot.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 16];
        assert!(robot.recv(&mut buf).is_err());
    }

    #[test]
    fn test_stick_command_reaches_robot() {
        let (robot, mut session) = robot_and_session(DispatchMode::Timed);
        let limits = [session.ramp().limits(Side::Left), session.ramp().limits(Side::Right)];
        let cmd = crate::gamepad::tank_drive(0.5, -0.1, limits);
        assert!(session.send_command(&cmd).is_none());

        session.start();
        let sent = session.send_command(&cmd).unwrap().unwrap();
        assert_eq!(sent, "$PWM=50,0*\n");
        assert_eq!(next_datagram(&robot), "$PWM=50,0*\n");
    }

    #[test]
    fn test_timed_session_sends_on_tick() {
        let (robot, mut session) = robot_and_session(DispatchMode::Timed);
        session.start();
        let now = Instant::now();
        assert!(session.on_action(Action::Forward, now).is_none());
        session.ramp_tick(now + RAMP_TICK);

        let sent = session.send_tick().unwrap().unwrap();
        assert_eq!(sent, "$PWM=45,45*\n");
        assert_eq!(next_datagram(&robot), "$PWM=45,45*\n");
    }
}
